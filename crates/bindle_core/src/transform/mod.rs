use bindle_common::{ModuleId, ModuleKind};
use bindle_transpiler::ImportKind;

use crate::{BuildInputOptions, UnaryBuildResult};

mod asset;
mod script;
mod style;
mod stylesheet;

pub(crate) use asset::transform_asset;
pub(crate) use script::transform_script;
pub(crate) use stylesheet::transform_stylesheet;

/// A dependency the module declares, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRequest {
  pub specifier: String,
  pub kind: ImportKind,
}

/// A copy-through artifact produced by the asset transform, routed to the
/// emitter under a content-hashed name.
#[derive(Debug, Clone)]
pub struct EmittedAsset {
  /// The asset's path relative to the project root, used as its manifest key.
  pub logical_name: String,
  pub file_name: String,
  pub content: Vec<u8>,
}

#[derive(Debug)]
pub struct TransformOutput {
  pub code: String,
  pub dependencies: Vec<DependencyRequest>,
  pub emitted_asset: Option<EmittedAsset>,
}

pub(crate) struct TransformContext<'a> {
  pub id: &'a ModuleId,
  pub options: &'a BuildInputOptions,
}

pub(crate) fn transform_module(
  ctx: &TransformContext,
  raw: Vec<u8>,
) -> UnaryBuildResult<TransformOutput> {
  match ctx.id.kind() {
    ModuleKind::Script => transform_script(ctx, into_utf8(ctx, raw)?),
    ModuleKind::Stylesheet => transform_stylesheet(ctx, into_utf8(ctx, raw)?),
    ModuleKind::Asset => transform_asset(ctx, raw),
  }
}

fn into_utf8(ctx: &TransformContext, raw: Vec<u8>) -> UnaryBuildResult<String> {
  String::from_utf8(raw).map_err(|_| {
    crate::BuildError::transform_failed(ctx.id.as_ref(), None, "module content is not valid UTF-8")
  })
}
