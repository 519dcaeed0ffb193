use std::path::Path;

use base64::Engine;
use sugar_path::SugarPath;

use super::{EmittedAsset, TransformContext, TransformOutput};
use crate::utils::{js_string, short_hash};
use crate::UnaryBuildResult;

pub(crate) fn transform_asset(
  ctx: &TransformContext,
  raw: Vec<u8>,
) -> UnaryBuildResult<TransformOutput> {
  let path = Path::new(ctx.id.as_ref());

  if raw.len() as u64 <= ctx.options.inline_limit {
    let encoded = base64::engine::general_purpose::STANDARD.encode(&raw);
    let data_uri = format!("data:{};base64,{encoded}", mime_for(path));
    return Ok(TransformOutput {
      code: format!("module.exports = {};", js_string(&data_uri)),
      dependencies: vec![],
      emitted_asset: None,
    });
  }

  let stem = path
    .file_stem()
    .and_then(|stem| stem.to_str())
    .unwrap_or("asset");
  let ext = path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| format!(".{ext}"))
    .unwrap_or_default();
  let file_name = format!("assets/{stem}.{}{ext}", short_hash(&raw));
  let logical_name = path
    .relative(&ctx.options.cwd)
    .to_string_lossy()
    .to_string();
  let url = format!("{}{file_name}", ctx.options.public_path);

  Ok(TransformOutput {
    code: format!("module.exports = {};", js_string(&url)),
    dependencies: vec![],
    emitted_asset: Some(EmittedAsset {
      logical_name,
      file_name,
      content: raw,
    }),
  })
}

fn mime_for(path: &Path) -> &'static str {
  match path.extension().and_then(|ext| ext.to_str()).unwrap_or("") {
    "png" => "image/png",
    "jpg" | "jpeg" => "image/jpeg",
    "gif" => "image/gif",
    "svg" => "image/svg+xml",
    "webp" => "image/webp",
    "ico" => "image/x-icon",
    "woff" => "font/woff",
    "woff2" => "font/woff2",
    "ttf" => "font/ttf",
    "eot" => "application/vnd.ms-fontobject",
    "json" => "application/json",
    "txt" => "text/plain",
    _ => "application/octet-stream",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{BuildInputOptions, TransformContext};
  use bindle_common::ModuleId;

  fn ctx_with_limit<'a>(options: &'a BuildInputOptions, id: &'a ModuleId) -> TransformContext<'a> {
    TransformContext { id, options }
  }

  #[test]
  fn small_asset_inlines_as_data_uri() {
    let options = BuildInputOptions {
      inline_limit: 1024,
      ..Default::default()
    };
    let id = ModuleId::from_path("/proj/logo.png");
    let out = transform_asset(&ctx_with_limit(&options, &id), vec![1, 2, 3]).unwrap();
    assert!(out.code.contains("data:image/png;base64,"));
    assert!(out.emitted_asset.is_none());
  }

  #[test]
  fn large_asset_becomes_copy_through_artifact() {
    let options = BuildInputOptions {
      inline_limit: 2,
      cwd: "/proj".into(),
      public_path: "/static/".to_string(),
      ..Default::default()
    };
    let id = ModuleId::from_path("/proj/img/logo.png");
    let out = transform_asset(&ctx_with_limit(&options, &id), vec![9; 64]).unwrap();
    let asset = out.emitted_asset.expect("artifact");
    assert!(asset.file_name.starts_with("assets/logo."));
    assert!(asset.file_name.ends_with(".png"));
    assert_eq!(asset.logical_name, "img/logo.png");
    assert!(out.code.contains("/static/assets/logo."));
  }
}
