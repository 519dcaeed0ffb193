use arcstr::ArcStr;
use bindle_common::ModuleId;
use derivative::Derivative;
use rustc_hash::FxHashMap;

use crate::utils::rewrite_specifiers;
use crate::EmittedAsset;

#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct NormalModule {
  /// execution order
  pub(crate) exec_order: usize,
  pub(crate) id: ModuleId,
  /// Module ids this module imports statically. The order infers the order
  /// of execution.
  pub(crate) dependencies: Vec<ModuleId>,
  /// Created by `import()`.
  pub(crate) dyn_dependencies: Vec<ModuleId>,
  /// Transformed code in the normalized `__bindle_require__` form.
  #[derivative(Debug = "ignore")]
  pub(crate) code: String,
  /// Hash of the raw on-disk content this record was transformed from.
  pub(crate) content_hash: ArcStr,
  /// Specifier text -> resolved identity, for emission-time rewriting.
  pub(crate) resolved_ids: FxHashMap<String, ModuleId>,
  pub(crate) is_user_defined_entry: bool,
  pub(crate) is_dynamic_entry: bool,
  pub(crate) emitted_asset: Option<EmittedAsset>,
}

impl NormalModule {
  pub fn id(&self) -> &ModuleId {
    &self.id
  }

  pub fn code(&self) -> &str {
    &self.code
  }

  pub fn content_hash(&self) -> &str {
    &self.content_hash
  }

  pub fn dependencies(&self) -> &[ModuleId] {
    &self.dependencies
  }

  /// The factory body with every normalized specifier rewritten to the
  /// resolved module identity.
  pub(crate) fn finalized_code(&self) -> String {
    rewrite_specifiers(&self.code, &|specifier, _is_dynamic| {
      self
        .resolved_ids
        .get(specifier)
        .map(|id| id.id().to_string())
    })
  }

  /// One registry entry: `"<id>": function(module, exports, __bindle_require__) { .. }`.
  pub(crate) fn render_factory(&self) -> String {
    format!(
      "{}: function(module, exports, {}) {{\n{}\n}}",
      crate::utils::js_string(self.id.as_ref()),
      bindle_transpiler::RUNTIME_REQUIRE,
      self.finalized_code()
    )
  }
}
