use bindle_common::{ModuleId, StaticStr};

/// A dependency resolved to a runtime-provided module. It is emitted as a
/// reference to the configured access expression, never inlined.
#[derive(Debug, Clone)]
pub struct ExternalModule {
  pub(crate) exec_order: usize,
  pub(crate) id: ModuleId,
  pub(crate) access: StaticStr,
}

impl ExternalModule {
  pub(crate) fn render_factory(&self) -> String {
    format!(
      "{}: function(module) {{ module.exports = {}; }}",
      crate::utils::js_string(self.id.as_ref()),
      self.access
    )
  }
}
