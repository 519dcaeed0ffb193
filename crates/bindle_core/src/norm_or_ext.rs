use bindle_common::ModuleId;

use crate::{external_module::ExternalModule, normal_module::NormalModule};

#[derive(Debug, Clone)]
pub enum NormOrExt {
  Normal(NormalModule),
  External(ExternalModule),
}

impl NormOrExt {
  pub fn id(&self) -> &ModuleId {
    match self {
      NormOrExt::Normal(module) => &module.id,
      NormOrExt::External(module) => &module.id,
    }
  }

  pub fn dependencies(&self) -> &[ModuleId] {
    static DUMMY: [ModuleId; 0] = [];
    match self {
      NormOrExt::Normal(module) => &module.dependencies,
      NormOrExt::External(_) => &DUMMY,
    }
  }

  pub fn dynamic_dependencies(&self) -> &[ModuleId] {
    static DUMMY: [ModuleId; 0] = [];
    match self {
      NormOrExt::Normal(module) => &module.dyn_dependencies,
      NormOrExt::External(_) => &DUMMY,
    }
  }

  pub fn exec_order(&self) -> usize {
    match self {
      NormOrExt::Normal(module) => module.exec_order,
      NormOrExt::External(module) => module.exec_order,
    }
  }

  pub fn set_exec_order(&mut self, exec_order: usize) {
    match self {
      NormOrExt::Normal(module) => module.exec_order = exec_order,
      NormOrExt::External(module) => module.exec_order = exec_order,
    }
  }

  pub fn as_norm(&self) -> Option<&NormalModule> {
    match self {
      NormOrExt::Normal(module) => Some(module),
      _ => None,
    }
  }

  pub fn as_norm_mut(&mut self) -> Option<&mut NormalModule> {
    match self {
      NormOrExt::Normal(module) => Some(module),
      _ => None,
    }
  }

  pub fn expect_norm(&self) -> &NormalModule {
    if let NormOrExt::Normal(module) = self {
      module
    } else {
      panic!("Expected NormalModule, got ExternalModule({})", self.id())
    }
  }

  pub(crate) fn render_factory(&self) -> String {
    match self {
      NormOrExt::Normal(module) => module.render_factory(),
      NormOrExt::External(module) => module.render_factory(),
    }
  }
}
