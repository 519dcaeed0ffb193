use std::path::Path;
use std::str::FromStr;

/// The closed set of module kinds the transform pipeline dispatches on.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModuleKind {
  Script,
  Stylesheet,
  Asset,
}

impl ModuleKind {
  pub fn from_path(path: impl AsRef<Path>) -> Self {
    let ext = path
      .as_ref()
      .extension()
      .and_then(|ext| ext.to_str())
      .unwrap_or("");
    Self::from_extension(ext)
  }

  pub fn from_extension(ext: &str) -> Self {
    match ext {
      "js" | "jsx" | "mjs" | "cjs" | "ts" | "tsx" => ModuleKind::Script,
      "css" | "less" | "scss" => ModuleKind::Stylesheet,
      _ => ModuleKind::Asset,
    }
  }

  pub fn is_script(self) -> bool {
    matches!(self, ModuleKind::Script)
  }

  pub fn is_stylesheet(self) -> bool {
    matches!(self, ModuleKind::Stylesheet)
  }

  pub fn is_asset(self) -> bool {
    matches!(self, ModuleKind::Asset)
  }
}

impl FromStr for ModuleKind {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value {
      "script" => Ok(ModuleKind::Script),
      "stylesheet" => Ok(ModuleKind::Stylesheet),
      "asset" => Ok(ModuleKind::Asset),
      _ => Err(format!("Unknown module kind \"{value}\"")),
    }
  }
}

/// Target syntax level handed to the transform collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EcmaVersion {
  Es5,
  Es2015,
  Es2017,
  Es2020,
  Es2022,
  EsNext,
}

impl Default for EcmaVersion {
  fn default() -> Self {
    EcmaVersion::Es2020
  }
}

impl FromStr for EcmaVersion {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value {
      "es5" => Ok(EcmaVersion::Es5),
      "es2015" | "es6" => Ok(EcmaVersion::Es2015),
      "es2017" => Ok(EcmaVersion::Es2017),
      "es2020" => Ok(EcmaVersion::Es2020),
      "es2022" => Ok(EcmaVersion::Es2022),
      "esnext" => Ok(EcmaVersion::EsNext),
      _ => Err(format!("Unknown ecma version \"{value}\"")),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kind_from_extension() {
    assert_eq!(ModuleKind::from_path("/a/b.tsx"), ModuleKind::Script);
    assert_eq!(ModuleKind::from_path("/a/b.less"), ModuleKind::Stylesheet);
    assert_eq!(ModuleKind::from_path("/a/b.png"), ModuleKind::Asset);
    assert_eq!(ModuleKind::from_path("/a/noext"), ModuleKind::Asset);
  }
}
