use std::str::FromStr;

/// Build platform used for platform-qualified module selection
/// (`foo.node.js` over `foo.js` when building for node).
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Platform {
  Browser,
  Node,
}

impl Platform {
  /// The file-name qualifier between stem and extension.
  pub fn qualifier(self) -> &'static str {
    match self {
      Platform::Browser => "browser",
      Platform::Node => "node",
    }
  }
}

impl Default for Platform {
  fn default() -> Self {
    Platform::Browser
  }
}

impl FromStr for Platform {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value {
      "browser" => Ok(Platform::Browser),
      "node" => Ok(Platform::Node),
      _ => Err(format!("Unknown platform \"{value}\"")),
    }
  }
}
