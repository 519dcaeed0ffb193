use std::borrow::Cow;
use std::fmt::Display;
use std::path::Path;

use arcstr::ArcStr;

mod kind;
pub use kind::*;
mod platform;
pub use platform::*;

pub type StaticStr = Cow<'static, str>;

#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct ChunkId(ArcStr);

impl ChunkId {
  pub fn new(value: impl Into<ArcStr>) -> Self {
    Self(value.into())
  }

  pub fn value(&self) -> &ArcStr {
    &self.0
  }
}

impl From<ArcStr> for ChunkId {
  fn from(value: ArcStr) -> Self {
    Self(value)
  }
}

impl From<String> for ChunkId {
  fn from(value: String) -> Self {
    Self(value.into())
  }
}

impl AsRef<str> for ChunkId {
  fn as_ref(&self) -> &str {
    &self.0
  }
}

impl Display for ChunkId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Canonical identity of one source unit in the graph: the resolved absolute
/// path plus the kind qualifier it was resolved as. The same file requested
/// as a stylesheet and as a script is two distinct identities.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct ModuleId {
  value: ArcStr,
  kind: ModuleKind,
  is_external: bool,
}

impl Display for ModuleId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.value)
  }
}

impl ModuleId {
  pub fn new(value: impl Into<ArcStr>, kind: ModuleKind) -> Self {
    Self {
      value: value.into(),
      kind,
      is_external: false,
    }
  }

  /// Identity for a module resolved to a runtime-provided external.
  pub fn external(value: impl Into<ArcStr>) -> Self {
    Self {
      value: value.into(),
      kind: ModuleKind::Script,
      is_external: true,
    }
  }

  pub fn from_path(path: impl AsRef<Path>) -> Self {
    let path = path.as_ref();
    let kind = ModuleKind::from_path(path);
    Self::new(path.to_string_lossy().to_string(), kind)
  }

  pub fn is_external(&self) -> bool {
    self.is_external
  }

  pub fn kind(&self) -> ModuleKind {
    self.kind
  }

  pub fn id(&self) -> &ArcStr {
    &self.value
  }
}

impl AsRef<str> for ModuleId {
  fn as_ref(&self) -> &str {
    &self.value
  }
}

/// A 0-based offset into source text rendered as 1-based line/column in
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPosition {
  pub line: usize,
  pub column: usize,
}

impl TextPosition {
  pub fn from_offset(source: &str, offset: usize) -> Self {
    let mut line = 1;
    let mut column = 1;
    for (idx, ch) in source.char_indices() {
      if idx >= offset {
        break;
      }
      if ch == '\n' {
        line += 1;
        column = 1;
      } else {
        column += 1;
      }
    }
    Self { line, column }
  }
}

impl Display for TextPosition {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}:{}", self.line, self.column)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn module_id_kind_is_part_of_identity() {
    let as_script = ModuleId::new("/a/style.css", ModuleKind::Script);
    let as_style = ModuleId::new("/a/style.css", ModuleKind::Stylesheet);
    assert_ne!(as_script, as_style);
    assert_eq!(as_script.id(), as_style.id());
  }

  #[test]
  fn text_position_counts_lines_and_columns() {
    let source = "ab\ncd";
    assert_eq!(TextPosition::from_offset(source, 0), TextPosition { line: 1, column: 1 });
    assert_eq!(TextPosition::from_offset(source, 4), TextPosition { line: 2, column: 2 });
  }
}
