use std::fmt::Display;
use std::path::{Path, PathBuf};

use bindle_common::TextPosition;

use crate::ErrorKind;

#[derive(Debug)]
pub struct Error {
  contexts: Vec<String>,
  pub kind: ErrorKind,
}

impl PartialEq for Error {
  fn eq(&self, other: &Self) -> bool {
    self.kind.to_string().eq(&other.kind.to_string())
  }
}

impl Eq for Error {}

impl PartialOrd for Error {
  fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Error {
  fn cmp(&self, other: &Self) -> std::cmp::Ordering {
    self.kind.to_string().cmp(&other.kind.to_string())
  }
}

impl Error {
  fn with_kind(kind: ErrorKind) -> Self {
    Self {
      contexts: vec![],
      kind,
    }
  }

  pub fn context(mut self, context: String) -> Self {
    self.contexts.push(context);
    self
  }

  pub fn code(&self) -> &'static str {
    self.kind.code()
  }

  pub fn unresolved(
    specifier: impl Into<String>,
    importer: Option<&Path>,
    tried: Vec<PathBuf>,
  ) -> Self {
    Self::with_kind(ErrorKind::Resolution {
      specifier: specifier.into().into(),
      importer: importer.map(Path::to_path_buf),
      tried,
    })
  }

  pub fn transform_failed(
    module: impl AsRef<Path>,
    position: Option<TextPosition>,
    reason: impl Into<String>,
  ) -> Self {
    Self::with_kind(ErrorKind::Transform {
      module: module.as_ref().to_path_buf(),
      position,
      reason: reason.into().into(),
    })
  }

  pub fn style_eval(module: impl AsRef<Path>, reason: impl Into<String>) -> Self {
    Self::with_kind(ErrorKind::StyleEval {
      module: module.as_ref().to_path_buf(),
      reason: reason.into().into(),
    })
  }

  pub fn split_conflict(
    module: impl AsRef<Path>,
    first: impl Into<String>,
    second: impl Into<String>,
  ) -> Self {
    Self::with_kind(ErrorKind::SplitConflict {
      module: module.as_ref().to_path_buf(),
      first: first.into().into(),
      second: second.into().into(),
    })
  }

  pub fn emission(path: impl AsRef<Path>, source: std::io::Error) -> Self {
    Self::with_kind(ErrorKind::Emission {
      path: path.as_ref().to_path_buf(),
      source,
    })
  }

  pub fn unresolved_entry(unresolved_id: impl AsRef<Path>) -> Self {
    Self::with_kind(ErrorKind::UnresolvedEntry {
      unresolved_id: unresolved_id.as_ref().to_path_buf(),
    })
  }

  pub fn entry_cannot_be_external(unresolved_id: impl AsRef<Path>) -> Self {
    Self::with_kind(ErrorKind::ExternalEntry {
      id: unresolved_id.as_ref().to_path_buf(),
    })
  }

  pub fn io_error(e: std::io::Error) -> Self {
    Self::with_kind(ErrorKind::IoError(e))
  }

  pub fn panic(msg: String) -> Self {
    anyhow::format_err!(msg).into()
  }
}

impl std::convert::From<anyhow::Error> for Error {
  fn from(value: anyhow::Error) -> Self {
    Self::with_kind(ErrorKind::Panic { source: value })
  }
}

impl std::error::Error for Error {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match &self.kind {
      ErrorKind::Panic { source, .. } => Some(source.as_ref()),
      ErrorKind::Emission { source, .. } => Some(source),
      ErrorKind::IoError(source) => Some(source),
      _ => None,
    }
  }
}

impl Display for Error {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    for ctx in self.contexts.iter().rev() {
      writeln!(f, "{}: {}", ansi_term::Color::Yellow.paint("context"), ctx)?;
    }

    self.kind.fmt(f)
  }
}
