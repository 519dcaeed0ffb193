use std::fmt::Display;
use std::path::{Path, PathBuf};

use bindle_common::{StaticStr, TextPosition};

use crate::utils::{format_quoted_strings, PathExt};
use crate::CWD;

pub mod error_code;

#[derive(Debug)]
pub enum ErrorKind {
  /// A specifier could not be resolved to a file or an external after
  /// exhausting alias rewriting, the externals table, and extension probing.
  Resolution {
    specifier: StaticStr,
    importer: Option<PathBuf>,
    tried: Vec<PathBuf>,
  },
  /// Module content could not be parsed or transformed.
  Transform {
    module: PathBuf,
    position: Option<TextPosition>,
    reason: StaticStr,
  },
  /// Invalid arithmetic or a unit mismatch while evaluating a stylesheet
  /// expression.
  StyleEval {
    module: PathBuf,
    reason: StaticStr,
  },
  /// Contradictory chunk assignment. Defensive; the deterministic tie-break
  /// should make this unreachable.
  SplitConflict {
    module: PathBuf,
    first: StaticStr,
    second: StaticStr,
  },
  /// I/O failure while writing chunks, the manifest, or copied assets.
  Emission {
    path: PathBuf,
    source: std::io::Error,
  },

  UnresolvedEntry {
    unresolved_id: PathBuf,
  },
  ExternalEntry {
    id: PathBuf,
  },

  /// Unrecoverable error; also used to surface plain `anyhow` failures.
  Panic {
    source: anyhow::Error,
  },

  IoError(std::io::Error),
}

impl Display for ErrorKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ErrorKind::Resolution {
        specifier,
        importer,
        tried,
      } => {
        write!(f, "Could not resolve \"{specifier}\"")?;
        if let Some(importer) = importer {
          write!(f, " from \"{}\"", importer.may_display_relative())?;
        }
        if !tried.is_empty() {
          write!(
            f,
            " (tried {})",
            format_quoted_strings(
              &tried
                .iter()
                .map(|p| p.may_display_relative().into_owned())
                .collect::<Vec<_>>()
            )
          )?;
        }
        Ok(())
      }
      ErrorKind::Transform {
        module,
        position,
        reason,
      } => {
        write!(
          f,
          "Transform failed for \"{}\"",
          module.may_display_relative()
        )?;
        if let Some(position) = position {
          write!(f, " at {position}")?;
        }
        write!(f, ": {reason}")
      }
      ErrorKind::StyleEval { module, reason } => write!(
        f,
        "Invalid style expression in \"{}\": {reason}",
        module.may_display_relative()
      ),
      ErrorKind::SplitConflict {
        module,
        first,
        second,
      } => write!(
        f,
        "Module \"{}\" was assigned to both chunk \"{first}\" and chunk \"{second}\"",
        module.may_display_relative()
      ),
      ErrorKind::Emission { path, source } => write!(
        f,
        "Failed to emit \"{}\": {source}",
        path.may_display_relative()
      ),
      ErrorKind::UnresolvedEntry { unresolved_id } => write!(
        f,
        "Could not resolve entry module \"{}\"",
        unresolved_id.may_display_relative()
      ),
      ErrorKind::ExternalEntry { id } => write!(
        f,
        "Entry module \"{}\" cannot be external.",
        id.may_display_relative()
      ),
      ErrorKind::Panic { source } => source.fmt(f),
      ErrorKind::IoError(e) => e.fmt(f),
    }
  }
}

impl ErrorKind {
  /// Shorten the file paths in messages by making them relative to CWD.
  pub fn to_readable_string(&self, cwd: impl AsRef<Path>) -> String {
    let cwd = cwd.as_ref().to_path_buf();
    CWD.set(&cwd, || self.to_string())
  }

  pub fn code(&self) -> &'static str {
    match self {
      ErrorKind::Resolution { .. } => error_code::RESOLUTION_ERROR,
      ErrorKind::Transform { .. } => error_code::TRANSFORM_ERROR,
      ErrorKind::StyleEval { .. } => error_code::STYLE_EVAL_ERROR,
      ErrorKind::SplitConflict { .. } => error_code::SPLIT_CONFLICT,
      ErrorKind::Emission { .. } => error_code::EMISSION_ERROR,
      ErrorKind::UnresolvedEntry { .. } => error_code::UNRESOLVED_ENTRY,
      ErrorKind::ExternalEntry { .. } => error_code::UNRESOLVED_ENTRY,
      ErrorKind::Panic { .. } => error_code::PANIC,
      ErrorKind::IoError(_) => error_code::IO_ERROR,
    }
  }
}
