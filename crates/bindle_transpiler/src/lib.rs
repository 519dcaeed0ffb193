//! The transform-collaborator contract: language-level transpilation is
//! delegated to an implementor of [`Transpiler`], which must rewrite
//! import/require occurrences into the normalized runtime form and report
//! every import specifier it observed. Implementations must be deterministic
//! for identical input and must report syntax errors with positions.

use bindle_common::{EcmaVersion, ModuleKind, TextPosition};

mod es;
pub use es::EsTranspiler;

/// Name of the runtime require function emitted chunks provide to module
/// factories. Static imports are rewritten to calls of this function,
/// dynamic imports to calls of its `dynamic` member.
pub const RUNTIME_REQUIRE: &str = "__bindle_require__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
  /// `import`/`require` — inlined into the importer's chunk.
  Static,
  /// `import()` — a chunk-split boundary.
  Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
  pub specifier: String,
  pub kind: ImportKind,
}

#[derive(Debug, Clone)]
pub struct TranspileOutput {
  pub code: String,
  /// Specifiers in first-occurrence order, deduplicated.
  pub imports: Vec<ImportRecord>,
}

#[derive(Debug)]
pub struct TranspileError {
  pub reason: String,
  pub position: Option<TextPosition>,
}

impl std::fmt::Display for TranspileError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self.position {
      Some(position) => write!(f, "{} at {position}", self.reason),
      None => write!(f, "{}", self.reason),
    }
  }
}

impl std::error::Error for TranspileError {}

pub trait Transpiler: std::fmt::Debug + Send + Sync {
  fn transpile(
    &self,
    code: &str,
    kind: ModuleKind,
    target: EcmaVersion,
  ) -> Result<TranspileOutput, TranspileError>;
}
