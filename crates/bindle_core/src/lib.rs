use std::sync::Arc;

mod bundler;
pub use bundler::*;
mod bundle;
pub use bundle::*;
mod chunk;
pub use chunk::*;
mod chunk_graph;
pub use chunk_graph::*;
mod code_splitter;
pub use code_splitter::*;
mod emit;
pub use emit::*;
mod external_module;
pub use external_module::*;
mod graph;
pub use graph::*;
mod hmr;
pub use hmr::*;
mod incremental;
pub use incremental::*;
mod module_loader;
mod norm_or_ext;
pub use norm_or_ext::*;
mod normal_module;
pub use normal_module::*;
mod options;
pub use options::*;
mod transform;
pub use transform::*;
mod utils;
pub use utils::*;
mod watch;
pub use watch::*;

use bindle_common::ModuleId;
use rustc_hash::FxHashMap;

pub use bindle_error::Error as BuildError;

/// Result of per-module work; errors are collected by the caller so one
/// broken module does not hide the others.
pub type UnaryBuildResult<T> = std::result::Result<T, BuildError>;
/// Result at build granularity carrying the full collected error set.
pub type BuildResult<T> = std::result::Result<T, Vec<BuildError>>;

pub(crate) type ModuleById = FxHashMap<ModuleId, NormOrExt>;
pub type SharedResolver = Arc<bindle_resolver::Resolver>;
pub type SharedTranspiler = Arc<dyn bindle_transpiler::Transpiler>;
