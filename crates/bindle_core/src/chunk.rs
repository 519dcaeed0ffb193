use bindle_common::{ChunkId, ModuleId};
use hashlink::LinkedHashSet;
use rustc_hash::FxHashSet;

use crate::file_name::RenderOptions;
use crate::{BuildOutputOptions, ModuleById, NormOrExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
  /// Rooted at a configured entry; carries the runtime and bootstrap.
  Entry,
  /// Third-party modules grouped under a configured boundary.
  Vendor,
  /// A module shared between entries under `depPerChunk`.
  Shared,
  /// Rooted at a dynamically imported module, loaded on demand.
  Async,
}

#[derive(Debug, Clone)]
pub struct Chunk {
  pub(crate) id: ChunkId,
  pub(crate) kind: ChunkKind,
  /// Root module for entry/shared/async chunks.
  pub(crate) entry: Option<ModuleId>,
  /// Logical entry name, for file naming and the manifest.
  pub(crate) entry_name: Option<String>,
  pub(crate) modules: FxHashSet<ModuleId>,
  /// External references used by members, in first-use order.
  pub(crate) externals: LinkedHashSet<ModuleId>,
  /// Chunks that must be loaded before this one executes.
  pub(crate) depends_on: LinkedHashSet<ChunkId>,
  /// Async chunks reachable through dynamic imports of members.
  pub(crate) async_deps: LinkedHashSet<ChunkId>,
  pub(crate) filename: Option<String>,
}

impl Chunk {
  pub fn new(id: impl Into<ChunkId>, kind: ChunkKind, entry: Option<ModuleId>) -> Self {
    Self {
      id: id.into(),
      kind,
      entry,
      entry_name: None,
      modules: Default::default(),
      externals: Default::default(),
      depends_on: Default::default(),
      async_deps: Default::default(),
      filename: None,
    }
  }

  pub fn id(&self) -> &ChunkId {
    &self.id
  }

  pub fn kind(&self) -> ChunkKind {
    self.kind
  }

  pub fn modules(&self) -> &FxHashSet<ModuleId> {
    &self.modules
  }

  pub fn entry_name(&self) -> Option<&str> {
    self.entry_name.as_deref()
  }

  pub fn depends_on(&self) -> impl Iterator<Item = &ChunkId> {
    self.depends_on.iter()
  }

  pub fn file_name(&self) -> Option<&str> {
    self.filename.as_deref()
  }

  pub(crate) fn gen_file_name(&mut self, output_options: &BuildOutputOptions, hash: Option<&str>) {
    let template = match self.kind {
      ChunkKind::Entry => &output_options.entry_file_names,
      _ => &output_options.chunk_file_names,
    };
    let name = self
      .entry_name
      .clone()
      .unwrap_or_else(|| self.id.as_ref().to_string());
    self.filename = Some(template.render(RenderOptions {
      name: Some(&name),
      hash,
    }));
  }

  /// Members in stable topological order: dependencies before dependents,
  /// ties broken by first-discovery order (the graph's execution order).
  pub(crate) fn ordered_modules<'m>(&self, module_by_id: &'m ModuleById) -> Vec<&'m NormOrExt> {
    let mut modules = self
      .modules
      .iter()
      .filter_map(|id| module_by_id.get(id))
      .collect::<Vec<_>>();
    modules.sort_by_key(|m| m.exec_order());
    modules
  }

  /// Hash over member identities and content hashes; unchanged chunks keep
  /// their hash across rebuilds and are not re-emitted.
  pub(crate) fn content_hash(&self, module_by_id: &ModuleById) -> String {
    let mut hasher = blake3::Hasher::new();
    for module in self.ordered_modules(module_by_id) {
      hasher.update(module.id().as_ref().as_bytes());
      if let Some(normal) = module.as_norm() {
        hasher.update(normal.content_hash.as_bytes());
      }
    }
    for external in &self.externals {
      hasher.update(external.as_ref().as_bytes());
    }
    hasher.finalize().to_hex()[..8].to_string()
  }
}
