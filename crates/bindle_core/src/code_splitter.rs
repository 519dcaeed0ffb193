use std::path::Path;

use bindle_common::{ChunkId, ModuleId};
use hashlink::LinkedHashSet;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::utils::uri_to_chunk_name;
use crate::{
  BuildError, BuildInputOptions, Chunk, ChunkGraph, ChunkKind, Graph, SplitStrategy,
  UnaryBuildResult,
};

/// Partitions the module graph into chunks. Split points are processed in a
/// single deterministic sequence — user entries in declaration order, vendor
/// groups in configuration order, shared modules in execution order, async
/// roots in discovery order — and the first claim wins, so repeated builds of
/// unchanged input produce identical assignments.
pub(crate) struct CodeSplitter<'me> {
  opts: &'me BuildInputOptions,
  graph: &'me Graph,
  chunk_by_id: FxHashMap<ChunkId, Chunk>,
  chunk_order: Vec<ChunkId>,
  module_to_chunk: FxHashMap<ModuleId, ChunkId>,
  split_point_to_chunk: FxHashMap<ModuleId, ChunkId>,
  dynamic_entries: LinkedHashSet<ModuleId>,
}

impl<'me> CodeSplitter<'me> {
  pub(crate) fn new(graph: &'me Graph, opts: &'me BuildInputOptions) -> Self {
    Self {
      opts,
      graph,
      chunk_by_id: Default::default(),
      chunk_order: Default::default(),
      module_to_chunk: Default::default(),
      split_point_to_chunk: Default::default(),
      dynamic_entries: graph
        .modules_in_exec_order()
        .iter()
        .flat_map(|m| m.dynamic_dependencies())
        .filter(|id| !id.is_external())
        .cloned()
        .collect::<LinkedHashSet<_>>(),
    }
  }

  pub(crate) fn split(mut self) -> UnaryBuildResult<ChunkGraph> {
    if self.opts.split_strategy == SplitStrategy::BigVendors {
      self.assign_vendor_chunks()?;
    }
    if self.opts.split_strategy == SplitStrategy::DepPerChunk {
      self.assign_shared_chunks()?;
    }
    self.assign_entry_chunks()?;
    self.assign_async_chunks()?;
    self.link_chunks();

    Ok(ChunkGraph {
      chunk_by_id: self.chunk_by_id,
      chunk_order: self.chunk_order,
      split_point_to_chunk: self.split_point_to_chunk,
      module_to_chunk: self.module_to_chunk,
    })
  }

  fn add_chunk(&mut self, chunk: Chunk) -> ChunkId {
    let id = chunk.id.clone();
    debug_assert!(!self.chunk_by_id.contains_key(&id));
    self.chunk_order.push(id.clone());
    self.chunk_by_id.insert(id.clone(), chunk);
    id
  }

  fn claim(&mut self, module_id: &ModuleId, chunk_id: &ChunkId) -> UnaryBuildResult<()> {
    if let Some(existing) = self.module_to_chunk.get(module_id) {
      if existing != chunk_id {
        // Defensive; unreachable under the first-claim-wins sequence.
        return Err(BuildError::split_conflict(
          module_id.as_ref(),
          existing.as_ref(),
          chunk_id.as_ref(),
        ));
      }
      return Ok(());
    }
    self.module_to_chunk.insert(module_id.clone(), chunk_id.clone());
    self
      .chunk_by_id
      .get_mut(chunk_id)
      .unwrap()
      .modules
      .insert(module_id.clone());
    Ok(())
  }

  fn is_under_boundary(module: &ModuleId, boundary: &Path) -> bool {
    Path::new(module.as_ref()).starts_with(boundary)
  }

  fn assign_vendor_chunks(&mut self) -> UnaryBuildResult<()> {
    for group in &self.opts.vendor_groups {
      let boundary = if group.boundary.is_absolute() {
        group.boundary.clone()
      } else {
        self.opts.cwd.join(&group.boundary)
      };
      let members = self
        .graph
        .modules_in_exec_order()
        .iter()
        .filter(|m| !m.id().is_external())
        .filter(|m| !self.module_to_chunk.contains_key(m.id()))
        .filter(|m| Self::is_under_boundary(m.id(), &boundary))
        .map(|m| m.id().clone())
        .collect::<Vec<_>>();
      if members.is_empty() {
        continue;
      }
      let chunk_id = self.add_chunk(Chunk::new(group.name.clone(), ChunkKind::Vendor, None));
      for member in members {
        self.claim(&member, &chunk_id)?;
      }
    }
    Ok(())
  }

  /// Under `depPerChunk`, every module synchronously reachable from more
  /// than one entry gets a chunk of its own, maximizing cache granularity.
  fn assign_shared_chunks(&mut self) -> UnaryBuildResult<()> {
    let mut seen_from: FxHashMap<ModuleId, usize> = FxHashMap::default();
    for (_, entry_id) in &self.graph.entries {
      for id in self.sync_reachable(entry_id) {
        *seen_from.entry(id).or_default() += 1;
      }
    }

    let shared = self
      .graph
      .modules_in_exec_order()
      .iter()
      .map(|m| m.id().clone())
      .filter(|id| !id.is_external())
      .filter(|id| seen_from.get(id).copied().unwrap_or(0) > 1)
      .filter(|id| !self.module_to_chunk.contains_key(id))
      .collect::<Vec<_>>();

    for module_id in shared {
      let name = self.unique_chunk_name(&uri_to_chunk_name(
        &self.opts.cwd.to_string_lossy(),
        module_id.as_ref(),
      ));
      let chunk_id = self.add_chunk(Chunk::new(name, ChunkKind::Shared, Some(module_id.clone())));
      self
        .split_point_to_chunk
        .insert(module_id.clone(), chunk_id.clone());
      self.claim(&module_id, &chunk_id)?;
    }
    Ok(())
  }

  fn assign_entry_chunks(&mut self) -> UnaryBuildResult<()> {
    for (name, entry_id) in &self.graph.entries {
      if !self.graph.module_by_id.contains_key(entry_id) {
        continue;
      }
      let chunk_name = self.unique_chunk_name(name.as_str());
      let mut chunk = Chunk::new(chunk_name, ChunkKind::Entry, Some(entry_id.clone()));
      chunk.entry_name = Some(name.to_string());
      let chunk_id = self.add_chunk(chunk);
      self
        .split_point_to_chunk
        .insert(entry_id.clone(), chunk_id.clone());
      for member in self.claimable_reachable(entry_id) {
        self.claim(&member, &chunk_id)?;
      }
    }
    Ok(())
  }

  fn assign_async_chunks(&mut self) -> UnaryBuildResult<()> {
    for root in self.dynamic_entries.clone() {
      if self.split_point_to_chunk.contains_key(&root) {
        // Already a split point (an entry or a shared module); the dynamic
        // import loads that chunk instead of a new one.
        continue;
      }
      let name = self.unique_chunk_name(&uri_to_chunk_name(
        &self.opts.cwd.to_string_lossy(),
        root.as_ref(),
      ));
      let chunk_id = self.add_chunk(Chunk::new(name, ChunkKind::Async, Some(root.clone())));
      self.split_point_to_chunk.insert(root.clone(), chunk_id.clone());
      for member in self.claimable_reachable(&root) {
        self.claim(&member, &chunk_id)?;
      }
    }
    Ok(())
  }

  /// Synchronously reachable, unassigned, non-external modules from a root,
  /// in discovery order. Traversal passes through already-assigned modules
  /// (their first-party dependencies may still belong here) but never
  /// crosses an async split point.
  fn claimable_reachable(&self, root: &ModuleId) -> Vec<ModuleId> {
    let mut out = vec![];
    let mut visited: FxHashSet<ModuleId> = FxHashSet::default();
    let mut stack = vec![root.clone()];
    while let Some(id) = stack.pop() {
      if !visited.insert(id.clone()) {
        continue;
      }
      if id.is_external() || !self.graph.module_by_id.contains_key(&id) {
        continue;
      }
      if !self.module_to_chunk.contains_key(&id) {
        out.push(id.clone());
      }
      let module = &self.graph.module_by_id[&id];
      stack.extend(
        module
          .dependencies()
          .iter()
          .rev()
          .filter(|dep| !self.dynamic_entries.contains(dep) || *dep == root)
          .cloned(),
      );
    }
    out
  }

  fn sync_reachable(&self, root: &ModuleId) -> FxHashSet<ModuleId> {
    let mut visited: FxHashSet<ModuleId> = FxHashSet::default();
    let mut stack = vec![root.clone()];
    while let Some(id) = stack.pop() {
      if id.is_external() || !self.graph.module_by_id.contains_key(&id) {
        continue;
      }
      if !visited.insert(id.clone()) {
        continue;
      }
      let module = &self.graph.module_by_id[&id];
      stack.extend(
        module
          .dependencies()
          .iter()
          .filter(|dep| !self.dynamic_entries.contains(dep))
          .cloned(),
      );
    }
    visited
  }

  fn unique_chunk_name(&self, base: &str) -> String {
    let base = if base.is_empty() { "chunk" } else { base };
    if !self.chunk_by_id.contains_key(&ChunkId::new(base.to_string())) {
      return base.to_string();
    }
    let mut n = 1;
    loop {
      let candidate = format!("{base}{n}");
      if !self.chunk_by_id.contains_key(&ChunkId::new(candidate.clone())) {
        return candidate;
      }
      n += 1;
    }
  }

  /// Computes inter-chunk load dependencies and per-chunk external lists so
  /// the runtime loader can fetch dependencies before executing a chunk.
  fn link_chunks(&mut self) {
    let mut chunk_links: Vec<(ChunkId, LinkedHashSet<ChunkId>, LinkedHashSet<ChunkId>, LinkedHashSet<ModuleId>)> =
      vec![];
    for chunk_id in &self.chunk_order {
      let chunk = &self.chunk_by_id[chunk_id];
      let mut depends_on = LinkedHashSet::new();
      let mut async_deps = LinkedHashSet::new();
      let mut externals = LinkedHashSet::new();
      let ordered = chunk.ordered_modules(&self.graph.module_by_id);
      for module in ordered {
        for dep in module.dependencies() {
          if dep.is_external() {
            externals.insert(dep.clone());
            continue;
          }
          if let Some(owner) = self.module_to_chunk.get(dep) {
            if owner != chunk_id && !depends_on.contains(owner) {
              depends_on.insert(owner.clone());
            }
          }
        }
        for dep in module.dynamic_dependencies() {
          if let Some(owner) = self.split_point_to_chunk.get(dep) {
            if owner != chunk_id && !async_deps.contains(owner) {
              async_deps.insert(owner.clone());
            }
          }
        }
      }
      chunk_links.push((chunk_id.clone(), depends_on, async_deps, externals));
    }
    for (chunk_id, depends_on, async_deps, externals) in chunk_links {
      let chunk = self.chunk_by_id.get_mut(&chunk_id).unwrap();
      chunk.depends_on = depends_on;
      chunk.async_deps = async_deps;
      chunk.externals = externals;
    }
  }
}
