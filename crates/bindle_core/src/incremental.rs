use std::path::PathBuf;
use std::sync::Arc;

use bindle_common::{ChunkId, ModuleId};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::module_loader::ModuleLoader;
use crate::{
  Bundle, BuildInputOptions, BuildOutput, BuildResult, ChunkGraph, ChunkLoadHint, Graph,
  HmrModuleUpdate, HmrPayload, NormOrExt, SharedResolver,
};

/// Process-durable state retained between builds within one watch session:
/// the last-known module graph, chunk assignment, and per-chunk content
/// hashes. Created by the first full build, replaced wholesale after every
/// successful incremental build, and discarded with the session.
#[derive(Debug)]
pub struct BuildState {
  pub(crate) graph: Graph,
  pub(crate) chunk_graph: ChunkGraph,
  pub(crate) chunk_hashes: FxHashMap<ChunkId, String>,
  pub(crate) full_hash: String,
}

impl BuildState {
  pub(crate) fn new(
    graph: Graph,
    chunk_graph: ChunkGraph,
    chunk_hashes: FxHashMap<ChunkId, String>,
  ) -> Self {
    let full_hash = graph.full_hash();
    Self {
      graph,
      chunk_graph,
      chunk_hashes,
      full_hash,
    }
  }

  pub fn graph(&self) -> &Graph {
    &self.graph
  }

  pub fn chunk_graph(&self) -> &ChunkGraph {
    &self.chunk_graph
  }

  pub fn full_hash(&self) -> &str {
    &self.full_hash
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UpdateType {
  Add,
  Remove,
  Modify,
}

/// What an incremental build produced: the assets that actually changed
/// (unchanged chunks are not re-emitted) and the payload for HMR clients.
#[derive(Debug)]
pub struct RebuildOutcome {
  /// `None` when coalesced changes cancelled out (identical full hash).
  pub output: Option<BuildOutput>,
  pub payload: Option<HmrPayload>,
}

pub(crate) struct IncrementalEngine<'a> {
  pub input_options: &'a Arc<BuildInputOptions>,
  pub output_options: &'a crate::BuildOutputOptions,
  pub resolver: &'a SharedResolver,
}

impl IncrementalEngine<'_> {
  /// Recomputes the minimal affected subgraph for a set of changed paths,
  /// re-runs splitting and emission for impacted chunks only, and swaps the
  /// new state in. On failure the prior state is left untouched.
  pub(crate) async fn rebuild(
    &self,
    state: &mut BuildState,
    changed_paths: Vec<PathBuf>,
  ) -> BuildResult<RebuildOutcome> {
    // Work on a copy so a failed rebuild never leaves BuildState half
    // mutated; the running bundle must stay consistent.
    let mut graph = state.graph.clone();

    let classified: Vec<(PathBuf, UpdateType)> = changed_paths
      .into_iter()
      .filter_map(|path| {
        let known = !graph.module_ids_for_path(&path).is_empty();
        let exists = path.exists();
        match (known, exists) {
          (true, true) => Some((path, UpdateType::Modify)),
          (true, false) => Some((path, UpdateType::Remove)),
          (false, true) => Some((path, UpdateType::Add)),
          // Neither in the graph nor on disk; nothing to do.
          (false, false) => None,
        }
      })
      .collect();
    tracing::debug!("update classification: {classified:?}");

    let mut changed_modules: FxHashSet<ModuleId> = FxHashSet::default();
    let mut removed_modules: FxHashSet<ModuleId> = FxHashSet::default();
    for (path, update) in &classified {
      match update {
        UpdateType::Modify => changed_modules.extend(graph.module_ids_for_path(path)),
        UpdateType::Remove => removed_modules.extend(graph.module_ids_for_path(path)),
        // An added path only matters to modules whose rebuild previously
        // failed on it; the watch session re-queues those change sets.
        UpdateType::Add => {}
      }
    }

    // Affected set: changed modules plus their transitive dependents, and
    // the dependents of anything removed.
    let dependents_of_removed: Vec<ModuleId> = {
      let dependents = graph.dependents_by_id();
      removed_modules
        .iter()
        .flat_map(|id| dependents.get(id).cloned().unwrap_or_default())
        .collect()
    };
    let affected = graph.transitive_dependents(
      changed_modules
        .iter()
        .cloned()
        .chain(dependents_of_removed),
    );

    for id in &removed_modules {
      graph.remove_module(id);
    }

    if affected.is_empty() && removed_modules.is_empty() {
      return Ok(RebuildOutcome {
        output: None,
        payload: None,
      });
    }

    // Re-resolve and re-transform only the affected modules; everything
    // else is reused verbatim. New edges discovered by the re-run feed the
    // regular fixpoint.
    let seeds: Vec<(ModuleId, bool)> = affected
      .iter()
      .map(|id| {
        let was_entry = graph
          .module(id)
          .and_then(NormOrExt::as_norm)
          .map(|m| m.is_user_defined_entry)
          .unwrap_or(false);
        (id.clone(), was_entry)
      })
      .collect();
    for (id, _) in &seeds {
      graph.remove_module(id);
    }
    ModuleLoader::new(&mut graph, self.resolver.clone(), self.input_options.clone())
      .fetch(seeds)
      .await?;

    graph.prune_unreachable();
    graph.sort_modules();

    let mut bundle = Bundle::new(self.input_options, self.output_options, &graph);
    let mut chunk_graph = bundle.split().map_err(|e| vec![e])?;
    let chunk_hashes = bundle.finalize_chunks(&mut chunk_graph);

    // Only chunks whose content hash moved are re-rendered and re-emitted.
    let impacted: FxHashSet<ChunkId> = chunk_hashes
      .iter()
      .filter(|(id, hash)| state.chunk_hashes.get(*id) != Some(*hash))
      .map(|(id, _)| id.clone())
      .collect();

    let mut assets = bundle.render_chunks(&chunk_graph, Some(&impacted));
    assets.extend(bundle.collect_asset_artifacts());
    let manifest = bundle.build_manifest(&chunk_graph);

    let new_state = BuildState::new(graph, chunk_graph, chunk_hashes);
    let payload = if new_state.full_hash == state.full_hash {
      None
    } else {
      Some(self.build_payload(&new_state, &affected, &impacted))
    };

    let output = BuildOutput {
      assets,
      manifest,
      stats: None,
    };
    *state = new_state;

    Ok(RebuildOutcome {
      output: Some(output),
      payload,
    })
  }

  fn build_payload(
    &self,
    next: &BuildState,
    affected: &FxHashSet<ModuleId>,
    impacted: &FxHashSet<ChunkId>,
  ) -> HmrPayload {
    let mut modules: Vec<HmrModuleUpdate> = next
      .graph
      .modules_in_exec_order()
      .into_iter()
      .filter(|m| affected.contains(m.id()))
      .filter_map(|m| m.as_norm())
      .map(|m| HmrModuleUpdate {
        id: m.id.as_ref().to_string(),
        code: m.finalized_code(),
      })
      .collect();
    modules.sort_by(|a, b| a.id.cmp(&b.id));

    let chunks = next
      .chunk_graph
      .chunks()
      .filter(|chunk| impacted.contains(&chunk.id))
      .map(|chunk| ChunkLoadHint {
        chunk: chunk.id.as_ref().to_string(),
        file: chunk.filename.clone().unwrap_or_default(),
        depends_on: chunk
          .depends_on
          .iter()
          .filter_map(|dep| next.chunk_graph.chunk(dep))
          .filter_map(|dep| dep.filename.clone())
          .collect(),
      })
      .collect();

    HmrPayload::Update {
      hash: next.full_hash.clone(),
      modules,
      chunks,
    }
  }
}
