use std::path::Path;
use std::sync::Arc;

use arcstr::ArcStr;
use bindle_common::ModuleId;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::module_loader::ModuleLoader;
use crate::{BuildInputOptions, BuildResult, ModuleById, NormOrExt, SharedResolver};

#[derive(Debug, Clone, Default)]
pub struct Graph {
  /// Entry logical name and resolved identity, in declaration order.
  pub entries: Vec<(ArcStr, ModuleId)>,
  pub(crate) module_by_id: ModuleById,
}

impl Graph {
  pub(crate) fn add_module(&mut self, module: NormOrExt) {
    self.module_by_id.insert(module.id().clone(), module);
  }

  pub fn modules(&self) -> impl Iterator<Item = &NormOrExt> {
    self.module_by_id.values()
  }

  pub fn module(&self, id: &ModuleId) -> Option<&NormOrExt> {
    self.module_by_id.get(id)
  }

  pub(crate) async fn build(
    &mut self,
    input_opts: &Arc<BuildInputOptions>,
    resolver: &SharedResolver,
  ) -> BuildResult<()> {
    ModuleLoader::new(self, resolver.clone(), input_opts.clone())
      .fetch_all_modules()
      .await?;
    self.sort_modules();
    tracing::debug!("module graph built: {} modules", self.module_by_id.len());
    Ok(())
  }

  /// Assigns execution order by a depth-first post-order walk from the
  /// entries: dependencies come before dependents, cycles break at the
  /// first-discovered member, ties break by discovery order. Dynamically
  /// imported subgraphs are ordered after the synchronous walk.
  #[tracing::instrument(skip_all)]
  pub(crate) fn sort_modules(&mut self) {
    enum Action {
      Enter,
      Exit,
    }
    type Queue = Vec<(Action, ModuleId)>;
    let mut queue = self
      .entries
      .iter()
      .filter(|(_, id)| self.module_by_id.contains_key(id))
      .map(|(_, id)| (Action::Enter, id.clone()))
      .rev()
      .collect::<Vec<_>>();

    let mut entered_ids: FxHashSet<ModuleId> = FxHashSet::default();
    let mut next_exec_order = 0;
    let mut dynamic_entries: Queue = vec![];

    let mut walk = |queue: &mut Queue, mut dynamic_entries: Option<&mut Queue>| {
      while let Some((action, id)) = queue.pop() {
        match action {
          Action::Enter => {
            if !entered_ids.contains(&id) {
              entered_ids.insert(id.clone());
              let module = self.module_by_id.get(&id).unwrap();
              queue.push((Action::Exit, id.clone()));
              module
                .dependencies()
                .iter()
                .rev()
                .filter(|dep| !entered_ids.contains(dep))
                .filter(|dep| self.module_by_id.contains_key(dep))
                .for_each(|dep| {
                  queue.push((Action::Enter, dep.clone()));
                });
              if let Some(dynamic_entries) = dynamic_entries.as_mut() {
                module
                  .dynamic_dependencies()
                  .iter()
                  .filter(|dep| !entered_ids.contains(dep))
                  .filter(|dep| self.module_by_id.contains_key(dep))
                  .for_each(|dep| {
                    dynamic_entries.push((Action::Enter, dep.clone()));
                  });
              }
            }
          }
          Action::Exit => {
            self
              .module_by_id
              .get_mut(&id)
              .unwrap()
              .set_exec_order(next_exec_order);
            next_exec_order += 1;
          }
        }
      }
    };

    walk(&mut queue, Some(&mut dynamic_entries));
    walk(&mut dynamic_entries, None);
  }

  pub(crate) fn modules_in_exec_order(&self) -> Vec<&NormOrExt> {
    let mut modules = self.module_by_id.values().collect::<Vec<_>>();
    modules.sort_by_key(|module| module.exec_order());
    modules
  }

  /// Reverse edges: importee -> importers, over both edge kinds.
  pub(crate) fn dependents_by_id(&self) -> FxHashMap<ModuleId, Vec<ModuleId>> {
    let mut dependents: FxHashMap<ModuleId, Vec<ModuleId>> = FxHashMap::default();
    for module in self.module_by_id.values() {
      for dep in module
        .dependencies()
        .iter()
        .chain(module.dynamic_dependencies())
      {
        dependents
          .entry(dep.clone())
          .or_default()
          .push(module.id().clone());
      }
    }
    dependents
  }

  /// The affected set for a change: the seeds plus every module that
  /// imports them, directly or transitively.
  pub(crate) fn transitive_dependents(
    &self,
    seeds: impl IntoIterator<Item = ModuleId>,
  ) -> FxHashSet<ModuleId> {
    let dependents = self.dependents_by_id();
    let mut affected: FxHashSet<ModuleId> = FxHashSet::default();
    let mut stack: Vec<ModuleId> = seeds.into_iter().collect();
    while let Some(id) = stack.pop() {
      if !affected.insert(id.clone()) {
        continue;
      }
      if let Some(importers) = dependents.get(&id) {
        stack.extend(importers.iter().cloned());
      }
    }
    affected
  }

  /// Identities present in the graph for a changed file path (the reverse
  /// lookup of resolution).
  pub(crate) fn module_ids_for_path(&self, path: &Path) -> Vec<ModuleId> {
    let path = path.to_string_lossy();
    self
      .module_by_id
      .keys()
      .filter(|id| !id.is_external() && id.id().as_str() == path.as_ref())
      .cloned()
      .collect()
  }

  pub(crate) fn remove_module(&mut self, id: &ModuleId) -> Option<NormOrExt> {
    self.module_by_id.remove(id)
  }

  /// Drops records no longer reachable from the entry set.
  pub(crate) fn prune_unreachable(&mut self) {
    let mut reachable: FxHashSet<ModuleId> = FxHashSet::default();
    let mut stack: Vec<ModuleId> = self
      .entries
      .iter()
      .map(|(_, id)| id.clone())
      .filter(|id| self.module_by_id.contains_key(id))
      .collect();
    while let Some(id) = stack.pop() {
      if !reachable.insert(id.clone()) {
        continue;
      }
      if let Some(module) = self.module_by_id.get(&id) {
        stack.extend(
          module
            .dependencies()
            .iter()
            .chain(module.dynamic_dependencies())
            .filter(|dep| self.module_by_id.contains_key(dep))
            .cloned(),
        );
      }
    }
    self.module_by_id.retain(|id, _| reachable.contains(id));
  }

  /// Hash over every module's content hash; two builds with identical
  /// module contents share it.
  pub(crate) fn full_hash(&self) -> String {
    let mut items = self
      .module_by_id
      .values()
      .filter_map(|module| {
        module
          .as_norm()
          .map(|m| (m.id.id().as_str(), m.content_hash.as_str()))
      })
      .collect::<Vec<_>>();
    items.sort_unstable();
    let mut hasher = blake3::Hasher::new();
    for (id, hash) in items {
      hasher.update(id.as_bytes());
      hasher.update(hash.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
  }
}
