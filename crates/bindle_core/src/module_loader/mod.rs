use std::sync::Arc;

use bindle_common::ModuleId;
use bindle_resolver::Resolution;
use bindle_transpiler::ImportKind;
use futures::future::join_all;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::Semaphore;

pub(crate) mod module_task;

use module_task::{ModuleTask, TaskResult};

use crate::{
  BuildError, BuildInputOptions, BuildResult, ExternalModule, Graph, NormOrExt, NormalModule,
  SharedResolver, UnaryBuildResult,
};

/// Builds the module graph to a fixpoint: resolve, transform, discover new
/// specifiers, repeat until the pending-work queue drains. Distinct modules
/// run concurrently on spawned tasks bounded by the configured concurrency
/// limit; this loader is the single owner of the visited set and the graph,
/// so each identity is transformed exactly once.
pub(crate) struct ModuleLoader<'a> {
  input_options: Arc<BuildInputOptions>,
  graph: &'a mut Graph,
  loaded_modules: FxHashSet<ModuleId>,
  remaining_tasks: usize,
  tx: tokio::sync::mpsc::UnboundedSender<Msg>,
  rx: tokio::sync::mpsc::UnboundedReceiver<Msg>,
  resolver: SharedResolver,
  semaphore: Arc<Semaphore>,
  errors: Vec<BuildError>,
  dynamic_imported_modules: FxHashSet<ModuleId>,
}

#[derive(Debug)]
pub(crate) enum Msg {
  Loaded(TaskResult),
  Error(BuildError),
}

impl<'a> ModuleLoader<'a> {
  pub(crate) fn new(
    graph: &'a mut Graph,
    resolver: SharedResolver,
    input_options: Arc<BuildInputOptions>,
  ) -> Self {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Msg>();
    let semaphore = Arc::new(Semaphore::new(input_options.concurrency.max(1)));
    Self {
      graph,
      loaded_modules: Default::default(),
      remaining_tasks: 0,
      tx,
      rx,
      resolver,
      semaphore,
      errors: Default::default(),
      dynamic_imported_modules: Default::default(),
      input_options,
    }
  }

  fn resolve_entries(&self) -> Vec<UnaryBuildResult<(String, ModuleId)>> {
    self
      .input_options
      .input
      .iter()
      .map(|item| {
        let resolved = self
          .resolver
          .resolve(&item.import, None)
          .map_err(|_| BuildError::unresolved_entry(&item.import))?;
        match resolved {
          Resolution::Module(id) => Ok((item.name.clone(), id)),
          Resolution::External(ext) => Err(BuildError::entry_cannot_be_external(ext.id.as_ref())),
        }
      })
      .collect()
  }

  pub(crate) async fn fetch_all_modules(mut self) -> BuildResult<()> {
    if self.input_options.input.is_empty() {
      return Err(vec![BuildError::panic(
        "You must supply at least one entry".to_string(),
      )]);
    }

    let mut seeds = vec![];
    for entry in self.resolve_entries() {
      match entry {
        Ok((name, id)) => {
          self.graph.entries.push((name.into(), id.clone()));
          seeds.push((id, true));
        }
        Err(err) => self.errors.push(err),
      }
    }

    self.fetch(seeds).await
  }

  /// Runs the fixpoint from an explicit seed set. Identities already present
  /// in the graph are reused verbatim and never re-enqueued.
  pub(crate) async fn fetch(mut self, seeds: Vec<(ModuleId, bool)>) -> BuildResult<()> {
    self
      .loaded_modules
      .extend(self.graph.module_by_id.keys().cloned());

    for (id, is_entry) in seeds {
      if self.loaded_modules.contains(&id) {
        continue;
      }
      self.loaded_modules.insert(id.clone());
      self.spawn_new_module_task(id, is_entry);
    }

    while self.remaining_tasks > 0 {
      let msg = self.rx.recv().await.unwrap();
      self.remaining_tasks -= 1;
      match msg {
        Msg::Loaded(result) => {
          tracing::trace!("loaded: {}", result.module_id);
          self.handle_msg_loaded(result);
        }
        Msg::Error(err) => {
          self.errors.push(err);
        }
      }
      tracing::trace!("remaining: {}", self.remaining_tasks);
    }

    self.mark_dynamic_imported_modules();

    if self.errors.is_empty() {
      Ok(())
    } else {
      Err(self.errors)
    }
  }

  fn mark_dynamic_imported_modules(&mut self) {
    for id in &self.dynamic_imported_modules {
      if let Some(NormOrExt::Normal(module)) = self.graph.module_by_id.get_mut(id) {
        module.is_dynamic_entry = true;
      }
    }
  }

  fn spawn_new_module_task(&mut self, module_id: ModuleId, is_user_defined_entry: bool) {
    tracing::trace!("spawning new task for {}", module_id);
    self.remaining_tasks += 1;
    let task = ModuleTask {
      id: module_id,
      is_user_defined_entry,
      tx: self.tx.clone(),
      resolver: self.resolver.clone(),
      input_options: self.input_options.clone(),
      semaphore: self.semaphore.clone(),
    };
    tokio::spawn(task.run());
  }

  fn handle_msg_loaded(&mut self, result: TaskResult) {
    let module_id = result.module_id;

    let mut dependencies = vec![];
    let mut dyn_dependencies = vec![];
    let mut resolved_ids: FxHashMap<String, ModuleId> = FxHashMap::default();

    for (request, resolution) in result.resolved {
      match resolution {
        Ok(Resolution::Module(id)) => {
          if !self.loaded_modules.contains(&id) {
            self.loaded_modules.insert(id.clone());
            self.spawn_new_module_task(id.clone(), false);
          }
          match request.kind {
            ImportKind::Static => dependencies.push(id.clone()),
            ImportKind::Dynamic => {
              self.dynamic_imported_modules.insert(id.clone());
              dyn_dependencies.push(id.clone());
            }
          }
          resolved_ids.insert(request.specifier, id);
        }
        Ok(Resolution::External(ext)) => {
          if !self.loaded_modules.contains(&ext.id) {
            self.loaded_modules.insert(ext.id.clone());
            self.graph.add_module(NormOrExt::External(ExternalModule {
              exec_order: usize::MAX,
              id: ext.id.clone(),
              access: ext.access,
            }));
          }
          if let ImportKind::Static = request.kind {
            dependencies.push(ext.id.clone());
          }
          resolved_ids.insert(request.specifier, ext.id);
        }
        Err(err) => {
          self.errors.push(err);
        }
      }
    }

    let normal_module = NormalModule {
      exec_order: usize::MAX,
      id: module_id.clone(),
      dependencies,
      dyn_dependencies,
      code: result.code,
      content_hash: result.content_hash,
      resolved_ids,
      is_user_defined_entry: result.is_user_defined_entry,
      is_dynamic_entry: false,
      emitted_asset: result.emitted_asset,
    };
    self.graph.add_module(NormOrExt::Normal(normal_module));
  }
}

pub(crate) async fn resolve_requests(
  resolver: &SharedResolver,
  importer: &ModuleId,
  requests: Vec<crate::DependencyRequest>,
) -> Vec<(crate::DependencyRequest, UnaryBuildResult<Resolution>)> {
  join_all(requests.into_iter().map(|request| {
    let resolver = resolver.clone();
    let importer = importer.clone();
    async move {
      let resolution = resolver.resolve(&request.specifier, Some(&importer));
      (request, resolution)
    }
  }))
  .await
}
