use std::path::PathBuf;

use rustc_hash::FxHashSet;
use tokio::sync::broadcast::{Receiver, Sender};

use crate::{
  BuildOutput, BuildOutputOptions, BuildResult, BuildState, BundlerCore, HmrPayload,
};

/// Watch-session phase, advanced on each triggered rebuild:
/// `Idle -> Building -> { Ready, Failed } -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchPhase {
  Idle,
  Building,
  Ready,
  Failed,
}

/// A resident watch session. Owns the retained [`BuildState`], serializes
/// rebuilds, coalesces change notifications that arrive while a build is in
/// flight, and broadcasts HMR payloads to whatever transport subscribes.
pub struct WatchSession {
  bundler: BundlerCore,
  output_options: BuildOutputOptions,
  state: Option<BuildState>,
  pending: FxHashSet<PathBuf>,
  /// The change set of the last failed rebuild. Folded into the next cycle
  /// so a fix (or a newly created file) re-processes the affected modules.
  failed: FxHashSet<PathBuf>,
  phase: WatchPhase,
  payload_tx: Sender<HmrPayload>,
}

impl WatchSession {
  pub fn new(bundler: BundlerCore, output_options: BuildOutputOptions) -> Self {
    let (payload_tx, _) = tokio::sync::broadcast::channel(256);
    Self {
      bundler,
      output_options,
      state: None,
      pending: Default::default(),
      failed: Default::default(),
      phase: WatchPhase::Idle,
      payload_tx,
    }
  }

  pub fn phase(&self) -> WatchPhase {
    self.phase
  }

  pub fn state(&self) -> Option<&BuildState> {
    self.state.as_ref()
  }

  /// The transport side: subscribe to receive HMR payloads.
  pub fn subscribe(&self) -> Receiver<HmrPayload> {
    self.payload_tx.subscribe()
  }

  /// The first full build of the session. Creates the retained state and
  /// writes the bundle; a failure here fails the session start.
  pub async fn initial_build(&mut self) -> BuildResult<BuildOutput> {
    self.phase = WatchPhase::Building;
    match self.bundler.build(&self.output_options).await {
      Ok((state, output)) => {
        self.bundler.write(&state, &self.output_options, &output)?;
        self.state = Some(state);
        self.phase = WatchPhase::Ready;
        Ok(output)
      }
      Err(errors) => {
        self.phase = WatchPhase::Failed;
        Err(errors)
      }
    }
  }

  /// Records changed paths. Notifications arriving while a build is in
  /// flight pile up here and are merged into one affected-set computation;
  /// an in-flight build is never cancelled.
  pub fn notify_changed(&mut self, paths: impl IntoIterator<Item = PathBuf>) {
    self.pending.extend(paths);
  }

  /// Runs rebuilds until no pending changes remain. Each cycle drains the
  /// entire pending set (coalescing), rebuilds, emits only impacted chunks,
  /// and broadcasts the resulting payload. On failure the last-good state
  /// and the files on disk are left untouched.
  pub async fn run_pending(&mut self) {
    while !self.pending.is_empty() {
      let mut changed: Vec<PathBuf> = self.pending.drain().collect();
      changed.extend(std::mem::take(&mut self.failed));
      self.build_cycle(changed).await;
    }
  }

  async fn build_cycle(&mut self, changed: Vec<PathBuf>) {
    let Some(state) = self.state.as_mut() else {
      // No successful build yet; retry from scratch.
      let _ = self.initial_build().await;
      return;
    };

    self.phase = WatchPhase::Building;
    tracing::debug!("rebuilding for {} changed paths", changed.len());
    match self
      .bundler
      .rebuild(state, &self.output_options, changed.clone())
      .await
    {
      Ok(outcome) => {
        if let Some(output) = &outcome.output {
          let state = self.state.as_ref().unwrap();
          if let Err(errors) = self.bundler.write(state, &self.output_options, output) {
            // Emission failures are fatal to this attempt.
            self.phase = WatchPhase::Failed;
            self.broadcast(HmrPayload::Failure {
              errors: errors.iter().map(|e| e.to_string()).collect(),
            });
            return;
          }
        }
        if let Some(payload) = outcome.payload {
          self.broadcast(payload);
        }
        self.phase = WatchPhase::Ready;
      }
      Err(errors) => {
        // Prior BuildState is retained unmodified; the running bundle is
        // never left partially updated.
        for error in &errors {
          (self.bundler.input_options().on_warn)(crate::BuildError::panic(error.to_string()));
        }
        self.failed.extend(changed);
        self.phase = WatchPhase::Failed;
        self.broadcast(HmrPayload::Failure {
          errors: errors.iter().map(|e| e.to_string()).collect(),
        });
      }
    }
  }

  fn broadcast(&self, payload: HmrPayload) {
    if self.output_options.hmr.enabled && self.payload_tx.receiver_count() > 0 {
      let _ = self.payload_tx.send(payload);
    }
  }

  /// Drives the session from an external change-notification stream until
  /// the stream closes. Notifications queued behind an in-flight build are
  /// drained and merged before the next cycle.
  pub async fn serve(
    mut self,
    mut changes: tokio::sync::mpsc::UnboundedReceiver<Vec<PathBuf>>,
  ) -> Self {
    while let Some(paths) = changes.recv().await {
      self.notify_changed(paths);
      while let Ok(more) = changes.try_recv() {
        self.notify_changed(more);
      }
      self.run_pending().await;
    }
    self
  }
}
