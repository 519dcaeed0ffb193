use std::sync::Arc;

use bindle_resolver::Resolver;
use tracing::instrument;

use crate::incremental::IncrementalEngine;
use crate::{
  Bundle, BuildInputOptions, BuildOutput, BuildOutputOptions, BuildResult, BuildState, Graph,
  RebuildOutcome, SharedResolver,
};

/// The build engine proper: drives graph construction, splitting and
/// emission for full builds, and wraps the incremental engine for rebuilds
/// against a retained [`BuildState`].
pub struct BundlerCore {
  input_options: Arc<BuildInputOptions>,
  resolver: SharedResolver,
}

impl BundlerCore {
  pub fn new(input_options: BuildInputOptions) -> Self {
    let resolver = Arc::new(Resolver::new(
      input_options.cwd.clone(),
      input_options.resolve.clone(),
      input_options
        .externals
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect(),
      input_options.platform,
    ));
    Self {
      input_options: Arc::new(input_options),
      resolver,
    }
  }

  pub fn input_options(&self) -> &BuildInputOptions {
    &self.input_options
  }

  /// One full build: graph fixpoint, splitting, emission. In production
  /// mode any collected error fails the entire build and nothing is
  /// emitted; the same holds for the first build of a watch session.
  #[instrument(skip_all)]
  pub async fn build(
    &self,
    output_options: &BuildOutputOptions,
  ) -> BuildResult<(BuildState, BuildOutput)> {
    tracing::debug!("{:#?}", self.input_options);
    let mut graph = Graph::default();
    graph.build(&self.input_options, &self.resolver).await?;

    let mut bundle = Bundle::new(&self.input_options, output_options, &graph);
    let (chunk_graph, chunk_hashes, output) = bundle.generate()?;

    Ok((BuildState::new(graph, chunk_graph, chunk_hashes), output))
  }

  /// Writes a build's assets, copies and manifest under the configured
  /// output directory.
  pub fn write(
    &self,
    state: &BuildState,
    output_options: &BuildOutputOptions,
    output: &BuildOutput,
  ) -> BuildResult<()> {
    let bundle = Bundle::new(&self.input_options, output_options, &state.graph);
    bundle.write(output).map_err(|e| vec![e])
  }

  /// Incremental rebuild for a set of changed paths against retained state.
  #[instrument(skip_all)]
  pub async fn rebuild(
    &self,
    state: &mut BuildState,
    output_options: &BuildOutputOptions,
    changed_paths: Vec<std::path::PathBuf>,
  ) -> BuildResult<RebuildOutcome> {
    IncrementalEngine {
      input_options: &self.input_options,
      output_options,
      resolver: &self.resolver,
    }
    .rebuild(state, changed_paths)
    .await
  }
}
