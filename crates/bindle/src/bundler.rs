use bindle_core::{
  BuildInputOptions, BuildOutput, BuildOutputOptions, BuildResult, BuildState, BundlerCore,
  WatchSession,
};

/// Thin front over [`BundlerCore`]: wires tracing, keeps the state of the
/// latest successful build, and hands out watch sessions.
pub struct Bundler {
  core: BundlerCore,
  state: Option<BuildState>,
}

impl Bundler {
  pub fn new(input_options: BuildInputOptions) -> Self {
    bindle_tracing::init();
    Self {
      core: BundlerCore::new(input_options),
      state: None,
    }
  }

  /// Builds and writes the bundle to the configured output directory.
  pub async fn build(&mut self, output_options: &BuildOutputOptions) -> BuildResult<BuildOutput> {
    let (state, output) = self.core.build(output_options).await?;
    self.core.write(&state, output_options, &output)?;
    self.state = Some(state);
    Ok(output)
  }

  /// Builds in memory without touching the output directory.
  pub async fn generate(&mut self, output_options: &BuildOutputOptions) -> BuildResult<BuildOutput> {
    let (state, output) = self.core.build(output_options).await?;
    self.state = Some(state);
    Ok(output)
  }

  pub fn state(&self) -> Option<&BuildState> {
    self.state.as_ref()
  }

  /// Converts this bundler into a resident watch session.
  pub fn into_watch_session(self, output_options: BuildOutputOptions) -> WatchSession {
    WatchSession::new(self.core, output_options)
  }
}
