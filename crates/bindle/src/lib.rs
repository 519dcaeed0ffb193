use std::path::PathBuf;

mod bundler;
pub use {
  bindle_common::{ChunkId, EcmaVersion, ModuleId, ModuleKind, Platform},
  bindle_core::{
    file_name::FileNameTemplate, Asset, BuildError, BuildInputOptions, BuildMode, BuildOutput,
    BuildOutputOptions, BuildResult, BuildState, BuildStats, Chunk, ChunkGraph, ChunkKind,
    HmrOptions, HmrPayload, InputItem, Manifest, NormOrExt, PlatformTargets, RebuildOutcome,
    SourceMapOption, SplitStrategy, VendorGroup, WatchPhase, WatchSession,
  },
  bindle_resolver::{AliasRule, ResolveOptions},
  bindle_transpiler::{EsTranspiler, Transpiler},
  bundler::Bundler,
};

/// The invocation contract: run one full build of `root` and resolve once it
/// finishes. With `watch`, the returned session stays resident and performs
/// incremental builds for every change notification fed to it; it only
/// terminates when the caller drops it or its notification stream closes.
pub async fn build(
  root: PathBuf,
  mut input_options: BuildInputOptions,
  output_options: BuildOutputOptions,
  watch: bool,
) -> BuildResult<(BuildOutput, Option<WatchSession>)> {
  input_options.cwd = root;
  let mut bundler = Bundler::new(input_options);
  if watch {
    let mut session = bundler.into_watch_session(output_options);
    let output = session.initial_build().await?;
    Ok((output, Some(session)))
  } else {
    let output = bundler.build(&output_options).await?;
    Ok((output, None))
  }
}
