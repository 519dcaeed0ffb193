use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use bindle_common::{EcmaVersion, Platform};
use bindle_resolver::ResolveOptions;
use derivative::Derivative;
use indexmap::IndexMap;

use crate::{BuildError, SharedTranspiler};

pub type WarningHandler = Arc<dyn Fn(BuildError) + Send + Sync>;

/// One entry: a logical name and the specifier it maps to.
#[derive(Debug, Clone)]
pub struct InputItem {
  pub name: String,
  pub import: String,
}

impl InputItem {
  pub fn new(name: impl Into<String>, import: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      import: import.into(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
  Development,
  Production,
}

impl BuildMode {
  pub fn is_production(self) -> bool {
    self == BuildMode::Production
  }
}

impl FromStr for BuildMode {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value {
      "development" => Ok(BuildMode::Development),
      "production" => Ok(BuildMode::Production),
      _ => Err(format!("Invalid build mode: {value}")),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitStrategy {
  /// One chunk per entry; async subgraphs still split.
  None,
  /// Modules shared between entries each get their own chunk.
  DepPerChunk,
  /// Modules under a configured dependency boundary group into vendor chunks.
  BigVendors,
}

impl Default for SplitStrategy {
  fn default() -> Self {
    SplitStrategy::None
  }
}

impl FromStr for SplitStrategy {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value {
      "none" => Ok(SplitStrategy::None),
      "depPerChunk" => Ok(SplitStrategy::DepPerChunk),
      "bigVendors" => Ok(SplitStrategy::BigVendors),
      _ => Err(format!("Invalid split strategy: {value}")),
    }
  }
}

/// A vendor boundary for `bigVendors`: modules whose resolved path falls
/// under `boundary` group into the chunk named `name`.
#[derive(Debug, Clone)]
pub struct VendorGroup {
  pub name: String,
  pub boundary: PathBuf,
}

#[derive(Debug, Clone, Copy)]
pub struct PlatformTargets {
  pub browser: EcmaVersion,
  pub node: EcmaVersion,
}

impl PlatformTargets {
  pub fn target_for(&self, platform: Platform) -> EcmaVersion {
    match platform {
      Platform::Browser => self.browser,
      Platform::Node => self.node,
    }
  }
}

impl Default for PlatformTargets {
  fn default() -> Self {
    Self {
      browser: EcmaVersion::Es2015,
      node: EcmaVersion::Es2020,
    }
  }
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct BuildInputOptions {
  pub input: Vec<InputItem>,
  pub cwd: PathBuf,
  pub mode: BuildMode,
  pub platform: Platform,
  pub targets: PlatformTargets,
  pub resolve: ResolveOptions,
  /// Specifier -> runtime access expression. Matching modules are emitted as
  /// references, never inlined.
  pub externals: IndexMap<String, String>,
  /// Identifier -> literal replacement, substituted textually before
  /// dependency extraction.
  pub define: Vec<(String, String)>,
  pub split_strategy: SplitStrategy,
  pub vendor_groups: Vec<VendorGroup>,
  /// Assets at or below this many bytes are inlined as data URIs.
  pub inline_limit: u64,
  /// Upper bound on concurrently running module tasks.
  pub concurrency: usize,
  /// Prefix for asset URLs and dynamically loaded chunk requests.
  pub public_path: String,
  #[derivative(Debug = "ignore")]
  pub on_warn: WarningHandler,
  #[derivative(Debug = "ignore")]
  pub transpiler: SharedTranspiler,
}

impl Default for BuildInputOptions {
  fn default() -> Self {
    Self {
      input: Default::default(),
      cwd: std::env::current_dir().unwrap(),
      mode: BuildMode::Development,
      platform: Platform::default(),
      targets: PlatformTargets::default(),
      resolve: ResolveOptions::default(),
      externals: Default::default(),
      define: Default::default(),
      split_strategy: SplitStrategy::default(),
      vendor_groups: Default::default(),
      inline_limit: 8192,
      concurrency: std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(8),
      public_path: "/".to_string(),
      on_warn: Arc::new(|err| {
        eprintln!("{err}");
      }),
      transpiler: Arc::new(bindle_transpiler::EsTranspiler),
    }
  }
}
