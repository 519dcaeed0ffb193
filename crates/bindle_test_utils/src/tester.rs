use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use bindle_core::{
  BuildError, BuildInputOptions, BuildMode, BuildOutputOptions, InputItem, SourceMapOption,
  SplitStrategy, VendorGroup,
};
use bindle_resolver::AliasRule;

use crate::test_config::TestConfig;

pub struct Tester {
  pub config: TestConfig,
  pub warnings: Arc<Mutex<Vec<BuildError>>>,
}

impl Tester {
  pub fn from_config_path(filepath: &Path) -> Self {
    let config = TestConfig::from_config_path(filepath);
    Self {
      config,
      warnings: Default::default(),
    }
  }

  pub fn input_options(&self, cwd: PathBuf) -> BuildInputOptions {
    let warning_collector = self.warnings.clone();
    let input = &self.config.input;
    let mut options = BuildInputOptions {
      input: input
        .input
        .iter()
        .map(|item| InputItem::new(item.name.clone(), item.import.clone()))
        .collect(),
      cwd,
      externals: input
        .external
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect(),
      define: input
        .define
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect(),
      vendor_groups: input
        .vendor_groups
        .iter()
        .map(|group| VendorGroup {
          name: group.name.clone(),
          boundary: PathBuf::from(&group.boundary),
        })
        .collect(),
      on_warn: Arc::new(move |err| {
        warning_collector.lock().unwrap().push(err);
      }),
      ..Default::default()
    };
    for item in &input.alias {
      options.resolve.alias.push(if item.exact {
        AliasRule::exact(item.find.clone(), item.replacement.clone())
      } else {
        AliasRule::prefix(item.find.clone(), item.replacement.clone())
      });
    }
    if let Some(mode) = &input.mode {
      options.mode = BuildMode::from_str(mode).unwrap();
    }
    if let Some(platform) = &input.platform {
      options.platform = platform.parse().unwrap();
    }
    if let Some(strategy) = &input.split_strategy {
      options.split_strategy = SplitStrategy::from_str(strategy).unwrap();
    }
    if let Some(limit) = input.inline_limit {
      options.inline_limit = limit;
    }
    if let Some(public_path) = &input.public_path {
      options.public_path = public_path.clone();
    }
    options
  }

  pub fn output_options(&self, dir: PathBuf) -> BuildOutputOptions {
    let output = &self.config.output;
    let mut options = BuildOutputOptions {
      dir,
      ..Default::default()
    };
    if let Some(source_map) = &output.source_map {
      options.source_map = SourceMapOption::from_str(source_map).unwrap();
    }
    if let Some(manifest) = output.manifest {
      options.manifest = manifest;
    }
    options.copy = output.copy.iter().map(PathBuf::from).collect();
    options
  }
}
