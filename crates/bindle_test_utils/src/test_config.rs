use std::collections::BTreeMap;
use std::path::Path;

use schemars::JsonSchema;
use serde::Deserialize;

use crate::impl_serde_default;

fn input_default() -> Vec<InputItem> {
  vec![InputItem {
    name: "main".to_string(),
    import: "./main".to_string(),
  }]
}

#[derive(Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TestConfig {
  #[serde(default)]
  pub input: InputOptions,
  #[serde(default)]
  pub output: OutputOptions,
}

impl TestConfig {
  pub fn from_config_path(filepath: &Path) -> Self {
    let content = std::fs::read_to_string(filepath)
      .unwrap_or_else(|e| panic!("Failed to read {filepath:?}: {e}"));
    serde_json::from_str(&content)
      .unwrap_or_else(|e| panic!("Failed to parse {filepath:?}: {e}"))
  }
}

#[derive(Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InputOptions {
  #[serde(default = "input_default")]
  pub input: Vec<InputItem>,

  /// Specifier -> runtime access expression.
  #[serde(default)]
  pub external: BTreeMap<String, String>,

  #[serde(default)]
  pub alias: Vec<AliasItem>,

  #[serde(default)]
  pub define: BTreeMap<String, String>,

  #[serde(default)]
  pub mode: Option<String>,

  #[serde(default)]
  pub platform: Option<String>,

  #[serde(default)]
  pub split_strategy: Option<String>,

  #[serde(default)]
  pub vendor_groups: Vec<VendorGroupItem>,

  #[serde(default)]
  pub inline_limit: Option<u64>,

  #[serde(default)]
  pub public_path: Option<String>,
}

#[derive(Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OutputOptions {
  #[serde(default)]
  pub source_map: Option<String>,

  #[serde(default)]
  pub manifest: Option<bool>,

  #[serde(default)]
  pub copy: Vec<String>,
}

#[derive(Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InputItem {
  pub name: String,
  pub import: String,
}

#[derive(Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AliasItem {
  pub find: String,
  pub replacement: String,
  #[serde(default)]
  pub exact: bool,
}

#[derive(Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VendorGroupItem {
  pub name: String,
  pub boundary: String,
}

impl_serde_default!(TestConfig);
impl_serde_default!(InputOptions);
impl_serde_default!(OutputOptions);
impl_serde_default!(AliasItem);
