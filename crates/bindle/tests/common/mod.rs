use std::path::{Path, PathBuf};

use bindle::{BuildOutput, BuildResult, Bundler, ModuleId};
use bindle_test_utils::Tester;

pub struct CompiledFixture {
  pub bundler: Bundler,
  pub output: BuildOutput,
  pub out_dir: tempfile::TempDir,
  pub fixture_dir: PathBuf,
}

impl CompiledFixture {
  pub fn module_id(&self, relative: &str) -> ModuleId {
    ModuleId::from_path(self.fixture_dir.join(relative))
  }

  pub fn chunk_code(&self, filename: &str) -> String {
    let asset = self
      .output
      .assets
      .iter()
      .find(|asset| asset.filename == filename)
      .unwrap_or_else(|| panic!("no asset named {filename}"));
    String::from_utf8(asset.content.clone()).unwrap()
  }
}

pub fn fixture_dir(name: &str) -> PathBuf {
  Path::new(env!("CARGO_MANIFEST_DIR"))
    .join("tests/fixtures")
    .join(name)
}

pub async fn compile_fixture(name: &str) -> CompiledFixture {
  try_compile_fixture(name, |_| {}).await.unwrap()
}

pub async fn try_compile_fixture(
  name: &str,
  tweak: impl FnOnce(&mut bindle::BuildInputOptions),
) -> BuildResult<CompiledFixture> {
  let fixture_dir = fixture_dir(name);
  let tester = Tester::from_config_path(&fixture_dir.join("test.config.json"));
  let out_dir = tempfile::tempdir().unwrap();

  let mut input_options = tester.input_options(fixture_dir.clone());
  tweak(&mut input_options);
  let output_options = tester.output_options(out_dir.path().to_path_buf());

  let mut bundler = Bundler::new(input_options);
  let output = bundler.build(&output_options).await?;
  Ok(CompiledFixture {
    bundler,
    output,
    out_dir,
    fixture_dir,
  })
}
