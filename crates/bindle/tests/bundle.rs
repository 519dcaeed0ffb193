use std::collections::BTreeMap;

use bindle::{Bundler, ChunkKind, ModuleId, SplitStrategy};
use bindle_test_utils::Tester;

mod common;

use common::{compile_fixture, fixture_dir, try_compile_fixture};

#[tokio::test]
async fn builds_a_complete_graph_and_bundle() {
  let fixture = compile_fixture("basic").await;
  let state = fixture.bundler.state().unwrap();

  let non_external = state
    .graph()
    .modules()
    .filter(|m| !m.id().is_external())
    .count();
  assert_eq!(non_external, 4, "main, greet, styles, logo");
  assert!(state.graph().modules().any(|m| m.id().is_external()));

  // Every declared dependency resolved to a module present in the graph.
  for module in state.graph().modules() {
    if let Some(normal) = module.as_norm() {
      for dep in normal.dependencies() {
        assert!(state.graph().module(dep).is_some(), "dangling edge to {dep}");
      }
    }
  }

  let code = fixture.chunk_code("main.js");
  // define substitution
  assert!(code.contains("\"1.2.3\""));
  assert!(!code.contains("__VERSION__"));
  // external reference, not inlined
  assert!(code.contains("window.React"));
  // stylesheet arithmetic and nesting flattened into the injected css
  assert!(code.contains("padding: 24px;"));
  assert!(code.contains("font-size: 14px;"));
  assert!(code.contains(".app .title"));
  // asset routed through the configured public path
  assert!(code.contains("/static/assets/logo."));
}

#[tokio::test]
async fn manifest_round_trips_to_emitted_files() {
  let fixture = compile_fixture("basic").await;

  let manifest_path = fixture.out_dir.path().join("manifest.json");
  let manifest: BTreeMap<String, String> =
    serde_json::from_str(&std::fs::read_to_string(&manifest_path).unwrap()).unwrap();

  assert_eq!(manifest.get("main").unwrap(), "main.js");
  let logo = manifest.get("src/logo.svg").unwrap();
  assert!(logo.starts_with("assets/logo."));

  for file in manifest.values() {
    assert!(
      fixture.out_dir.path().join(file).is_file(),
      "manifest entry {file} missing on disk"
    );
  }
}

#[tokio::test]
async fn dynamic_import_forces_a_chunk_boundary() {
  let fixture = compile_fixture("split_dynamic").await;
  let state = fixture.bundler.state().unwrap();
  let chunk_graph = state.chunk_graph();

  let lazy = fixture.module_id("src/lazy.js");
  let lazy_chunk = chunk_graph.chunk_of_module(&lazy).expect("lazy is assigned");
  assert_eq!(chunk_graph.chunk(lazy_chunk).unwrap().kind(), ChunkKind::Async);

  // The helper only reachable through the async subgraph lives there too.
  let helper = fixture.module_id("src/lazy_helper.js");
  assert_eq!(chunk_graph.chunk_of_module(&helper), Some(lazy_chunk));

  // The entry chunk does not inline the async subgraph but knows how to
  // load it.
  let entry_code = fixture.chunk_code("main.js");
  assert!(!entry_code.contains("lazy_helper"));
  assert!(entry_code.contains("src_lazy.js"));
  assert!(fixture.chunk_code("src_lazy.js").contains("lazy_helper"));
}

#[tokio::test]
async fn strategy_none_assigns_shared_modules_to_the_first_entry() {
  let fixture = compile_fixture("two_entries").await;
  let state = fixture.bundler.state().unwrap();
  let chunk_graph = state.chunk_graph();

  let shared = fixture.module_id("src/shared.js");
  let first = fixture.module_id("src/first.js");
  let second = fixture.module_id("src/second.js");

  assert_eq!(
    chunk_graph.chunk_of_module(&shared),
    chunk_graph.chunk_of_module(&first),
    "tie-break goes to entry declaration order"
  );
  assert_ne!(
    chunk_graph.chunk_of_module(&shared),
    chunk_graph.chunk_of_module(&second)
  );

  // The second entry's chunk records the load dependency instead.
  let second_chunk = chunk_graph
    .chunk(chunk_graph.chunk_of_module(&second).unwrap())
    .unwrap();
  let first_chunk_id = chunk_graph.chunk_of_module(&first).unwrap();
  assert!(second_chunk.depends_on().any(|dep| dep == first_chunk_id));
}

#[tokio::test]
async fn strategy_dep_per_chunk_extracts_shared_modules() {
  let fixture = try_compile_fixture("two_entries", |options| {
    options.split_strategy = SplitStrategy::DepPerChunk;
  })
  .await
  .unwrap();
  let state = fixture.bundler.state().unwrap();
  let chunk_graph = state.chunk_graph();

  let shared = fixture.module_id("src/shared.js");
  let shared_chunk = chunk_graph.chunk_of_module(&shared).unwrap();
  assert_eq!(
    chunk_graph.chunk(shared_chunk).unwrap().kind(),
    ChunkKind::Shared
  );
  for entry in ["src/first.js", "src/second.js"] {
    let id = fixture.module_id(entry);
    assert_ne!(chunk_graph.chunk_of_module(&id), Some(shared_chunk));
  }
}

#[tokio::test]
async fn strategy_big_vendors_groups_boundary_modules() {
  let fixture = compile_fixture("vendors").await;
  let state = fixture.bundler.state().unwrap();
  let chunk_graph = state.chunk_graph();

  let button = fixture.module_id("vendor/ui/button.js");
  let vendor_chunk = chunk_graph.chunk_of_module(&button).unwrap();
  let vendor = chunk_graph.chunk(vendor_chunk).unwrap();
  assert_eq!(vendor.kind(), ChunkKind::Vendor);
  assert_eq!(vendor_chunk.as_ref(), "vendor");

  // First-party modules stay in per-entry chunks.
  let table = fixture.module_id("src/table.js");
  assert_ne!(chunk_graph.chunk_of_module(&table), Some(vendor_chunk));

  // Partition totality: every non-external module belongs to exactly one
  // chunk, and the union of chunk memberships equals the module set.
  let mut assigned = 0usize;
  for chunk in chunk_graph.chunks() {
    assigned += chunk.modules().len();
  }
  let module_count = state
    .graph()
    .modules()
    .filter(|m| !m.id().is_external())
    .count();
  assert_eq!(assigned, module_count);
}

#[tokio::test]
async fn splitting_is_deterministic_across_builds() {
  for strategy in [
    SplitStrategy::None,
    SplitStrategy::DepPerChunk,
    SplitStrategy::BigVendors,
  ] {
    let first = try_compile_fixture("vendors", |o| o.split_strategy = strategy)
      .await
      .unwrap();
    let second = try_compile_fixture("vendors", |o| o.split_strategy = strategy)
      .await
      .unwrap();

    let assignment = |fixture: &common::CompiledFixture| -> BTreeMap<String, String> {
      let state = fixture.bundler.state().unwrap();
      state
        .graph()
        .modules()
        .filter(|m| !m.id().is_external())
        .map(|m| {
          let chunk = state.chunk_graph().chunk_of_module(m.id()).unwrap();
          (m.id().to_string(), chunk.as_ref().to_string())
        })
        .collect()
    };

    assert_eq!(assignment(&first), assignment(&second), "{strategy:?}");
    assert_eq!(first.output.manifest, second.output.manifest, "{strategy:?}");
  }
}

#[tokio::test]
async fn production_build_collects_all_errors_and_emits_nothing() {
  let dir = fixture_dir("errors");
  let tester = Tester::from_config_path(&dir.join("test.config.json"));
  let out_dir = tempfile::tempdir().unwrap();
  let out_path = out_dir.path().join("dist");

  let mut output_options = tester.output_options(out_path.clone());
  output_options.manifest = true;
  let mut bundler = Bundler::new(tester.input_options(dir));

  let errors = bundler.build(&output_options).await.unwrap_err();
  let codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
  assert!(codes.contains(&"TRANSFORM_ERROR"), "{codes:?}");
  assert!(codes.contains(&"RESOLUTION_ERROR"), "{codes:?}");
  assert_eq!(errors.len(), 2, "independent errors are all surfaced");

  assert!(!out_path.exists(), "no partial bundle in production mode");
}

#[tokio::test]
async fn copies_static_paths_verbatim() {
  let fixture = compile_fixture("copy_static").await;

  let robots = fixture.out_dir.path().join("robots.txt");
  let pixel = fixture.out_dir.path().join("img/pixel.gif");
  assert!(robots.is_file());
  assert!(pixel.is_file());
  assert_eq!(
    std::fs::read(&pixel).unwrap(),
    std::fs::read(fixture.fixture_dir.join("public/img/pixel.gif")).unwrap()
  );

  assert_eq!(fixture.output.manifest.get("robots.txt").unwrap(), "robots.txt");
  assert_eq!(
    fixture.output.manifest.get("img/pixel.gif").unwrap(),
    "img/pixel.gif"
  );
}

#[tokio::test]
async fn platform_selects_qualified_module_variants() {
  let dir = tempfile::tempdir().unwrap();
  std::fs::write(
    dir.path().join("main.js"),
    "import { flag } from './env';\nexport const main = flag;\n",
  )
  .unwrap();
  std::fs::write(dir.path().join("env.js"), "export const flag = 'browser';\n").unwrap();
  std::fs::write(dir.path().join("env.node.js"), "export const flag = 'node';\n").unwrap();

  let out = tempfile::tempdir().unwrap();
  let mut input = bindle::BuildInputOptions {
    input: vec![bindle::InputItem::new("main", "./main.js")],
    cwd: dir.path().to_path_buf(),
    platform: bindle::Platform::Node,
    ..Default::default()
  };
  input.resolve.extensions = vec!["js".to_string()];
  let output_options = bindle::BuildOutputOptions {
    dir: out.path().to_path_buf(),
    ..Default::default()
  };

  let mut bundler = Bundler::new(input);
  let output = bundler.build(&output_options).await.unwrap();
  let code = String::from_utf8(
    output
      .assets
      .iter()
      .find(|a| a.filename == "main.js")
      .unwrap()
      .content
      .clone(),
  )
  .unwrap();
  assert!(code.contains("'node'"));
  assert!(!code.contains("'browser'"));

  let env_node = ModuleId::from_path(dir.path().join("env.node.js"));
  assert!(bundler.state().unwrap().graph().module(&env_node).is_some());
}
