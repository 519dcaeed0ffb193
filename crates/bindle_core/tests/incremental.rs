use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bindle_core::{
  BuildInputOptions, BuildOutputOptions, BundlerCore, HmrPayload, InputItem, WatchPhase,
  WatchSession,
};
use bindle_common::ModuleId;

fn write(path: &Path, content: &str) {
  std::fs::create_dir_all(path.parent().unwrap()).unwrap();
  std::fs::write(path, content).unwrap();
}

fn scaffold(root: &Path) {
  write(
    &root.join("main.js"),
    "import { a } from './a';\nexport function boot() {\n  return import('./lazy').then(function (m) { return a + m.default; });\n}\n",
  );
  write(&root.join("a.js"), "export const a = 1;\n");
  write(&root.join("lazy.js"), "export default 2;\n");
}

fn input_options(root: &Path) -> BuildInputOptions {
  BuildInputOptions {
    input: vec![InputItem::new("main", "./main.js")],
    cwd: root.to_path_buf(),
    on_warn: std::sync::Arc::new(|_| {}),
    ..Default::default()
  }
}

fn output_options(dir: PathBuf) -> BuildOutputOptions {
  let mut options = BuildOutputOptions {
    dir,
    ..Default::default()
  };
  options.hmr.enabled = true;
  options
}

fn content_hashes(state: &bindle_core::BuildState) -> BTreeMap<String, String> {
  state
    .graph()
    .modules()
    .filter_map(|m| m.as_norm())
    .map(|m| (m.id().to_string(), m.content_hash().to_string()))
    .collect()
}

fn read_dir_files(dir: &Path) -> BTreeMap<String, Vec<u8>> {
  let mut files = BTreeMap::new();
  for entry in walkdir(dir) {
    let rel = entry.strip_prefix(dir).unwrap().to_string_lossy().to_string();
    files.insert(rel, std::fs::read(&entry).unwrap());
  }
  files
}

fn walkdir(dir: &Path) -> Vec<PathBuf> {
  let mut out = vec![];
  let mut stack = vec![dir.to_path_buf()];
  while let Some(current) = stack.pop() {
    for entry in std::fs::read_dir(&current).unwrap() {
      let path = entry.unwrap().path();
      if path.is_dir() {
        stack.push(path);
      } else {
        out.push(path);
      }
    }
  }
  out
}

#[tokio::test]
async fn changing_a_module_without_dependents_retransforms_only_it() {
  let src = tempfile::tempdir().unwrap();
  let out = tempfile::tempdir().unwrap();
  scaffold(src.path());

  let core = BundlerCore::new(input_options(src.path()));
  let opts = output_options(out.path().to_path_buf());
  let (mut state, _) = core.build(&opts).await.unwrap();
  let before = content_hashes(&state);

  // Nothing imports the entry, so it is its own affected set.
  let main_path = src.path().join("main.js");
  write(
    &main_path,
    "import { a } from './a';\nexport function boot() {\n  return import('./lazy').then(function (m) { return a + m.default + 1; });\n}\n",
  );
  let outcome = core
    .rebuild(&mut state, &opts, vec![main_path.clone()])
    .await
    .unwrap();

  let payload = outcome.payload.expect("content changed");
  match &payload {
    HmrPayload::Update { modules, .. } => {
      assert_eq!(modules.len(), 1);
      assert!(modules[0].id.ends_with("main.js"));
    }
    HmrPayload::Failure { .. } => panic!("expected update"),
  }

  // All other records are reused verbatim.
  let after = content_hashes(&state);
  for (id, hash) in &before {
    if !id.ends_with("main.js") {
      assert_eq!(after.get(id), Some(hash), "{id} should be untouched");
    }
  }

  // Only the chunk containing the changed module is re-emitted; the async
  // chunk is untouched.
  let output = outcome.output.unwrap();
  let emitted: Vec<&str> = output.assets.iter().map(|a| a.filename.as_str()).collect();
  assert_eq!(emitted, vec!["main.js"]);
}

#[tokio::test]
async fn unaffected_chunks_are_not_reemitted() {
  let src = tempfile::tempdir().unwrap();
  let out = tempfile::tempdir().unwrap();
  scaffold(src.path());

  let core = BundlerCore::new(input_options(src.path()));
  let opts = output_options(out.path().to_path_buf());
  let (mut state, _) = core.build(&opts).await.unwrap();

  // `a` sits in the entry chunk; its change re-emits only that chunk even
  // though the importing entry is re-transformed as a dependent.
  let a_path = src.path().join("a.js");
  write(&a_path, "export const a = 41;\n");
  let outcome = core.rebuild(&mut state, &opts, vec![a_path]).await.unwrap();

  let output = outcome.output.unwrap();
  let emitted: Vec<&str> = output.assets.iter().map(|a| a.filename.as_str()).collect();
  assert_eq!(emitted, vec!["main.js"]);
  match outcome.payload.unwrap() {
    HmrPayload::Update { modules, chunks, .. } => {
      let ids: Vec<&str> = modules.iter().map(|m| m.id.as_str()).collect();
      assert!(ids.iter().any(|id| id.ends_with("a.js")));
      assert!(ids.iter().any(|id| id.ends_with("main.js")));
      assert_eq!(chunks.len(), 1);
      assert_eq!(chunks[0].file, "main.js");
    }
    HmrPayload::Failure { .. } => panic!("expected update"),
  }
}

#[tokio::test]
async fn rebuild_with_identical_content_produces_no_payload() {
  let src = tempfile::tempdir().unwrap();
  let out = tempfile::tempdir().unwrap();
  scaffold(src.path());

  let core = BundlerCore::new(input_options(src.path()));
  let opts = output_options(out.path().to_path_buf());
  let (mut state, _) = core.build(&opts).await.unwrap();
  let hash_before = state.full_hash().to_string();

  let a_path = src.path().join("a.js");
  write(&a_path, "export const a = 1;\n");
  let outcome = core.rebuild(&mut state, &opts, vec![a_path]).await.unwrap();

  assert!(outcome.payload.is_none());
  assert!(outcome.output.unwrap().assets.is_empty());
  assert_eq!(state.full_hash(), hash_before);
}

#[tokio::test]
async fn failed_rebuild_keeps_state_and_emitted_files() {
  let src = tempfile::tempdir().unwrap();
  let out = tempfile::tempdir().unwrap();
  scaffold(src.path());

  let mut session = WatchSession::new(
    BundlerCore::new(input_options(src.path())),
    output_options(out.path().to_path_buf()),
  );
  session.initial_build().await.unwrap();
  let mut rx = session.subscribe();
  let disk_before = read_dir_files(out.path());
  let hash_before = session.state().unwrap().full_hash().to_string();

  // Break a non-entry module.
  let a_path = src.path().join("a.js");
  write(&a_path, "export const a = 'oops;\n");
  session.notify_changed([a_path.clone()]);
  session.run_pending().await;

  assert_eq!(session.phase(), WatchPhase::Failed);
  assert!(matches!(rx.try_recv().unwrap(), HmrPayload::Failure { .. }));
  assert_eq!(read_dir_files(out.path()), disk_before, "previously emitted bundle stays live");
  assert_eq!(session.state().unwrap().full_hash(), hash_before);

  // Fixing the module recovers, re-processing the failed change set.
  write(&a_path, "export const a = 7;\n");
  session.notify_changed([a_path]);
  session.run_pending().await;

  assert_eq!(session.phase(), WatchPhase::Ready);
  match rx.try_recv().unwrap() {
    HmrPayload::Update { modules, .. } => {
      assert!(modules.iter().any(|m| m.id.ends_with("a.js")));
    }
    HmrPayload::Failure { .. } => panic!("expected update after fix"),
  }
  assert_ne!(read_dir_files(out.path()), disk_before);
}

#[tokio::test]
async fn pending_changes_are_coalesced_into_one_build() {
  let src = tempfile::tempdir().unwrap();
  let out = tempfile::tempdir().unwrap();
  scaffold(src.path());

  let mut session = WatchSession::new(
    BundlerCore::new(input_options(src.path())),
    output_options(out.path().to_path_buf()),
  );
  session.initial_build().await.unwrap();
  let mut rx = session.subscribe();

  let a_path = src.path().join("a.js");
  let lazy_path = src.path().join("lazy.js");
  write(&a_path, "export const a = 5;\n");
  write(&lazy_path, "export default 6;\n");
  session.notify_changed([a_path, lazy_path]);
  session.run_pending().await;

  match rx.try_recv().unwrap() {
    HmrPayload::Update { modules, .. } => {
      let ids: Vec<&str> = modules.iter().map(|m| m.id.as_str()).collect();
      assert!(ids.iter().any(|id| id.ends_with("a.js")));
      assert!(ids.iter().any(|id| id.ends_with("lazy.js")));
      // main.js imports a, so it is a transitive dependent.
      assert!(ids.iter().any(|id| id.ends_with("main.js")));
    }
    HmrPayload::Failure { .. } => panic!("expected update"),
  }
  // One coalesced build, one payload.
  assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn removing_a_module_drops_its_record() {
  let src = tempfile::tempdir().unwrap();
  let out = tempfile::tempdir().unwrap();
  scaffold(src.path());

  let core = BundlerCore::new(input_options(src.path()));
  let opts = output_options(out.path().to_path_buf());
  let (mut state, _) = core.build(&opts).await.unwrap();

  let a_path = src.path().join("a.js");
  let main_path = src.path().join("main.js");
  std::fs::remove_file(&a_path).unwrap();
  write(
    &main_path,
    "export function boot() {\n  return import('./lazy').then(function (m) { return m.default; });\n}\n",
  );

  let outcome = core
    .rebuild(&mut state, &opts, vec![a_path.clone(), main_path])
    .await
    .unwrap();
  assert!(outcome.payload.is_some());

  let a_id = ModuleId::from_path(&a_path);
  assert!(state.graph().module(&a_id).is_none(), "removed module is gone");
}
