use std::collections::BTreeMap;
use std::path::Path;

use crate::{BuildError, UnaryBuildResult};

/// Logical asset name -> emitted file name.
pub type Manifest = BTreeMap<String, String>;

/// Written via temp file + rename so a failed build never leaves a
/// partially written manifest behind.
pub(crate) fn write_manifest_atomic(path: &Path, manifest: &Manifest) -> UnaryBuildResult<()> {
  let json = serde_json::to_string_pretty(manifest).expect("manifests always serialize");
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).map_err(|e| BuildError::emission(parent, e))?;
  }
  let tmp = path.with_file_name(format!(
    "{}.tmp",
    path.file_name().and_then(|n| n.to_str()).unwrap_or("manifest")
  ));
  std::fs::write(&tmp, json).map_err(|e| BuildError::emission(&tmp, e))?;
  std::fs::rename(&tmp, path).map_err(|e| BuildError::emission(path, e))?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn writes_manifest_without_leaving_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manifest.json");
    let mut manifest = Manifest::new();
    manifest.insert("main".to_string(), "main-abc.js".to_string());
    write_manifest_atomic(&path, &manifest).unwrap();

    let written: Manifest = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written, manifest);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
  }
}
