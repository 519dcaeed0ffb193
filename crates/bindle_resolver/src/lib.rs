use std::path::{Path, PathBuf};

use bindle_common::{ModuleId, ModuleKind, Platform, StaticStr};
use rustc_hash::FxHashMap;
use sugar_path::SugarPath;

/// One alias rewrite rule. Exact rules replace the whole specifier,
/// prefix rules replace the matched head and keep the tail.
#[derive(Debug, Clone)]
pub struct AliasRule {
  pub find: String,
  pub replacement: String,
  pub exact: bool,
}

impl AliasRule {
  pub fn exact(find: impl Into<String>, replacement: impl Into<String>) -> Self {
    Self {
      find: find.into(),
      replacement: replacement.into(),
      exact: true,
    }
  }

  pub fn prefix(find: impl Into<String>, replacement: impl Into<String>) -> Self {
    Self {
      find: find.into(),
      replacement: replacement.into(),
      exact: false,
    }
  }

  fn apply(&self, specifier: &str) -> Option<String> {
    if self.exact {
      (specifier == self.find).then(|| self.replacement.clone())
    } else {
      specifier
        .strip_prefix(&self.find)
        .map(|rest| format!("{}{rest}", self.replacement))
    }
  }
}

#[derive(Debug, Clone)]
pub struct ResolveOptions {
  pub alias: Vec<AliasRule>,
  /// Probe order for extension-less candidates.
  pub extensions: Vec<String>,
  /// Roots walked for bare specifiers, in order.
  pub search_paths: Vec<PathBuf>,
}

impl Default for ResolveOptions {
  fn default() -> Self {
    Self {
      alias: vec![],
      extensions: ["js", "jsx", "ts", "tsx", "css", "json"]
        .into_iter()
        .map(str::to_string)
        .collect(),
      search_paths: vec![],
    }
  }
}

/// A specifier resolved to a runtime-provided module. Carries the configured
/// runtime access expression; such modules are never transformed or emitted.
#[derive(Debug, Clone)]
pub struct ExternalReference {
  pub id: ModuleId,
  pub access: StaticStr,
}

#[derive(Debug, Clone)]
pub enum Resolution {
  Module(ModuleId),
  External(ExternalReference),
}

impl Resolution {
  pub fn id(&self) -> &ModuleId {
    match self {
      Resolution::Module(id) => id,
      Resolution::External(ext) => &ext.id,
    }
  }
}

#[derive(Debug)]
pub struct Resolver {
  cwd: PathBuf,
  options: ResolveOptions,
  externals: FxHashMap<String, String>,
  platform: Platform,
}

impl Resolver {
  pub fn new(
    cwd: PathBuf,
    options: ResolveOptions,
    externals: FxHashMap<String, String>,
    platform: Platform,
  ) -> Self {
    Self {
      cwd,
      options,
      externals,
      platform,
    }
  }

  pub fn with_cwd(cwd: PathBuf) -> Self {
    Self::new(cwd, Default::default(), Default::default(), Default::default())
  }

  pub fn cwd(&self) -> &PathBuf {
    &self.cwd
  }

  pub fn resolve(
    &self,
    specifier: &str,
    importer: Option<&ModuleId>,
  ) -> bindle_error::Result<Resolution> {
    // Alias rewriting happens first; a match short-circuits further alias
    // application.
    let specifier = self
      .options
      .alias
      .iter()
      .find_map(|rule| rule.apply(specifier))
      .unwrap_or_else(|| specifier.to_string());

    if let Some(access) = self.externals.get(&specifier) {
      return Ok(Resolution::External(ExternalReference {
        id: ModuleId::external(specifier),
        access: access.clone().into(),
      }));
    }

    let mut tried = vec![];
    let candidates = self.candidates_for(&specifier, importer);
    for candidate in &candidates {
      if let Some(found) = self.probe(candidate, &mut tried) {
        let id = found.to_string_lossy().to_string();
        let kind = ModuleKind::from_path(&found);
        return Ok(Resolution::Module(ModuleId::new(id, kind)));
      }
    }

    Err(bindle_error::Error::unresolved(
      specifier,
      importer.map(|id| Path::new(id.as_ref())),
      tried,
    ))
  }

  fn candidates_for(&self, specifier: &str, importer: Option<&ModuleId>) -> Vec<PathBuf> {
    let specifier_path = Path::new(specifier);
    if specifier_path.is_absolute() {
      return vec![specifier_path.normalize()];
    }
    if specifier.starts_with('.') {
      let base = importer
        .and_then(|id| Path::new(id.as_ref()).parent().map(Path::to_path_buf))
        .unwrap_or_else(|| self.cwd.clone());
      return vec![base.join(specifier).normalize()];
    }
    // Bare specifier: walk the configured search paths in order.
    self
      .options
      .search_paths
      .iter()
      .map(|root| {
        let root = if root.is_absolute() {
          root.clone()
        } else {
          self.cwd.join(root)
        };
        root.join(specifier).normalize()
      })
      .collect()
  }

  /// Probe one candidate path. The candidate itself is tried first, then the
  /// configured extension list; at each step a platform-qualified variant
  /// (`foo.node.js` for platform `node`) is preferred over the plain file.
  fn probe(&self, candidate: &Path, tried: &mut Vec<PathBuf>) -> Option<PathBuf> {
    let mut try_file = |path: PathBuf| -> Option<PathBuf> {
      if path.is_file() {
        Some(path)
      } else {
        tried.push(path);
        None
      }
    };

    if candidate.extension().is_some() {
      if let Some(variant) = self.platform_variant(candidate) {
        if let Some(found) = try_file(variant) {
          return Some(found);
        }
      }
      if let Some(found) = try_file(candidate.to_path_buf()) {
        return Some(found);
      }
    }

    for ext in &self.options.extensions {
      let with_ext = append_extension(candidate, ext);
      if let Some(variant) = self.platform_variant(&with_ext) {
        if let Some(found) = try_file(variant) {
          return Some(found);
        }
      }
      if let Some(found) = try_file(with_ext) {
        return Some(found);
      }
    }

    None
  }

  fn platform_variant(&self, path: &Path) -> Option<PathBuf> {
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?;
    let qualifier = self.platform.qualifier();
    if stem.ends_with(&format!(".{qualifier}")) {
      return None;
    }
    Some(path.with_file_name(format!("{stem}.{qualifier}.{ext}")))
  }
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
  let mut os = path.as_os_str().to_os_string();
  os.push(".");
  os.push(ext);
  PathBuf::from(os)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;

  fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "").unwrap();
  }

  fn resolver(root: &Path) -> Resolver {
    Resolver::with_cwd(root.to_path_buf())
  }

  #[test]
  fn resolves_relative_with_extension_probing() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("src/foo.ts"));
    touch(&dir.path().join("src/main.js"));

    let r = resolver(dir.path());
    let importer = ModuleId::from_path(dir.path().join("src/main.js"));
    let resolved = r.resolve("./foo", Some(&importer)).unwrap();
    assert_eq!(
      resolved.id().as_ref(),
      dir.path().join("src/foo.ts").to_string_lossy()
    );
    assert_eq!(resolved.id().kind(), ModuleKind::Script);
  }

  #[test]
  fn first_extension_in_list_wins() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("foo.js"));
    touch(&dir.path().join("foo.ts"));

    let r = resolver(dir.path());
    let resolved = r.resolve("./foo", None).unwrap();
    assert!(resolved.id().as_ref().ends_with("foo.js"));
  }

  #[test]
  fn platform_variant_preferred_over_plain_file() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("env.js"));
    touch(&dir.path().join("env.node.js"));

    let r = Resolver::new(
      dir.path().to_path_buf(),
      Default::default(),
      Default::default(),
      Platform::Node,
    );
    let resolved = r.resolve("./env.js", None).unwrap();
    assert!(resolved.id().as_ref().ends_with("env.node.js"));

    let browser = resolver(dir.path());
    let resolved = browser.resolve("./env.js", None).unwrap();
    assert!(resolved.id().as_ref().ends_with("env.js"));
  }

  #[test]
  fn alias_rewrites_before_probing() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("lib/utils/math.js"));

    let mut options = ResolveOptions::default();
    options.alias.push(AliasRule::prefix("@utils/", "./lib/utils/"));
    let r = Resolver::new(
      dir.path().to_path_buf(),
      options,
      Default::default(),
      Default::default(),
    );
    let resolved = r.resolve("@utils/math", None).unwrap();
    assert!(resolved.id().as_ref().ends_with("math.js"));
  }

  #[test]
  fn externals_table_short_circuits() {
    let dir = tempfile::tempdir().unwrap();
    let mut externals = FxHashMap::default();
    externals.insert("react".to_string(), "window.React".to_string());
    let r = Resolver::new(
      dir.path().to_path_buf(),
      Default::default(),
      externals,
      Default::default(),
    );
    match r.resolve("react", None).unwrap() {
      Resolution::External(ext) => {
        assert!(ext.id.is_external());
        assert_eq!(ext.access, "window.React");
      }
      Resolution::Module(_) => panic!("expected external"),
    }
  }

  #[test]
  fn bare_specifier_walks_search_paths() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("vendor/left-pad/index.js"));

    let mut options = ResolveOptions::default();
    options.search_paths.push(PathBuf::from("vendor"));
    let r = Resolver::new(
      dir.path().to_path_buf(),
      options,
      Default::default(),
      Default::default(),
    );
    let resolved = r.resolve("left-pad/index", None).unwrap();
    assert!(resolved.id().as_ref().ends_with("index.js"));
  }

  #[test]
  fn unresolvable_specifier_reports_tried_paths() {
    let dir = tempfile::tempdir().unwrap();
    let r = resolver(dir.path());
    let err = r.resolve("./nope", None).unwrap_err();
    match err.kind {
      bindle_error::ErrorKind::Resolution { tried, .. } => {
        assert!(!tried.is_empty());
      }
      _ => panic!("expected resolution error"),
    }
  }
}
