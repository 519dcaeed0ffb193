use bindle_common::ModuleKind;

use super::{DependencyRequest, TransformContext, TransformOutput};
use crate::{BuildError, UnaryBuildResult};

pub(crate) fn transform_script(
  ctx: &TransformContext,
  source: String,
) -> UnaryBuildResult<TransformOutput> {
  // Definition substitution is textual and happens before dependency
  // extraction so substituted imports are still discoverable.
  let source = apply_defines(&source, &ctx.options.define);
  let target = ctx.options.targets.target_for(ctx.options.platform);
  let transpiled = ctx
    .options
    .transpiler
    .transpile(&source, ModuleKind::Script, target)
    .map_err(|e| BuildError::transform_failed(ctx.id.as_ref(), e.position, e.reason))?;

  Ok(TransformOutput {
    code: transpiled.code,
    dependencies: transpiled
      .imports
      .into_iter()
      .map(|record| DependencyRequest {
        specifier: record.specifier,
        kind: record.kind,
      })
      .collect(),
    emitted_asset: None,
  })
}

fn apply_defines(source: &str, define: &[(String, String)]) -> String {
  if define.is_empty() {
    return source.to_string();
  }
  // Longer keys first so `process.env.NODE_ENV` wins over `process.env`.
  let mut ordered: Vec<&(String, String)> = define.iter().collect();
  ordered.sort_by_key(|(key, _)| std::cmp::Reverse(key.len()));

  let mut out = source.to_string();
  for (key, value) in ordered {
    out = replace_identifier(&out, key, value);
  }
  out
}

fn replace_identifier(source: &str, key: &str, value: &str) -> String {
  let mut out = String::with_capacity(source.len());
  let mut rest = source;
  while let Some(found) = rest.find(key) {
    let before = rest[..found].chars().next_back();
    let after = rest[found + key.len()..].chars().next();
    let boundary_before = !matches!(before, Some(c) if c.is_alphanumeric() || c == '_' || c == '$' || c == '.');
    let boundary_after = !matches!(after, Some(c) if c.is_alphanumeric() || c == '_' || c == '$');
    out.push_str(&rest[..found]);
    if boundary_before && boundary_after {
      out.push_str(value);
    } else {
      out.push_str(key);
    }
    rest = &rest[found + key.len()..];
  }
  out.push_str(rest);
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn substitutes_whole_identifiers_only() {
    let define = vec![("__DEV__".to_string(), "false".to_string())];
    assert_eq!(apply_defines("if (__DEV__) {}", &define), "if (false) {}");
    assert_eq!(apply_defines("const __DEV__X = 1;", &define), "const __DEV__X = 1;");
    assert_eq!(apply_defines("obj.__DEV__", &define), "obj.__DEV__");
  }

  #[test]
  fn longest_key_wins() {
    let define = vec![
      ("process.env".to_string(), "({})".to_string()),
      ("process.env.NODE_ENV".to_string(), "\"production\"".to_string()),
    ];
    assert_eq!(
      apply_defines("process.env.NODE_ENV === 'production'", &define),
      "\"production\" === 'production'"
    );
  }

  #[test]
  fn substituted_imports_stay_discoverable() {
    let define = vec![("FEATURE_MODULE".to_string(), "'./feature'".to_string())];
    assert_eq!(
      apply_defines("require(FEATURE_MODULE)", &define),
      "require('./feature')"
    );
  }
}
