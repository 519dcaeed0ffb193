use bindle_common::TextPosition;
use bindle_transpiler::{ImportKind, RUNTIME_REQUIRE};
use rustc_hash::FxHashMap;

use super::style::{self, BodyItem, Rule, StyleItem};
use super::{DependencyRequest, TransformContext, TransformOutput};
use crate::utils::js_string;
use crate::{BuildError, UnaryBuildResult};

pub(crate) fn transform_stylesheet(
  ctx: &TransformContext,
  source: String,
) -> UnaryBuildResult<TransformOutput> {
  let items = style::parse_stylesheet(&source).map_err(|e| {
    BuildError::transform_failed(
      ctx.id.as_ref(),
      Some(TextPosition::from_offset(&source, e.offset)),
      e.message,
    )
  })?;

  let mut flattener = Flattener {
    ctx,
    vars: FxHashMap::default(),
    mixins: FxHashMap::default(),
    css: String::new(),
  };

  let mut imports = vec![];
  for item in &items {
    match item {
      StyleItem::Import(spec) => imports.push(spec.clone()),
      StyleItem::VarDef { name, value } => flattener.define_var(name, value)?,
      StyleItem::Rule(rule) => {
        flattener.register_mixin(rule);
        flattener.flatten(rule, None)?;
      }
    }
  }

  // Imported sheets execute first so their rules precede ours in the
  // cascade; the dependency edge carries the actual inclusion.
  let mut code = String::new();
  for spec in &imports {
    code.push_str(&format!("{RUNTIME_REQUIRE}({});\n", js_string(spec)));
  }
  code.push_str(&format!(
    "{RUNTIME_REQUIRE}.css({});\nmodule.exports = {{}};",
    js_string(flattener.css.trim_end())
  ));

  Ok(TransformOutput {
    code,
    dependencies: imports
      .into_iter()
      .map(|specifier| DependencyRequest {
        specifier,
        kind: ImportKind::Static,
      })
      .collect(),
    emitted_asset: None,
  })
}

struct Flattener<'a, 'b> {
  ctx: &'a TransformContext<'b>,
  vars: FxHashMap<String, String>,
  /// Parameterless mixins: top-level single-class rules, by selector.
  mixins: FxHashMap<String, Vec<(String, String)>>,
  css: String,
}

impl Flattener<'_, '_> {
  fn style_err(&self, reason: String) -> BuildError {
    BuildError::style_eval(self.ctx.id.as_ref(), reason)
  }

  fn define_var(&mut self, name: &str, value: &str) -> UnaryBuildResult<()> {
    let evaluated = style::eval_value(value, &self.vars).map_err(|e| self.style_err(e))?;
    self.vars.insert(name.to_string(), evaluated);
    Ok(())
  }

  fn register_mixin(&mut self, rule: &Rule) {
    let selector = rule.selector.trim();
    let is_simple_class = selector.starts_with('.')
      && selector[1..]
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_');
    if !is_simple_class {
      return;
    }
    let declarations = rule
      .body
      .iter()
      .filter_map(|item| match item {
        BodyItem::Declaration { property, value } => Some((property.clone(), value.clone())),
        _ => None,
      })
      .collect();
    self.mixins.insert(selector.to_string(), declarations);
  }

  fn flatten(&mut self, rule: &Rule, parent: Option<&str>) -> UnaryBuildResult<()> {
    let selector = combine_selectors(parent, &rule.selector);

    let mut declarations: Vec<(String, String)> = vec![];
    let mut nested: Vec<&Rule> = vec![];
    for item in &rule.body {
      match item {
        BodyItem::VarDef { name, value } => self.define_var(name, value)?,
        BodyItem::Declaration { property, value } => {
          let value = style::eval_value(value, &self.vars).map_err(|e| self.style_err(e))?;
          declarations.push((property.clone(), value));
        }
        BodyItem::Include { name } => {
          let mixin = self
            .mixins
            .get(name)
            .cloned()
            .ok_or_else(|| self.style_err(format!("unknown mixin \"{name}()\"")))?;
          for (property, value) in mixin {
            let value = style::eval_value(&value, &self.vars).map_err(|e| self.style_err(e))?;
            declarations.push((property, value));
          }
        }
        BodyItem::Nested(inner) => nested.push(inner),
      }
    }

    if !declarations.is_empty() {
      self.css.push_str(&selector);
      self.css.push_str(" {\n");
      for (property, value) in &declarations {
        self.css.push_str(&format!("  {property}: {value};\n"));
      }
      self.css.push_str("}\n");
    }

    for inner in nested {
      self.flatten(inner, Some(&selector))?;
    }
    Ok(())
  }
}

fn combine_selectors(parent: Option<&str>, child: &str) -> String {
  let Some(parent) = parent else {
    return child.trim().to_string();
  };
  let mut combined = vec![];
  for parent_part in parent.split(',').map(str::trim) {
    for child_part in child.split(',').map(str::trim) {
      if child_part.contains('&') {
        combined.push(child_part.replace('&', parent_part));
      } else {
        combined.push(format!("{parent_part} {child_part}"));
      }
    }
  }
  combined.join(", ")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::BuildInputOptions;
  use bindle_common::ModuleId;
  use bindle_error::ErrorKind;

  fn transform(source: &str) -> UnaryBuildResult<TransformOutput> {
    let options = BuildInputOptions::default();
    let id = ModuleId::from_path("/proj/app.less");
    transform_stylesheet(
      &TransformContext {
        id: &id,
        options: &options,
      },
      source.to_string(),
    )
  }

  #[test]
  fn evaluates_arithmetic_in_declarations() {
    let out = transform(".a { padding: 24px + 0px; }").unwrap();
    assert!(out.code.contains("padding: 24px;"));
  }

  #[test]
  fn unit_mismatch_is_a_style_eval_error() {
    let err = transform(".a { padding: 10px + 2em; }").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::StyleEval { .. }));
  }

  #[test]
  fn substitutes_variables() {
    let out = transform("@primary: #333;\n.a { color: @primary; }").unwrap();
    assert!(out.code.contains("color: #333;"));
  }

  #[test]
  fn flattens_nested_rules_with_parent_references() {
    let out = transform(".nav { color: black; .item { color: grey; } &:hover { color: red; } }")
      .unwrap();
    assert!(out.code.contains(".nav {"));
    assert!(out.code.contains(".nav .item {"));
    assert!(out.code.contains(".nav:hover {"));
  }

  #[test]
  fn splices_mixins() {
    let out =
      transform(".bordered { border: 1px solid black; }\n.card { .bordered(); width: 10px; }")
        .unwrap();
    let css_times = out.code.matches("border: 1px solid black;").count();
    assert_eq!(css_times, 2);
  }

  #[test]
  fn unknown_mixin_is_a_style_eval_error() {
    let err = transform(".card { .missing(); }").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::StyleEval { .. }));
  }

  #[test]
  fn imports_become_dependencies_and_requires() {
    let out = transform("@import \"./base.css\";\n.a { color: red; }").unwrap();
    assert_eq!(out.dependencies.len(), 1);
    assert_eq!(out.dependencies[0].specifier, "./base.css");
    assert!(out.code.contains("__bindle_require__(\"./base.css\");"));
    assert!(!out.code.contains("@import"));
  }

  #[test]
  fn parse_failure_is_a_transform_error_with_position() {
    let err = transform(".a { color: red;").unwrap_err();
    match err.kind {
      ErrorKind::Transform { position, .. } => assert!(position.is_some()),
      other => panic!("expected transform error, got {other:?}"),
    }
  }
}
