//! A small stylesheet dialect: nested rules with `&` parent references,
//! `@name: value;` variables, parameterless `.mixin()` includes, `@import`
//! of nested style files, and arithmetic over unit-carrying numeric literals
//! in declaration values.

mod eval;
pub(crate) use eval::eval_value;

#[derive(Debug, Clone)]
pub(crate) enum StyleItem {
  Import(String),
  VarDef { name: String, value: String },
  Rule(Rule),
}

#[derive(Debug, Clone)]
pub(crate) struct Rule {
  pub selector: String,
  pub body: Vec<BodyItem>,
}

#[derive(Debug, Clone)]
pub(crate) enum BodyItem {
  Declaration { property: String, value: String },
  Include { name: String },
  Nested(Rule),
  VarDef { name: String, value: String },
}

#[derive(Debug)]
pub(crate) struct StyleParseError {
  pub message: String,
  pub offset: usize,
}

pub(crate) fn parse_stylesheet(src: &str) -> Result<Vec<StyleItem>, StyleParseError> {
  Parser { src, pos: 0 }.parse_block_items(true)
}

struct Parser<'a> {
  src: &'a str,
  pos: usize,
}

enum RawItem {
  Import(String),
  VarDef { name: String, value: String },
  Declaration { property: String, value: String },
  Include { name: String },
  Rule(Rule),
}

impl<'a> Parser<'a> {
  fn byte(&self, i: usize) -> Option<u8> {
    self.src.as_bytes().get(i).copied()
  }

  fn error(&self, message: impl Into<String>) -> StyleParseError {
    StyleParseError {
      message: message.into(),
      offset: self.pos,
    }
  }

  fn skip_ws(&mut self) {
    loop {
      match self.byte(self.pos) {
        Some(b) if (b as char).is_ascii_whitespace() => self.pos += 1,
        Some(b'/') if self.byte(self.pos + 1) == Some(b'/') => {
          while let Some(b) = self.byte(self.pos) {
            if b == b'\n' {
              break;
            }
            self.pos += 1;
          }
        }
        Some(b'/') if self.byte(self.pos + 1) == Some(b'*') => {
          self.pos += 2;
          while let Some(b) = self.byte(self.pos) {
            if b == b'*' && self.byte(self.pos + 1) == Some(b'/') {
              self.pos += 2;
              break;
            }
            self.pos += 1;
          }
        }
        _ => break,
      }
    }
  }

  fn parse_block_items(&mut self, top: bool) -> Result<Vec<StyleItem>, StyleParseError> {
    let mut items = vec![];
    loop {
      self.skip_ws();
      match self.byte(self.pos) {
        None => return Ok(items),
        Some(b'}') if !top => return Ok(items),
        Some(b'}') => return Err(self.error("unexpected \"}\"")),
        _ => match self.parse_item(top)? {
          RawItem::Import(spec) => items.push(StyleItem::Import(spec)),
          RawItem::VarDef { name, value } => items.push(StyleItem::VarDef { name, value }),
          RawItem::Rule(rule) => items.push(StyleItem::Rule(rule)),
          RawItem::Declaration { .. } | RawItem::Include { .. } => {
            return Err(self.error("declarations are only allowed inside a rule block"))
          }
        },
      }
    }
  }

  fn parse_rule_body(&mut self) -> Result<Vec<BodyItem>, StyleParseError> {
    let mut body = vec![];
    loop {
      self.skip_ws();
      match self.byte(self.pos) {
        None => return Err(self.error("unexpected end of input inside a rule block")),
        Some(b'}') => {
          self.pos += 1;
          return Ok(body);
        }
        _ => match self.parse_item(false)? {
          RawItem::VarDef { name, value } => body.push(BodyItem::VarDef { name, value }),
          RawItem::Declaration { property, value } => {
            body.push(BodyItem::Declaration { property, value })
          }
          RawItem::Include { name } => body.push(BodyItem::Include { name }),
          RawItem::Rule(rule) => body.push(BodyItem::Nested(rule)),
          RawItem::Import(_) => return Err(self.error("@import is only allowed at the top level")),
        },
      }
    }
  }

  fn parse_item(&mut self, top: bool) -> Result<RawItem, StyleParseError> {
    if self.byte(self.pos) == Some(b'@') {
      return self.parse_at_rule();
    }

    let prelude_start = self.pos;
    let prelude = self.read_prelude()?;
    match self.byte(self.pos) {
      Some(b'{') => {
        self.pos += 1;
        let body = self.parse_rule_body()?;
        Ok(RawItem::Rule(Rule {
          selector: prelude.trim().to_string(),
          body,
        }))
      }
      terminator @ (Some(b';') | Some(b'}') | None) => {
        if matches!(terminator, Some(b';')) {
          self.pos += 1;
        }
        let prelude = prelude.trim();
        if top {
          self.pos = prelude_start;
          return Err(self.error("expected a rule block"));
        }
        if let Some(name) = prelude.strip_suffix("()") {
          return Ok(RawItem::Include {
            name: name.trim().to_string(),
          });
        }
        match prelude.split_once(':') {
          Some((property, value)) => Ok(RawItem::Declaration {
            property: property.trim().to_string(),
            value: value.trim().to_string(),
          }),
          None => {
            self.pos = prelude_start;
            Err(self.error("expected \"property: value\""))
          }
        }
      }
      _ => unreachable!("read_prelude stops at {{, ;, }} or end"),
    }
  }

  fn parse_at_rule(&mut self) -> Result<RawItem, StyleParseError> {
    debug_assert_eq!(self.byte(self.pos), Some(b'@'));
    self.pos += 1;
    let name = self.read_ident();
    if name.is_empty() {
      return Err(self.error("expected identifier after \"@\""));
    }

    if name == "import" {
      self.skip_ws();
      let spec = self.read_quoted()?;
      self.skip_ws();
      if self.byte(self.pos) == Some(b';') {
        self.pos += 1;
      }
      return Ok(RawItem::Import(spec));
    }

    self.skip_ws();
    if self.byte(self.pos) != Some(b':') {
      return Err(self.error(format!("expected \":\" after \"@{name}\"")));
    }
    self.pos += 1;
    let value = self.read_prelude()?;
    if self.byte(self.pos) == Some(b';') {
      self.pos += 1;
    }
    Ok(RawItem::VarDef {
      name,
      value: value.trim().to_string(),
    })
  }

  fn read_ident(&mut self) -> String {
    let start = self.pos;
    while let Some(b) = self.byte(self.pos) {
      if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
        self.pos += 1;
      } else {
        break;
      }
    }
    self.src[start..self.pos].to_string()
  }

  fn read_quoted(&mut self) -> Result<String, StyleParseError> {
    let quote = match self.byte(self.pos) {
      Some(q @ (b'"' | b'\'')) => q,
      _ => return Err(self.error("expected a quoted path")),
    };
    let start = self.pos + 1;
    let mut i = start;
    while let Some(b) = self.byte(i) {
      if b == quote {
        let value = self.src[start..i].to_string();
        self.pos = i + 1;
        return Ok(value);
      }
      i += 1;
    }
    Err(self.error("unterminated string"))
  }

  /// Reads selector/declaration text until `{`, `;`, `}` or end of input at
  /// parenthesis depth zero, skipping quoted strings.
  fn read_prelude(&mut self) -> Result<String, StyleParseError> {
    let start = self.pos;
    let mut depth = 0usize;
    loop {
      match self.byte(self.pos) {
        None => break,
        Some(b'(') => {
          depth += 1;
          self.pos += 1;
        }
        Some(b')') => {
          depth = depth.saturating_sub(1);
          self.pos += 1;
        }
        Some(b'{' | b';' | b'}') if depth == 0 => break,
        Some(b'"' | b'\'') => {
          self.read_quoted()?;
        }
        Some(b'/') if self.byte(self.pos + 1) == Some(b'*') => self.skip_ws(),
        _ => self.pos += 1,
      }
    }
    Ok(self.src[start..self.pos].to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_imports_variables_and_nested_rules() {
    let src = r#"
      @import "./base.css";
      @primary: #333;
      .button {
        color: @primary;
        &:hover { color: red; }
        .label { font-size: 12px }
      }
    "#;
    let items = parse_stylesheet(src).unwrap();
    assert_eq!(items.len(), 3);
    assert!(matches!(&items[0], StyleItem::Import(spec) if spec == "./base.css"));
    assert!(matches!(&items[1], StyleItem::VarDef { name, .. } if name == "primary"));
    match &items[2] {
      StyleItem::Rule(rule) => {
        assert_eq!(rule.selector, ".button");
        assert_eq!(rule.body.len(), 3);
      }
      _ => panic!("expected rule"),
    }
  }

  #[test]
  fn include_is_distinguished_from_declaration() {
    let src = ".card { .mixin-base(); width: 10px; }";
    let items = parse_stylesheet(src).unwrap();
    match &items[0] {
      StyleItem::Rule(rule) => {
        assert!(matches!(&rule.body[0], BodyItem::Include { name } if name == ".mixin-base"));
        assert!(
          matches!(&rule.body[1], BodyItem::Declaration { property, .. } if property == "width")
        );
      }
      _ => panic!("expected rule"),
    }
  }

  #[test]
  fn unterminated_block_is_a_parse_error() {
    let err = parse_stylesheet(".a { color: red;").unwrap_err();
    assert!(err.message.contains("unexpected end"));
  }
}
