use rustc_hash::FxHashMap;

/// Evaluates one declaration value: variables are substituted, arithmetic
/// over unit-carrying numeric literals is folded with standard precedence,
/// everything else passes through verbatim.
pub(crate) fn eval_value(value: &str, vars: &FxHashMap<String, String>) -> Result<String, String> {
  let tokens = expand_vars(tokenize(value)?, vars, 0)?;
  render(&tokens)
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
  Num(f64, String),
  Op(char),
  LParen,
  RParen,
  Comma,
  Var(String),
  /// Identifiers, colors, quoted strings, whole function calls.
  Word(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Value {
  num: f64,
  unit: String,
}

impl Value {
  fn render(&self) -> String {
    let rounded = (self.num * 1e6).round() / 1e6;
    if (rounded - rounded.round()).abs() < 1e-9 {
      format!("{}{}", rounded.round() as i64, self.unit)
    } else {
      format!("{rounded}{}", self.unit)
    }
  }
}

fn tokenize(src: &str) -> Result<Vec<Tok>, String> {
  let bytes = src.as_bytes();
  let mut tokens = vec![];
  let mut i = 0;
  let mut ws_before = true;
  while i < bytes.len() {
    let b = bytes[i];
    match b {
      b if (b as char).is_ascii_whitespace() => {
        i += 1;
        ws_before = true;
        continue;
      }
      b'(' => {
        tokens.push(Tok::LParen);
        i += 1;
      }
      b')' => {
        tokens.push(Tok::RParen);
        i += 1;
      }
      b',' => {
        tokens.push(Tok::Comma);
        i += 1;
      }
      b'+' | b'*' | b'/' => {
        tokens.push(Tok::Op(b as char));
        i += 1;
      }
      b'-' => {
        let next = bytes.get(i + 1).copied();
        let next_numeric =
          matches!(next, Some(c) if c.is_ascii_digit() || c == b'.');
        let next_wordish = matches!(next, Some(c) if c.is_ascii_alphabetic() || c == b'-');
        // `10px -5px` (space before, none after) is a negative literal;
        // `10px - 5px` and `10px-5px` are subtraction.
        let negative_literal = next_numeric
          && (!is_operand(tokens.last())
            || (ws_before && !ws_follows_op(bytes, i)));
        if next_wordish {
          let (word, end) = read_word(src, i);
          tokens.push(Tok::Word(word));
          i = end;
        } else if negative_literal {
          let (mut num, unit, end) = read_number(src, i + 1)?;
          num = -num;
          tokens.push(Tok::Num(num, unit));
          i = end;
        } else {
          tokens.push(Tok::Op('-'));
          i += 1;
        }
      }
      b'@' => {
        let (word, end) = read_word(src, i + 1);
        if word.is_empty() {
          return Err("expected variable name after \"@\"".to_string());
        }
        tokens.push(Tok::Var(word));
        i = end;
      }
      b'"' | b'\'' => {
        let end = read_quoted(bytes, i)?;
        tokens.push(Tok::Word(src[i..end].to_string()));
        i = end;
      }
      b'#' => {
        let (word, end) = read_word(src, i + 1);
        tokens.push(Tok::Word(format!("#{word}")));
        i = end;
      }
      b'!' => {
        let (word, end) = read_word(src, i + 1);
        tokens.push(Tok::Word(format!("!{word}")));
        i = end;
      }
      b if b.is_ascii_digit() || b == b'.' => {
        let (num, unit, end) = read_number(src, i)?;
        tokens.push(Tok::Num(num, unit));
        i = end;
      }
      b if b.is_ascii_alphabetic() || b == b'_' => {
        let (word, end) = read_word(src, i);
        if bytes.get(end) == Some(&b'(') {
          // whole function call passes through verbatim
          let close = find_balanced(bytes, end)?;
          tokens.push(Tok::Word(src[i..close].to_string()));
          i = close;
        } else {
          tokens.push(Tok::Word(word));
          i = end;
        }
      }
      _ => {
        let c = src[i..].chars().next().unwrap();
        tokens.push(Tok::Word(c.to_string()));
        i += c.len_utf8();
      }
    }
    ws_before = false;
  }
  Ok(tokens)
}

fn is_operand(tok: Option<&Tok>) -> bool {
  matches!(tok, Some(Tok::Num(..)) | Some(Tok::RParen) | Some(Tok::Var(_)))
}

fn ws_follows_op(bytes: &[u8], minus_at: usize) -> bool {
  matches!(bytes.get(minus_at + 1), Some(b) if (*b as char).is_ascii_whitespace())
}

fn read_word(src: &str, start: usize) -> (String, usize) {
  let bytes = src.as_bytes();
  let mut i = start;
  while i < bytes.len() {
    let b = bytes[i];
    if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'%' {
      i += 1;
    } else {
      break;
    }
  }
  (src[start..i].to_string(), i)
}

fn read_number(src: &str, start: usize) -> Result<(f64, String, usize), String> {
  let bytes = src.as_bytes();
  let mut i = start;
  let mut saw_dot = false;
  while i < bytes.len() {
    match bytes[i] {
      b'.' if !saw_dot => {
        saw_dot = true;
        i += 1;
      }
      b if b.is_ascii_digit() => i += 1,
      _ => break,
    }
  }
  let num: f64 = src[start..i]
    .parse()
    .map_err(|_| format!("invalid number \"{}\"", &src[start..i]))?;
  let mut j = i;
  while j < bytes.len() {
    let b = bytes[j];
    if b.is_ascii_alphabetic() || b == b'%' {
      j += 1;
    } else {
      break;
    }
  }
  Ok((num, src[i..j].to_string(), j))
}

fn read_quoted(bytes: &[u8], start: usize) -> Result<usize, String> {
  let quote = bytes[start];
  let mut i = start + 1;
  while i < bytes.len() {
    if bytes[i] == quote {
      return Ok(i + 1);
    }
    i += 1;
  }
  Err("unterminated string in value".to_string())
}

fn find_balanced(bytes: &[u8], open: usize) -> Result<usize, String> {
  debug_assert_eq!(bytes[open], b'(');
  let mut depth = 0usize;
  let mut i = open;
  while i < bytes.len() {
    match bytes[i] {
      b'(' => depth += 1,
      b')' => {
        depth -= 1;
        if depth == 0 {
          return Ok(i + 1);
        }
      }
      _ => {}
    }
    i += 1;
  }
  Err("unbalanced parentheses in value".to_string())
}

fn expand_vars(
  tokens: Vec<Tok>,
  vars: &FxHashMap<String, String>,
  depth: usize,
) -> Result<Vec<Tok>, String> {
  if depth > 16 {
    return Err("too deeply nested variable substitution".to_string());
  }
  let mut out = vec![];
  for tok in tokens {
    match tok {
      Tok::Var(name) => {
        let value = vars
          .get(&name)
          .ok_or_else(|| format!("undefined variable \"@{name}\""))?;
        out.extend(expand_vars(tokenize(value)?, vars, depth + 1)?);
      }
      tok => out.push(tok),
    }
  }
  Ok(out)
}

struct ExprParser<'a> {
  tokens: &'a [Tok],
  i: usize,
}

impl<'a> ExprParser<'a> {
  fn parse_expr(&mut self) -> Result<Value, String> {
    let mut lhs = self.parse_term()?;
    while let Some(Tok::Op(op @ ('+' | '-'))) = self.tokens.get(self.i) {
      let op = *op;
      self.i += 1;
      let rhs = self.parse_term()?;
      if lhs.unit != rhs.unit {
        return Err(format!(
          "unit mismatch: cannot {} \"{}\" and \"{}\"",
          if op == '+' { "add" } else { "subtract" },
          lhs.render(),
          rhs.render()
        ));
      }
      lhs.num = if op == '+' {
        lhs.num + rhs.num
      } else {
        lhs.num - rhs.num
      };
    }
    Ok(lhs)
  }

  fn parse_term(&mut self) -> Result<Value, String> {
    let mut lhs = self.parse_factor()?;
    while let Some(Tok::Op(op @ ('*' | '/'))) = self.tokens.get(self.i) {
      let op = *op;
      self.i += 1;
      let rhs = self.parse_factor()?;
      if op == '*' {
        if !lhs.unit.is_empty() && !rhs.unit.is_empty() {
          return Err(format!(
            "unit mismatch: cannot multiply \"{}\" by \"{}\"",
            lhs.render(),
            rhs.render()
          ));
        }
        lhs = Value {
          num: lhs.num * rhs.num,
          unit: if lhs.unit.is_empty() { rhs.unit } else { lhs.unit },
        };
      } else {
        if rhs.num == 0.0 {
          return Err("division by zero".to_string());
        }
        let unit = if rhs.unit.is_empty() {
          lhs.unit.clone()
        } else if rhs.unit == lhs.unit {
          String::new()
        } else {
          return Err(format!(
            "unit mismatch: cannot divide \"{}\" by \"{}\"",
            lhs.render(),
            rhs.render()
          ));
        };
        lhs = Value {
          num: lhs.num / rhs.num,
          unit,
        };
      }
    }
    Ok(lhs)
  }

  fn parse_factor(&mut self) -> Result<Value, String> {
    match self.tokens.get(self.i) {
      Some(Tok::Num(num, unit)) => {
        self.i += 1;
        Ok(Value {
          num: *num,
          unit: unit.clone(),
        })
      }
      Some(Tok::Op('-')) => {
        self.i += 1;
        let mut value = self.parse_factor()?;
        value.num = -value.num;
        Ok(value)
      }
      Some(Tok::LParen) => {
        self.i += 1;
        let value = self.parse_expr()?;
        match self.tokens.get(self.i) {
          Some(Tok::RParen) => {
            self.i += 1;
            Ok(value)
          }
          _ => Err("expected \")\"".to_string()),
        }
      }
      _ => Err("expected a numeric operand".to_string()),
    }
  }
}

fn render(tokens: &[Tok]) -> Result<String, String> {
  let mut out = String::new();
  let mut i = 0;
  let mut push_part = |out: &mut String, part: &str| {
    if !out.is_empty() && part != "," {
      out.push(' ');
    }
    out.push_str(part);
  };
  while i < tokens.len() {
    match &tokens[i] {
      Tok::Num(..) | Tok::LParen => {
        let mut parser = ExprParser { tokens, i };
        let value = parser.parse_expr()?;
        i = parser.i;
        push_part(&mut out, &value.render());
      }
      Tok::Op('-') if matches!(tokens.get(i + 1), Some(Tok::Num(..)) | Some(Tok::LParen)) => {
        let mut parser = ExprParser { tokens, i };
        let value = parser.parse_expr()?;
        i = parser.i;
        push_part(&mut out, &value.render());
      }
      Tok::Comma => {
        push_part(&mut out, ",");
        i += 1;
      }
      Tok::Op(op) => {
        push_part(&mut out, &op.to_string());
        i += 1;
      }
      Tok::Word(word) => {
        push_part(&mut out, word);
        i += 1;
      }
      Tok::RParen => {
        push_part(&mut out, ")");
        i += 1;
      }
      Tok::Var(_) => unreachable!("variables are expanded before rendering"),
    }
  }
  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn eval(value: &str) -> Result<String, String> {
    eval_value(value, &FxHashMap::default())
  }

  #[test]
  fn addition_preserves_unit() {
    assert_eq!(eval("24px + 0px").unwrap(), "24px");
  }

  #[test]
  fn unit_mismatch_fails() {
    let err = eval("10px + 2em").unwrap_err();
    assert!(err.contains("unit mismatch"), "{err}");
  }

  #[test]
  fn standard_precedence_applies() {
    assert_eq!(eval("2px + 3px * 2").unwrap(), "8px");
    assert_eq!(eval("(100px + 20px) * 2").unwrap(), "240px");
  }

  #[test]
  fn division_rules() {
    assert_eq!(eval("24px / 2").unwrap(), "12px");
    assert_eq!(eval("24px / 12px").unwrap(), "2");
    assert!(eval("24px / 2em").unwrap_err().contains("unit mismatch"));
    assert!(eval("24px / 0").unwrap_err().contains("division by zero"));
  }

  #[test]
  fn multiplication_allows_one_unit() {
    assert_eq!(eval("8px * 3").unwrap(), "24px");
    assert_eq!(eval("3 * 8px").unwrap(), "24px");
    assert!(eval("2px * 2px").unwrap_err().contains("unit mismatch"));
  }

  #[test]
  fn fractional_results_are_trimmed() {
    assert_eq!(eval("5px / 2").unwrap(), "2.5px");
  }

  #[test]
  fn non_numeric_parts_pass_through() {
    assert_eq!(eval("1px solid #333").unwrap(), "1px solid #333");
    assert_eq!(eval("url(./bg.png) no-repeat").unwrap(), "url(./bg.png) no-repeat");
    assert_eq!(eval("\"Helvetica Neue\", sans-serif").unwrap(), "\"Helvetica Neue\", sans-serif");
  }

  #[test]
  fn negative_literal_is_not_subtraction() {
    assert_eq!(eval("10px -5px").unwrap(), "10px -5px");
    assert_eq!(eval("10px - 5px").unwrap(), "5px");
    assert_eq!(eval("-5px").unwrap(), "-5px");
  }

  #[test]
  fn variables_expand_recursively() {
    let mut vars = FxHashMap::default();
    vars.insert("pad".to_string(), "8px".to_string());
    vars.insert("double-pad".to_string(), "@pad * 2".to_string());
    assert_eq!(eval_value("@double-pad + 2px", &vars).unwrap(), "18px");
  }

  #[test]
  fn undefined_variable_is_an_error() {
    let err = eval("@missing").unwrap_err();
    assert!(err.contains("undefined variable"));
  }

  #[test]
  fn percent_is_a_unit() {
    assert_eq!(eval("50% + 25%").unwrap(), "75%");
    assert!(eval("50% + 1px").unwrap_err().contains("unit mismatch"));
  }
}
