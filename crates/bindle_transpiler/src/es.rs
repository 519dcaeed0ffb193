use bindle_common::{EcmaVersion, ModuleKind, TextPosition};

use crate::{ImportKind, ImportRecord, TranspileError, TranspileOutput, Transpiler, RUNTIME_REQUIRE};

/// The built-in collaborator: a single-pass lexical rewriter that turns
/// import/require occurrences into the normalized `__bindle_require__` form
/// and collects the specifiers it observed. It deliberately stops short of
/// full language semantics; syntax downleveling belongs to an external
/// implementation of the same trait.
#[derive(Debug, Default)]
pub struct EsTranspiler;

impl Transpiler for EsTranspiler {
  fn transpile(
    &self,
    code: &str,
    kind: ModuleKind,
    _target: EcmaVersion,
  ) -> Result<TranspileOutput, TranspileError> {
    if !kind.is_script() {
      return Ok(TranspileOutput {
        code: code.to_string(),
        imports: vec![],
      });
    }
    Rewriter::new(code).rewrite()
  }
}

const KEYWORDS_BEFORE_REGEX: &[&str] = &[
  "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "do", "else", "case",
  "throw", "yield", "await",
];

fn is_ident_start(b: u8) -> bool {
  b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_byte(b: u8) -> bool {
  b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

fn js_str(s: &str) -> String {
  let mut out = String::with_capacity(s.len() + 2);
  out.push('"');
  for c in s.chars() {
    match c {
      '"' => out.push_str("\\\""),
      '\\' => out.push_str("\\\\"),
      '\n' => out.push_str("\\n"),
      '\r' => out.push_str("\\r"),
      '\t' => out.push_str("\\t"),
      c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
      c => out.push(c),
    }
  }
  out.push('"');
  out
}

struct Rewriter<'a> {
  src: &'a str,
  pos: usize,
  out: String,
  imports: Vec<ImportRecord>,
  deferred: Vec<String>,
  /// Whether any export form was rewritten; such modules are marked
  /// `__esModule` so default-import interop picks `.default`.
  has_exports: bool,
  reexport_counter: usize,
  /// Brace depth per open template interpolation.
  interp_stack: Vec<usize>,
  last_sig: Option<char>,
  last_word: String,
}

impl<'a> Rewriter<'a> {
  fn new(src: &'a str) -> Self {
    Self {
      src,
      pos: 0,
      out: String::with_capacity(src.len()),
      imports: vec![],
      deferred: vec![],
      has_exports: false,
      reexport_counter: 0,
      interp_stack: vec![],
      last_sig: None,
      last_word: String::new(),
    }
  }

  fn rewrite(mut self) -> Result<TranspileOutput, TranspileError> {
    while let Some(b) = self.byte(self.pos) {
      match b {
        b'/' => self.slash()?,
        b'\'' | b'"' => self.copy_string()?,
        b'`' => {
          let start = self.pos;
          self.push_char('`');
          self.copy_template(start)?;
        }
        b'{' => {
          if let Some(depth) = self.interp_stack.last_mut() {
            *depth += 1;
          }
          self.push_char('{');
        }
        b'}' => {
          let closes_interpolation = match self.interp_stack.last_mut() {
            Some(depth) if *depth == 0 => true,
            Some(depth) => {
              *depth -= 1;
              false
            }
            None => false,
          };
          self.push_char('}');
          if closes_interpolation {
            self.interp_stack.pop();
            let start = self.pos;
            self.copy_template(start)?;
          }
        }
        b if is_ident_start(b) => self.word()?,
        _ => self.copy_char(),
      }
    }

    if self.has_exports {
      let mut epilogue = String::from("\n\nexports.__esModule = true;");
      for line in &self.deferred {
        epilogue.push('\n');
        epilogue.push_str(line);
      }
      epilogue.push('\n');
      self.out.push_str(&epilogue);
    }

    Ok(TranspileOutput {
      code: self.out,
      imports: self.imports,
    })
  }

  // --- low-level cursor helpers

  fn byte(&self, i: usize) -> Option<u8> {
    self.src.as_bytes().get(i).copied()
  }

  fn cur_char(&self) -> Option<char> {
    self.src[self.pos..].chars().next()
  }

  fn err_at(&self, reason: impl Into<String>, at: usize) -> TranspileError {
    TranspileError {
      reason: reason.into(),
      position: Some(TextPosition::from_offset(self.src, at)),
    }
  }

  fn push_char(&mut self, c: char) {
    self.out.push(c);
    self.pos += c.len_utf8();
    if !c.is_whitespace() {
      self.last_sig = Some(c);
    }
  }

  fn copy_char(&mut self) {
    if let Some(c) = self.cur_char() {
      self.push_char(c);
    }
  }

  fn record(&mut self, specifier: String, kind: ImportKind) {
    if !self
      .imports
      .iter()
      .any(|r| r.specifier == specifier && r.kind == kind)
    {
      self.imports.push(ImportRecord { specifier, kind });
    }
  }

  fn emit_stmt(&mut self, stmt: &str) {
    self.out.push_str(stmt);
    self.last_sig = Some(';');
    self.last_word.clear();
  }

  // --- copying scanners

  fn copy_string(&mut self) -> Result<(), TranspileError> {
    let start = self.pos;
    let quote = self.byte(self.pos).unwrap();
    self.copy_char();
    loop {
      match self.byte(self.pos) {
        None | Some(b'\n') => return Err(self.err_at("unterminated string literal", start)),
        Some(b'\\') => {
          self.copy_char();
          self.copy_char();
        }
        Some(b) if b == quote => {
          self.copy_char();
          return Ok(());
        }
        _ => self.copy_char(),
      }
    }
  }

  fn copy_template(&mut self, start: usize) -> Result<(), TranspileError> {
    loop {
      match self.byte(self.pos) {
        None => return Err(self.err_at("unterminated template literal", start)),
        Some(b'\\') => {
          self.copy_char();
          self.copy_char();
        }
        Some(b'`') => {
          self.copy_char();
          return Ok(());
        }
        Some(b'$') if self.byte(self.pos + 1) == Some(b'{') => {
          self.copy_char();
          self.copy_char();
          self.interp_stack.push(0);
          return Ok(());
        }
        _ => self.copy_char(),
      }
    }
  }

  fn slash(&mut self) -> Result<(), TranspileError> {
    let start = self.pos;
    match self.byte(self.pos + 1) {
      Some(b'/') => {
        while let Some(b) = self.byte(self.pos) {
          if b == b'\n' {
            break;
          }
          self.copy_char();
        }
        Ok(())
      }
      Some(b'*') => {
        self.copy_char();
        self.copy_char();
        loop {
          match self.byte(self.pos) {
            None => return Err(self.err_at("unterminated block comment", start)),
            Some(b'*') if self.byte(self.pos + 1) == Some(b'/') => {
              self.copy_char();
              self.copy_char();
              return Ok(());
            }
            _ => self.copy_char(),
          }
        }
      }
      _ if self.regex_allowed() => self.copy_regex(start),
      _ => {
        self.copy_char();
        Ok(())
      }
    }
  }

  fn regex_allowed(&self) -> bool {
    match self.last_sig {
      None => true,
      Some(c) if "=([{,;:!&|?+-*/%<>^~".contains(c) => true,
      Some(_) => KEYWORDS_BEFORE_REGEX.contains(&self.last_word.as_str()),
    }
  }

  fn copy_regex(&mut self, start: usize) -> Result<(), TranspileError> {
    self.copy_char();
    let mut in_class = false;
    loop {
      match self.byte(self.pos) {
        None | Some(b'\n') => return Err(self.err_at("unterminated regular expression", start)),
        Some(b'\\') => {
          self.copy_char();
          self.copy_char();
        }
        Some(b'[') => {
          in_class = true;
          self.copy_char();
        }
        Some(b']') => {
          in_class = false;
          self.copy_char();
        }
        Some(b'/') if !in_class => {
          self.copy_char();
          while let Some(b) = self.byte(self.pos) {
            if is_ident_byte(b) {
              self.copy_char();
            } else {
              break;
            }
          }
          return Ok(());
        }
        _ => self.copy_char(),
      }
    }
  }

  // --- non-copying (lookahead) scanners

  fn scan_ws(&self, mut i: usize) -> usize {
    let bytes = self.src.as_bytes();
    while i < bytes.len() {
      match bytes[i] {
        b if (b as char).is_ascii_whitespace() => i += 1,
        b'/' if bytes.get(i + 1) == Some(&b'/') => {
          while i < bytes.len() && bytes[i] != b'\n' {
            i += 1;
          }
        }
        b'/' if bytes.get(i + 1) == Some(&b'*') => {
          i += 2;
          while i < bytes.len() {
            if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
              i += 2;
              break;
            }
            i += 1;
          }
        }
        _ => break,
      }
    }
    i
  }

  fn scan_ident(&self, i: usize) -> (String, usize) {
    let bytes = self.src.as_bytes();
    let mut j = i;
    while j < bytes.len() && is_ident_byte(bytes[j]) {
      j += 1;
    }
    (self.src[i..j].to_string(), j)
  }

  fn scan_string(&self, i: usize) -> Option<(String, usize)> {
    let bytes = self.src.as_bytes();
    let quote = *bytes.get(i)?;
    if quote != b'\'' && quote != b'"' {
      return None;
    }
    let mut j = i + 1;
    let mut value = String::new();
    while j < bytes.len() {
      match bytes[j] {
        b'\n' => return None,
        b'\\' => {
          let next = *bytes.get(j + 1)? as char;
          match next {
            'n' => value.push('\n'),
            'r' => value.push('\r'),
            't' => value.push('\t'),
            c => value.push(c),
          }
          j += 2;
        }
        b if b == quote => return Some((value, j + 1)),
        _ => {
          let c = self.src[j..].chars().next()?;
          value.push(c);
          j += c.len_utf8();
        }
      }
    }
    None
  }

  // --- consuming parsers used inside import/export rewrites

  fn skip_ws(&mut self) -> Result<(), TranspileError> {
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
          let start = self.pos;
          self.pos += 2;
          loop {
            match self.byte(self.pos) {
              None => return Err(self.err_at("unterminated block comment", start)),
              Some(b'*') if self.byte(self.pos + 1) == Some(b'/') => {
                self.pos += 2;
                break;
              }
              _ => self.pos += 1,
            }
          }
        }
        _ => return Ok(()),
      }
    }
  }

  fn parse_ident(&mut self) -> Result<String, TranspileError> {
    match self.byte(self.pos) {
      Some(b) if is_ident_start(b) => {
        let (word, end) = self.scan_ident(self.pos);
        self.pos = end;
        Ok(word)
      }
      _ => Err(self.err_at("expected identifier", self.pos)),
    }
  }

  fn parse_string(&mut self) -> Result<String, TranspileError> {
    match self.scan_string(self.pos) {
      Some((value, end)) => {
        self.pos = end;
        Ok(value)
      }
      None => Err(self.err_at("expected string literal", self.pos)),
    }
  }

  fn eat(&mut self, b: u8) -> bool {
    if self.byte(self.pos) == Some(b) {
      self.pos += 1;
      true
    } else {
      false
    }
  }

  fn at_word(&self, word: &str) -> bool {
    let (found, _) = self.scan_ident(self.pos);
    found == word
  }

  fn expect_word(&mut self, word: &str) -> Result<(), TranspileError> {
    let at = self.pos;
    let found = self.parse_ident()?;
    if found == word {
      Ok(())
    } else {
      Err(self.err_at(format!("expected \"{word}\", found \"{found}\""), at))
    }
  }

  fn eat_semi(&mut self) -> Result<(), TranspileError> {
    self.skip_ws()?;
    self.eat(b';');
    Ok(())
  }

  // --- word dispatch

  fn word(&mut self) -> Result<(), TranspileError> {
    let start = self.pos;
    let (word, end) = self.scan_ident(self.pos);
    self.pos = end;

    let member_access = matches!(
      self.last_sig,
      Some(c) if c == '.' || c.is_alphanumeric() || c == '_' || c == '$' || !c.is_ascii()
    );

    if !member_access {
      match word.as_str() {
        "import" => return self.import_occurrence(start),
        "export" => return self.export_statement(start),
        "require" => return self.require_call(start),
        _ => {}
      }
    }

    self.out.push_str(&word);
    self.last_sig = word.chars().last();
    self.last_word = word;
    Ok(())
  }

  fn require_call(&mut self, kw_start: usize) -> Result<(), TranspileError> {
    let i = self.scan_ws(self.pos);
    if self.byte(i) == Some(b'(') {
      let j = self.scan_ws(i + 1);
      if let Some((spec, end)) = self.scan_string(j) {
        let k = self.scan_ws(end);
        if self.byte(k) == Some(b')') {
          self.out.push_str(RUNTIME_REQUIRE);
          self.out.push('(');
          self.out.push_str(&js_str(&spec));
          self.out.push(')');
          self.pos = k + 1;
          self.last_sig = Some(')');
          self.record(spec, ImportKind::Static);
          return Ok(());
        }
      }
    }

    // Not a literal require call; leave it alone.
    let _ = kw_start;
    self.out.push_str("require");
    self.last_sig = Some('e');
    self.last_word = "require".to_string();
    Ok(())
  }

  fn import_occurrence(&mut self, kw_start: usize) -> Result<(), TranspileError> {
    let i = self.scan_ws(self.pos);
    match self.byte(i) {
      Some(b'(') => {
        self.out.push_str(RUNTIME_REQUIRE);
        self.out.push_str(".dynamic(");
        self.pos = i + 1;
        self.last_sig = Some('(');
        let j = self.scan_ws(self.pos);
        if let Some((spec, _)) = self.scan_string(j) {
          self.record(spec, ImportKind::Dynamic);
        }
        Ok(())
      }
      Some(b'.') => {
        // import.meta
        self.out.push_str("import");
        self.last_sig = Some('t');
        self.last_word = "import".to_string();
        Ok(())
      }
      _ => self.import_declaration(kw_start),
    }
  }

  fn import_declaration(&mut self, kw_start: usize) -> Result<(), TranspileError> {
    self.skip_ws()?;
    match self.byte(self.pos) {
      Some(b'\'' | b'"') => {
        let spec = self.parse_string()?;
        self.eat_semi()?;
        self.emit_stmt(&format!("{RUNTIME_REQUIRE}({});", js_str(&spec)));
        self.record(spec, ImportKind::Static);
        Ok(())
      }
      Some(b'*') => {
        self.pos += 1;
        self.skip_ws()?;
        self.expect_word("as")?;
        self.skip_ws()?;
        let ns = self.parse_ident()?;
        self.skip_ws()?;
        self.expect_word("from")?;
        self.skip_ws()?;
        let spec = self.parse_string()?;
        self.eat_semi()?;
        self.emit_stmt(&format!("const {ns} = {RUNTIME_REQUIRE}({});", js_str(&spec)));
        self.record(spec, ImportKind::Static);
        Ok(())
      }
      Some(b'{') => {
        let bindings = self.parse_named_imports()?;
        self.skip_ws()?;
        self.expect_word("from")?;
        self.skip_ws()?;
        let spec = self.parse_string()?;
        self.eat_semi()?;
        if bindings.is_empty() {
          self.emit_stmt(&format!("{RUNTIME_REQUIRE}({});", js_str(&spec)));
        } else {
          self.emit_stmt(&format!(
            "const {{ {} }} = {RUNTIME_REQUIRE}({});",
            bindings.join(", "),
            js_str(&spec)
          ));
        }
        self.record(spec, ImportKind::Static);
        Ok(())
      }
      Some(b) if is_ident_start(b) => {
        let first = self.parse_ident()?;
        if first == "type" {
          let i = self.scan_ws(self.pos);
          let (next, _) = self.scan_ident(i);
          let type_only = match self.byte(i) {
            Some(b'{') => true,
            Some(b) if is_ident_start(b) => next != "from",
            _ => false,
          };
          if type_only {
            self.skip_statement(false)?;
            return Ok(());
          }
        }

        self.skip_ws()?;
        let mut named: Option<Vec<String>> = None;
        let mut ns: Option<String> = None;
        if self.eat(b',') {
          self.skip_ws()?;
          match self.byte(self.pos) {
            Some(b'{') => named = Some(self.parse_named_imports()?),
            Some(b'*') => {
              self.pos += 1;
              self.skip_ws()?;
              self.expect_word("as")?;
              self.skip_ws()?;
              ns = Some(self.parse_ident()?);
            }
            _ => return Err(self.err_at("unexpected token in import declaration", self.pos)),
          }
          self.skip_ws()?;
        }
        self.expect_word("from")?;
        self.skip_ws()?;
        let spec = self.parse_string()?;
        self.eat_semi()?;

        let req = format!("{RUNTIME_REQUIRE}({})", js_str(&spec));
        let mut stmt = format!("const {first} = {RUNTIME_REQUIRE}.interop({req});");
        if let Some(named) = named {
          if !named.is_empty() {
            stmt.push_str(&format!("\nconst {{ {} }} = {req};", named.join(", ")));
          }
        }
        if let Some(ns) = ns {
          stmt.push_str(&format!("\nconst {ns} = {req};"));
        }
        self.emit_stmt(&stmt);
        self.record(spec, ImportKind::Static);
        let _ = kw_start;
        Ok(())
      }
      _ => Err(self.err_at("unexpected token in import declaration", self.pos)),
    }
  }

  /// Parses `{ a, b as c, type T }`, returning destructuring bindings
  /// (`a`, `b: c`); type-only specifiers are dropped.
  fn parse_named_imports(&mut self) -> Result<Vec<String>, TranspileError> {
    debug_assert_eq!(self.byte(self.pos), Some(b'{'));
    self.pos += 1;
    let mut bindings = vec![];
    loop {
      self.skip_ws()?;
      if self.eat(b'}') {
        return Ok(bindings);
      }
      let mut name = self.parse_ident()?;
      if name == "type" {
        let i = self.scan_ws(self.pos);
        if matches!(self.byte(i), Some(b) if is_ident_start(b)) {
          // type-only specifier; parse and drop
          self.skip_ws()?;
          self.parse_ident()?;
          self.skip_ws()?;
          if self.at_word("as") {
            self.expect_word("as")?;
            self.skip_ws()?;
            self.parse_ident()?;
          }
          self.skip_ws()?;
          self.eat(b',');
          continue;
        }
      }
      self.skip_ws()?;
      if self.at_word("as") {
        self.expect_word("as")?;
        self.skip_ws()?;
        let alias = self.parse_ident()?;
        name = format!("{name}: {alias}");
      }
      bindings.push(name);
      self.skip_ws()?;
      if !self.eat(b',') {
        self.skip_ws()?;
        if self.eat(b'}') {
          return Ok(bindings);
        }
        return Err(self.err_at("expected \",\" or \"}\" in import specifiers", self.pos));
      }
    }
  }

  fn export_statement(&mut self, kw_start: usize) -> Result<(), TranspileError> {
    self.has_exports = true;
    self.skip_ws()?;
    match self.byte(self.pos) {
      Some(b'{') => {
        let list = self.parse_export_list()?;
        self.skip_ws()?;
        if self.at_word("from") {
          self.expect_word("from")?;
          self.skip_ws()?;
          let spec = self.parse_string()?;
          self.eat_semi()?;
          let tmp = format!("__bindle_reexport_{}__", self.reexport_counter);
          self.reexport_counter += 1;
          self.emit_stmt(&format!("const {tmp} = {RUNTIME_REQUIRE}({});", js_str(&spec)));
          for (local, exported) in list {
            self.deferred.push(format!("exports.{exported} = {tmp}.{local};"));
          }
          self.record(spec, ImportKind::Static);
        } else {
          self.eat_semi()?;
          for (local, exported) in list {
            self.deferred.push(format!("exports.{exported} = {local};"));
          }
        }
        Ok(())
      }
      Some(b'*') => {
        self.pos += 1;
        self.skip_ws()?;
        if self.at_word("as") {
          self.expect_word("as")?;
          self.skip_ws()?;
          let ns = self.parse_ident()?;
          self.skip_ws()?;
          self.expect_word("from")?;
          self.skip_ws()?;
          let spec = self.parse_string()?;
          self.eat_semi()?;
          self.emit_stmt(&format!("exports.{ns} = {RUNTIME_REQUIRE}({});", js_str(&spec)));
          self.record(spec, ImportKind::Static);
        } else {
          self.expect_word("from")?;
          self.skip_ws()?;
          let spec = self.parse_string()?;
          self.eat_semi()?;
          self.emit_stmt(&format!(
            "Object.assign(exports, {RUNTIME_REQUIRE}({}));",
            js_str(&spec)
          ));
          self.record(spec, ImportKind::Static);
        }
        Ok(())
      }
      Some(b) if is_ident_start(b) => {
        let word_start = self.pos;
        let word = self.parse_ident()?;
        match word.as_str() {
          "default" => self.export_default(),
          "const" | "let" | "var" => {
            self.out.push_str(&word);
            let names = self.scan_declared_names(self.pos);
            for name in names {
              self.deferred.push(format!("exports.{name} = {name};"));
            }
            self.last_sig = word.chars().last();
            self.last_word = word;
            Ok(())
          }
          "function" | "class" => {
            self.out.push_str(&word);
            if let Some(name) = self.scan_declaration_name(self.pos) {
              self.deferred.push(format!("exports.{name} = {name};"));
            }
            self.last_sig = word.chars().last();
            self.last_word = word;
            Ok(())
          }
          "async" => {
            self.out.push_str("async ");
            self.skip_ws()?;
            self.expect_word("function")?;
            self.out.push_str("function");
            if let Some(name) = self.scan_declaration_name(self.pos) {
              self.deferred.push(format!("exports.{name} = {name};"));
            }
            self.last_sig = Some('n');
            self.last_word = "function".to_string();
            Ok(())
          }
          "type" | "interface" | "declare" => {
            // TypeScript type-level exports carry no runtime code.
            self.skip_statement(word != "type")?;
            Ok(())
          }
          _ => Err(self.err_at(format!("unsupported export form \"{word}\""), word_start)),
        }
      }
      _ => Err(self.err_at("unexpected token in export statement", kw_start)),
    }
  }

  fn export_default(&mut self) -> Result<(), TranspileError> {
    self.skip_ws()?;
    let i = self.pos;
    let (word, after) = self.scan_ident(i);
    let decl_kind = match word.as_str() {
      "function" | "class" => Some(after),
      "async" => {
        let j = self.scan_ws(after);
        let (next, k) = self.scan_ident(j);
        (next == "function").then_some(k)
      }
      _ => None,
    };

    if let Some(after_kw) = decl_kind {
      if let Some(name) = self.scan_declaration_name(after_kw) {
        // Keep the declaration itself so the binding stays live, then
        // export the binding at module end.
        self.deferred.push(format!("exports.default = {name};"));
        return Ok(());
      }
    }

    self.out.push_str("exports.default = ");
    self.last_sig = Some('=');
    self.last_word.clear();
    Ok(())
  }

  /// Name of a function/class declaration starting right after its keyword,
  /// or `None` when anonymous.
  fn scan_declaration_name(&self, i: usize) -> Option<String> {
    let mut j = self.scan_ws(i);
    if self.byte(j) == Some(b'*') {
      j = self.scan_ws(j + 1);
    }
    match self.byte(j) {
      Some(b) if is_ident_start(b) => {
        let (name, _) = self.scan_ident(j);
        if name == "extends" {
          None
        } else {
          Some(name)
        }
      }
      _ => None,
    }
  }

  fn parse_export_list(&mut self) -> Result<Vec<(String, String)>, TranspileError> {
    debug_assert_eq!(self.byte(self.pos), Some(b'{'));
    self.pos += 1;
    let mut list = vec![];
    loop {
      self.skip_ws()?;
      if self.eat(b'}') {
        return Ok(list);
      }
      let local = self.parse_ident()?;
      if local == "type" {
        let i = self.scan_ws(self.pos);
        if matches!(self.byte(i), Some(b) if is_ident_start(b)) {
          self.skip_ws()?;
          self.parse_ident()?;
          self.skip_ws()?;
          if self.at_word("as") {
            self.expect_word("as")?;
            self.skip_ws()?;
            self.parse_ident()?;
          }
          self.skip_ws()?;
          self.eat(b',');
          continue;
        }
      }
      self.skip_ws()?;
      let exported = if self.at_word("as") {
        self.expect_word("as")?;
        self.skip_ws()?;
        self.parse_ident()?
      } else {
        local.clone()
      };
      list.push((local, exported));
      self.skip_ws()?;
      if !self.eat(b',') {
        self.skip_ws()?;
        if self.eat(b'}') {
          return Ok(list);
        }
        return Err(self.err_at("expected \",\" or \"}\" in export specifiers", self.pos));
      }
    }
  }

  /// Declarator names of a `const`/`let`/`var` declaration, by lookahead.
  fn scan_declared_names(&self, start: usize) -> Vec<String> {
    let mut names = vec![];
    let mut i = start;
    loop {
      i = self.scan_ws(i);
      match self.byte(i) {
        Some(b'{') | Some(b'[') => i = self.scan_pattern(i, &mut names),
        Some(b) if is_ident_start(b) => {
          let (name, j) = self.scan_ident(i);
          names.push(name);
          i = j;
        }
        _ => break,
      }
      i = self.scan_ws(i);
      if self.byte(i) == Some(b'=') {
        i = self.scan_expression(i + 1, &[b',', b';']);
      }
      i = self.scan_ws(i);
      if self.byte(i) == Some(b',') {
        i += 1;
        continue;
      }
      break;
    }
    names
  }

  /// Collects binding identifiers of a destructuring pattern; returns the
  /// index past the closing brace/bracket.
  fn scan_pattern(&self, open: usize, names: &mut Vec<String>) -> usize {
    let close = match self.byte(open) {
      Some(b'{') => b'}',
      _ => b']',
    };
    let mut i = open + 1;
    loop {
      i = self.scan_ws(i);
      match self.byte(i) {
        None => return i,
        Some(b) if b == close => return i + 1,
        Some(b'{') | Some(b'[') => i = self.scan_pattern(i, names),
        Some(b',') => i += 1,
        Some(b'.') => i += 1,
        Some(b) if is_ident_start(b) => {
          let (name, j) = self.scan_ident(i);
          let k = self.scan_ws(j);
          if self.byte(k) == Some(b':') {
            // property key; the binding comes from the value side
            i = k + 1;
          } else {
            names.push(name);
            i = j;
          }
        }
        Some(b'=') => i = self.scan_expression(i + 1, &[b',', close]),
        _ => i += 1,
      }
    }
  }

  /// Skips an expression by lookahead until one of `stops` occurs at depth 0.
  fn scan_expression(&self, start: usize, stops: &[u8]) -> usize {
    let bytes = self.src.as_bytes();
    let mut i = start;
    let mut depth = 0usize;
    while i < bytes.len() {
      let b = bytes[i];
      match b {
        b'(' | b'[' | b'{' => {
          depth += 1;
          i += 1;
        }
        b')' | b']' | b'}' => {
          if depth == 0 {
            return i;
          }
          depth -= 1;
          i += 1;
        }
        b'\'' | b'"' => {
          i = self.scan_string(i).map(|(_, end)| end).unwrap_or(i + 1);
        }
        b'`' => {
          // coarse: skip to the closing backtick
          i += 1;
          while i < bytes.len() {
            if bytes[i] == b'\\' {
              i += 2;
            } else if bytes[i] == b'`' {
              i += 1;
              break;
            } else {
              i += 1;
            }
          }
        }
        b'/' if bytes.get(i + 1) == Some(&b'/') || bytes.get(i + 1) == Some(&b'*') => {
          i = self.scan_ws(i);
        }
        b'\n' if depth == 0 => {
          let next = self.scan_ws(i);
          match bytes.get(next) {
            Some(c) if "|&.+-*/?:=,([".contains(*c as char) => i = next,
            _ => return i,
          }
        }
        _ if depth == 0 && stops.contains(&b) => return i,
        _ => i += 1,
      }
    }
    i
  }

  /// Consumes a statement without emitting it (type-only TS constructs).
  /// With `ends_on_top_block`, the first balanced top-level `{ .. }` block
  /// terminates the statement (interface bodies).
  fn skip_statement(&mut self, ends_on_top_block: bool) -> Result<(), TranspileError> {
    let mut depth = 0usize;
    let mut saw_top_block = false;
    loop {
      match self.byte(self.pos) {
        None => return Ok(()),
        Some(b';') if depth == 0 => {
          self.pos += 1;
          return Ok(());
        }
        Some(b'{') | Some(b'(') | Some(b'[') => {
          if depth == 0 && self.byte(self.pos) == Some(b'{') {
            saw_top_block = true;
          }
          depth += 1;
          self.pos += 1;
        }
        Some(b'}') | Some(b')') | Some(b']') => {
          depth = depth.saturating_sub(1);
          self.pos += 1;
          if depth == 0 && saw_top_block && ends_on_top_block {
            return Ok(());
          }
        }
        Some(b'\'' | b'"') => {
          let end = self
            .scan_string(self.pos)
            .map(|(_, end)| end)
            .unwrap_or(self.pos + 1);
          self.pos = end;
        }
        Some(b'\n') if depth == 0 => {
          let next = self.scan_ws(self.pos);
          match self.byte(next) {
            Some(c) if "|&.=,<>".contains(c as char) => self.pos = next,
            Some(b) if is_ident_start(b) => {
              let (word, _) = self.scan_ident(next);
              if word == "extends" || word == "implements" {
                self.pos = next;
              } else {
                return Ok(());
              }
            }
            _ => return Ok(()),
          }
        }
        Some(b'/') => {
          let next = self.scan_ws(self.pos);
          if next == self.pos {
            self.pos += 1;
          } else {
            self.pos = next;
          }
        }
        _ => {
          if let Some(c) = self.cur_char() {
            self.pos += c.len_utf8();
          }
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn run(code: &str) -> TranspileOutput {
    EsTranspiler
      .transpile(code, ModuleKind::Script, EcmaVersion::default())
      .unwrap()
  }

  fn specifiers(output: &TranspileOutput) -> Vec<(&str, ImportKind)> {
    output
      .imports
      .iter()
      .map(|r| (r.specifier.as_str(), r.kind))
      .collect()
  }

  #[test]
  fn rewrites_default_import() {
    let out = run(r#"import foo from "./foo";"#);
    assert_eq!(
      out.code,
      "const foo = __bindle_require__.interop(__bindle_require__(\"./foo\"));"
    );
    assert_eq!(specifiers(&out), vec![("./foo", ImportKind::Static)]);
  }

  #[test]
  fn rewrites_named_and_namespace_imports() {
    let out = run("import { a, b as c } from './x';\nimport * as ns from './y';");
    assert!(out.code.contains("const { a, b: c } = __bindle_require__(\"./x\");"));
    assert!(out.code.contains("const ns = __bindle_require__(\"./y\");"));
    assert_eq!(
      specifiers(&out),
      vec![("./x", ImportKind::Static), ("./y", ImportKind::Static)]
    );
  }

  #[test]
  fn rewrites_bare_and_combined_imports() {
    let out = run("import './side-effect';\nimport d, { n } from './m';");
    assert!(out.code.contains("__bindle_require__(\"./side-effect\");"));
    assert!(out
      .code
      .contains("const d = __bindle_require__.interop(__bindle_require__(\"./m\"));"));
    assert!(out.code.contains("const { n } = __bindle_require__(\"./m\");"));
  }

  #[test]
  fn rewrites_dynamic_import_and_records_async_edge() {
    let out = run("const p = import('./lazy');");
    assert_eq!(out.code, "const p = __bindle_require__.dynamic('./lazy');");
    assert_eq!(specifiers(&out), vec![("./lazy", ImportKind::Dynamic)]);
  }

  #[test]
  fn rewrites_require_calls() {
    let out = run("const fs = require('./io');");
    assert_eq!(out.code, "const fs = __bindle_require__(\"./io\");");
    assert_eq!(specifiers(&out), vec![("./io", ImportKind::Static)]);
  }

  #[test]
  fn leaves_non_literal_require_untouched() {
    let out = run("const x = require(pathVariable);");
    assert_eq!(out.code, "const x = require(pathVariable);");
    assert!(out.imports.is_empty());
  }

  #[test]
  fn ignores_imports_inside_strings_and_comments() {
    let out = run("const s = \"import x from 'y'\";\n// import fake from 'z'\n/* require('w') */");
    assert!(out.imports.is_empty());
    assert_eq!(
      out.code,
      "const s = \"import x from 'y'\";\n// import fake from 'z'\n/* require('w') */"
    );
  }

  #[test]
  fn rewrites_inside_template_interpolation_only() {
    let out = run("const t = `require('a') ${require('b')}`;");
    assert!(out.code.contains("`require('a') ${__bindle_require__(\"b\")}`"));
    assert_eq!(specifiers(&out), vec![("b", ImportKind::Static)]);
  }

  #[test]
  fn member_access_import_is_not_a_keyword() {
    let out = run("foo.import('x');");
    assert_eq!(out.code, "foo.import('x');");
    assert!(out.imports.is_empty());
  }

  #[test]
  fn export_default_expression() {
    let out = run("export default 1 + 2;");
    assert!(out.code.starts_with("exports.default = 1 + 2;"));
    assert!(out.code.contains("exports.__esModule = true;"));
  }

  #[test]
  fn export_default_named_function_keeps_binding() {
    let out = run("export default function main() {}\nmain();");
    assert!(out.code.contains("function main() {}"));
    assert!(out.code.contains("exports.default = main;"));
  }

  #[test]
  fn export_const_and_function_declarations() {
    let out = run("export const answer = 42;\nexport function helper() {}");
    assert!(out.code.contains("const answer = 42;"));
    assert!(out.code.contains("exports.answer = answer;"));
    assert!(out.code.contains("function helper() {}"));
    assert!(out.code.contains("exports.helper = helper;"));
  }

  #[test]
  fn export_named_list_and_reexport() {
    let out = run("const a = 1, b = 2;\nexport { a, b as c };\nexport { d } from './d';");
    assert!(out.code.contains("exports.a = a;"));
    assert!(out.code.contains("exports.c = b;"));
    assert!(out.code.contains("const __bindle_reexport_0__ = __bindle_require__(\"./d\");"));
    assert!(out.code.contains("exports.d = __bindle_reexport_0__.d;"));
    assert_eq!(specifiers(&out), vec![("./d", ImportKind::Static)]);
  }

  #[test]
  fn export_star_from() {
    let out = run("export * from './all';");
    assert!(out
      .code
      .starts_with("Object.assign(exports, __bindle_require__(\"./all\"));"));
  }

  #[test]
  fn type_only_imports_are_dropped() {
    let out = run("import type { Props } from './types';\nconst x = 1;");
    assert!(!out.code.contains("types"));
    assert!(out.code.contains("const x = 1;"));
    assert!(out.imports.is_empty());
  }

  #[test]
  fn unterminated_string_reports_position() {
    let err = EsTranspiler
      .transpile("const a = 1;\nconst b = 'oops", ModuleKind::Script, EcmaVersion::default())
      .unwrap_err();
    let position = err.position.unwrap();
    assert_eq!(position.line, 2);
  }

  #[test]
  fn deterministic_for_identical_input() {
    let src = "import a from './a';\nexport const b = a;\nexport default b;";
    assert_eq!(run(src).code, run(src).code);
  }

  #[test]
  fn duplicate_specifiers_recorded_once() {
    let out = run("import a from './a';\nimport { b } from './a';");
    assert_eq!(specifiers(&out), vec![("./a", ImportKind::Static)]);
  }

  #[test]
  fn stylesheet_kind_passes_through() {
    let out = EsTranspiler
      .transpile(".a { color: red }", ModuleKind::Stylesheet, EcmaVersion::default())
      .unwrap();
    assert_eq!(out.code, ".a { color: red }");
    assert!(out.imports.is_empty());
  }
}
