use serde::Serialize;

const BASE64_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

#[derive(Serialize)]
struct SourceMapJson<'a> {
  version: u8,
  file: &'a str,
  sources: &'a [String],
  #[serde(rename = "sourcesContent")]
  sources_content: &'a [String],
  names: [&'a str; 0],
  mappings: String,
}

/// Builds a line-granular source map: each mapped output line points at
/// column zero of one line of one source.
#[derive(Debug, Default)]
pub(crate) struct SourceMapBuilder {
  sources: Vec<String>,
  contents: Vec<String>,
  /// (generated line, source index, source line), in generated order.
  mappings: Vec<(usize, usize, usize)>,
}

impl SourceMapBuilder {
  pub fn add_source(&mut self, name: String, content: String) -> usize {
    self.sources.push(name);
    self.contents.push(content);
    self.sources.len() - 1
  }

  pub fn add_line_mapping(&mut self, generated_line: usize, source: usize, source_line: usize) {
    debug_assert!(
      self
        .mappings
        .last()
        .map_or(true, |(line, _, _)| *line <= generated_line)
    );
    self.mappings.push((generated_line, source, source_line));
  }

  pub fn build(&self, file: &str) -> String {
    let mut mappings = String::new();
    let mut prev_source = 0i64;
    let mut prev_line = 0i64;
    let mut generated = 0usize;
    for (gen_line, source, source_line) in &self.mappings {
      while generated < *gen_line {
        mappings.push(';');
        generated += 1;
      }
      // [generated column, source index delta, source line delta, column]
      encode_vlq(0, &mut mappings);
      encode_vlq(*source as i64 - prev_source, &mut mappings);
      encode_vlq(*source_line as i64 - prev_line, &mut mappings);
      encode_vlq(0, &mut mappings);
      prev_source = *source as i64;
      prev_line = *source_line as i64;
    }

    serde_json::to_string(&SourceMapJson {
      version: 3,
      file,
      sources: &self.sources,
      sources_content: &self.contents,
      names: [],
      mappings,
    })
    .expect("source maps always serialize")
  }
}

fn encode_vlq(value: i64, out: &mut String) {
  let mut vlq = if value < 0 {
    (((-value) as u64) << 1) | 1
  } else {
    (value as u64) << 1
  };
  loop {
    let mut digit = (vlq & 0b11111) as usize;
    vlq >>= 5;
    if vlq > 0 {
      digit |= 0b100000;
    }
    out.push(BASE64_CHARS[digit] as char);
    if vlq == 0 {
      break;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn vlq_encoding_matches_known_values() {
    let mut out = String::new();
    encode_vlq(0, &mut out);
    assert_eq!(out, "A");
    out.clear();
    encode_vlq(1, &mut out);
    assert_eq!(out, "C");
    out.clear();
    encode_vlq(-1, &mut out);
    assert_eq!(out, "D");
    out.clear();
    encode_vlq(16, &mut out);
    assert_eq!(out, "gB");
  }

  #[test]
  fn builds_line_mappings() {
    let mut builder = SourceMapBuilder::default();
    let src = builder.add_source("a.js".to_string(), "line0\nline1".to_string());
    builder.add_line_mapping(2, src, 0);
    builder.add_line_mapping(3, src, 1);
    let json = builder.build("out.js");
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["version"], 3);
    assert_eq!(parsed["sources"][0], "a.js");
    assert_eq!(parsed["mappings"], ";;AAAA;AACA");
  }
}
