use std::path::Component;

use sugar_path::SugarPath;

pub fn uri_to_chunk_name(root: &str, uri: &str) -> String {
  let path = std::path::Path::new(uri);
  let mut relatived = path.relative(root);
  relatived.set_extension("");
  itertools::Itertools::intersperse(
    relatived
      .components()
      .filter(|com| matches!(com, Component::Normal(_)))
      .filter_map(|seg| seg.as_os_str().to_str()),
    "_",
  )
  .fold(String::new(), |mut acc, seg| {
    acc.push_str(seg);
    acc
  })
}

/// Short content hash used for cache-busting file names.
pub fn short_hash(bytes: &[u8]) -> String {
  blake3::hash(bytes).to_hex()[..8].to_string()
}

pub(crate) fn js_string(value: &str) -> String {
  serde_json::to_string(value).expect("strings always serialize")
}

/// Rewrites every normalized `__bindle_require__("spec")` /
/// `__bindle_require__.dynamic("spec")` occurrence. The callback returns the
/// replacement module id for a specifier, or `None` to leave it untouched.
pub(crate) fn rewrite_specifiers(
  code: &str,
  replace: &dyn Fn(&str, bool) -> Option<String>,
) -> String {
  const NEEDLE: &str = bindle_transpiler::RUNTIME_REQUIRE;
  let mut out = String::with_capacity(code.len());
  let mut rest = code;
  while let Some(found) = rest.find(NEEDLE) {
    let after_needle = found + NEEDLE.len();
    out.push_str(&rest[..after_needle]);
    let mut cursor = &rest[after_needle..];

    let is_dynamic = cursor.starts_with(".dynamic");
    if is_dynamic {
      out.push_str(".dynamic");
      cursor = &cursor[".dynamic".len()..];
    }

    match split_call_head(cursor) {
      Some((head, spec, tail)) => {
        match replace(&spec, is_dynamic) {
          Some(id) => {
            out.push('(');
            out.push_str(&js_string(&id));
          }
          None => {
            out.push_str(head);
          }
        }
        rest = tail;
      }
      None => rest = cursor,
    }
  }
  out.push_str(rest);
  out
}

/// Splits `("spec"` off the front of `cursor`, returning the raw head text,
/// the decoded specifier, and the remaining tail (starting at the closing
/// parenthesis or whatever follows the literal).
fn split_call_head(cursor: &str) -> Option<(&str, String, &str)> {
  let bytes = cursor.as_bytes();
  if bytes.first() != Some(&b'(') {
    return None;
  }
  let mut i = 1;
  while i < bytes.len() && (bytes[i] as char).is_ascii_whitespace() {
    i += 1;
  }
  let quote = *bytes.get(i)?;
  if quote != b'"' && quote != b'\'' {
    return None;
  }
  let mut spec = String::new();
  let mut j = i + 1;
  loop {
    match bytes.get(j)? {
      b'\\' => {
        let next = *bytes.get(j + 1)? as char;
        match next {
          'n' => spec.push('\n'),
          'r' => spec.push('\r'),
          't' => spec.push('\t'),
          c => spec.push(c),
        }
        j += 2;
      }
      &b if b == quote => {
        j += 1;
        break;
      }
      _ => {
        let c = cursor[j..].chars().next()?;
        spec.push(c);
        j += c.len_utf8();
      }
    }
  }
  Some((&cursor[..j], spec, &cursor[j..]))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn chunk_name_from_uri() {
    assert_eq!(uri_to_chunk_name("/proj", "/proj/src/pages/home.js"), "src_pages_home");
  }

  #[test]
  fn rewrites_static_and_dynamic_occurrences() {
    let code = r#"const a = __bindle_require__("./a");
const b = __bindle_require__.dynamic('./b');"#;
    let out = rewrite_specifiers(code, &|spec, is_dynamic| {
      Some(format!("/abs/{}/{}", if is_dynamic { "dyn" } else { "sync" }, spec))
    });
    assert!(out.contains(r#"__bindle_require__("/abs/sync/./a")"#));
    assert!(out.contains(r#"__bindle_require__.dynamic("/abs/dyn/./b")"#));
  }

  #[test]
  fn unmatched_specifier_is_left_alone() {
    let code = r#"__bindle_require__("./gone")"#;
    let out = rewrite_specifiers(code, &|_, _| None);
    assert_eq!(out, code);
  }
}
