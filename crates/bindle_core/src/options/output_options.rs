use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMapOption {
  Inline,
  Separate,
  Omitted,
}

impl Default for SourceMapOption {
  fn default() -> Self {
    SourceMapOption::Omitted
  }
}

impl FromStr for SourceMapOption {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value {
      "inline" => Ok(SourceMapOption::Inline),
      "separate" | "file" => Ok(SourceMapOption::Separate),
      "omitted" | "none" => Ok(SourceMapOption::Omitted),
      _ => Err(format!("Invalid source map option: {value}")),
    }
  }
}

#[derive(Debug, Clone)]
pub struct HmrOptions {
  pub enabled: bool,
  pub host: String,
  pub port: u16,
}

impl Default for HmrOptions {
  fn default() -> Self {
    Self {
      enabled: false,
      host: "127.0.0.1".to_string(),
      port: 3000,
    }
  }
}

pub mod file_name {
  #[derive(Debug, Clone)]
  pub struct FileNameTemplate {
    template: String,
  }

  impl FileNameTemplate {
    pub fn new(template: String) -> Self {
      Self { template }
    }
  }

  impl From<String> for FileNameTemplate {
    fn from(template: String) -> Self {
      Self { template }
    }
  }

  #[derive(Debug, Default)]
  pub struct RenderOptions<'me> {
    pub name: Option<&'me str>,
    pub hash: Option<&'me str>,
  }

  impl FileNameTemplate {
    pub fn render(&self, options: RenderOptions) -> String {
      let mut tmp = self.template.clone();
      if let Some(name) = options.name {
        tmp = tmp.replace("[name]", name);
      }
      match options.hash {
        Some(hash) => tmp = tmp.replace("[hash]", hash),
        None => {
          // Without a hash the placeholder vanishes along with a joining
          // `-` or `.` so `[name]-[hash].js` degrades to `[name].js`.
          tmp = tmp
            .replace("-[hash]", "")
            .replace(".[hash]", "")
            .replace("[hash]", "");
        }
      }
      tmp
    }
  }
}

pub use file_name::FileNameTemplate;

#[derive(Debug, Clone)]
pub struct BuildOutputOptions {
  pub dir: PathBuf,
  pub entry_file_names: FileNameTemplate,
  pub chunk_file_names: FileNameTemplate,
  pub source_map: SourceMapOption,
  pub manifest: bool,
  /// Manifest location relative to `dir`.
  pub manifest_path: String,
  /// Paths copied verbatim into `dir`, preserving relative structure.
  pub copy: Vec<PathBuf>,
  pub hmr: HmrOptions,
  pub stats: bool,
}

impl Default for BuildOutputOptions {
  fn default() -> Self {
    Self {
      dir: PathBuf::from("dist"),
      entry_file_names: FileNameTemplate::from("[name]-[hash].js".to_string()),
      chunk_file_names: FileNameTemplate::from("[name]-[hash].js".to_string()),
      source_map: SourceMapOption::default(),
      manifest: true,
      manifest_path: "manifest.json".to_string(),
      copy: Default::default(),
      hmr: HmrOptions::default(),
      stats: false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::file_name::*;

  #[test]
  fn hash_placeholder_degrades_without_hash() {
    let template = FileNameTemplate::from("[name]-[hash].js".to_string());
    assert_eq!(
      template.render(RenderOptions {
        name: Some("main"),
        hash: None
      }),
      "main.js"
    );
    assert_eq!(
      template.render(RenderOptions {
        name: Some("main"),
        hash: Some("abc12345")
      }),
      "main-abc12345.js"
    );
  }
}
