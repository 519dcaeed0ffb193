use base64::Engine;
use bindle_common::ChunkId;
use rustc_hash::FxHashMap;
use serde_json::json;

mod manifest;
pub use manifest::Manifest;
pub(crate) use manifest::write_manifest_atomic;
mod runtime;
pub(crate) use runtime::render_runtime;
mod source_map;
pub(crate) use source_map::SourceMapBuilder;

use crate::{
  BuildInputOptions, BuildOutputOptions, Chunk, ChunkGraph, ChunkKind, Graph, SourceMapOption,
};

pub(crate) struct RenderContext<'a> {
  pub graph: &'a Graph,
  pub input_options: &'a BuildInputOptions,
  pub output_options: &'a BuildOutputOptions,
  pub chunk_graph: &'a ChunkGraph,
  pub chunk_filename_by_id: &'a FxHashMap<ChunkId, String>,
}

pub(crate) struct RenderedChunk {
  pub code: String,
  /// Separate-file source map content, when that policy is configured.
  pub source_map: Option<String>,
}

impl Chunk {
  pub(crate) fn render(&self, ctx: &RenderContext) -> RenderedChunk {
    let filename = self.filename.clone().unwrap_or_default();
    let mut writer = ChunkWriter::default();

    if self.kind == ChunkKind::Entry {
      writer.push_raw(&render_runtime(
        &ctx.input_options.public_path,
        &chunk_map_json(ctx),
      ));
    }

    let opener = if self.kind == ChunkKind::Entry {
      "__bindle_require__.register({"
    } else {
      "__bindle_register__({"
    };
    writer.push_raw(opener);

    let ordered = self.ordered_modules(&ctx.graph.module_by_id);
    let count = ordered.len() + self.externals.len();
    let mut emitted = 0usize;
    for module in ordered {
      let factory = module.render_factory();
      emitted += 1;
      let trailing_comma = emitted < count;
      match module.as_norm() {
        Some(normal) => writer.push_module_factory(normal, &factory, trailing_comma),
        None => writer.push_raw(&with_comma(&factory, trailing_comma)),
      }
    }
    for external_id in &self.externals {
      if let Some(module) = ctx.graph.module_by_id.get(external_id) {
        emitted += 1;
        writer.push_raw(&with_comma(&module.render_factory(), emitted < count));
      }
    }

    writer.push_raw("});");

    if self.kind == ChunkKind::Entry {
      if let Some(entry) = &self.entry {
        writer.push_raw(&format!(
          "__bindle_require__({});",
          crate::utils::js_string(entry.as_ref())
        ));
      }
    }

    let ChunkWriter { mut code, map, .. } = writer;
    let mut source_map = None;
    match ctx.output_options.source_map {
      SourceMapOption::Omitted => {}
      SourceMapOption::Inline => {
        let encoded =
          base64::engine::general_purpose::STANDARD.encode(map.build(&filename).as_bytes());
        code.push_str(&format!(
          "\n//# sourceMappingURL=data:application/json;charset=utf-8;base64,{encoded}"
        ));
      }
      SourceMapOption::Separate => {
        source_map = Some(map.build(&filename));
        code.push_str(&format!("\n//# sourceMappingURL={filename}.map"));
      }
    }

    RenderedChunk { code, source_map }
  }
}

fn with_comma(factory: &str, trailing_comma: bool) -> String {
  if trailing_comma {
    format!("{factory},")
  } else {
    factory.to_string()
  }
}

/// The runtime's load table: every split-point module id maps to its chunk
/// file plus the transitive closure of chunk files that must load first.
fn chunk_map_json(ctx: &RenderContext) -> String {
  let mut map = serde_json::Map::new();
  for chunk in ctx.chunk_graph.chunks() {
    let Some(root) = &chunk.entry else { continue };
    if chunk.kind == ChunkKind::Entry {
      continue;
    }
    let Some(file) = ctx.chunk_filename_by_id.get(&chunk.id) else {
      continue;
    };
    let deps = chunk_dependency_files(ctx, &chunk.id);
    map.insert(
      root.as_ref().to_string(),
      json!({ "file": file, "deps": deps }),
    );
  }
  serde_json::Value::Object(map).to_string()
}

fn chunk_dependency_files(ctx: &RenderContext, chunk_id: &ChunkId) -> Vec<String> {
  let mut files = vec![];
  let mut visited = vec![chunk_id.clone()];
  let mut stack = ctx
    .chunk_graph
    .chunk(chunk_id)
    .map(|c| c.depends_on.iter().cloned().collect::<Vec<_>>())
    .unwrap_or_default();
  while let Some(dep) = stack.pop() {
    if visited.contains(&dep) {
      continue;
    }
    visited.push(dep.clone());
    let Some(chunk) = ctx.chunk_graph.chunk(&dep) else {
      continue;
    };
    // Entry chunks are assumed present; they carry the runtime itself.
    if chunk.kind != ChunkKind::Entry {
      if let Some(file) = ctx.chunk_filename_by_id.get(&dep) {
        files.push(file.clone());
      }
    }
    stack.extend(chunk.depends_on.iter().cloned());
  }
  files.reverse();
  files
}

#[derive(Default)]
struct ChunkWriter {
  code: String,
  line: usize,
  map: SourceMapBuilder,
}

impl ChunkWriter {
  fn push_raw(&mut self, text: &str) {
    self.code.push_str(text);
    self.line += text.matches('\n').count();
    if !text.ends_with('\n') {
      self.code.push('\n');
      self.line += 1;
    }
  }

  /// Pushes one module factory, mapping its body lines back to the
  /// module's transformed source.
  fn push_module_factory(
    &mut self,
    module: &crate::NormalModule,
    factory: &str,
    trailing_comma: bool,
  ) {
    let source = self
      .map
      .add_source(module.id.as_ref().to_string(), module.finalized_code());
    // The factory opens with `"<id>": function(...) {` on its first line;
    // body lines follow it.
    let body_start = self.line + 1;
    let body_lines = factory.matches('\n').count().saturating_sub(1);
    for offset in 0..body_lines {
      self.map.add_line_mapping(body_start + offset, source, offset);
    }
    self.push_raw(&with_comma(factory, trailing_comma));
  }
}
