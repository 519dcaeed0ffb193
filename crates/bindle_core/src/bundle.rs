use std::path::{Path, PathBuf};

use bindle_common::ChunkId;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::emit::{write_manifest_atomic, Manifest, RenderContext};
use crate::{
  BuildError, BuildInputOptions, BuildOutputOptions, BuildResult, ChunkGraph, ChunkKind,
  CodeSplitter, Graph, SourceMapOption, UnaryBuildResult,
};

#[derive(Debug)]
pub struct Asset {
  pub filename: String,
  pub content: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct BuildStats {
  pub modules: usize,
  pub chunks: usize,
  pub assets: usize,
}

#[derive(Debug)]
pub struct BuildOutput {
  pub assets: Vec<Asset>,
  pub manifest: Manifest,
  pub stats: Option<BuildStats>,
}

#[derive(Debug)]
pub struct Bundle<'a> {
  pub input_options: &'a BuildInputOptions,
  pub output_options: &'a BuildOutputOptions,
  pub graph: &'a Graph,
}

impl<'a> Bundle<'a> {
  pub fn new(
    input_options: &'a BuildInputOptions,
    output_options: &'a BuildOutputOptions,
    graph: &'a Graph,
  ) -> Self {
    Self {
      input_options,
      output_options,
      graph,
    }
  }

  pub(crate) fn split(&self) -> UnaryBuildResult<ChunkGraph> {
    CodeSplitter::new(self.graph, self.input_options).split()
  }

  /// Computes content hashes and output file names for every chunk.
  pub(crate) fn finalize_chunks(&self, chunk_graph: &mut ChunkGraph) -> FxHashMap<ChunkId, String> {
    let hashes: FxHashMap<ChunkId, String> = chunk_graph
      .chunk_order
      .par_iter()
      .map(|id| {
        let hash = chunk_graph.chunk_by_id[id].content_hash(&self.graph.module_by_id);
        (id.clone(), hash)
      })
      .collect();

    let production = self.input_options.mode.is_production();
    for (id, chunk) in chunk_graph.chunk_by_id.iter_mut() {
      let hash = production.then(|| hashes[id].as_str());
      chunk.gen_file_name(self.output_options, hash);
    }
    hashes
  }

  /// Serializes chunks to output code; `only` restricts rendering to the
  /// named chunks (incremental re-emission).
  pub(crate) fn render_chunks(
    &self,
    chunk_graph: &ChunkGraph,
    only: Option<&FxHashSet<ChunkId>>,
  ) -> Vec<Asset> {
    let chunk_filename_by_id: FxHashMap<ChunkId, String> = chunk_graph
      .chunks()
      .map(|chunk| (chunk.id.clone(), chunk.filename.clone().unwrap()))
      .collect();
    let ctx = RenderContext {
      graph: self.graph,
      input_options: self.input_options,
      output_options: self.output_options,
      chunk_graph,
      chunk_filename_by_id: &chunk_filename_by_id,
    };

    let selected: Vec<&crate::Chunk> = chunk_graph
      .chunks()
      .filter(|chunk| only.map_or(true, |set| set.contains(&chunk.id)))
      .collect();

    selected
      .par_iter()
      .flat_map(|chunk| {
        let filename = chunk.filename.clone().unwrap();
        let rendered = chunk.render(&ctx);
        let mut assets = vec![Asset {
          filename: filename.clone(),
          content: rendered.code.into_bytes(),
        }];
        if let Some(map) = rendered.source_map {
          debug_assert_eq!(self.output_options.source_map, SourceMapOption::Separate);
          assets.push(Asset {
            filename: format!("{filename}.map"),
            content: map.into_bytes(),
          });
        }
        assets
      })
      .collect()
  }

  /// Copy-through artifacts registered by asset transforms, deduplicated by
  /// output name (two imports of one file share the artifact).
  pub(crate) fn collect_asset_artifacts(&self) -> Vec<Asset> {
    let mut seen = FxHashSet::default();
    let mut assets = vec![];
    for module in self.graph.modules_in_exec_order() {
      if let Some(artifact) = module.as_norm().and_then(|m| m.emitted_asset.as_ref()) {
        if seen.insert(artifact.file_name.clone()) {
          assets.push(Asset {
            filename: artifact.file_name.clone(),
            content: artifact.content.clone(),
          });
        }
      }
    }
    assets
  }

  pub(crate) fn build_manifest(&self, chunk_graph: &ChunkGraph) -> Manifest {
    let mut manifest = Manifest::new();
    for chunk in chunk_graph.chunks() {
      let filename = chunk.filename.clone().unwrap();
      match (&chunk.kind, &chunk.entry_name) {
        (ChunkKind::Entry, Some(name)) => {
          manifest.insert(name.clone(), filename);
        }
        _ => {
          manifest.insert(chunk.id.as_ref().to_string(), filename);
        }
      }
    }
    for module in self.graph.modules_in_exec_order() {
      if let Some(artifact) = module.as_norm().and_then(|m| m.emitted_asset.as_ref()) {
        manifest.insert(artifact.logical_name.clone(), artifact.file_name.clone());
      }
    }
    for (logical, _) in self.copy_plan() {
      manifest.insert(logical.clone(), logical);
    }
    manifest
  }

  /// (relative output name, absolute source path) for every configured
  /// verbatim-copy file.
  fn copy_plan(&self) -> Vec<(String, PathBuf)> {
    let mut plan = vec![];
    for copy in &self.output_options.copy {
      let root = if copy.is_absolute() {
        copy.clone()
      } else {
        self.input_options.cwd.join(copy)
      };
      if root.is_file() {
        if let Some(name) = root.file_name().and_then(|n| n.to_str()) {
          plan.push((name.to_string(), root.clone()));
        }
      } else if root.is_dir() {
        for entry in walkdir::WalkDir::new(&root)
          .sort_by_file_name()
          .into_iter()
          .filter_map(Result::ok)
          .filter(|e| e.file_type().is_file())
        {
          if let Ok(rel) = entry.path().strip_prefix(&root) {
            plan.push((
              rel.to_string_lossy().replace('\\', "/"),
              entry.path().to_path_buf(),
            ));
          }
        }
      }
    }
    plan
  }

  pub fn generate(&mut self) -> BuildResult<(ChunkGraph, FxHashMap<ChunkId, String>, BuildOutput)> {
    let mut chunk_graph = self.split().map_err(|e| vec![e])?;
    let chunk_hashes = self.finalize_chunks(&mut chunk_graph);

    let mut assets = self.render_chunks(&chunk_graph, None);
    assets.extend(self.collect_asset_artifacts());
    let manifest = self.build_manifest(&chunk_graph);

    let stats = self.output_options.stats.then(|| BuildStats {
      modules: self.graph.module_by_id.len(),
      chunks: chunk_graph.chunk_order.len(),
      assets: assets.len(),
    });

    Ok((
      chunk_graph,
      chunk_hashes,
      BuildOutput {
        assets,
        manifest,
        stats,
      },
    ))
  }

  /// Writes rendered assets, copies configured static paths, and writes the
  /// manifest last, atomically. All I/O failures here are fatal to the
  /// build attempt regardless of mode.
  pub(crate) fn write(&self, output: &BuildOutput) -> UnaryBuildResult<()> {
    let dir = &self.output_options.dir;
    std::fs::create_dir_all(dir).map_err(|e| BuildError::emission(dir, e))?;

    for asset in &output.assets {
      let path = dir.join(&asset.filename);
      if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| BuildError::emission(parent, e))?;
      }
      std::fs::write(&path, &asset.content).map_err(|e| BuildError::emission(&path, e))?;
    }

    for (logical, source) in self.copy_plan() {
      let dest = dir.join(&logical);
      if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| BuildError::emission(parent, e))?;
      }
      std::fs::copy(&source, &dest).map_err(|e| BuildError::emission(&dest, e))?;
    }

    if self.output_options.manifest {
      let path = manifest_path(self.output_options);
      write_manifest_atomic(&path, &output.manifest)?;
    }
    Ok(())
  }
}

pub(crate) fn manifest_path(output_options: &BuildOutputOptions) -> std::path::PathBuf {
  let configured = Path::new(&output_options.manifest_path);
  if configured.is_absolute() {
    configured.to_path_buf()
  } else {
    output_options.dir.join(configured)
  }
}
