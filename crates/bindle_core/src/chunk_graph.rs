use bindle_common::{ChunkId, ModuleId};
use rustc_hash::FxHashMap;

use crate::Chunk;

#[derive(Debug, Clone, Default)]
pub struct ChunkGraph {
  pub(crate) chunk_by_id: FxHashMap<ChunkId, Chunk>,
  /// Creation order, used wherever chunk iteration must be deterministic.
  pub(crate) chunk_order: Vec<ChunkId>,
  /// Split-point module -> owning chunk (entry roots and async roots).
  pub(crate) split_point_to_chunk: FxHashMap<ModuleId, ChunkId>,
  pub(crate) module_to_chunk: FxHashMap<ModuleId, ChunkId>,
}

impl ChunkGraph {
  pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
    self.chunk_order.iter().map(|id| &self.chunk_by_id[id])
  }

  pub fn chunk(&self, id: &ChunkId) -> Option<&Chunk> {
    self.chunk_by_id.get(id)
  }

  pub fn chunk_of_module(&self, id: &ModuleId) -> Option<&ChunkId> {
    self.module_to_chunk.get(id)
  }
}
