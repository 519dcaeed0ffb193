use serde::Serialize;

/// One updated module delivered to running clients: the identity and its new
/// factory code, directly installable via the runtime's `hot` hook.
#[derive(Debug, Clone, Serialize)]
pub struct HmrModuleUpdate {
  pub id: String,
  pub code: String,
}

/// Load-order hint for a chunk that changed: which file to fetch and which
/// files must be present before executing it.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkLoadHint {
  pub chunk: String,
  pub file: String,
  pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HmrPayload {
  /// A successful incremental build with new module code.
  Update {
    hash: String,
    modules: Vec<HmrModuleUpdate>,
    chunks: Vec<ChunkLoadHint>,
  },
  /// The rebuild failed; the previously served bundle stays live.
  Failure { errors: Vec<String> },
}

impl HmrPayload {
  pub fn is_update(&self) -> bool {
    matches!(self, HmrPayload::Update { .. })
  }
}
