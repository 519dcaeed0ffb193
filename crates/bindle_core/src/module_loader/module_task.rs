use std::sync::Arc;

use arcstr::ArcStr;
use bindle_common::ModuleId;
use bindle_resolver::Resolution;
use tokio::sync::Semaphore;
use tracing::instrument;

use super::{resolve_requests, Msg};
use crate::transform::{transform_module, TransformContext};
use crate::{
  BuildError, BuildInputOptions, DependencyRequest, EmittedAsset, SharedResolver, UnaryBuildResult,
};

pub(crate) struct ModuleTask {
  pub(crate) id: ModuleId,
  pub(crate) is_user_defined_entry: bool,
  pub(crate) tx: tokio::sync::mpsc::UnboundedSender<Msg>,
  pub(crate) resolver: SharedResolver,
  pub(crate) input_options: Arc<BuildInputOptions>,
  pub(crate) semaphore: Arc<Semaphore>,
}

impl ModuleTask {
  #[instrument(skip_all)]
  pub(crate) async fn run(self) {
    let semaphore = self.semaphore.clone();
    let _permit = semaphore.acquire().await.expect("loader outlives its tasks");
    let tx = self.tx.clone();
    match self.run_inner().await {
      Ok(result) => {
        // The receiver only drops after every task settled.
        tx.send(Msg::Loaded(result)).unwrap();
      }
      Err(err) => {
        tx.send(Msg::Error(err)).unwrap();
      }
    }
  }

  async fn run_inner(self) -> UnaryBuildResult<TaskResult> {
    let raw = tokio::fs::read(self.id.as_ref())
      .await
      .map_err(|e| BuildError::io_error(e).context(format!("Read file: {}", self.id)))?;
    let content_hash: ArcStr = blake3::hash(&raw).to_hex().as_str().into();

    let transformed = transform_module(
      &TransformContext {
        id: &self.id,
        options: &self.input_options,
      },
      raw,
    )?;

    let resolved = resolve_requests(&self.resolver, &self.id, transformed.dependencies).await;

    Ok(TaskResult {
      module_id: self.id,
      content_hash,
      code: transformed.code,
      emitted_asset: transformed.emitted_asset,
      resolved,
      is_user_defined_entry: self.is_user_defined_entry,
    })
  }
}

#[derive(Debug)]
pub(crate) struct TaskResult {
  pub module_id: ModuleId,
  pub content_hash: ArcStr,
  pub code: String,
  pub emitted_asset: Option<EmittedAsset>,
  pub resolved: Vec<(DependencyRequest, UnaryBuildResult<Resolution>)>,
  pub is_user_defined_entry: bool,
}
