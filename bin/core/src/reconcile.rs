use std::sync::Arc;

use async_timing_util::wait_until_timelength;
use database::mungos::mongodb::bson::doc;
use futures::{StreamExt, stream::FuturesUnordered};
use showcase_client::{
  EngineError,
  entities::{
    project::{Project, ProjectStatus},
    showcase_timestamp,
  },
};
use tokio::task::JoinHandle;

use crate::{config::core_config, engine::Engine, helpers::query};

impl Engine {
  /// Periodically reconcile `status=running` rows against observed
  /// container state, demoting projects whose container is gone or
  /// no longer running.
  pub fn spawn_reconciler(self: &Arc<Self>) -> JoinHandle<()> {
    let engine = self.clone();
    tokio::spawn(async move {
      let interval = core_config()
        .reconcile_interval
        .try_into()
        .unwrap_or(async_timing_util::Timelength::ThirtySeconds);
      loop {
        wait_until_timelength(interval, 500).await;
        if let Err(e) = engine.reconcile_running().await {
          error!("error reconciling container state | {e:#}");
        }
      }
    })
  }

  pub async fn reconcile_running(&self) -> anyhow::Result<()> {
    let running = query::running_projects(&self.db).await?;
    let mut checks = running
      .into_iter()
      .map(|project| self.reconcile_project(project))
      .collect::<FuturesUnordered<_>>();
    while checks.next().await.is_some() {}
    Ok(())
  }

  async fn reconcile_project(&self, project: Project) {
    let Some(container_id) = &project.container_id else {
      warn!(
        "running project {} has no container id, skipping check",
        project.id
      );
      return;
    };
    match self.docker.inspect_container(container_id).await {
      Ok(container) if container.running => {}
      Ok(_) | Err(EngineError::NotFound(_)) => {
        info!(
          "container for project {} is no longer running, marking stopped",
          project.id
        );
        if let Err(e) = query::update_project(
          &self.db,
          &project.id,
          doc! {
            "status": ProjectStatus::Stopped.as_ref(),
            "stopped_at": showcase_timestamp(),
          },
        )
        .await
        {
          error!(
            "failed to mark project {} stopped | {e:#}",
            project.id
          );
        }
      }
      Err(e) => {
        warn!(
          "failed to inspect container for project {} | {e:#}",
          project.id
        );
      }
    }
  }
}
