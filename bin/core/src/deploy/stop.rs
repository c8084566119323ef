use database::mungos::mongodb::bson::doc;
use showcase_client::{
  EngineError, EngineResult,
  entities::{
    project::{Project, ProjectStatus},
    showcase_timestamp,
  },
};

use crate::{engine::Engine, helpers::query, permission};

impl Engine {
  /// Force-kill a project's container and mark the project stopped.
  #[instrument(skip(self))]
  pub async fn stop(
    &self,
    project_id: &str,
    caller: &str,
  ) -> EngineResult<Project> {
    let project = query::find_project(&self.db, project_id).await?;
    let Some(container_id) = project.container_id.clone() else {
      return Err(EngineError::BadRequest(format!(
        "project {project_id} has no container"
      )));
    };
    let team = query::find_team(&self.db, &project.team_id).await?;
    permission::ensure_can_stop(&self.db, caller, &team).await?;

    // A container which is already gone or already stopped leaves
    // the goal state holding.
    match self.docker.kill_container(&container_id).await {
      Ok(())
      | Err(EngineError::NotFound(_))
      | Err(EngineError::Conflict(_)) => {}
      Err(e) => return Err(e),
    }

    query::update_project(
      &self.db,
      &project.id,
      doc! {
        "status": ProjectStatus::Stopped.as_ref(),
        "stopped_at": showcase_timestamp(),
        "failed_check_count": 0,
        "last_checked_at": null,
      },
    )
    .await?;
    query::find_project(&self.db, &project.id).await
  }
}
