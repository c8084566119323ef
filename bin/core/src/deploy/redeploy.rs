use showcase_client::{
  EngineError, EngineResult,
  entities::{
    optional_string,
    project::{Project, ProjectStatus},
    to_deploy_name,
  },
};

use crate::{
  engine::Engine,
  helpers::{self, query},
  permission,
};

impl Engine {
  /// Run a new container from a prior project's stored image and
  /// inputs. Skips clone and build entirely; the stored image and
  /// data file must both still exist.
  #[instrument(skip(self))]
  pub async fn redeploy(
    &self,
    source_project_id: &str,
    caller: &str,
  ) -> EngineResult<Project> {
    let source =
      query::find_project(&self.db, source_project_id).await?;
    let team = query::find_team(&self.db, &source.team_id).await?;
    permission::ensure_can_deploy(&self.db, caller, &team).await?;

    if source.image_hash.is_empty() {
      return Err(EngineError::BadRequest(format!(
        "project {source_project_id} has no built image"
      )));
    }
    self.docker.inspect_image(&source.image_hash).await?;
    if let Some(data_file) = &source.data_file {
      let path = helpers::host_data_path(data_file);
      if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Err(EngineError::NotFound(format!(
          "data file {path} no longer exists"
        )));
      }
    }

    let project = query::insert_project(
      &self.db,
      Project {
        team_id: source.team_id.clone(),
        deployed_by_id: optional_string(caller),
        github_url: source.github_url.clone(),
        image_hash: source.image_hash.clone(),
        tag: source.tag.clone(),
        build_args: source.build_args.clone(),
        env_vars: source.env_vars.clone(),
        data_file: source.data_file.clone(),
        original_data_file_name: source
          .original_data_file_name
          .clone(),
        status: ProjectStatus::Deploying,
        ..Default::default()
      },
    )
    .await?;

    let name = to_deploy_name(&team.name);
    let res = async {
      self.preempt_running(&team.id).await;
      self.remove_container_by_name(&name).await;
      self.ensure_project_network().await?;
      self
        .start_project_container(
          &project,
          &name,
          &source.image_hash,
          None,
          Vec::new(),
        )
        .await
    }
    .await;

    match res {
      Ok(project) => Ok(project),
      Err(e) => {
        self.mark_failed(&project.id).await;
        Err(e)
      }
    }
  }
}
