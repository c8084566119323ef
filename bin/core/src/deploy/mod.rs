use std::path::Path;

use anyhow::Context;
use database::mungos::mongodb::bson::{doc, to_bson};
use futures::StreamExt;
use showcase_client::{
  EngineError, EngineResult,
  entities::{
    deploy::DeployArgs,
    docker::BuildEvent,
    optional_string,
    project::{Project, ProjectStatus},
    showcase_timestamp,
    team::Team,
    to_deploy_name,
  },
};

use crate::{
  config::core_config,
  docker::ContainerSpec,
  engine::Engine,
  helpers::{self, query},
  permission, transport,
};

mod legacy;
mod redeploy;
mod stop;
mod stream;

pub use stream::DeployStream;

impl Engine {
  /// Clone, build and run a team's repository. On success exactly
  /// one project of the team is left `running`: any prior running
  /// project is stopped before the new container starts.
  #[instrument(skip(self))]
  pub async fn deploy(
    &self,
    args: DeployArgs,
  ) -> EngineResult<Project> {
    let team = query::find_team(&self.db, &args.team_id).await?;
    permission::ensure_can_deploy(
      &self.db,
      &args.deployed_by,
      &team,
    )
    .await?;

    let project = self.create_project(&team, &args).await?;

    match self.run_deploy(&project, &team, &args).await {
      Ok(project) => Ok(project),
      Err(e) => {
        self.mark_failed(&project.id).await;
        Err(e)
      }
    }
  }

  pub(crate) async fn create_project(
    &self,
    team: &Team,
    args: &DeployArgs,
  ) -> EngineResult<Project> {
    let project = Project {
      team_id: team.id.clone(),
      deployed_by_id: optional_string(&args.deployed_by),
      github_url: args.github_url.clone(),
      build_args: args.build_args.clone(),
      env_vars: args.env_vars.clone(),
      data_file: args.data_file_path.clone(),
      original_data_file_name: args.original_file_name.clone(),
      status: ProjectStatus::Building,
      ..Default::default()
    };
    query::insert_project(&self.db, project).await
  }

  async fn run_deploy(
    &self,
    project: &Project,
    team: &Team,
    args: &DeployArgs,
  ) -> EngineResult<Project> {
    let name = to_deploy_name(&team.name);

    self.preempt_running(&team.id).await;
    self.remove_container_by_name(&name).await;
    self.ensure_project_network().await?;

    let clone_dir = helpers::scoped_clone_dir(&args.github_url);
    let res = async {
      git::clone_repo(&args.github_url, &clone_dir).await?;
      let image_ref = format!("{name}:latest");
      let logs = self
        .consume_build(&project.id, &clone_dir, &image_ref, args)
        .await?;
      self
        .finish_build(project, &name, &image_ref, logs, None, Vec::new())
        .await
    }
    .await;
    cleanup_clone_dir(&clone_dir).await;
    res
  }

  /// Build and accumulate the full event stream. A build ending in
  /// an error persists the partial logs and surfaces `BuildFailed`.
  pub(crate) async fn consume_build(
    &self,
    project_id: &str,
    clone_dir: &Path,
    image_ref: &str,
    args: &DeployArgs,
  ) -> EngineResult<String> {
    let mut stream = self
      .docker
      .build_image(clone_dir, image_ref, &args.build_args)
      .await?;
    let mut logs = String::new();
    let mut error = None;
    while let Some(event) = stream.next().await {
      logs.push_str(&transport::build_event_text(&event));
      if let BuildEvent::Error { message } = event {
        error = Some(message);
        break;
      }
    }
    if let Some(message) = error {
      self.persist_build_logs(project_id, &logs).await;
      return Err(EngineError::BuildFailed { message, logs });
    }
    Ok(logs)
  }

  /// Steps after a successful build: resolve the image content hash,
  /// persist it together with the logs, then create and start the
  /// container from the hash (not the mutable `:latest` reference,
  /// which a later deploy of the same team will take over).
  pub(crate) async fn finish_build(
    &self,
    project: &Project,
    name: &str,
    image_ref: &str,
    logs: String,
    cmd: Option<Vec<String>>,
    extra_env: Vec<String>,
  ) -> EngineResult<Project> {
    let image = self.docker.inspect_image(image_ref).await?;
    query::update_project(
      &self.db,
      &project.id,
      doc! {
        "build_logs": logs,
        "image_hash": &image.id,
      },
    )
    .await?;
    self
      .start_project_container(project, name, &image.id, cmd, extra_env)
      .await
  }

  /// Steps 8-9 of a deploy: create the container from the image
  /// hash, start it, and persist the observed container identity and
  /// port snapshot with `status=running`.
  pub(crate) async fn start_project_container(
    &self,
    project: &Project,
    name: &str,
    image_hash: &str,
    cmd: Option<Vec<String>>,
    extra_env: Vec<String>,
  ) -> EngineResult<Project> {
    let config = core_config();
    let mut env = helpers::env_list(&project.env_vars);
    env.extend(extra_env);
    let binds = match &project.data_file {
      Some(data_file) => vec![format!(
        "{}:{}:ro",
        helpers::host_data_path(data_file),
        helpers::data_mount_target(
          data_file,
          project.original_data_file_name.as_deref(),
          &config.data_mount_path,
        ),
      )],
      None => Vec::new(),
    };
    let spec = ContainerSpec {
      name: name.to_string(),
      image: image_hash.to_string(),
      env,
      cmd,
      binds,
      memory_bytes: Some(
        (config.container_memory_mb * 1024 * 1024) as i64,
      ),
      network: Some(config.projects_network.clone()),
      aliases: vec![name.to_string()],
    };
    let container_id = self.docker.create_container(&spec).await?;
    self.docker.start_container(&container_id).await?;
    let container =
      self.docker.inspect_container(&container_id).await?;
    let ports = to_bson(&container.ports)
      .context("failed to serialize container ports")?;
    query::update_project(
      &self.db,
      &project.id,
      doc! {
        "container_id": &container.id,
        "container_name": &container.name,
        "ports": ports,
        "status": ProjectStatus::Running.as_ref(),
        "deployed_at": showcase_timestamp(),
      },
    )
    .await?;
    query::find_project(&self.db, &project.id).await
  }

  /// Stop every running project of the team before a new one starts.
  /// Opportunistic: failures are logged, never abort the deploy.
  pub(crate) async fn preempt_running(&self, team_id: &str) {
    let running =
      match query::running_projects_for_team(&self.db, team_id)
        .await
      {
        Ok(running) => running,
        Err(e) => {
          warn!(
            "failed to list running projects for team {team_id} | {e:#}"
          );
          return;
        }
      };
    for project in running {
      if let Some(container_id) = &project.container_id {
        match self.docker.stop_container(container_id).await {
          Ok(()) | Err(EngineError::NotFound(_)) => {}
          Err(e) => warn!(
            "failed to stop container {container_id} | {e:#}"
          ),
        }
      }
      if let Err(e) = query::update_project(
        &self.db,
        &project.id,
        doc! {
          "status": ProjectStatus::Stopped.as_ref(),
          "stopped_at": showcase_timestamp(),
          "failed_check_count": 0,
          "last_checked_at": null,
        },
      )
      .await
      {
        warn!("failed to stop project {} | {e:#}", project.id);
      }
    }
  }

  /// Reconcile a container the daemon has under the canonical name
  /// but the repository forgot about: best-effort stop then remove.
  pub(crate) async fn remove_container_by_name(&self, name: &str) {
    match self.docker.inspect_container(name).await {
      Ok(container) => {
        let _ = self.docker.stop_container(&container.id).await;
        match self.docker.remove_container(&container.id).await {
          Ok(()) | Err(EngineError::NotFound(_)) => {}
          Err(e) => {
            warn!("failed to remove container {name} | {e:#}")
          }
        }
      }
      Err(EngineError::NotFound(_)) => {}
      Err(e) => {
        warn!("failed to inspect container {name} | {e:#}")
      }
    }
  }

  /// Inspect-then-create of the shared project network. Concurrent
  /// creates converge on the daemon's name uniqueness: `Conflict`
  /// counts as success.
  pub(crate) async fn ensure_project_network(
    &self,
  ) -> EngineResult<()> {
    let network = &core_config().projects_network;
    match self.docker.inspect_network(network).await {
      Ok(_) => Ok(()),
      Err(EngineError::NotFound(_)) => {
        match self.docker.create_network(network).await {
          Ok(()) | Err(EngineError::Conflict(_)) => Ok(()),
          Err(e) => Err(e),
        }
      }
      Err(e) => Err(e),
    }
  }

  pub(crate) async fn persist_build_logs(
    &self,
    project_id: &str,
    logs: &str,
  ) {
    if let Err(e) = query::update_project(
      &self.db,
      project_id,
      doc! { "build_logs": logs },
    )
    .await
    {
      warn!(
        "failed to persist build logs for project {project_id} | {e:#}"
      );
    }
  }

  pub(crate) async fn mark_failed(&self, project_id: &str) {
    if let Err(e) = query::update_project(
      &self.db,
      project_id,
      doc! { "status": ProjectStatus::Failed.as_ref() },
    )
    .await
    {
      error!(
        "failed to mark project {project_id} failed | {e:#}"
      );
    }
  }
}

/// Runs on every deploy exit path.
pub(crate) async fn cleanup_clone_dir(clone_dir: &Path) {
  if let Err(e) = tokio::fs::remove_dir_all(clone_dir).await {
    if e.kind() != std::io::ErrorKind::NotFound {
      warn!("failed to clean up clone dir {clone_dir:?} | {e}");
    }
  }
}
