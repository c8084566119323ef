use showcase_client::{
  EngineResult,
  entities::{
    deploy::{DeployArgs, LegacyDbVariant},
    project::Project,
    team::Team,
    to_deploy_name,
  },
};

use crate::{
  config::core_config,
  deploy::cleanup_clone_dir,
  docker::ContainerSpec,
  engine::Engine,
  helpers::{self, query},
  permission,
};

/// Start command forced onto legacy application containers.
const LEGACY_APP_CMD: [&str; 4] =
  ["flask", "run", "--host=0.0.0.0", "--port=5000"];

impl Engine {
  /// The two-container deploy older course projects expect: the
  /// application plus a sidecar database container on the same
  /// network, reachable at the `{team}-db` alias. The sidecar is not
  /// tracked as a project; the project row points at the application
  /// container.
  #[instrument(skip(self))]
  pub async fn deploy_legacy(
    &self,
    team_id: &str,
    github_url: &str,
    deployed_by: &str,
    variant: LegacyDbVariant,
  ) -> EngineResult<Project> {
    let team = query::find_team(&self.db, team_id).await?;
    permission::ensure_can_deploy(&self.db, deployed_by, &team)
      .await?;

    let args = DeployArgs {
      team_id: team_id.to_string(),
      github_url: github_url.to_string(),
      deployed_by: deployed_by.to_string(),
      ..Default::default()
    };
    let project = self.create_project(&team, &args).await?;

    match self
      .run_legacy_deploy(&project, &team, &args, variant)
      .await
    {
      Ok(project) => Ok(project),
      Err(e) => {
        self.mark_failed(&project.id).await;
        Err(e)
      }
    }
  }

  async fn run_legacy_deploy(
    &self,
    project: &Project,
    team: &Team,
    args: &DeployArgs,
    variant: LegacyDbVariant,
  ) -> EngineResult<Project> {
    let name = to_deploy_name(&team.name);
    let db_alias = format!("{name}-db");

    self.preempt_running(&team.id).await;
    self.remove_container_by_name(&name).await;
    self.remove_container_by_name(&db_alias).await;
    self.ensure_project_network().await?;

    let clone_dir = helpers::scoped_clone_dir(&args.github_url);
    let res = async {
      git::clone_repo(&args.github_url, &clone_dir).await?;
      let image_ref = format!("{name}:latest");
      let logs = self
        .consume_build(&project.id, &clone_dir, &image_ref, args)
        .await?;
      self.start_sidecar_db(&db_alias, variant).await?;
      self
        .finish_build(
          project,
          &name,
          &image_ref,
          logs,
          Some(
            LEGACY_APP_CMD.iter().map(|s| s.to_string()).collect(),
          ),
          vec![format!("DB_NAME={db_alias}")],
        )
        .await
    }
    .await;
    cleanup_clone_dir(&clone_dir).await;
    res
  }

  async fn start_sidecar_db(
    &self,
    db_alias: &str,
    variant: LegacyDbVariant,
  ) -> EngineResult<()> {
    let config = core_config();
    let (image, env) = match variant {
      LegacyDbVariant::Sql => (
        config.legacy_sql_image.clone(),
        vec![
          String::from("MYSQL_ALLOW_EMPTY_PASSWORD=yes"),
          String::from("MYSQL_DATABASE=db"),
        ],
      ),
      LegacyDbVariant::Json => {
        (config.legacy_json_image.clone(), Vec::new())
      }
    };
    let spec = ContainerSpec {
      name: db_alias.to_string(),
      image,
      env,
      memory_bytes: Some(
        (config.container_memory_mb * 1024 * 1024) as i64,
      ),
      network: Some(config.projects_network.clone()),
      aliases: vec![db_alias.to_string()],
      ..Default::default()
    };
    let container_id = self.docker.create_container(&spec).await?;
    self.docker.start_container(&container_id).await
  }
}
