use anyhow::Context;

use crate::{config::core_config, docker::DockerClient};

/// Holds the external handles the engine orchestrates. Constructed
/// once at startup and passed around explicitly (`Arc<Engine>`);
/// the periodic jobs are spawned off it with the `spawn_*` methods.
pub struct Engine {
  pub docker: DockerClient,
  pub db: database::Client,
}

impl Engine {
  pub async fn new() -> anyhow::Result<Engine> {
    let docker = DockerClient::new()
      .context("Failed to initialize docker client")?;
    let db = database::Client::new(&core_config().database)
      .await
      .context("Failed to initialize database client")?;
    Ok(Engine { docker, db })
  }
}
