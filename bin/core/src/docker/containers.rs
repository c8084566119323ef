use std::collections::HashMap;

use anyhow::Context;
use bollard::{
  query_parameters::{
    CreateContainerOptionsBuilder, InspectContainerOptions,
    KillContainerOptions, ListContainersOptions,
    RemoveContainerOptionsBuilder, StartContainerOptions,
    StopContainerOptions,
  },
  secret::{
    ContainerCreateBody, EndpointSettings, HostConfig,
    NetworkingConfig,
  },
};
use showcase_client::{
  EngineResult,
  entities::docker::{
    ContainerInfo, ContainerListItem, PortBinding,
  },
};

use super::{DockerClient, daemon_error, is_not_modified};

/// Inputs for container creation; only what the deploy pipeline and
/// the legacy sidecar actually set. Auto-remove is always disabled.
#[derive(Debug, Clone, Default)]
pub struct ContainerSpec {
  pub name: String,
  /// Image content identifier or reference.
  pub image: String,
  /// `KEY=value` pairs.
  pub env: Vec<String>,
  /// Overrides the image command when set.
  pub cmd: Option<Vec<String>>,
  /// `host:container:ro` bind specs.
  pub binds: Vec<String>,
  /// Memory cap in bytes.
  pub memory_bytes: Option<i64>,
  /// Network to attach at create time.
  pub network: Option<String>,
  /// Aliases on that network.
  pub aliases: Vec<String>,
}

impl DockerClient {
  pub async fn list_containers(
    &self,
    include_stopped: bool,
  ) -> EngineResult<Vec<ContainerListItem>> {
    let containers = self
      .docker
      .list_containers(Some(ListContainersOptions {
        all: include_stopped,
        ..Default::default()
      }))
      .await
      .map_err(|e| daemon_error(e, "container list"))?;
    let containers = containers
      .into_iter()
      .flat_map(|container| {
        let name = container
          .names
          .context("no names on container")?
          .pop()
          .context("no names on container (empty vec)")?
          .replace('/', "");
        anyhow::Ok(ContainerListItem {
          name,
          id: container.id.context("no id on container")?,
          image: container.image,
          image_id: container.image_id,
          running: matches!(
            container.state,
            Some(
              bollard::secret::ContainerSummaryStateEnum::RUNNING
            )
          ),
          created: container.created,
        })
      })
      .collect();
    Ok(containers)
  }

  pub async fn inspect_container(
    &self,
    name_or_id: &str,
  ) -> EngineResult<ContainerInfo> {
    let container = self
      .docker
      .inspect_container(
        name_or_id,
        None::<InspectContainerOptions>,
      )
      .await
      .map_err(|e| {
        daemon_error(e, &format!("container {name_or_id}"))
      })?;
    let (ports, network_aliases) = container
      .network_settings
      .map(|settings| {
        let ports = settings
          .ports
          .unwrap_or_default()
          .into_iter()
          .map(|(k, v)| {
            (
              k,
              v.unwrap_or_default()
                .into_iter()
                .map(|v| PortBinding {
                  host_ip: v.host_ip,
                  host_port: v.host_port,
                })
                .collect(),
            )
          })
          .collect::<HashMap<_, _>>();
        let aliases = settings
          .networks
          .unwrap_or_default()
          .into_iter()
          .map(|(k, v)| (k, v.aliases.unwrap_or_default()))
          .collect::<HashMap<_, _>>();
        (ports, aliases)
      })
      .unwrap_or_default();
    Ok(ContainerInfo {
      id: container.id.context("no id on container")?,
      name: container.name.unwrap_or_default(),
      running: container
        .state
        .and_then(|state| state.running)
        .unwrap_or_default(),
      image: container.image,
      created: container.created,
      ports,
      network_aliases,
    })
  }

  pub async fn create_container(
    &self,
    spec: &ContainerSpec,
  ) -> EngineResult<String> {
    let options =
      CreateContainerOptionsBuilder::new().name(&spec.name).build();
    let networking_config = spec.network.as_ref().map(|network| {
      NetworkingConfig {
        endpoints_config: Some(HashMap::from([(
          network.clone(),
          EndpointSettings {
            aliases: Some(spec.aliases.clone()),
            ..Default::default()
          },
        )])),
      }
    });
    let body = ContainerCreateBody {
      image: Some(spec.image.clone()),
      env: Some(spec.env.clone()),
      cmd: spec.cmd.clone(),
      host_config: Some(HostConfig {
        memory: spec.memory_bytes,
        binds: (!spec.binds.is_empty())
          .then(|| spec.binds.clone()),
        auto_remove: Some(false),
        ..Default::default()
      }),
      networking_config,
      ..Default::default()
    };
    let res = self
      .docker
      .create_container(Some(options), body)
      .await
      .map_err(|e| {
        daemon_error(e, &format!("container {}", spec.name))
      })?;
    Ok(res.id)
  }

  pub async fn start_container(
    &self,
    id: &str,
  ) -> EngineResult<()> {
    match self
      .docker
      .start_container(id, None::<StartContainerOptions>)
      .await
    {
      Ok(()) => Ok(()),
      Err(e) if is_not_modified(&e) => Ok(()),
      Err(e) => Err(daemon_error(e, &format!("container {id}"))),
    }
  }

  pub async fn stop_container(&self, id: &str) -> EngineResult<()> {
    match self
      .docker
      .stop_container(id, None::<StopContainerOptions>)
      .await
    {
      Ok(()) => Ok(()),
      Err(e) if is_not_modified(&e) => Ok(()),
      Err(e) => Err(daemon_error(e, &format!("container {id}"))),
    }
  }

  /// Force kill, not a graceful stop.
  pub async fn kill_container(&self, id: &str) -> EngineResult<()> {
    match self
      .docker
      .kill_container(id, None::<KillContainerOptions>)
      .await
    {
      Ok(()) => Ok(()),
      Err(e) if is_not_modified(&e) => Ok(()),
      Err(e) => Err(daemon_error(e, &format!("container {id}"))),
    }
  }

  pub async fn remove_container(
    &self,
    id: &str,
  ) -> EngineResult<()> {
    self
      .docker
      .remove_container(
        id,
        Some(
          RemoveContainerOptionsBuilder::new().force(true).build(),
        ),
      )
      .await
      .map_err(|e| daemon_error(e, &format!("container {id}")))
  }
}
