use bollard::{
  query_parameters::InspectNetworkOptionsBuilder,
  secret::{
    EndpointSettings, NetworkConnectRequest, NetworkCreateRequest,
    NetworkDisconnectRequest,
  },
};
use showcase_client::{
  EngineResult, entities::docker::NetworkInfo,
};

use super::{DockerClient, daemon_error};

impl DockerClient {
  pub async fn inspect_network(
    &self,
    network_name: &str,
  ) -> EngineResult<NetworkInfo> {
    let network = self
      .docker
      .inspect_network(
        network_name,
        Some(
          InspectNetworkOptionsBuilder::new().verbose(true).build(),
        ),
      )
      .await
      .map_err(|e| {
        daemon_error(e, &format!("network {network_name}"))
      })?;
    Ok(NetworkInfo {
      name: network
        .name
        .unwrap_or_else(|| network_name.to_string()),
      id: network.id,
      container_ids: network
        .containers
        .unwrap_or_default()
        .into_keys()
        .collect(),
    })
  }

  /// Create a non-internal attachable bridge network with default
  /// IPAM. Racing creates converge on the daemon's name uniqueness;
  /// callers treat `Conflict` as success.
  pub async fn create_network(
    &self,
    network_name: &str,
  ) -> EngineResult<()> {
    self
      .docker
      .create_network(NetworkCreateRequest {
        name: network_name.to_string(),
        driver: Some(String::from("bridge")),
        internal: Some(false),
        attachable: Some(true),
        ..Default::default()
      })
      .await
      .map_err(|e| {
        daemon_error(e, &format!("network {network_name}"))
      })?;
    Ok(())
  }

  pub async fn connect_network(
    &self,
    network_name: &str,
    container_id: &str,
    aliases: Vec<String>,
  ) -> EngineResult<()> {
    self
      .docker
      .connect_network(
        network_name,
        NetworkConnectRequest {
          container: Some(container_id.to_string()),
          endpoint_config: Some(EndpointSettings {
            aliases: Some(aliases),
            ..Default::default()
          }),
        },
      )
      .await
      .map_err(|e| {
        daemon_error(e, &format!("network {network_name}"))
      })
  }

  pub async fn disconnect_network(
    &self,
    network_name: &str,
    container_id: &str,
  ) -> EngineResult<()> {
    self
      .docker
      .disconnect_network(
        network_name,
        NetworkDisconnectRequest {
          container: Some(container_id.to_string()),
          force: Some(false),
        },
      )
      .await
      .map_err(|e| {
        daemon_error(e, &format!("network {network_name}"))
      })
  }
}
