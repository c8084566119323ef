use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One event on a streaming image build. The stream terminates on
/// success or on the first `Error` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildEvent {
  Stream {
    text: String,
  },
  Status {
    status: String,
    progress: Option<String>,
  },
  Error {
    message: String,
  },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortBinding {
  pub host_ip: Option<String>,
  pub host_port: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerListItem {
  pub id: String,
  /// Name without the daemon's leading `/`.
  pub name: String,
  pub image: Option<String>,
  pub image_id: Option<String>,
  pub running: bool,
  pub created: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerInfo {
  pub id: String,
  /// Daemon-reported name, verbatim (leading `/` included).
  pub name: String,
  pub running: bool,
  /// Image content identifier.
  pub image: Option<String>,
  /// RFC3339 creation timestamp as reported.
  pub created: Option<String>,
  pub ports: HashMap<String, Vec<PortBinding>>,
  /// Aliases keyed by network name.
  pub network_aliases: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkInfo {
  pub name: String,
  pub id: Option<String>,
  /// Ids of the containers attached to the network.
  pub container_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageInfo {
  /// Content identifier, eg `sha256:...`.
  pub id: String,
}
