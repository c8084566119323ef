use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::entities::{MongoId, docker::PortBinding};

/// The central persisted entity. One row per deploy attempt;
/// redeploys create a new Project rather than reviving an old one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(
  feature = "mongo",
  derive(mongo_indexed::derive::MongoIndexed)
)]
pub struct Project {
  /// The Mongo ID of the project.
  /// This field is de/serialized from/to JSON as
  /// `{ "_id": { "$oid": "..." }, ...(rest of serialized Project) }`
  #[serde(
    default,
    rename = "_id",
    skip_serializing_if = "String::is_empty",
    with = "bson::serde_helpers::hex_string_as_object_id"
  )]
  pub id: MongoId,

  #[cfg_attr(feature = "mongo", index)]
  pub team_id: String,

  /// Nulled if the deploying user is deleted.
  #[serde(default)]
  pub deployed_by_id: Option<String>,

  /// Source of truth for rebuilds.
  #[serde(default)]
  pub github_url: String,

  /// Image content identifier reported by the daemon.
  /// Empty until the build resolves.
  #[serde(default)]
  pub image_hash: String,

  /// Untagged projects are eligible for scheduled pruning.
  #[serde(default)]
  pub tag: Option<String>,

  /// Unique across projects when non-null.
  #[serde(default)]
  pub container_id: Option<String>,

  /// Daemon-assigned name, stored verbatim (leading `/` included).
  #[serde(default)]
  pub container_name: Option<String>,

  #[cfg_attr(feature = "mongo", index)]
  pub status: ProjectStatus,

  /// Snapshot of the daemon's port map taken at container start.
  #[serde(default)]
  pub ports: HashMap<String, Vec<PortBinding>>,

  /// Concatenated build output.
  #[serde(default)]
  pub build_logs: String,

  #[serde(default)]
  pub build_args: HashMap<String, String>,

  #[serde(default)]
  pub env_vars: HashMap<String, String>,

  /// Host path of a read-only bind-mounted data file.
  #[serde(default)]
  pub data_file: Option<String>,

  /// Preserves the in-container filename of the data file.
  #[serde(default)]
  pub original_data_file_name: Option<String>,

  /// Set on successful container start (ms).
  #[serde(default)]
  pub deployed_at: Option<i64>,

  /// Set on the transition to stopped (ms).
  #[serde(default)]
  pub stopped_at: Option<i64>,

  /// Reconciler bookkeeping. Reset by Stop.
  #[serde(default)]
  pub failed_check_count: u32,

  /// Reconciler bookkeeping. Reset by Stop.
  #[serde(default)]
  pub last_checked_at: Option<i64>,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProjectStatus {
  #[default]
  Building,
  /// A redeploy in flight (clone / build skipped).
  Deploying,
  Running,
  Stopped,
  Failed,
  /// Terminal. Container, name and data file are all cleared.
  Pruned,
}

#[cfg(test)]
mod tests {
  use super::*;

  /// Query filters compare `as_ref()` strings against the serde
  /// representation stored on the db; the two must agree.
  #[test]
  fn status_wire_format_matches_as_ref() {
    for status in [
      ProjectStatus::Building,
      ProjectStatus::Deploying,
      ProjectStatus::Running,
      ProjectStatus::Stopped,
      ProjectStatus::Failed,
      ProjectStatus::Pruned,
    ] {
      let serialized =
        serde_json::to_string(&status).unwrap();
      assert_eq!(
        serialized.trim_matches('"'),
        status.as_ref()
      );
    }
  }
}
