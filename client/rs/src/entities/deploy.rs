use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Inputs to a deploy attempt, as the facade hands them over.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployArgs {
  pub team_id: String,
  pub github_url: String,
  /// The calling user.
  pub deployed_by: String,
  #[serde(default)]
  pub build_args: HashMap<String, String>,
  #[serde(default)]
  pub env_vars: HashMap<String, String>,
  /// Host path of a data file to bind-mount read-only.
  #[serde(default)]
  pub data_file_path: Option<String>,
  /// Preserves the in-container filename of the data file.
  #[serde(default)]
  pub original_file_name: Option<String>,
}

/// Sidecar database flavor for the legacy two-container deploy.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LegacyDbVariant {
  Json,
  Sql,
}
