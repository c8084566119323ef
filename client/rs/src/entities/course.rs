use serde::{Deserialize, Serialize};

use crate::entities::{JsonObject, MongoId};

/// A semester-scoped grouping of teams with shared settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(
  feature = "mongo",
  derive(mongo_indexed::derive::MongoIndexed)
)]
pub struct CourseOffering {
  #[serde(
    default,
    rename = "_id",
    skip_serializing_if = "String::is_empty",
    with = "bson::serde_helpers::hex_string_as_object_id"
  )]
  pub id: MongoId,

  #[serde(default)]
  pub settings: OfferingSettings,
}

/// Offering settings. The engine reads `server_locked` and
/// `project_tags`; every other key is carried opaquely for the
/// collaborators which own it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OfferingSettings {
  /// When locked, only admins and instructors may deploy or stop.
  #[serde(default)]
  pub server_locked: bool,

  /// Every label ever applied to this offering's teams, in order.
  #[serde(default)]
  pub project_tags: Vec<String>,

  #[serde(flatten)]
  pub extra: JsonObject,
}
