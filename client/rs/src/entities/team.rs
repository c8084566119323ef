use serde::{Deserialize, Serialize};

use crate::entities::MongoId;

/// A group of users to whom projects belong.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(
  feature = "mongo",
  derive(mongo_indexed::derive::MongoIndexed)
)]
pub struct Team {
  #[serde(
    default,
    rename = "_id",
    skip_serializing_if = "String::is_empty",
    with = "bson::serde_helpers::hex_string_as_object_id"
  )]
  pub id: MongoId,

  /// Display name. [crate::entities::to_deploy_name] derives the
  /// container name / image repo / network alias from this.
  pub name: String,

  #[cfg_attr(feature = "mongo", index)]
  pub course_offering_id: String,

  #[serde(default)]
  pub member_ids: Vec<String>,
}
