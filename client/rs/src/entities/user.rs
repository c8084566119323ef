use serde::{Deserialize, Serialize};
use strum::AsRefStr;

use crate::entities::MongoId;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(
  feature = "mongo",
  derive(mongo_indexed::derive::MongoIndexed)
)]
pub struct User {
  #[serde(
    default,
    rename = "_id",
    skip_serializing_if = "String::is_empty",
    with = "bson::serde_helpers::hex_string_as_object_id"
  )]
  pub id: MongoId,

  #[cfg_attr(feature = "mongo", unique_index)]
  pub username: String,

  #[serde(default)]
  pub admin: bool,
}

/// Membership of a user in a course offering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(
  feature = "mongo",
  derive(mongo_indexed::derive::MongoIndexed)
)]
pub struct Enrollment {
  #[serde(
    default,
    rename = "_id",
    skip_serializing_if = "String::is_empty",
    with = "bson::serde_helpers::hex_string_as_object_id"
  )]
  pub id: MongoId,

  #[cfg_attr(feature = "mongo", index)]
  pub user_id: String,

  #[cfg_attr(feature = "mongo", index)]
  pub course_offering_id: String,

  #[serde(default)]
  pub role: EnrollmentRole,
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
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EnrollmentRole {
  Instructor,
  #[default]
  Student,
}
