use std::str::FromStr;

use anyhow::Context;
use async_timing_util::unix_timestamp_ms;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub mod config;
pub mod course;
pub mod deploy;
pub mod docker;
pub mod logger;
pub mod logs;
pub mod project;
pub mod team;
pub mod user;

pub type MongoId = String;
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Unix timestamp in milliseconds as i64
pub fn showcase_timestamp() -> i64 {
  unix_timestamp_ms() as i64
}

pub fn optional_string(string: impl Into<String>) -> Option<String> {
  let string = string.into();
  if string.is_empty() { None } else { Some(string) }
}

/// Canonical deploy name for a team: lowercased, with each maximal
/// run of whitespace collapsed to a single `-`. Used as the container
/// name, the image repo component, and the primary network alias.
pub fn to_deploy_name(name: &str) -> String {
  let mut res = String::with_capacity(name.len());
  let mut in_whitespace = false;
  for c in name.to_lowercase().chars() {
    if c.is_whitespace() {
      if !in_whitespace {
        res.push('-');
      }
      in_whitespace = true;
    } else {
      res.push(c);
      in_whitespace = false;
    }
  }
  res
}

/// The final path segment of a repo url, without any `.git` suffix,
/// reduced to characters safe in a directory name.
pub fn repo_slug(url: &str) -> String {
  let last = url
    .trim_end_matches('/')
    .rsplit('/')
    .next()
    .unwrap_or(url)
    .trim_end_matches(".git");
  let slug = last
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'
      {
        c
      } else {
        '-'
      }
    })
    .collect::<String>();
  if slug.is_empty() { String::from("repo") } else { slug }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Timelength {
  /// `5-sec`
  #[serde(rename = "5-sec")]
  #[strum(serialize = "5-sec")]
  FiveSeconds,
  /// `10-sec`
  #[serde(rename = "10-sec")]
  #[strum(serialize = "10-sec")]
  TenSeconds,
  /// `15-sec`
  #[serde(rename = "15-sec")]
  #[strum(serialize = "15-sec")]
  FifteenSeconds,
  #[default]
  /// `30-sec`
  #[serde(rename = "30-sec")]
  #[strum(serialize = "30-sec")]
  ThirtySeconds,
  /// `1-min`
  #[serde(rename = "1-min")]
  #[strum(serialize = "1-min")]
  OneMinute,
  /// `5-min`
  #[serde(rename = "5-min")]
  #[strum(serialize = "5-min")]
  FiveMinutes,
  /// `15-min`
  #[serde(rename = "15-min")]
  #[strum(serialize = "15-min")]
  FifteenMinutes,
}

impl TryInto<async_timing_util::Timelength> for Timelength {
  type Error = anyhow::Error;
  fn try_into(
    self,
  ) -> Result<async_timing_util::Timelength, Self::Error> {
    async_timing_util::Timelength::from_str(&self.to_string())
      .context("failed to parse timelength?")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn deploy_name_collapses_whitespace() {
    assert_eq!(to_deploy_name("Team A"), "team-a");
    assert_eq!(to_deploy_name("  Big\t Team  7"), "-big-team-7");
    assert_eq!(to_deploy_name("solo"), "solo");
  }

  #[test]
  fn repo_slug_strips_git_suffix() {
    assert_eq!(repo_slug("https://github.com/u/r.git"), "r");
    assert_eq!(repo_slug("https://github.com/u/My-App"), "My-App");
    assert_eq!(repo_slug("https://github.com/u/r/"), "r");
  }
}
