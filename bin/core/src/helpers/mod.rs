use std::path::{Path, PathBuf};

use showcase_client::entities::{repo_slug, showcase_timestamp};

use crate::config::core_config;

pub mod query;

/// Scoped temp directory for one clone attempt. Uniquified by
/// timestamp so concurrent deploys never share a checkout.
pub fn scoped_clone_dir(github_url: &str) -> PathBuf {
  core_config().clone_dir.join(format!(
    "project-{}-{}",
    showcase_timestamp(),
    repo_slug(github_url)
  ))
}

/// The host-side path of a data file for daemon calls.
pub fn host_data_path(data_file: &str) -> String {
  let config = core_config();
  resolve_host_data_path(
    data_file,
    &config.container_data_dir,
    config.host_data_dir.as_deref(),
  )
}

/// When a host data dir is configured and the path lives under the
/// container data dir, rewrite the prefix. Otherwise the path is
/// used verbatim.
pub fn resolve_host_data_path(
  data_file: &str,
  container_data_dir: &str,
  host_data_dir: Option<&str>,
) -> String {
  let Some(host_data_dir) = host_data_dir else {
    return data_file.to_string();
  };
  match data_file
    .strip_prefix(container_data_dir.trim_end_matches('/'))
  {
    Some(rest) => {
      format!("{}{}", host_data_dir.trim_end_matches('/'), rest)
    }
    None => data_file.to_string(),
  }
}

/// In-container mount target for a data file, preserving the
/// original upload filename when known.
pub fn data_mount_target(
  data_file: &str,
  original_file_name: Option<&str>,
  mount_dir: &str,
) -> String {
  let file_name = original_file_name
    .filter(|name| !name.is_empty())
    .map(str::to_string)
    .unwrap_or_else(|| {
      Path::new(data_file)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("data"))
    });
  format!("{}/{file_name}", mount_dir.trim_end_matches('/'))
}

/// `KEY=value` pairs for the daemon, in stable order.
pub fn env_list(
  env_vars: &std::collections::HashMap<String, String>,
) -> Vec<String> {
  let mut env = env_vars
    .iter()
    .map(|(key, value)| format!("{key}={value}"))
    .collect::<Vec<_>>();
  env.sort();
  env
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn host_path_rewrites_container_prefix() {
    assert_eq!(
      resolve_host_data_path(
        "/app/data/project-data-files/teams/a.csv",
        "/app/data/project-data-files",
        Some("/srv/showcase/data"),
      ),
      "/srv/showcase/data/teams/a.csv"
    );
  }

  #[test]
  fn host_path_verbatim_without_host_dir() {
    assert_eq!(
      resolve_host_data_path(
        "/app/data/project-data-files/a.csv",
        "/app/data/project-data-files",
        None,
      ),
      "/app/data/project-data-files/a.csv"
    );
  }

  #[test]
  fn host_path_verbatim_outside_container_dir() {
    assert_eq!(
      resolve_host_data_path(
        "/mnt/elsewhere/a.csv",
        "/app/data/project-data-files",
        Some("/srv/showcase/data"),
      ),
      "/mnt/elsewhere/a.csv"
    );
  }

  #[test]
  fn env_list_is_stable() {
    let vars = std::collections::HashMap::from([
      (String::from("FLASK_ENV"), String::from("production")),
      (String::from("API_KEY"), String::from("abc=123")),
    ]);
    assert_eq!(
      env_list(&vars),
      vec!["API_KEY=abc=123", "FLASK_ENV=production"]
    );
  }

  #[test]
  fn mount_target_prefers_original_name() {
    assert_eq!(
      data_mount_target(
        "/app/data/project-data-files/8f3a-upload.bin",
        Some("menu.json"),
        "/var/www",
      ),
      "/var/www/menu.json"
    );
    assert_eq!(
      data_mount_target(
        "/app/data/project-data-files/menu.json",
        None,
        "/var/www/",
      ),
      "/var/www/menu.json"
    );
  }
}
