use std::collections::HashSet;

use anyhow::Context;
use database::mungos::mongodb::bson::{doc, to_bson};
use rand::Rng;
use showcase_client::{
  EngineError, EngineResult,
  entities::{
    project::{Project, ProjectStatus},
    showcase_timestamp, to_deploy_name,
  },
};

use crate::{
  config::core_config, engine::Engine, helpers::query,
};

impl Engine {
  /// Adopt an externally created container into the control plane:
  /// attach it to the shared network under a unique team-derived
  /// alias and upsert a project row keyed by its container id.
  #[instrument(skip(self))]
  pub async fn migrate_container(
    &self,
    project_name: &str,
    team_id: &str,
    github_url: Option<String>,
    deployed_by: Option<String>,
  ) -> EngineResult<Project> {
    let team = query::find_team(&self.db, team_id).await?;

    let containers = self.docker.list_containers(true).await?;
    let wanted = project_name.trim_start_matches('/');
    let Some(container) =
      containers.into_iter().find(|c| c.name == wanted)
    else {
      return Err(EngineError::NotFound(format!(
        "no container named {project_name}"
      )));
    };

    self.ensure_project_network().await?;
    let network = &core_config().projects_network;

    let info =
      self.docker.inspect_container(&container.id).await?;
    let current_aliases = info
      .network_aliases
      .get(network)
      .cloned()
      .unwrap_or_default();

    // Aliases the container itself holds don't block reuse.
    let mut taken = self.network_aliases(network).await?;
    for alias in &current_aliases {
      taken.remove(alias);
    }
    let base = to_deploy_name(&team.name);
    let alias = unique_alias(&base, &taken, 10, random_hex_suffix)
      .ok_or_else(|| {
        EngineError::Conflict(format!(
          "could not allocate a unique alias for {base}"
        ))
      })?;

    if !info.network_aliases.contains_key(network) {
      self
        .docker
        .connect_network(network, &container.id, vec![alias.clone()])
        .await?;
    } else if !current_aliases.contains(&alias) {
      let _ = self
        .docker
        .disconnect_network(network, &container.id)
        .await;
      self
        .docker
        .connect_network(network, &container.id, vec![alias.clone()])
        .await?;
    }

    let info =
      self.docker.inspect_container(&container.id).await?;
    let image_hash = match &info.image {
      Some(image) => match self.docker.inspect_image(image).await {
        Ok(resolved) => resolved.id,
        // Keep the raw id if the image can't be inspected.
        Err(_) => image.clone(),
      },
      None => String::new(),
    };
    let created_at = info
      .created
      .as_deref()
      .and_then(|created| {
        chrono::DateTime::parse_from_rfc3339(created).ok()
      })
      .map(|created| created.timestamp_millis())
      .unwrap_or_else(showcase_timestamp);
    let status = if info.running {
      ProjectStatus::Running
    } else {
      ProjectStatus::Stopped
    };

    let existing =
      query::find_project_by_container(&self.db, &container.id)
        .await?;
    match existing {
      // Known container: refresh observed fields, keep deployed_at,
      // move to the target team. The deploying user is preserved
      // unless the caller overrides it.
      Some(project) => {
        let mut set = doc! {
          "team_id": &team.id,
          "container_name": &info.name,
          "image_hash": &image_hash,
          "ports": to_bson(&info.ports)
            .context("failed to serialize container ports")?,
          "status": status.as_ref(),
        };
        if let Some(github_url) = &github_url {
          set.insert("github_url", github_url);
        }
        if let Some(deployed_by) = &deployed_by {
          set.insert("deployed_by_id", deployed_by);
        }
        query::update_project(&self.db, &project.id, set).await?;
        query::find_project(&self.db, &project.id).await
      }
      None => {
        let project = Project {
          team_id: team.id.clone(),
          deployed_by_id: deployed_by,
          github_url: github_url.unwrap_or_default(),
          image_hash,
          container_id: Some(container.id.clone()),
          container_name: Some(info.name.clone()),
          status,
          ports: info.ports,
          deployed_at: Some(created_at),
          ..Default::default()
        };
        query::insert_project(&self.db, project).await
      }
    }
  }

  /// Every alias in use on the network, collected by scanning the
  /// connected containers' alias lists.
  async fn network_aliases(
    &self,
    network: &str,
  ) -> EngineResult<HashSet<String>> {
    let info = self.docker.inspect_network(network).await?;
    let mut aliases = HashSet::new();
    for container_id in info.container_ids {
      match self.docker.inspect_container(&container_id).await {
        Ok(container) => {
          if let Some(list) = container.network_aliases.get(network)
          {
            aliases.extend(list.iter().cloned());
          }
        }
        // Disconnected while we were scanning.
        Err(EngineError::NotFound(_)) => {}
        Err(e) => return Err(e),
      }
    }
    Ok(aliases)
  }
}

/// `base` if free, else `base-{suffix}` for up to `attempts`
/// freshly drawn suffixes.
fn unique_alias(
  base: &str,
  taken: &HashSet<String>,
  attempts: usize,
  mut suffix: impl FnMut() -> String,
) -> Option<String> {
  if !taken.contains(base) {
    return Some(base.to_string());
  }
  for _ in 0..attempts {
    let candidate = format!("{base}-{}", suffix());
    if !taken.contains(&candidate) {
      return Some(candidate);
    }
  }
  None
}

/// 4 lowercase hex chars.
fn random_hex_suffix() -> String {
  let bytes: [u8; 2] = rand::rng().random();
  hex::encode(bytes)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn base_alias_used_when_free() {
    let taken = HashSet::new();
    assert_eq!(
      unique_alias("team-a", &taken, 10, || unreachable!()),
      Some(String::from("team-a"))
    );
  }

  #[test]
  fn suffix_appended_when_base_taken() {
    let taken =
      HashSet::from([String::from("team-a")]);
    assert_eq!(
      unique_alias("team-a", &taken, 10, || String::from("3f0c")),
      Some(String::from("team-a-3f0c"))
    );
  }

  #[test]
  fn retries_until_free_suffix() {
    let taken = HashSet::from([
      String::from("team-a"),
      String::from("team-a-0000"),
      String::from("team-a-0001"),
    ]);
    let mut counter = 0;
    let alias = unique_alias("team-a", &taken, 10, || {
      let suffix = format!("{counter:04x}");
      counter += 1;
      suffix
    });
    assert_eq!(alias, Some(String::from("team-a-0002")));
  }

  #[test]
  fn gives_up_after_attempts() {
    let taken = HashSet::from([
      String::from("team-a"),
      String::from("team-a-dead"),
    ]);
    let alias =
      unique_alias("team-a", &taken, 10, || String::from("dead"));
    assert_eq!(alias, None);
  }

  #[test]
  fn random_suffix_shape() {
    let suffix = random_hex_suffix();
    assert_eq!(suffix.len(), 4);
    assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()
      && !c.is_ascii_uppercase()));
  }
}
