use std::{collections::HashSet, sync::Arc};

use database::mungos::mongodb::bson::doc;
use futures::{StreamExt, stream::FuturesUnordered};
use serde::Serialize;
use showcase_client::{
  EngineError, EngineResult,
  entities::{
    docker::ContainerListItem,
    project::{Project, ProjectStatus},
  },
};
use tokio::task::JoinHandle;

use crate::{
  config::core_config,
  engine::Engine,
  helpers::{self, query},
};

#[derive(Debug, Default, Serialize)]
pub struct PruneSummary {
  pub total_found: usize,
  pub success_count: usize,
  pub error_count: usize,
  pub errors: Vec<String>,
}

impl Engine {
  /// Garbage collect untagged non-running projects on the configured
  /// cron schedule.
  pub fn spawn_prune_schedule(self: &Arc<Self>) -> JoinHandle<()> {
    let engine = self.clone();
    tokio::spawn(async move {
      let schedule = &core_config().prune_schedule;
      let cron = match croner::parser::CronParser::builder()
        .seconds(croner::parser::Seconds::Required)
        .dom_and_dow(true)
        .build()
        .parse(schedule)
      {
        Ok(cron) => cron,
        Err(e) => {
          error!("invalid prune schedule '{schedule}' | {e:?}");
          return;
        }
      };
      loop {
        let now = chrono::Local::now();
        let next = match cron.find_next_occurrence(&now, false) {
          Ok(next) => next,
          Err(e) => {
            error!("failed to find next prune run time | {e:?}");
            return;
          }
        };
        let wait = (next - now).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;
        let summary = engine.prune_all_untagged().await;
        if summary.error_count > 0 {
          warn!("scheduled prune completed with errors | {summary:?}");
        } else {
          info!(
            "scheduled prune complete | pruned {} of {} candidates",
            summary.success_count, summary.total_found
          );
        }
      }
    })
  }

  /// Scheduled mode: prune every untagged project which is neither
  /// running nor already pruned. Candidates are processed
  /// concurrently; one failure never affects the others.
  #[instrument(skip(self))]
  pub async fn prune_all_untagged(&self) -> PruneSummary {
    // The protected set is snapshotted before and after candidate
    // collection and unioned: an image a mid-run deploy started
    // referencing must stay protected.
    let (candidates, protected) = match self.candidate_snapshot().await
    {
      Ok(snapshot) => snapshot,
      Err(e) => {
        return PruneSummary {
          errors: vec![format!("failed to load prune state: {e:#}")],
          error_count: 1,
          ..Default::default()
        };
      }
    };

    let total_found = candidates.len();
    let mut runs = candidates
      .into_iter()
      .map(|project| {
        let protected = &protected;
        async move {
          self.prune_project_resources(project, protected).await
        }
      })
      .collect::<FuturesUnordered<_>>();

    let mut summary = PruneSummary {
      total_found,
      ..Default::default()
    };
    while let Some(errors) = runs.next().await {
      if errors.is_empty() {
        summary.success_count += 1;
      } else {
        summary.error_count += 1;
        summary.errors.extend(errors);
      }
    }
    summary
  }

  /// On-demand prune of a single project. The project's own rows are
  /// excluded from the protected-set unions so its image can go.
  #[instrument(skip(self))]
  pub async fn prune_project(
    &self,
    project_id: &str,
  ) -> EngineResult<PruneSummary> {
    let project = query::find_project(&self.db, project_id).await?;
    if project.status == ProjectStatus::Pruned {
      return Err(EngineError::BadRequest(format!(
        "project {project_id} is already pruned"
      )));
    }
    let protected =
      query::protected_image_hashes(&self.db, Some(&project.id))
        .await?;
    let errors =
      self.prune_project_resources(project, &protected).await;
    Ok(PruneSummary {
      total_found: 1,
      success_count: usize::from(errors.is_empty()),
      error_count: usize::from(!errors.is_empty()),
      errors,
    })
  }

  async fn candidate_snapshot(
    &self,
  ) -> EngineResult<(Vec<Project>, HashSet<String>)> {
    let mut protected =
      query::protected_image_hashes(&self.db, None).await?;
    let candidates = query::prune_candidates(&self.db).await?;
    protected.extend(
      query::protected_image_hashes(&self.db, None).await?,
    );
    Ok((candidates, protected))
  }

  /// The shared per-project routine: container, then image (unless
  /// protected), then data file. The row transitions to pruned only
  /// if the container is actually gone.
  async fn prune_project_resources(
    &self,
    project: Project,
    protected: &HashSet<String>,
  ) -> Vec<String> {
    let mut errors = Vec::new();

    let mut container_removed = true;
    if let Some(container_id) = &project.container_id {
      let _ = self.docker.stop_container(container_id).await;
      match self.docker.remove_container(container_id).await {
        Ok(()) | Err(EngineError::NotFound(_)) => {}
        Err(e) => {
          container_removed = false;
          errors.push(format!(
            "project {}: failed to remove container {container_id}: {e:#}",
            project.id
          ));
        }
      }
    }

    if !project.image_hash.is_empty() {
      if protected.contains(&project.image_hash) {
        debug!(
          "image {} is protected, skipping removal",
          project.image_hash
        );
      } else if let Err(e) =
        self.remove_image_with_retry(&project.image_hash).await
      {
        errors.push(format!(
          "project {}: failed to remove image {}: {e:#}",
          project.id, project.image_hash
        ));
      }
    }

    if let Some(data_file) = &project.data_file {
      let path = helpers::host_data_path(data_file);
      if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        if let Err(e) = tokio::fs::remove_file(&path).await {
          errors.push(format!(
            "project {}: failed to remove data file {path}: {e}",
            project.id
          ));
        }
      }
    }

    if container_removed {
      if let Err(e) = query::update_project(
        &self.db,
        &project.id,
        doc! {
          "status": ProjectStatus::Pruned.as_ref(),
          "container_id": null,
          "container_name": null,
          "data_file": null,
        },
      )
      .await
      {
        errors.push(format!(
          "project {}: failed to mark pruned: {e:#}",
          project.id
        ));
      }
    } else {
      errors.push(format!(
        "project {}: container not removed, left in status {}",
        project.id, project.status
      ));
    }

    errors
  }

  /// Remove an image; on `Conflict` (in use), clear out every
  /// container referencing it and retry once. Daemon `NotFound` is
  /// success.
  async fn remove_image_with_retry(
    &self,
    image_hash: &str,
  ) -> EngineResult<()> {
    match self.docker.remove_image(image_hash).await {
      Ok(()) | Err(EngineError::NotFound(_)) => Ok(()),
      Err(EngineError::Conflict(_)) => {
        let containers = self.docker.list_containers(true).await?;
        for container in containers
          .iter()
          .filter(|container| image_matches(container, image_hash))
        {
          let _ = self.docker.stop_container(&container.id).await;
          let _ = self.docker.remove_container(&container.id).await;
        }
        match self.docker.remove_image(image_hash).await {
          Ok(()) | Err(EngineError::NotFound(_)) => Ok(()),
          Err(e) => Err(e),
        }
      }
      Err(e) => Err(e),
    }
  }
}

/// Hash prefix match in both directions: the daemon may report a
/// truncated id where the stored hash is full, or vice versa.
fn image_matches(
  container: &ContainerListItem,
  image_hash: &str,
) -> bool {
  let matches = |id: &str| {
    id.starts_with(image_hash) || image_hash.starts_with(id)
  };
  container.image_id.as_deref().map(matches).unwrap_or(false)
    || container.image.as_deref().map(matches).unwrap_or(false)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn container(
    image: Option<&str>,
    image_id: Option<&str>,
  ) -> ContainerListItem {
    ContainerListItem {
      id: String::from("c1"),
      name: String::from("team-a"),
      image: image.map(String::from),
      image_id: image_id.map(String::from),
      running: false,
      created: None,
    }
  }

  #[test]
  fn image_match_prefix_both_directions() {
    let full = "sha256:0a1b2c3d4e5f";
    let truncated = "sha256:0a1b2c";
    assert!(image_matches(&container(None, Some(full)), truncated));
    assert!(image_matches(&container(None, Some(truncated)), full));
    assert!(image_matches(&container(Some(full), None), full));
    assert!(!image_matches(
      &container(Some("sha256:ffff"), Some("sha256:eeee")),
      full
    ));
    assert!(!image_matches(&container(None, None), full));
  }
}
