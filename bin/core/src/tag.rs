use database::mungos::mongodb::bson::doc;
use serde::Serialize;
use showcase_client::{
  EngineError, EngineResult,
  entities::to_deploy_name,
};

use crate::{engine::Engine, helpers::query};

#[derive(Debug, Default, Serialize)]
pub struct TagSummary {
  pub tagged: usize,
  pub skipped: usize,
  pub errors: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct UntagSummary {
  pub untagged: u64,
  pub errors: Vec<String>,
}

impl Engine {
  /// Pin each team's preferred project under `label`: the daemon
  /// image is tagged `{team}:{label}` and the project row records
  /// the label, protecting its image from pruning. Teams without a
  /// project, or whose image is gone from the daemon, are skipped.
  #[instrument(skip(self))]
  pub async fn tag_course_offering(
    &self,
    offering_id: &str,
    label: &str,
  ) -> EngineResult<TagSummary> {
    let offering =
      query::find_offering(&self.db, offering_id).await?;
    if offering
      .settings
      .project_tags
      .iter()
      .any(|tag| tag == label)
    {
      return Err(EngineError::Conflict(format!(
        "label {label} was already applied to this offering"
      )));
    }

    let teams =
      query::teams_for_offering(&self.db, offering_id).await?;

    let mut summary = TagSummary::default();
    for team in teams {
      let project =
        match query::preferred_project_for_team(&self.db, &team.id)
          .await
        {
          Ok(Some(project)) => project,
          Ok(None) => {
            summary.skipped += 1;
            continue;
          }
          Err(e) => {
            summary
              .errors
              .push(format!("team {}: {e:#}", team.name));
            continue;
          }
        };
      if project.image_hash.is_empty() {
        summary.skipped += 1;
        continue;
      }
      match self.docker.inspect_image(&project.image_hash).await {
        Ok(_) => {}
        Err(EngineError::NotFound(_)) => {
          summary.skipped += 1;
          continue;
        }
        Err(e) => {
          summary
            .errors
            .push(format!("team {}: {e:#}", team.name));
          continue;
        }
      }
      let res = async {
        self
          .docker
          .tag_image(
            &project.image_hash,
            &to_deploy_name(&team.name),
            label,
          )
          .await?;
        query::update_project(
          &self.db,
          &project.id,
          doc! { "tag": label },
        )
        .await
      }
      .await;
      match res {
        Ok(()) => summary.tagged += 1,
        Err(e) => summary
          .errors
          .push(format!("team {}: {e:#}", team.name)),
      }
    }

    query::push_offering_tag(&self.db, offering_id, label).await?;
    Ok(summary)
  }

  /// Remove `label` from the offering settings and from every
  /// project carrying it. Idempotent on settings; the daemon-side
  /// image tag stays until pruning removes the image.
  #[instrument(skip(self))]
  pub async fn untag_course_offering(
    &self,
    offering_id: &str,
    label: &str,
  ) -> EngineResult<UntagSummary> {
    query::find_offering(&self.db, offering_id).await?;
    query::pull_offering_tag(&self.db, offering_id, label).await?;

    let teams =
      query::teams_for_offering(&self.db, offering_id).await?;
    let team_ids =
      teams.into_iter().map(|team| team.id).collect::<Vec<_>>();

    let mut summary = UntagSummary::default();
    match query::untag_projects(&self.db, &team_ids, label).await {
      Ok(untagged) => summary.untagged = untagged,
      Err(e) => summary
        .errors
        .push(format!("failed to untag projects: {e:#}")),
    }
    Ok(summary)
  }
}
