use std::{collections::HashSet, str::FromStr};

use anyhow::Context;
use database::mungos::{
  find::find_collect,
  mongodb::{
    bson::{Document, doc, oid::ObjectId},
    options::FindOneOptions,
  },
};
use showcase_client::{
  EngineError, EngineResult,
  entities::{
    course::CourseOffering,
    project::{Project, ProjectStatus},
    team::Team,
    user::{EnrollmentRole, User},
  },
};

pub fn object_id(id: &str) -> EngineResult<ObjectId> {
  ObjectId::from_str(id).map_err(|_| {
    EngineError::BadRequest(format!("invalid id: {id}"))
  })
}

pub async fn find_project(
  db: &database::Client,
  id: &str,
) -> EngineResult<Project> {
  db
    .projects
    .find_one(doc! { "_id": object_id(id)? })
    .await
    .context("failed to query projects")?
    .ok_or_else(|| {
      EngineError::NotFound(format!("no project matching {id}"))
    })
}

pub async fn find_project_by_container(
  db: &database::Client,
  container_id: &str,
) -> EngineResult<Option<Project>> {
  let project = db
    .projects
    .find_one(doc! { "container_id": container_id })
    .await
    .context("failed to query projects")?;
  Ok(project)
}

pub async fn find_team(
  db: &database::Client,
  id: &str,
) -> EngineResult<Team> {
  db
    .teams
    .find_one(doc! { "_id": object_id(id)? })
    .await
    .context("failed to query teams")?
    .ok_or_else(|| {
      EngineError::NotFound(format!("no team matching {id}"))
    })
}

pub async fn find_offering(
  db: &database::Client,
  id: &str,
) -> EngineResult<CourseOffering> {
  db
    .course_offerings
    .find_one(doc! { "_id": object_id(id)? })
    .await
    .context("failed to query course offerings")?
    .ok_or_else(|| {
      EngineError::NotFound(format!(
        "no course offering matching {id}"
      ))
    })
}

pub async fn find_user(
  db: &database::Client,
  id: &str,
) -> EngineResult<User> {
  db
    .users
    .find_one(doc! { "_id": object_id(id)? })
    .await
    .context("failed to query users")?
    .ok_or_else(|| {
      EngineError::NotFound(format!("no user matching {id}"))
    })
}

pub async fn is_instructor(
  db: &database::Client,
  user_id: &str,
  offering_id: &str,
) -> EngineResult<bool> {
  let enrollment = db
    .enrollments
    .find_one(doc! {
      "user_id": user_id,
      "course_offering_id": offering_id,
      "role": EnrollmentRole::Instructor.as_ref(),
    })
    .await
    .context("failed to query enrollments")?;
  Ok(enrollment.is_some())
}

pub async fn teams_for_offering(
  db: &database::Client,
  offering_id: &str,
) -> EngineResult<Vec<Team>> {
  let teams = find_collect(
    &db.teams,
    doc! { "course_offering_id": offering_id },
    None,
  )
  .await
  .context("failed to query teams")?;
  Ok(teams)
}

pub async fn running_projects_for_team(
  db: &database::Client,
  team_id: &str,
) -> EngineResult<Vec<Project>> {
  let projects = find_collect(
    &db.projects,
    doc! {
      "team_id": team_id,
      "status": ProjectStatus::Running.as_ref(),
    },
    None,
  )
  .await
  .context("failed to query projects")?;
  Ok(projects)
}

pub async fn running_projects(
  db: &database::Client,
) -> EngineResult<Vec<Project>> {
  let projects = find_collect(
    &db.projects,
    doc! { "status": ProjectStatus::Running.as_ref() },
    None,
  )
  .await
  .context("failed to query projects")?;
  Ok(projects)
}

/// The team's preferred project: newest running if any, else newest
/// regardless of status, by `deployed_at` desc.
pub async fn preferred_project_for_team(
  db: &database::Client,
  team_id: &str,
) -> EngineResult<Option<Project>> {
  let newest = FindOneOptions::builder()
    .sort(doc! { "deployed_at": -1 })
    .build();
  let running = db
    .projects
    .find_one(doc! {
      "team_id": team_id,
      "status": ProjectStatus::Running.as_ref(),
    })
    .with_options(newest.clone())
    .await
    .context("failed to query projects")?;
  if running.is_some() {
    return Ok(running);
  }
  let any = db
    .projects
    .find_one(doc! { "team_id": team_id })
    .with_options(newest)
    .await
    .context("failed to query projects")?;
  Ok(any)
}

/// Untagged projects which are neither running nor already pruned.
pub async fn prune_candidates(
  db: &database::Client,
) -> EngineResult<Vec<Project>> {
  let projects = find_collect(
    &db.projects,
    doc! {
      "status": { "$nin": [
        ProjectStatus::Running.as_ref(),
        ProjectStatus::Pruned.as_ref(),
      ] },
      "tag": null,
    },
    None,
  )
  .await
  .context("failed to query projects")?;
  Ok(projects)
}

/// Image hashes which must not be removed: those of running
/// projects, plus those of tagged non-pruned projects. A project id
/// passed in `exclude` is left out of both unions.
pub async fn protected_image_hashes(
  db: &database::Client,
  exclude: Option<&str>,
) -> EngineResult<HashSet<String>> {
  let mut running = doc! {
    "status": ProjectStatus::Running.as_ref(),
    "image_hash": { "$ne": "" },
  };
  let mut tagged = doc! {
    "tag": { "$ne": null },
    "status": { "$ne": ProjectStatus::Pruned.as_ref() },
    "image_hash": { "$ne": "" },
  };
  if let Some(exclude) = exclude {
    let id = object_id(exclude)?;
    running.insert("_id", doc! { "$ne": id });
    tagged.insert("_id", doc! { "$ne": id });
  }
  let mut protected = HashSet::new();
  for filter in [running, tagged] {
    protected.extend(
      find_collect(&db.projects, filter, None)
        .await
        .context("failed to query projects")?
        .into_iter()
        .map(|project| project.image_hash),
    );
  }
  Ok(protected)
}

pub async fn insert_project(
  db: &database::Client,
  mut project: Project,
) -> EngineResult<Project> {
  let res = db
    .projects
    .insert_one(&project)
    .await
    .context("failed to insert project")?;
  project.id = res
    .inserted_id
    .as_object_id()
    .context("no object id on insert result")?
    .to_hex();
  Ok(project)
}

/// Narrow update: applies `$set` on the given fields, preserving
/// everything unset.
pub async fn update_project(
  db: &database::Client,
  id: &str,
  set: Document,
) -> EngineResult<()> {
  db
    .projects
    .update_one(
      doc! { "_id": object_id(id)? },
      doc! { "$set": set },
    )
    .await
    .context("failed to update project")?;
  Ok(())
}

pub async fn untag_projects(
  db: &database::Client,
  team_ids: &[String],
  label: &str,
) -> EngineResult<u64> {
  let res = db
    .projects
    .update_many(
      doc! { "team_id": { "$in": team_ids }, "tag": label },
      doc! { "$set": { "tag": null } },
    )
    .await
    .context("failed to untag projects")?;
  Ok(res.modified_count)
}

pub async fn push_offering_tag(
  db: &database::Client,
  offering_id: &str,
  label: &str,
) -> EngineResult<()> {
  db
    .course_offerings
    .update_one(
      doc! { "_id": object_id(offering_id)? },
      doc! { "$push": { "settings.project_tags": label } },
    )
    .await
    .context("failed to update offering settings")?;
  Ok(())
}

pub async fn pull_offering_tag(
  db: &database::Client,
  offering_id: &str,
  label: &str,
) -> EngineResult<()> {
  db
    .course_offerings
    .update_one(
      doc! { "_id": object_id(offering_id)? },
      doc! { "$pull": { "settings.project_tags": label } },
    )
    .await
    .context("failed to update offering settings")?;
  Ok(())
}
