use showcase_client::{
  EngineError, EngineResult, entities::team::Team,
};

use crate::helpers::query;

/// Deploys are open unless the offering is server-locked, in which
/// case only admins and instructors may deploy.
pub fn deploy_permitted(
  admin: bool,
  server_locked: bool,
  instructor: bool,
) -> bool {
  !server_locked || admin || instructor
}

/// Stop: admins always; instructors always; team members only while
/// the offering is not server-locked.
pub fn stop_permitted(
  admin: bool,
  server_locked: bool,
  instructor: bool,
  member: bool,
) -> bool {
  if admin {
    true
  } else if server_locked {
    instructor
  } else {
    instructor || member
  }
}

pub async fn ensure_can_deploy(
  db: &database::Client,
  caller_id: &str,
  team: &Team,
) -> EngineResult<()> {
  let offering =
    query::find_offering(db, &team.course_offering_id).await?;
  if !offering.settings.server_locked {
    return Ok(());
  }
  let user = query::find_user(db, caller_id).await?;
  let instructor =
    query::is_instructor(db, caller_id, &offering.id).await?;
  if deploy_permitted(user.admin, true, instructor) {
    Ok(())
  } else {
    Err(EngineError::Forbidden(String::from(
      "the server is locked for this course offering",
    )))
  }
}

pub async fn ensure_can_stop(
  db: &database::Client,
  caller_id: &str,
  team: &Team,
) -> EngineResult<()> {
  let user = query::find_user(db, caller_id).await?;
  if user.admin {
    return Ok(());
  }
  let offering =
    query::find_offering(db, &team.course_offering_id).await?;
  let instructor =
    query::is_instructor(db, caller_id, &offering.id).await?;
  let member = team.member_ids.iter().any(|id| id == caller_id);
  if stop_permitted(
    false,
    offering.settings.server_locked,
    instructor,
    member,
  ) {
    Ok(())
  } else {
    Err(EngineError::Forbidden(String::from(
      "not permitted to stop this project",
    )))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn deploy_predicate() {
    assert!(deploy_permitted(false, false, false));
    assert!(deploy_permitted(true, true, false));
    assert!(deploy_permitted(false, true, true));
    assert!(!deploy_permitted(false, true, false));
  }

  #[test]
  fn stop_predicate() {
    // admin always wins
    assert!(stop_permitted(true, true, false, false));
    // locked: instructors only
    assert!(stop_permitted(false, true, true, false));
    assert!(!stop_permitted(false, true, false, true));
    // unlocked: instructors or members
    assert!(stop_permitted(false, false, true, false));
    assert!(stop_permitted(false, false, false, true));
    assert!(!stop_permitted(false, false, false, false));
  }
}
