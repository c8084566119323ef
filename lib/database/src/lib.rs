use anyhow::{Context, anyhow};
use mungos::{
  init::MongoBuilder,
  mongodb::{
    Collection, Database, IndexModel, bson::doc,
    options::IndexOptions,
  },
};
use showcase_client::entities::{
  config::DatabaseConfig, course::CourseOffering, project::Project,
  team::Team,
  user::{Enrollment, User},
};

pub use mongo_indexed;
pub use mungos;

#[derive(Debug)]
pub struct Client {
  pub projects: Collection<Project>,
  pub teams: Collection<Team>,
  pub course_offerings: Collection<CourseOffering>,
  pub users: Collection<User>,
  pub enrollments: Collection<Enrollment>,
  //
  pub db: Database,
}

impl Client {
  pub async fn new(
    config: &DatabaseConfig,
  ) -> anyhow::Result<Client> {
    let db = init(config).await?;
    Self::from_database(db).await
  }

  pub async fn from_database(db: Database) -> anyhow::Result<Client> {
    let projects: Collection<Project> =
      mongo_indexed::collection(&db, true).await?;

    // Unique across projects when non-null. Sparse, so the many rows
    // with no container (failed / pruned) don't collide on null.
    projects
      .create_index(
        IndexModel::builder()
          .keys(doc! { "container_id": 1 })
          .options(
            IndexOptions::builder()
              .unique(true)
              .sparse(true)
              .build(),
          )
          .build(),
      )
      .await
      .context("Failed to create container_id index")?;

    let client = Client {
      projects,
      teams: mongo_indexed::collection(&db, true).await?,
      course_offerings: mongo_indexed::collection(&db, true).await?,
      users: mongo_indexed::collection(&db, true).await?,
      enrollments: mongo_indexed::collection(&db, true).await?,
      //
      db,
    };
    Ok(client)
  }
}

/// Connect and return the raw database handle, without creating
/// any indexes. A full uri wins over address credentials; a bare
/// address connects unauthenticated.
pub async fn init(
  config: &DatabaseConfig,
) -> anyhow::Result<Database> {
  let mut builder =
    MongoBuilder::default().app_name(&config.app_name);

  if !config.uri.is_empty() {
    builder = builder.uri(&config.uri);
  } else if config.address.is_empty() {
    return Err(anyhow!(
      "Database is not configured. Set SHOWCASE_DATABASE_URI, or SHOWCASE_DATABASE_ADDRESS (with SHOWCASE_DATABASE_USERNAME / SHOWCASE_DATABASE_PASSWORD for auth)."
    ));
  } else {
    builder = builder.address(&config.address);
    if !config.username.is_empty() && !config.password.is_empty() {
      builder = builder
        .username(&config.username)
        .password(&config.password);
    }
  }

  let client = builder
    .build()
    .await
    .context("Failed to connect to the showcase database")?;

  Ok(client.database(&config.db_name))
}
