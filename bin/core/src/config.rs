use std::sync::OnceLock;

use colored::Colorize;
use showcase_client::entities::{
  config::{CoreConfig, Env},
  logger::LogConfig,
};

pub fn core_config() -> &'static CoreConfig {
  static CORE_CONFIG: OnceLock<CoreConfig> = OnceLock::new();
  CORE_CONFIG.get_or_init(|| {
    let env: Env = match envy::from_env() {
      Ok(env) => env,
      Err(e) => {
        println!(
          "{}: Failed to parse Showcase Core environment: {e:?}",
          "ERROR".red()
        );
        std::process::exit(1);
      }
    };
    let config = CoreConfig::default();

    // Apply env overrides over the defaults.
    CoreConfig {
      projects_network: env
        .showcase_projects_network
        .unwrap_or(config.projects_network),
      data_mount_path: env
        .showcase_data_mount_path
        .unwrap_or(config.data_mount_path),
      container_data_dir: env
        .showcase_container_data_dir
        .unwrap_or(config.container_data_dir),
      host_data_dir: env
        .showcase_host_data_dir
        .or(config.host_data_dir),
      clone_dir: env.showcase_clone_dir.unwrap_or(config.clone_dir),
      reconcile_interval: env
        .showcase_reconcile_interval
        .unwrap_or(config.reconcile_interval),
      prune_schedule: env
        .showcase_prune_schedule
        .unwrap_or(config.prune_schedule),
      container_memory_mb: env
        .showcase_container_memory_mb
        .unwrap_or(config.container_memory_mb),
      legacy_sql_image: env
        .showcase_legacy_sql_image
        .unwrap_or(config.legacy_sql_image),
      legacy_json_image: env
        .showcase_legacy_json_image
        .unwrap_or(config.legacy_json_image),
      database: showcase_client::entities::config::DatabaseConfig {
        uri: env
          .showcase_database_uri
          .unwrap_or(config.database.uri),
        address: env
          .showcase_database_address
          .unwrap_or(config.database.address),
        username: env
          .showcase_database_username
          .unwrap_or(config.database.username),
        password: env
          .showcase_database_password
          .unwrap_or(config.database.password),
        app_name: env
          .showcase_database_app_name
          .unwrap_or(config.database.app_name),
        db_name: env
          .showcase_database_db_name
          .unwrap_or(config.database.db_name),
      },
      logging: LogConfig {
        level: env
          .showcase_logging_level
          .unwrap_or(config.logging.level),
        stdio: env
          .showcase_logging_stdio
          .unwrap_or(config.logging.stdio),
        pretty: env
          .showcase_logging_pretty
          .unwrap_or(config.logging.pretty),
      },
    }
  })
}
