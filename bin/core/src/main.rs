#[macro_use]
extern crate tracing;

use std::sync::Arc;

use showcase_core::{config::core_config, engine::Engine};

async fn app() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();
  let config = core_config();
  logger::init(&config.logging)?;

  info!("Showcase Core version: v{}", env!("CARGO_PKG_VERSION"));
  info!("{:?}", config.sanitized());

  let engine = Arc::new(Engine::new().await?);

  engine.spawn_reconciler();
  engine.spawn_prune_schedule();

  info!(
    "engine ready | network: {} | reconcile: {} | prune: {}",
    config.projects_network,
    config.reconcile_interval,
    config.prune_schedule
  );

  // Operations are driven in-process by the facade; this binary
  // parks here until terminated.
  std::future::pending::<()>().await;
  Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let mut term_signal = tokio::signal::unix::signal(
    tokio::signal::unix::SignalKind::terminate(),
  )?;
  tokio::select! {
    res = tokio::spawn(app()) => res?,
    _ = term_signal.recv() => Ok(()),
  }
}
