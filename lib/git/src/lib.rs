use std::path::Path;

use anyhow::anyhow;
use run_command::async_run_command;

/// Clone `url` into `destination`, blocking until the checkout is
/// complete. Any existing directory at the destination is removed
/// first. A non-zero git exit is an error carrying the trailing
/// stderr / stdout lines as context.
#[tracing::instrument(level = "debug")]
pub async fn clone_repo(
  url: &str,
  destination: &Path,
) -> anyhow::Result<()> {
  let _ = tokio::fs::remove_dir_all(destination).await;
  let command =
    format!("git clone {url} {}", destination.display());
  let output = async_run_command(&command).await;
  if output.success() {
    tracing::debug!("repo cloned to {destination:?}");
    return Ok(());
  }
  let mut e = anyhow!("End of trace");
  for line in
    output.stderr.split('\n').filter(|line| !line.is_empty()).rev()
  {
    e = e.context(line.to_string());
  }
  for line in
    output.stdout.split('\n').filter(|line| !line.is_empty()).rev()
  {
    e = e.context(line.to_string());
  }
  Err(e.context(format!("Failed to clone {url}")))
}
