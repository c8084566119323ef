use anyhow::Context;
use bollard::Docker;
use showcase_client::EngineError;

mod build;
mod containers;
mod images;
mod logs;
mod networks;

pub use containers::ContainerSpec;
pub use logs::LogsQuery;

/// Typed wrapper over the daemon API, exposing only the operations
/// the engine needs. Failures carry the engine error kinds: daemon
/// 404 maps to `NotFound`, 409 to `Conflict`; 304 (already in the
/// desired state) is normalized to success where it can occur.
pub struct DockerClient {
  docker: Docker,
}

impl DockerClient {
  pub fn new() -> anyhow::Result<DockerClient> {
    Ok(DockerClient {
      docker: Docker::connect_with_defaults()
        .context("failed to connect to docker daemon")?,
    })
  }
}

fn response_status(e: &bollard::errors::Error) -> Option<u16> {
  match e {
    bollard::errors::Error::DockerResponseServerError {
      status_code,
      ..
    } => Some(*status_code),
    _ => None,
  }
}

pub(crate) fn is_not_modified(
  e: &bollard::errors::Error,
) -> bool {
  response_status(e) == Some(304)
}

/// Convert a daemon error into the engine kind for `entity`.
pub(crate) fn daemon_error(
  e: bollard::errors::Error,
  entity: &str,
) -> EngineError {
  match response_status(&e) {
    Some(404) => {
      EngineError::NotFound(format!("{entity} not found on daemon"))
    }
    Some(409) => EngineError::Conflict(format!("{entity}: {e}")),
    _ => EngineError::Daemon(
      anyhow::Error::new(e)
        .context(format!("daemon error on {entity}")),
    ),
  }
}
