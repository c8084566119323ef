use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// The failure kinds surfaced at engine operation boundaries.
/// The HTTP facade maps these onto status codes; the engine
/// itself knows nothing about HTTP.
#[derive(Debug, Error)]
pub enum EngineError {
  /// An entity is absent: team, project, container, image, data file.
  #[error("{0}")]
  NotFound(String),

  /// The permission predicate failed for the calling user.
  #[error("{0}")]
  Forbidden(String),

  /// Unique-name or duplicate-label collision.
  #[error("{0}")]
  Conflict(String),

  /// Structurally invalid input.
  #[error("{0}")]
  BadRequest(String),

  /// The build stream ended with an error. Carries the daemon's
  /// message along with the full accumulated build output.
  #[error("{message}")]
  BuildFailed { message: String, logs: String },

  /// Any other upstream failure.
  #[error(transparent)]
  Daemon(#[from] anyhow::Error),
}
