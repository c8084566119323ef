use serde::{Deserialize, Serialize};

use crate::entities::project::Project;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum StdioStream {
  Stdout,
  Stderr,
}

/// One record on a runtime log stream. Frames are delivered in the
/// order the daemon produced them; stdout / stderr interleaving is
/// preserved as-is.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEvent {
  Log {
    stream: StdioStream,
    data: String,
    /// Wall-clock iso string taken at decode time.
    timestamp: String,
  },
  End,
  Error {
    message: String,
  },
}

/// One record on a streaming deploy. `Start` is always first;
/// exactly one of `Complete` / `Error` is last.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeployEvent {
  Start { project: Project },
  Log { data: String },
  Complete { project: Project },
  Error { message: String },
}
