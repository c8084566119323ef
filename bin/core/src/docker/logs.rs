use bollard::{
  container::LogOutput, query_parameters::LogsOptions,
};
use bytes::Bytes;
use futures::StreamExt;
use showcase_client::EngineResult;

use crate::transport::framing::{StreamKind, encode_frame};

use super::{DockerClient, daemon_error};

#[derive(Debug, Clone, Default)]
pub struct LogsQuery {
  pub follow: bool,
  pub tail: u64,
  /// Unix seconds; 0 means from the start.
  pub since: Option<i64>,
  pub timestamps: bool,
}

impl DockerClient {
  /// The container's log stream in the daemon's multiplexed framing
  /// (8-byte header, big-endian payload length). The transport layer
  /// owns decoding.
  pub fn container_logs(
    &self,
    id: &str,
    query: &LogsQuery,
  ) -> futures::stream::BoxStream<'static, EngineResult<Bytes>> {
    let options = LogsOptions {
      follow: query.follow,
      stdout: true,
      stderr: true,
      timestamps: query.timestamps,
      since: query.since.unwrap_or_default() as i32,
      tail: query.tail.to_string(),
      ..Default::default()
    };
    let entity = format!("container {id}");
    self
      .docker
      .logs(id, Some(options))
      .map(move |res| {
        res
          .map(mux_frame)
          .map_err(|e| daemon_error(e, &entity))
      })
      .boxed()
  }
}

/// Frame one daemon log record back onto the wire format it arrived
/// in. Console output (tty containers) is attributed to stdout.
fn mux_frame(output: LogOutput) -> Bytes {
  match output {
    LogOutput::StdOut { message }
    | LogOutput::Console { message } => {
      encode_frame(StreamKind::Stdout, &message)
    }
    LogOutput::StdErr { message } => {
      encode_frame(StreamKind::Stderr, &message)
    }
    LogOutput::StdIn { message } => {
      encode_frame(StreamKind::Stdin, &message)
    }
  }
}
