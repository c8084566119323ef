use chrono::Utc;
use futures::StreamExt;
use showcase_client::{
  EngineError, EngineResult,
  entities::{
    docker::BuildEvent,
    logs::{DeployEvent, LogEvent, StdioStream},
  },
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
  docker::LogsQuery, engine::Engine, helpers::query,
  transport::framing::{LogDemuxer, StreamKind},
};

pub mod framing;

pub const DEFAULT_LOG_TAIL: u64 = 100;
pub const MAX_LOG_TAIL: u64 = 10_000;

#[derive(Debug, Clone, Default)]
pub struct RuntimeLogQuery {
  pub tail: Option<u64>,
  /// Unix seconds.
  pub since: Option<i64>,
  pub timestamps: bool,
}

/// The outbound text for one build event. `Stream` text passes
/// through verbatim; the same text is what accumulates into the
/// project's stored build logs.
pub fn build_event_text(event: &BuildEvent) -> String {
  match event {
    BuildEvent::Stream { text } => text.clone(),
    BuildEvent::Status { status, progress } => match progress {
      Some(progress) => format!("{status} {progress}\n"),
      None => format!("{status}\n"),
    },
    BuildEvent::Error { message } => format!("ERROR: {message}\n"),
  }
}

impl Engine {
  /// Follow a project's container logs as decoded events. Frames are
  /// delivered in daemon order; stdout / stderr interleaving is
  /// preserved. Dropping the returned stream tears down the
  /// underlying byte stream.
  #[instrument(skip(self))]
  pub async fn stream_runtime_logs(
    &self,
    project_id: &str,
    opts: RuntimeLogQuery,
  ) -> EngineResult<ReceiverStream<LogEvent>> {
    let project = query::find_project(&self.db, project_id).await?;
    let Some(container_id) = project.container_id else {
      return Err(EngineError::BadRequest(format!(
        "project {project_id} has no container"
      )));
    };
    let tail =
      opts.tail.unwrap_or(DEFAULT_LOG_TAIL).min(MAX_LOG_TAIL);
    let mut upstream = self.docker.container_logs(
      &container_id,
      &LogsQuery {
        follow: true,
        tail,
        since: opts.since,
        timestamps: opts.timestamps,
      },
    );
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(async move {
      let mut demuxer = LogDemuxer::default();
      while let Some(res) = upstream.next().await {
        let chunk = match res {
          Ok(chunk) => chunk,
          Err(e) => {
            let _ = tx
              .send(LogEvent::Error {
                message: format!("{e:#}"),
              })
              .await;
            return;
          }
        };
        for frame in demuxer.push(&chunk) {
          let stream = match frame.kind {
            StreamKind::Stdout => StdioStream::Stdout,
            StreamKind::Stderr => StdioStream::Stderr,
            StreamKind::Stdin => continue,
          };
          let event = LogEvent::Log {
            stream,
            data: String::from_utf8_lossy(&frame.payload)
              .into_owned(),
            timestamp: Utc::now().to_rfc3339(),
          };
          // Send failure means the consumer disconnected: drop the
          // upstream byte stream with this task.
          if tx.send(event).await.is_err() {
            return;
          }
        }
      }
      let _ = tx.send(LogEvent::End).await;
    });
    Ok(ReceiverStream::new(rx))
  }

  /// Replay a project's stored build logs as a deploy event stream.
  #[instrument(skip(self))]
  pub async fn stream_build_logs(
    &self,
    project_id: &str,
  ) -> EngineResult<
    futures::stream::Iter<std::vec::IntoIter<DeployEvent>>,
  > {
    let project = query::find_project(&self.db, project_id).await?;
    let events = vec![
      DeployEvent::Start {
        project: project.clone(),
      },
      DeployEvent::Log {
        data: project.build_logs.clone(),
      },
      DeployEvent::Complete { project },
    ];
    Ok(futures::stream::iter(events))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn build_event_text_shapes() {
    assert_eq!(
      build_event_text(&BuildEvent::Stream {
        text: String::from("Step 1/4 : FROM python:3.11\n"),
      }),
      "Step 1/4 : FROM python:3.11\n"
    );
    assert_eq!(
      build_event_text(&BuildEvent::Status {
        status: String::from("Downloading"),
        progress: Some(String::from("[=====>    ] 12MB/20MB")),
      }),
      "Downloading [=====>    ] 12MB/20MB\n"
    );
    assert_eq!(
      build_event_text(&BuildEvent::Status {
        status: String::from("Pull complete"),
        progress: None,
      }),
      "Pull complete\n"
    );
    assert_eq!(
      build_event_text(&BuildEvent::Error {
        message: String::from("executor failed"),
      }),
      "ERROR: executor failed\n"
    );
  }
}
