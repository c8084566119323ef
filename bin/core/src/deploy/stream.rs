use std::{
  pin::Pin,
  sync::Arc,
  task::{Context, Poll},
};

use futures::{Stream, StreamExt};
use showcase_client::{
  EngineResult,
  entities::{
    deploy::DeployArgs, docker::BuildEvent, logs::DeployEvent,
    project::Project, team::Team, to_deploy_name,
  },
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
  deploy::cleanup_clone_dir,
  engine::Engine,
  helpers::{self, query},
  permission, transport,
};

/// The event stream of one in-flight deploy. `Start` arrives first,
/// then one `Log` per build event, then a terminal `Complete` with
/// the running project, or `Error`. Dropping the stream abandons
/// observation only: the build still runs to daemon completion, and
/// the project is marked failed rather than started.
pub struct DeployStream {
  events: ReceiverStream<DeployEvent>,
}

impl Stream for DeployStream {
  type Item = DeployEvent;
  fn poll_next(
    mut self: Pin<&mut Self>,
    cx: &mut Context<'_>,
  ) -> Poll<Option<Self::Item>> {
    Pin::new(&mut self.events).poll_next(cx)
  }
}

impl Engine {
  /// Like [Engine::deploy], but exposes the build events in real
  /// time instead of blocking until the container runs.
  #[instrument(skip(self))]
  pub async fn deploy_streaming(
    self: &Arc<Self>,
    args: DeployArgs,
  ) -> EngineResult<DeployStream> {
    let team = query::find_team(&self.db, &args.team_id).await?;
    permission::ensure_can_deploy(
      &self.db,
      &args.deployed_by,
      &team,
    )
    .await?;
    let project = self.create_project(&team, &args).await?;

    let (tx, rx) = mpsc::channel(64);
    let engine = self.clone();
    tokio::spawn(async move {
      engine.drive_streaming_deploy(project, team, args, tx).await;
    });
    Ok(DeployStream {
      events: ReceiverStream::new(rx),
    })
  }

  async fn drive_streaming_deploy(
    &self,
    project: Project,
    team: Team,
    args: DeployArgs,
    tx: mpsc::Sender<DeployEvent>,
  ) {
    let _ = tx
      .send(DeployEvent::Start {
        project: project.clone(),
      })
      .await;

    let name = to_deploy_name(&team.name);
    self.preempt_running(&team.id).await;
    self.remove_container_by_name(&name).await;
    if let Err(e) = self.ensure_project_network().await {
      self
        .fail_streaming(&project.id, &tx, format!("{e:#}"))
        .await;
      return;
    }

    let clone_dir = helpers::scoped_clone_dir(&args.github_url);
    if let Err(e) =
      git::clone_repo(&args.github_url, &clone_dir).await
    {
      cleanup_clone_dir(&clone_dir).await;
      self
        .fail_streaming(&project.id, &tx, format!("{e:#}"))
        .await;
      return;
    }

    let image_ref = format!("{name}:latest");
    let mut stream = match self
      .docker
      .build_image(&clone_dir, &image_ref, &args.build_args)
      .await
    {
      Ok(stream) => stream,
      Err(e) => {
        cleanup_clone_dir(&clone_dir).await;
        self
          .fail_streaming(&project.id, &tx, format!("{e:#}"))
          .await;
        return;
      }
    };

    let mut logs = String::new();
    let mut build_error = None;
    let mut receiver_gone = tx.is_closed();
    while let Some(event) = stream.next().await {
      let text = transport::build_event_text(&event);
      logs.push_str(&text);
      if let BuildEvent::Error { message } = event {
        build_error = Some(message);
        break;
      }
      // A failed send means the client disconnected. Keep draining
      // so the daemon finishes the build, but the deploy must not
      // complete.
      if !receiver_gone
        && tx.send(DeployEvent::Log { data: text }).await.is_err()
      {
        receiver_gone = true;
      }
    }
    drop(stream);
    cleanup_clone_dir(&clone_dir).await;

    if let Some(message) = build_error {
      self.persist_build_logs(&project.id, &logs).await;
      self.fail_streaming(&project.id, &tx, message).await;
      return;
    }
    if receiver_gone {
      self.persist_build_logs(&project.id, &logs).await;
      self.mark_failed(&project.id).await;
      return;
    }

    match self
      .finish_build(&project, &name, &image_ref, logs, None, Vec::new())
      .await
    {
      Ok(project) => {
        let _ = tx.send(DeployEvent::Complete { project }).await;
      }
      Err(e) => {
        self
          .fail_streaming(&project.id, &tx, format!("{e:#}"))
          .await;
      }
    }
  }

  async fn fail_streaming(
    &self,
    project_id: &str,
    tx: &mpsc::Sender<DeployEvent>,
    message: String,
  ) {
    self.mark_failed(project_id).await;
    let _ = tx.send(DeployEvent::Error { message }).await;
  }
}
