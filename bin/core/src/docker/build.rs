use std::{collections::HashMap, path::Path};

use anyhow::Context;
use bollard::{
  query_parameters::BuildImageOptions, secret::BuildInfo,
};
use futures::StreamExt;
use showcase_client::{
  EngineResult, entities::docker::BuildEvent,
};

use super::DockerClient;

impl DockerClient {
  /// Build an image from `context_dir`, tagged `tag`. The returned
  /// stream ends on success or after an `Error` event carrying the
  /// daemon's message.
  pub async fn build_image(
    &self,
    context_dir: &Path,
    tag: &str,
    build_args: &HashMap<String, String>,
  ) -> EngineResult<futures::stream::BoxStream<'_, BuildEvent>>
  {
    let context_dir = context_dir.to_owned();
    let tar_bytes = tokio::task::spawn_blocking(move || {
      build_context_tar(&context_dir)
    })
    .await
    .context("build context task panicked")??;

    let options = BuildImageOptions {
      t: Some(tag.to_string()),
      buildargs: (!build_args.is_empty())
        .then(|| build_args.clone()),
      rm: true,
      ..Default::default()
    };

    let stream = self
      .docker
      .build_image(
        options,
        None,
        Some(bollard::body_full(tar_bytes.into())),
      )
      .filter_map(|res| {
        futures::future::ready(match res {
          Ok(info) => convert_build_info(info),
          Err(e) => Some(BuildEvent::Error {
            message: e.to_string(),
          }),
        })
      })
      .boxed();
    Ok(stream)
  }
}

fn convert_build_info(info: BuildInfo) -> Option<BuildEvent> {
  if let Some(error) = info.error {
    let message = info
      .error_detail
      .and_then(|detail| detail.message)
      .unwrap_or(error);
    return Some(BuildEvent::Error { message });
  }
  if let Some(status) = info.status {
    return Some(BuildEvent::Status {
      status,
      progress: info.progress,
    });
  }
  info.stream.map(|text| BuildEvent::Stream { text })
}

fn build_context_tar(dir: &Path) -> anyhow::Result<Vec<u8>> {
  let mut archive = tar::Builder::new(Vec::new());
  archive
    .append_dir_all(".", dir)
    .with_context(|| format!("Failed to tar build context {dir:?}"))?;
  archive.into_inner().context("Failed to finalize build context")
}
