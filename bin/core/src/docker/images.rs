use anyhow::Context;
use bollard::query_parameters::{
  RemoveImageOptions, TagImageOptionsBuilder,
};
use showcase_client::{
  EngineResult, entities::docker::ImageInfo,
};

use super::{DockerClient, daemon_error};

impl DockerClient {
  pub async fn inspect_image(
    &self,
    reference: &str,
  ) -> EngineResult<ImageInfo> {
    let image = self
      .docker
      .inspect_image(reference)
      .await
      .map_err(|e| daemon_error(e, &format!("image {reference}")))?;
    Ok(ImageInfo {
      id: image.id.context("no id on image")?,
    })
  }

  /// Apply `repo:tag` to an existing image.
  pub async fn tag_image(
    &self,
    source: &str,
    repo: &str,
    tag: &str,
  ) -> EngineResult<()> {
    self
      .docker
      .tag_image(
        source,
        Some(
          TagImageOptionsBuilder::new().repo(repo).tag(tag).build(),
        ),
      )
      .await
      .map_err(|e| daemon_error(e, &format!("image {source}")))
  }

  pub async fn remove_image(
    &self,
    reference: &str,
  ) -> EngineResult<()> {
    self
      .docker
      .remove_image(reference, None::<RemoveImageOptions>, None)
      .await
      .map_err(|e| daemon_error(e, &format!("image {reference}")))?;
    Ok(())
  }
}
