//! イメージプッシュ処理
//!
//! ビルド済みの `repository:tag` をすべて `registry/repository:tag` に付け直し、
//! タグ順にプッシュする。認証はプッシュ開始前に一度だけ解決する。

use crate::auth::{RegistryAuth, RegistryLogin};
use crate::error::{BuildError, BuildResult};
use async_trait::async_trait;
use bollard::Docker;
use bollard::models::PushImageInfo;
use colored::Colorize;
use futures_util::StreamExt;
use pushgate_core::{CredentialPair, ImagePush, ImageReference, PushSpec};
use std::io::Write;

pub struct ImagePusher {
    docker: Docker,
    auth: RegistryAuth,
}

impl ImagePusher {
    pub fn new(docker: Docker, auth: RegistryAuth) -> Self {
        Self { docker, auth }
    }

    /// `target.registry` へ全タグをプッシュし、プッシュした参照を返す
    pub async fn push_all(
        &self,
        image: &ImageReference,
        target: &PushSpec,
        secrets: Option<&CredentialPair>,
    ) -> BuildResult<Vec<String>> {
        let login = self.auth.resolve(&target.registry, secrets).await?;
        tracing::info!(registry = %login.host, source = %login.source, "Resolved registry login");

        let remote_repo = image.remote_repository(&target.registry);
        let mut pushed = Vec::with_capacity(image.tags.len());
        for tag in &image.tags {
            self.retag(&image.local(tag), &remote_repo, tag).await?;
            pushed.push(self.push_one(&remote_repo, tag, &login).await?);
        }
        Ok(pushed)
    }

    async fn retag(&self, local: &str, remote_repo: &str, tag: &str) -> BuildResult<()> {
        #[allow(deprecated)]
        let options = bollard::image::TagImageOptions::<String> {
            repo: remote_repo.to_string(),
            tag: tag.to_string(),
        };

        self.docker
            .tag_image(local, Some(options))
            .await
            .map_err(|e| BuildError::PushFailed {
                reference: local.to_string(),
                message: format!("タグ付けに失敗しました: {}", e),
            })
    }

    async fn push_one(
        &self,
        remote_repo: &str,
        tag: &str,
        login: &RegistryLogin,
    ) -> BuildResult<String> {
        let reference = format!("{}:{}", remote_repo, tag);
        println!("  → {}", reference.cyan());
        tracing::info!(%reference, "Pushing image");

        #[allow(deprecated)]
        let options = bollard::image::PushImageOptions::<String> {
            tag: tag.to_string(),
        };
        #[allow(deprecated)]
        let mut stream = self
            .docker
            .push_image(remote_repo, Some(options), login.credentials.clone());

        let mut tally = LayerTally::default();
        while let Some(item) = stream.next().await {
            let info = item.map_err(|e| BuildError::PushFailed {
                reference: reference.clone(),
                message: e.to_string(),
            })?;
            tally.observe(&info);
        }

        if let Some(message) = tally.error {
            println!();
            return Err(BuildError::PushFailed { reference, message });
        }

        println!(
            "\r  {} {} ({} pushed, {} existed)          ",
            "✓".green(),
            tag,
            tally.pushed,
            tally.existing
        );
        Ok(reference)
    }
}

#[async_trait]
impl ImagePush for ImagePusher {
    async fn push(
        &self,
        image: &ImageReference,
        target: &PushSpec,
        credentials: Option<&CredentialPair>,
    ) -> pushgate_core::Result<Vec<String>> {
        self.push_all(image, target, credentials)
            .await
            .map_err(BuildError::into_push_failure)
    }
}

/// プッシュストリームのレイヤー集計
#[derive(Debug, Default)]
struct LayerTally {
    pushed: usize,
    existing: usize,
    error: Option<String>,
}

impl LayerTally {
    fn observe(&mut self, info: &PushImageInfo) {
        let error = info
            .error_detail
            .as_ref()
            .and_then(|d| d.message.clone())
            .or_else(|| info.error.clone());
        if let Some(err) = error {
            self.error.get_or_insert(err);
            return;
        }

        match info.status.as_deref() {
            Some("Pushed") => self.pushed += 1,
            Some("Layer already exists") => self.existing += 1,
            Some("Pushing") => {
                print!("\r  ↑ {}     ", info.progress.as_deref().unwrap_or(""));
                std::io::stdout().flush().ok();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: &str) -> PushImageInfo {
        PushImageInfo {
            status: Some(status.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_layer_tally_counts_layers() {
        let mut tally = LayerTally::default();
        for info in [
            status("The push refers to repository [quay.io/example/bugzooka]"),
            status("Preparing"),
            status("Pushed"),
            status("Layer already exists"),
            status("Layer already exists"),
            status("Waiting"),
        ] {
            tally.observe(&info);
        }
        assert_eq!(tally.pushed, 1);
        assert_eq!(tally.existing, 2);
        assert!(tally.error.is_none());
    }

    #[test]
    fn test_layer_tally_keeps_first_error() {
        let mut tally = LayerTally::default();
        for message in ["denied: requested access to the resource is denied", "later"] {
            tally.observe(&PushImageInfo {
                error: Some(message.to_string()),
                ..Default::default()
            });
        }
        assert_eq!(
            tally.error.as_deref(),
            Some("denied: requested access to the resource is denied")
        );
    }

    #[tokio::test]
    #[ignore] // ローカルレジストリ（localhost:5000）が必要
    async fn test_push_all_to_local_registry() {
        let docker = Docker::connect_with_local_defaults().unwrap();
        let pusher = ImagePusher::new(docker, RegistryAuth::new(None));
        let image = ImageReference::for_commit(
            "pushgate-test",
            "0123456789abcdef0123456789abcdef01234567",
        )
        .unwrap();

        let pushed = pusher
            .push_all(&image, &PushSpec::new("localhost:5000"), None)
            .await
            .unwrap();
        assert_eq!(pushed.len(), 2);
        assert_eq!(pushed[0], "localhost:5000/pushgate-test:latest");
    }
}
