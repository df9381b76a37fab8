use crate::context::ContextBuilder;
use crate::error::{BuildError, BuildResult};
use crate::progress::BuildProgress;
use async_trait::async_trait;
use bollard::Docker;
use bollard::models::BuildInfo;
use bytes::Bytes;
use colored::Colorize;
use futures_util::stream::StreamExt;
use http_body_util::{Either, Full};
use pushgate_core::{BuildRequest, ImageBuild, ImageReference};
use std::collections::HashMap;

/// Docker Engine API でイメージをビルドする
pub struct ImageBuilder {
    docker: Docker,
    /// ビルド出力をそのまま表示するか（false ならスピナー）
    verbose: bool,
}

impl ImageBuilder {
    pub fn new(docker: Docker) -> Self {
        Self {
            docker,
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// イメージをビルドし、`latest` とコミットSHAの両タグを付与
    ///
    /// まずコミットSHAのタグでビルドし、残りのタグは tag_image で付ける。
    pub async fn build_image(&self, request: &BuildRequest) -> BuildResult<ImageReference> {
        let image = &request.image;
        let primary = image.local(image.commit_tag());

        let context_data = ContextBuilder::create_context(&request.context, &request.dockerfile)?;

        tracing::info!("Building image: {}", primary);
        if !request.build_args.is_empty() {
            tracing::debug!(args = ?request.build_args.keys().collect::<Vec<_>>(), "Build args");
        }

        let buildargs: HashMap<String, String> = request
            .build_args
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        #[allow(deprecated)]
        let options = bollard::image::BuildImageOptions::<String> {
            dockerfile: "Dockerfile".to_string(),
            t: primary.clone(),
            buildargs,
            nocache: request.no_cache,
            rm: true,      // 中間コンテナを削除
            forcerm: true, // ビルド失敗時も中間コンテナを削除
            pull: true,    // ベースイメージを常にpull
            ..Default::default()
        };

        let body = Full::new(Bytes::from(context_data));
        let mut stream = self
            .docker
            .build_image(options, None, Some(Either::Left(body)));

        let progress = BuildProgress::spinner(&primary, !self.verbose);

        while let Some(msg) = stream.next().await {
            let result = match msg {
                Ok(output) => handle_build_output(self.verbose, output, &progress),
                Err(e) => Err(BuildError::Docker(e)),
            };
            if let Err(e) = result {
                progress.done(Some(&e.to_string()));
                return Err(e);
            }
        }
        progress.done(None);

        // 残りのタグ（latest）を付与
        for tag in image.tags.iter().filter(|t| t.as_str() != image.commit_tag()) {
            self.tag(&primary, &image.repository, tag).await?;
        }

        tracing::info!("Successfully built: {} {:?}", image.repository, image.tags);
        Ok(image.clone())
    }

    /// 既存イメージに別名タグを付ける
    pub async fn tag(&self, source: &str, repo: &str, tag: &str) -> BuildResult<()> {
        tracing::debug!(%source, %repo, %tag, "Tagging image");

        #[allow(deprecated)]
        let options = bollard::image::TagImageOptions::<String> {
            repo: repo.to_string(),
            tag: tag.to_string(),
        };

        self.docker.tag_image(source, Some(options)).await?;
        Ok(())
    }
}

/// ビルド出力の処理
fn handle_build_output(
    verbose: bool,
    output: BuildInfo,
    progress: &BuildProgress,
) -> BuildResult<()> {
    if let Some(stream) = output.stream {
        if verbose {
            print!("{}", stream);
        } else if let Some(line) = stream.lines().map(str::trim).find(|l| !l.is_empty()) {
            progress.step(line);
        }
    }

    if let Some(error) = output.error {
        return Err(BuildError::BuildFailed(error));
    }

    if let Some(error_detail) = output.error_detail {
        let error_msg = error_detail
            .message
            .unwrap_or_else(|| "Unknown build error".to_string());
        return Err(BuildError::BuildFailed(error_msg));
    }

    if let Some(status) = output.status
        && verbose
    {
        println!("{}", status.cyan());
    }

    Ok(())
}

#[async_trait]
impl ImageBuild for ImageBuilder {
    async fn build(&self, request: &BuildRequest) -> pushgate_core::Result<ImageReference> {
        self.build_image(request)
            .await
            .map_err(BuildError::into_build_failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushgate_core::PipelineError;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::tempdir;

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

    async fn image_exists(docker: &Docker, reference: &str) -> bool {
        docker.inspect_image(reference).await.is_ok()
    }

    #[test]
    fn test_handle_build_output_stream_only() {
        let output = BuildInfo {
            stream: Some("Step 1/2 : FROM alpine\n".to_string()),
            ..Default::default()
        };
        let progress = BuildProgress::spinner("test", false);
        assert!(handle_build_output(false, output, &progress).is_ok());
    }

    #[test]
    fn test_handle_build_output_error() {
        let output = BuildInfo {
            error: Some("The command '/bin/sh -c false' returned a non-zero code: 1".to_string()),
            ..Default::default()
        };

        let progress = BuildProgress::spinner("test", false);
        let err = handle_build_output(false, output, &progress).unwrap_err();
        assert!(matches!(err, BuildError::BuildFailed(msg) if msg.contains("non-zero code")));
    }

    #[tokio::test]
    async fn test_missing_dockerfile_fails_before_docker() {
        let docker = Docker::connect_with_http("http://127.0.0.1:1", 1, bollard::API_DEFAULT_VERSION).unwrap();
        let builder = ImageBuilder::new(docker);
        let temp_dir = tempdir().unwrap();

        let request = BuildRequest {
            context: temp_dir.path().to_path_buf(),
            dockerfile: temp_dir.path().join("Dockerfile"),
            image: ImageReference::for_commit("pushgate-test", SHA).unwrap(),
            build_args: BTreeMap::new(),
            no_cache: false,
        };

        let err = builder.build(&request).await.unwrap_err();
        assert!(matches!(err, PipelineError::BuildFailure(msg) if msg.contains("Dockerfile")));
    }

    #[tokio::test]
    #[ignore] // Docker接続が必要なため、通常のテストではスキップ
    async fn test_build_tags_latest_and_sha() {
        let docker = Docker::connect_with_local_defaults().unwrap();
        let builder = ImageBuilder::new(docker.clone()).verbose(true);

        let temp_dir = tempdir().unwrap();
        fs::write(
            temp_dir.path().join("Dockerfile"),
            "FROM alpine:latest\nCMD echo 'test'",
        )
        .unwrap();

        let request = BuildRequest {
            context: temp_dir.path().to_path_buf(),
            dockerfile: temp_dir.path().join("Dockerfile"),
            image: ImageReference::for_commit("pushgate-test", SHA).unwrap(),
            build_args: BTreeMap::new(),
            no_cache: false,
        };

        let built = builder.build(&request).await.unwrap();
        assert_eq!(built.tags, vec!["latest".to_string(), SHA.to_string()]);
        assert!(image_exists(&docker, "pushgate-test:latest").await);
        assert!(image_exists(&docker, &format!("pushgate-test:{}", SHA)).await);

        // クリーンアップ
        for tag in ["latest", SHA] {
            docker
                .remove_image(
                    &format!("pushgate-test:{}", tag),
                    None::<bollard::query_parameters::RemoveImageOptions>,
                    None,
                )
                .await
                .ok();
        }
    }
}
