use crate::error::{BuildError, BuildResult};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::path::Path;
use tar::Builder;

/// ビルドコンテキストの上限目安
const MAX_CONTEXT_SIZE: usize = 500 * 1024 * 1024;

pub struct ContextBuilder;

impl ContextBuilder {
    /// ビルドコンテキストをtar.gzアーカイブとして作成
    ///
    /// レシピはアーカイブ直下の `Dockerfile` として格納する。
    pub fn create_context(context_path: &Path, dockerfile_path: &Path) -> BuildResult<Vec<u8>> {
        if !context_path.is_dir() {
            return Err(BuildError::ContextNotFound(context_path.to_path_buf()));
        }
        if !dockerfile_path.is_file() {
            return Err(BuildError::DockerfileNotFound(dockerfile_path.to_path_buf()));
        }

        tracing::debug!("Creating build context from: {}", context_path.display());

        // コンテキスト直下の Dockerfile はそのまま含まれる
        let inject_dockerfile = !is_root_dockerfile(context_path, dockerfile_path);

        let mut archive_data = Vec::new();
        {
            let encoder = GzEncoder::new(&mut archive_data, Compression::default());
            let mut tar = Builder::new(encoder);

            tar.append_dir_all(".", context_path)?;

            if inject_dockerfile {
                let dockerfile_content = std::fs::read(dockerfile_path)?;

                let mut header = tar::Header::new_gnu();
                header.set_path("Dockerfile")?;
                header.set_size(dockerfile_content.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();

                tar.append(&header, &dockerfile_content[..])?;
            }

            tar.into_inner()?.finish()?;
        }

        tracing::debug!("Build context created: {} bytes", archive_data.len());
        Self::check_context_size(archive_data.len());

        Ok(archive_data)
    }

    fn check_context_size(size: usize) {
        if size > MAX_CONTEXT_SIZE {
            tracing::warn!(
                "ビルドコンテキストが大きすぎます（{}MB）。.dockerignore で不要なファイルを除外してください。",
                size / 1024 / 1024
            );
        }
    }
}

fn is_root_dockerfile(context_path: &Path, dockerfile_path: &Path) -> bool {
    match (context_path.canonicalize(), dockerfile_path.canonicalize()) {
        (Ok(ctx), Ok(df)) => df == ctx.join("Dockerfile"),
        _ => false,
    }
}
