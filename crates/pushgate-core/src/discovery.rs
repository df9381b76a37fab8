//! pipeline.kdl の発見ロジック
//!
//! --file → 環境変数 → 上方向探索 の順に探す。

use crate::error::{PipelineError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// パイプライン定義ファイル名
pub const PIPELINE_FILENAME: &str = "pipeline.kdl";

/// 隠しディレクトリ内の定義
const PIPELINE_DIR: &str = ".pushgate";

/// パイプライン定義の環境変数
pub const PIPELINE_PATH_ENV: &str = "PUSHGATE_PIPELINE";

/// pipeline.kdl を発見する
///
/// 検索順序:
/// 1. 明示的なパス（--file）
/// 2. PUSHGATE_PIPELINE 環境変数
/// 3. カレントディレクトリから上方向に pipeline.kdl / .pushgate/pipeline.kdl
#[tracing::instrument]
pub fn find_pipeline(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(PipelineError::PipelineNotFound(path.to_path_buf()));
    }

    if let Ok(path_str) = std::env::var(PIPELINE_PATH_ENV) {
        let path = PathBuf::from(&path_str);
        debug!(env_path = %path_str, "Checking PUSHGATE_PIPELINE");
        if path.is_file() {
            info!(pipeline_path = %path.display(), "Found pipeline from environment variable");
            return Ok(path);
        }
        warn!(env_path = %path_str, "PUSHGATE_PIPELINE is set but file does not exist");
    }

    let start_dir = std::env::current_dir()?;
    find_pipeline_from(&start_dir).ok_or(PipelineError::PipelineNotFound(start_dir))
}

/// 指定ディレクトリから上方向に探す
pub fn find_pipeline_from(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    debug!(start_dir = %start_dir.display(), "Searching for {}", PIPELINE_FILENAME);

    loop {
        let file = current.join(PIPELINE_FILENAME);
        if file.is_file() {
            info!(pipeline_path = %file.display(), "Found pipeline file");
            return Some(file);
        }

        let hidden = current.join(PIPELINE_DIR).join(PIPELINE_FILENAME);
        if hidden.is_file() {
            info!(pipeline_path = %hidden.display(), "Found pipeline file");
            return Some(hidden);
        }

        if !current.pop() {
            break;
        }
    }

    debug!("Pipeline file not found");
    None
}

/// .pushgate/pipeline.kdl の場合はリポジトリルートを返す
pub fn repository_root(pipeline_path: &Path) -> PathBuf {
    let parent = pipeline_path.parent().unwrap_or(Path::new("."));
    if parent.file_name().is_some_and(|n| n == PIPELINE_DIR) {
        parent.parent().unwrap_or(parent).to_path_buf()
    } else {
        parent.to_path_buf()
    }
}
