use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("ビルドに失敗しました: {0}")]
    BuildFailure(String),

    #[error("プッシュに失敗しました: {0}")]
    PushFailure(String),

    #[error("シークレット '{0}' が見つかりません")]
    MissingSecret(String),

    #[error("不正なイメージタグ: {0}")]
    InvalidTag(String),

    #[error("不明なイベント種別: {0}（manual または push を指定してください）")]
    InvalidEvent(String),

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error(
        "pipeline.kdl が見つかりません\n探索開始位置: {0}\nヒント: --file または PUSHGATE_PIPELINE で直接指定できます"
    )]
    PipelineNotFound(PathBuf),

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
