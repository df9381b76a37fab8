use crate::auth::AuthError;
use pushgate_core::PipelineError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Dockerfile が見つかりません: {0}")]
    DockerfileNotFound(PathBuf),

    #[error("ビルドコンテキストが見つかりません: {0}")]
    ContextNotFound(PathBuf),

    #[error("Docker API エラー: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("{0}")]
    BuildFailed(String),

    #[error("{reference}: {message}")]
    PushFailed { reference: String, message: String },

    #[error("レジストリ認証: {0}")]
    Auth(#[from] AuthError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// pipeline.kdl か環境のどこを直せばよいか
    fn hint(&self) -> Option<&'static str> {
        match self {
            BuildError::DockerfileNotFound(_) => {
                Some("pipeline.kdl の build { dockerfile \"...\" } を確認してください")
            }
            BuildError::ContextNotFound(_) => {
                Some("pipeline.kdl の build { context \"...\" } を確認してください")
            }
            BuildError::Auth(_) => Some(
                "push { username-secret / password-secret } の値、または docker login の状態を確認してください",
            ),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self.hint() {
            Some(hint) => format!("{}\nヒント: {}", self, hint),
            None => self.to_string(),
        }
    }

    /// ビルドステップの失敗として扱う
    pub fn into_build_failure(self) -> PipelineError {
        PipelineError::BuildFailure(self.describe())
    }

    /// プッシュステップの失敗として扱う
    pub fn into_push_failure(self) -> PipelineError {
        PipelineError::PushFailure(self.describe())
    }
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;
