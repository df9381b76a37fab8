//! pushgate core
//!
//! パイプライン定義（pipeline.kdl）のモデルとパーサー、トリガー評価、
//! シークレット解決、そして trigger → build → (条件付き) push を実行するランナー。
//! Docker への依存はなく、ビルドとプッシュは [`ImageBuild`] / [`ImagePush`] 経由で呼び出す。

pub mod detect;
pub mod discovery;
pub mod error;
pub mod model;
pub mod parser;
pub mod runner;
pub mod secrets;
pub mod trigger;

pub use detect::{EventOverrides, detect_event};
pub use discovery::{find_pipeline, find_pipeline_from};
pub use error::{PipelineError, Result};
pub use model::*;
pub use parser::{parse_pipeline, parse_pipeline_file};
pub use runner::{
    BuildRequest, ImageBuild, ImagePush, PipelineRunner, RunOptions, RunOutcome, RunReport,
};
pub use secrets::{ChainedSecretStore, DirSecretStore, EnvSecretStore, SecretStore};
pub use trigger::{TriggerDecision, decide};
