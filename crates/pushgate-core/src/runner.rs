//! パイプライン実行
//!
//! trigger → build → (条件付き) push を直列に一度だけ実行する。
//! リトライもロールバックもしない。失敗はそのまま呼び出し元に返す。

use crate::error::{PipelineError, Result};
use crate::model::{CredentialPair, ImageReference, Pipeline, PushSpec, TriggerEvent};
use crate::secrets::{SecretStore, resolve_credentials};
use crate::trigger::{TriggerDecision, decide};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// ビルドステップへの入力
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub context: PathBuf,
    pub dockerfile: PathBuf,
    pub image: ImageReference,
    pub build_args: std::collections::BTreeMap<String, String>,
    pub no_cache: bool,
}

/// イメージビルダー
#[async_trait]
pub trait ImageBuild: Send + Sync {
    /// イメージをビルドし、全タグを付与する
    async fn build(&self, request: &BuildRequest) -> Result<ImageReference>;
}

/// レジストリへのプッシュ
#[async_trait]
pub trait ImagePush: Send + Sync {
    /// 全タグをプッシュし、プッシュした参照を返す
    async fn push(
        &self,
        image: &ImageReference,
        target: &PushSpec,
        credentials: Option<&CredentialPair>,
    ) -> Result<Vec<String>>;
}

/// 実行結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    /// トリガー条件に一致しなかった
    Skipped,
    /// ビルドのみ
    Built,
    /// ビルドしてプッシュした
    Pushed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub pipeline: String,
    pub event: TriggerEvent,
    pub decision: TriggerDecision,
    pub outcome: RunOutcome,
    pub image: Option<ImageReference>,
    pub pushed: Vec<String>,
    pub started_at: DateTime<Utc>,
    #[serde(with = "duration_millis")]
    pub build_duration: Option<Duration>,
    #[serde(with = "duration_millis")]
    pub push_duration: Option<Duration>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub no_cache: bool,
}

/// パイプラインランナー
pub struct PipelineRunner<'a> {
    pipeline: &'a Pipeline,
    builder: &'a dyn ImageBuild,
    pusher: &'a dyn ImagePush,
    secrets: &'a dyn SecretStore,
    options: RunOptions,
}

impl<'a> PipelineRunner<'a> {
    pub fn new(
        pipeline: &'a Pipeline,
        builder: &'a dyn ImageBuild,
        pusher: &'a dyn ImagePush,
        secrets: &'a dyn SecretStore,
    ) -> Self {
        Self {
            pipeline,
            builder,
            pusher,
            secrets,
            options: RunOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// パイプラインを実行
    #[tracing::instrument(skip(self), fields(pipeline = %self.pipeline.name))]
    pub async fn run(&self, event: &TriggerEvent) -> Result<RunReport> {
        let started_at = Utc::now();
        let decision = decide(self.pipeline, event);

        let mut report = RunReport {
            pipeline: self.pipeline.name.clone(),
            event: event.clone(),
            decision: decision.clone(),
            outcome: RunOutcome::Skipped,
            image: None,
            pushed: Vec::new(),
            started_at,
            build_duration: None,
            push_duration: None,
        };

        if !decision.run {
            tracing::info!(reason = %decision.reason, "Trigger did not match, skipping pipeline");
            return Ok(report);
        }

        // ビルド
        let image = ImageReference::for_commit(&self.pipeline.build.image, &event.sha)
            .map_err(|e| PipelineError::BuildFailure(e.to_string()))?;
        let request = BuildRequest {
            context: self.pipeline.context_path(),
            dockerfile: self.pipeline.dockerfile_path(),
            image,
            build_args: self.pipeline.build.build_args.clone(),
            no_cache: self.options.no_cache,
        };

        tracing::info!(image = %request.image.repository, tags = ?request.image.tags, "Starting build step");
        let build_start = Instant::now();
        let built = self.builder.build(&request).await.map_err(into_build_failure)?;
        report.build_duration = Some(build_start.elapsed());
        report.outcome = RunOutcome::Built;
        report.image = Some(built.clone());

        // プッシュ（push イベントかつ指定ブランチのみ）
        let target = match (&self.pipeline.push, decision.push) {
            (Some(target), true) => target,
            _ => {
                tracing::info!(reason = %decision.reason, "Push step skipped");
                return Ok(report);
            }
        };

        let credentials = match target.secret_names() {
            Some((user, pass)) => Some(
                resolve_credentials(self.secrets, user, pass).map_err(into_push_failure)?,
            ),
            None => None,
        };

        tracing::info!(registry = %target.registry, "Starting push step");
        let push_start = Instant::now();
        let pushed = self
            .pusher
            .push(&built, target, credentials.as_ref())
            .await
            .map_err(into_push_failure)?;
        report.push_duration = Some(push_start.elapsed());
        report.outcome = RunOutcome::Pushed;
        report.pushed = pushed;

        Ok(report)
    }
}

fn into_build_failure(e: PipelineError) -> PipelineError {
    match e {
        PipelineError::BuildFailure(_) => e,
        other => PipelineError::BuildFailure(other.to_string()),
    }
}

fn into_push_failure(e: PipelineError) -> PipelineError {
    match e {
        PipelineError::PushFailure(_) => e,
        other => PipelineError::PushFailure(other.to_string()),
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }
}
