//! トリガー評価
//!
//! イベント種別とブランチ名から、パイプラインを実行するか・プッシュするかを決める。
//! 副作用はなく、条件に一致しない場合もエラーにはならない。

use crate::model::{EventKind, Pipeline, PushSpec, TriggerEvent, TriggerPolicy};
use serde::Serialize;

impl TriggerPolicy {
    /// パイプラインを実行するか
    ///
    /// - 手動実行: `manual` が有効なら常に実行
    /// - push: ブランチがトリガーブランチに含まれる場合のみ
    pub fn evaluate(&self, event: &TriggerEvent) -> bool {
        match event.kind {
            EventKind::Manual => self.manual,
            EventKind::Push => self.push_branches.iter().any(|b| b == &event.branch),
        }
    }
}

impl PushSpec {
    /// プッシュするか
    ///
    /// push イベントかつブランチが完全一致する場合のみ。手動実行では決してプッシュしない。
    pub fn should_push(&self, event: &TriggerEvent) -> bool {
        event.kind == EventKind::Push && event.branch == self.branch
    }
}

/// 評価結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerDecision {
    pub run: bool,
    pub push: bool,
    pub reason: String,
}

/// パイプライン全体の判定
pub fn decide(pipeline: &Pipeline, event: &TriggerEvent) -> TriggerDecision {
    if !pipeline.trigger.evaluate(event) {
        let reason = match event.kind {
            EventKind::Manual => "manual dispatch is disabled".to_string(),
            EventKind::Push => format!("branch '{}' is not a trigger branch", event.branch),
        };
        tracing::debug!(event = %event.kind, branch = %event.branch, %reason, "Pipeline skipped");
        return TriggerDecision {
            run: false,
            push: false,
            reason,
        };
    }

    let (push, reason) = match &pipeline.push {
        None => (false, "no push target configured".to_string()),
        Some(spec) if spec.should_push(event) => {
            (true, format!("push to '{}'", spec.branch))
        }
        Some(spec) if event.kind == EventKind::Manual => (
            false,
            format!("manual dispatch never pushes (push branch: '{}')", spec.branch),
        ),
        Some(spec) => (
            false,
            format!(
                "branch '{}' builds only (push branch: '{}')",
                event.branch, spec.branch
            ),
        ),
    };

    TriggerDecision {
        run: true,
        push,
        reason,
    }
}
