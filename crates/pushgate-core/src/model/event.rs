use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// パイプラインを起動したイベントの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// 手動実行（パラメータなし）
    Manual,
    /// ブランチへのpush
    Push,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Manual => "manual",
            EventKind::Push => "push",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = PipelineError;

    /// `workflow_dispatch` は CI ランナーが手動実行に付ける名前
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual" | "workflow_dispatch" | "dispatch" => Ok(EventKind::Manual),
            "push" => Ok(EventKind::Push),
            other => Err(PipelineError::InvalidEvent(other.to_string())),
        }
    }
}

/// トリガー記述子: 1回の実行で一度だけ消費される
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub kind: EventKind,
    pub branch: String,
    /// トリガーとなったコミットのSHA
    pub sha: String,
}

impl TriggerEvent {
    pub fn new(kind: EventKind, branch: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            kind,
            branch: branch.into(),
            sha: sha.into(),
        }
    }

    pub fn manual(branch: impl Into<String>, sha: impl Into<String>) -> Self {
        Self::new(EventKind::Manual, branch, sha)
    }

    pub fn push(branch: impl Into<String>, sha: impl Into<String>) -> Self {
        Self::new(EventKind::Push, branch, sha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_from_str() {
        assert_eq!("manual".parse::<EventKind>().unwrap(), EventKind::Manual);
        assert_eq!("PUSH".parse::<EventKind>().unwrap(), EventKind::Push);
        assert_eq!(
            "workflow_dispatch".parse::<EventKind>().unwrap(),
            EventKind::Manual
        );
    }

    #[test]
    fn test_event_kind_unknown() {
        let err = "pull_request".parse::<EventKind>().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidEvent(name) if name == "pull_request"));
    }
}
