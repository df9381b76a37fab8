//! 実行環境からトリガーイベントを検出する
//!
//! 優先順位:
//! 1. CLI 引数（呼び出し側が渡した値）
//! 2. PUSHGATE_* 環境変数
//! 3. CI ランナーの環境変数（GITHUB_*）
//! 4. git コマンド

use crate::error::{PipelineError, Result};
use crate::model::{EventKind, TriggerEvent};
use std::path::Path;
use std::process::Command;

/// CLI から明示された値
#[derive(Debug, Clone, Default)]
pub struct EventOverrides {
    pub event: Option<String>,
    pub branch: Option<String>,
    pub sha: Option<String>,
}

/// トリガーイベントを解決
pub fn detect_event(overrides: &EventOverrides, repo_dir: &Path) -> Result<TriggerEvent> {
    let kind = match overrides
        .event
        .clone()
        .or_else(|| env_non_empty("PUSHGATE_EVENT"))
        .or_else(|| env_non_empty("GITHUB_EVENT_NAME"))
    {
        Some(name) => name.parse::<EventKind>()?,
        None => EventKind::Manual,
    };

    let branch = overrides
        .branch
        .clone()
        .or_else(|| env_non_empty("PUSHGATE_BRANCH"))
        .or_else(|| env_non_empty("GITHUB_REF_NAME"))
        .or_else(|| env_non_empty("GITHUB_REF").map(|r| strip_ref(&r).to_string()))
        .or_else(|| git(repo_dir, &["rev-parse", "--abbrev-ref", "HEAD"]))
        .ok_or_else(|| {
            PipelineError::InvalidConfig(
                "ブランチ名を特定できません（--branch を指定してください）".to_string(),
            )
        })?;

    let sha = overrides
        .sha
        .clone()
        .or_else(|| env_non_empty("PUSHGATE_SHA"))
        .or_else(|| env_non_empty("GITHUB_SHA"))
        .or_else(|| git(repo_dir, &["rev-parse", "HEAD"]))
        .ok_or_else(|| {
            PipelineError::InvalidConfig(
                "コミットSHAを特定できません（--sha を指定してください）".to_string(),
            )
        })?;

    tracing::debug!(event = %kind, %branch, %sha, "Detected trigger event");
    Ok(TriggerEvent::new(kind, strip_ref(&branch), sha))
}

/// `refs/heads/main` -> `main`
pub fn strip_ref(reference: &str) -> &str {
    reference.strip_prefix("refs/heads/").unwrap_or(reference)
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn git(repo_dir: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()
        .ok()?;

    if !output.status.success() {
        tracing::debug!(
            ?args,
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "git command failed"
        );
        return None;
    }

    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

    const CLEARED: [(&str, Option<&str>); 7] = [
        ("PUSHGATE_EVENT", None),
        ("PUSHGATE_BRANCH", None),
        ("PUSHGATE_SHA", None),
        ("GITHUB_EVENT_NAME", None),
        ("GITHUB_REF_NAME", None),
        ("GITHUB_REF", None),
        ("GITHUB_SHA", None),
    ];

    #[test]
    fn test_overrides_win() {
        temp_env::with_vars(
            [
                ("PUSHGATE_EVENT", Some("manual")),
                ("PUSHGATE_BRANCH", Some("develop")),
                ("PUSHGATE_SHA", Some("ffff")),
            ],
            || {
                let overrides = EventOverrides {
                    event: Some("push".to_string()),
                    branch: Some("main".to_string()),
                    sha: Some(SHA.to_string()),
                };
                let event = detect_event(&overrides, Path::new(".")).unwrap();
                assert_eq!(event, TriggerEvent::push("main", SHA));
            },
        );
    }

    #[test]
    fn test_ci_runner_variables() {
        let mut vars = CLEARED.to_vec();
        vars.extend([
            ("GITHUB_EVENT_NAME", Some("push")),
            ("GITHUB_REF", Some("refs/heads/master")),
            ("GITHUB_SHA", Some(SHA)),
        ]);
        temp_env::with_vars(vars, || {
            let event = detect_event(&EventOverrides::default(), Path::new(".")).unwrap();
            assert_eq!(event, TriggerEvent::push("master", SHA));
        });
    }

    #[test]
    fn test_workflow_dispatch_is_manual() {
        let mut vars = CLEARED.to_vec();
        vars.extend([
            ("GITHUB_EVENT_NAME", Some("workflow_dispatch")),
            ("GITHUB_REF_NAME", Some("main")),
            ("GITHUB_SHA", Some(SHA)),
        ]);
        temp_env::with_vars(vars, || {
            let event = detect_event(&EventOverrides::default(), Path::new(".")).unwrap();
            assert_eq!(event.kind, EventKind::Manual);
            assert_eq!(event.branch, "main");
        });
    }

    #[test]
    fn test_unknown_event_is_error() {
        let mut vars = CLEARED.to_vec();
        vars.extend([
            ("PUSHGATE_EVENT", Some("pull_request")),
            ("PUSHGATE_BRANCH", Some("main")),
            ("PUSHGATE_SHA", Some(SHA)),
        ]);
        temp_env::with_vars(vars, || {
            let err = detect_event(&EventOverrides::default(), Path::new(".")).unwrap_err();
            assert!(matches!(err, PipelineError::InvalidEvent(_)));
        });
    }

    #[test]
    fn test_strip_ref() {
        assert_eq!(strip_ref("refs/heads/main"), "main");
        assert_eq!(strip_ref("main"), "main");
        assert_eq!(strip_ref("refs/tags/v1"), "refs/tags/v1");
    }
}
