use colored::Colorize;
use pushgate_core::{EventOverrides, Pipeline, TriggerEvent};
use std::path::{Path, PathBuf};

/// pipeline.kdl を発見してロード
pub fn load_pipeline(file: Option<&Path>) -> anyhow::Result<(PathBuf, Pipeline)> {
    let path = pushgate_core::find_pipeline(file)?;
    let pipeline = pushgate_core::parse_pipeline_file(&path)?;
    Ok((path, pipeline))
}

/// CLI 引数と実行環境からトリガーイベントを決定
pub fn resolve_event(
    pipeline: &Pipeline,
    event: Option<String>,
    branch: Option<String>,
    sha: Option<String>,
) -> anyhow::Result<TriggerEvent> {
    let overrides = EventOverrides { event, branch, sha };
    Ok(pushgate_core::detect_event(&overrides, &pipeline.root)?)
}

pub fn print_loaded_pipeline(path: &Path, pipeline: &Pipeline) {
    println!(
        "パイプライン: {} ({})",
        pipeline.name.cyan(),
        path.display().to_string().dimmed()
    );
}

pub fn print_event(event: &TriggerEvent) {
    println!(
        "イベント: {} / ブランチ: {} / コミット: {}",
        event.kind.to_string().cyan(),
        event.branch.cyan(),
        short_sha(&event.sha).cyan()
    );
}

/// 表示用の短縮SHA
pub fn short_sha(sha: &str) -> &str {
    sha.get(..12).unwrap_or(sha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_sha() {
        assert_eq!(
            short_sha("0123456789abcdef0123456789abcdef01234567"),
            "0123456789ab"
        );
        assert_eq!(short_sha("abc"), "abc");
    }
}
