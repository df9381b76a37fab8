use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// ビルド中のスピナー（非表示にもできる）
pub(crate) struct BuildProgress(ProgressBar);

impl BuildProgress {
    pub(crate) fn spinner(reference: &str, visible: bool) -> Self {
        if !visible {
            return Self(ProgressBar::hidden());
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.green} {elapsed:>4} {prefix} {wide_msg}")
        {
            pb.set_style(style);
        }
        pb.set_prefix(reference.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));
        Self(pb)
    }

    /// 直近のビルド出力行
    pub(crate) fn step(&self, line: &str) {
        self.0.set_message(line.to_string());
    }

    pub(crate) fn done(&self, error: Option<&str>) {
        match error {
            None => self.0.finish_with_message("✓"),
            Some(e) => self.0.abandon_with_message(format!("✗ {}", e)),
        }
    }
}
