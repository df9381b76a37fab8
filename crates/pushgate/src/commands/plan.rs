use crate::utils;
use colored::Colorize;
use pushgate_core::{ImageReference, Pipeline, TriggerDecision, TriggerEvent};
use serde::Serialize;
use std::path::PathBuf;

/// Docker に触れずに判定結果だけを出す
#[derive(Debug, Serialize)]
pub struct Plan {
    pub pipeline: String,
    pub event: TriggerEvent,
    pub decision: TriggerDecision,
    /// ビルドされるローカル参照
    pub build: Vec<String>,
    /// プッシュされるレジストリ参照
    pub push: Vec<String>,
}

impl Plan {
    pub fn new(pipeline: &Pipeline, event: &TriggerEvent) -> anyhow::Result<Self> {
        let decision = pushgate_core::decide(pipeline, event);

        let (build, push) = if decision.run {
            let image = ImageReference::for_commit(&pipeline.build.image, &event.sha)?;
            let build = image.tags.iter().map(|t| image.local(t)).collect();
            let push = match (&pipeline.push, decision.push) {
                (Some(target), true) => image.remote_references(&target.registry),
                _ => Vec::new(),
            };
            (build, push)
        } else {
            (Vec::new(), Vec::new())
        };

        Ok(Self {
            pipeline: pipeline.name.clone(),
            event: event.clone(),
            decision,
            build,
            push,
        })
    }
}

pub async fn handle(
    file: Option<PathBuf>,
    event: Option<String>,
    branch: Option<String>,
    sha: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let (path, pipeline) = utils::load_pipeline(file.as_deref())?;
    let event = utils::resolve_event(&pipeline, event, branch, sha)?;
    let plan = Plan::new(&pipeline, &event)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    utils::print_loaded_pipeline(&path, &pipeline);
    utils::print_event(&event);
    println!();

    if !plan.decision.run {
        println!("{} 実行しない: {}", "⏭".yellow(), plan.decision.reason);
        return Ok(());
    }

    println!("{}", "ビルド:".bold());
    for reference in &plan.build {
        println!("  • {}", reference.cyan());
    }

    println!("{}", "プッシュ:".bold());
    if plan.push.is_empty() {
        println!("  {} スキップ: {}", "-".dimmed(), plan.decision.reason);
    } else {
        for reference in &plan.push {
            println!("  • {}", reference.cyan());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

    fn pipeline() -> Pipeline {
        pushgate_core::parse_pipeline(
            r#"
pipeline "bugzooka"
build {
    image "bugzooka"
}
push {
    registry "quay.io/example"
}
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_plan_push_to_main() {
        let plan = Plan::new(&pipeline(), &TriggerEvent::push("main", SHA)).unwrap();
        assert_eq!(
            plan.build,
            vec!["bugzooka:latest".to_string(), format!("bugzooka:{}", SHA)]
        );
        assert_eq!(
            plan.push,
            vec![
                "quay.io/example/bugzooka:latest".to_string(),
                format!("quay.io/example/bugzooka:{}", SHA),
            ]
        );
    }

    #[test]
    fn test_plan_push_to_master() {
        let plan = Plan::new(&pipeline(), &TriggerEvent::push("master", SHA)).unwrap();
        assert_eq!(plan.build.len(), 2);
        assert!(plan.push.is_empty());
    }

    #[test]
    fn test_plan_skipped_branch() {
        let plan = Plan::new(&pipeline(), &TriggerEvent::push("develop", SHA)).unwrap();
        assert!(!plan.decision.run);
        assert!(plan.build.is_empty());
        assert!(plan.push.is_empty());
    }
}
