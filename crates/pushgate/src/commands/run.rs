use crate::{docker, utils};
use colored::Colorize;
use pushgate_build::{ImageBuilder, ImagePusher, RegistryAuth};
use pushgate_core::{
    ChainedSecretStore, DirSecretStore, EnvSecretStore, PipelineRunner, RunOptions, RunOutcome,
    RunReport,
};
use std::path::PathBuf;

pub struct RunArgs {
    pub file: Option<PathBuf>,
    pub event: Option<String>,
    pub branch: Option<String>,
    pub sha: Option<String>,
    pub no_cache: bool,
    pub verbose: bool,
    pub secrets_dir: Option<PathBuf>,
    pub docker_config: Option<PathBuf>,
}

/// trigger → build → (条件付き) push を実行
pub async fn handle(args: RunArgs) -> anyhow::Result<()> {
    let (path, pipeline) = utils::load_pipeline(args.file.as_deref())?;
    let event = utils::resolve_event(&pipeline, args.event, args.branch, args.sha)?;

    utils::print_loaded_pipeline(&path, &pipeline);
    utils::print_event(&event);

    // トリガー不一致なら Docker に接続しない
    let decision = pushgate_core::decide(&pipeline, &event);
    if !decision.run {
        println!();
        println!(
            "{} パイプラインをスキップしました: {}",
            "⏭".yellow(),
            decision.reason
        );
        return Ok(());
    }

    println!();
    println!("{}", "Dockerに接続中...".blue());
    let docker_conn = docker::init_docker_with_error_handling().await?;

    let builder = ImageBuilder::new(docker_conn.clone()).verbose(args.verbose);
    let pusher = ImagePusher::new(docker_conn, RegistryAuth::new(args.docker_config));

    let mut secrets = ChainedSecretStore::new().with(EnvSecretStore);
    if let Some(dir) = args.secrets_dir {
        secrets = secrets.with(DirSecretStore::new(dir));
    }

    println!();
    println!(
        "{}",
        format!("🔨 {} をビルド中...", pipeline.build.image)
            .green()
            .bold()
    );
    println!(
        "  → Dockerfile: {}",
        pipeline.dockerfile_path().display().to_string().cyan()
    );
    println!(
        "  → Context: {}",
        pipeline.context_path().display().to_string().cyan()
    );
    if decision.push {
        println!("{}", "📤 ビルド後にプッシュします".blue().bold());
    }

    let runner = PipelineRunner::new(&pipeline, &builder, &pusher, &secrets).with_options(
        RunOptions {
            no_cache: args.no_cache,
        },
    );

    let report = runner.run(&event).await?;

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!();
    match report.outcome {
        RunOutcome::Skipped => {
            println!("{}", "パイプラインはスキップされました".yellow());
            return;
        }
        RunOutcome::Built => {
            println!("{}", "✓ イメージがビルドされました！".green().bold());
            println!("  {} プッシュなし: {}", "ℹ".blue(), report.decision.reason);
        }
        RunOutcome::Pushed => {
            println!(
                "{}",
                "✓ イメージがビルド＆プッシュされました！".green().bold()
            );
        }
    }

    println!();
    println!("{}", "結果サマリー:".bold());
    if let Some(image) = &report.image {
        for tag in &image.tags {
            println!("  {} {}", "✓".green(), image.local(tag).cyan());
        }
    }
    for pushed in &report.pushed {
        println!("  {} {}", "↑".green(), pushed.cyan());
    }
    if let Some(d) = report.build_duration {
        println!("  ビルド時間: {:.1}s", d.as_secs_f64());
    }
    if let Some(d) = report.push_duration {
        println!("  プッシュ時間: {:.1}s", d.as_secs_f64());
    }
}
