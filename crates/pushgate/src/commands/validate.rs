use crate::utils;
use colored::Colorize;
use std::path::PathBuf;

pub async fn handle(file: Option<PathBuf>) -> anyhow::Result<()> {
    let (path, pipeline) = utils::load_pipeline(file.as_deref())?;

    utils::print_loaded_pipeline(&path, &pipeline);
    println!();

    let manual = if pipeline.trigger.manual {
        "有効".green()
    } else {
        "無効".yellow()
    };
    println!("手動実行: {}", manual);
    println!("push トリガー: {}", pipeline.trigger.push_branches.join(", ").cyan());
    println!("イメージ: {}", pipeline.build.image.cyan());

    let dockerfile = pipeline.dockerfile_path();
    if dockerfile.is_file() {
        println!("Dockerfile: {}", dockerfile.display().to_string().cyan());
    } else {
        println!(
            "Dockerfile: {} {}",
            dockerfile.display().to_string().yellow(),
            "(見つかりません)".yellow()
        );
    }

    match &pipeline.push {
        Some(push) => {
            println!(
                "プッシュ先: {} ({} への push のみ)",
                push.registry.cyan(),
                push.branch.cyan()
            );
            match push.secret_names() {
                Some((user, pass)) => println!("認証情報: {} / {}", user, pass),
                None => println!("認証情報: Docker config.json"),
            }
        }
        None => println!("プッシュ先: {}", "なし".dimmed()),
    }

    println!();
    println!("{}", "✓ 設定は有効です".green().bold());
    Ok(())
}
