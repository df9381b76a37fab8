mod commands;
mod docker;
mod utils;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use pushgate_core::PipelineError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pushgate")]
#[command(about = "コミットごとにイメージをビルドし、リリースブランチからだけプッシュする", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// トリガーイベントの指定（省略時は環境変数・git から検出）
#[derive(Args, Debug, Clone)]
struct EventArgs {
    /// pipeline.kdl のパス（省略時は PUSHGATE_PIPELINE → 上方向探索）
    #[arg(short, long)]
    file: Option<PathBuf>,
    /// イベント種別 (manual, push)
    #[arg(short, long)]
    event: Option<String>,
    /// ブランチ名
    #[arg(short, long)]
    branch: Option<String>,
    /// コミットSHA
    #[arg(long)]
    sha: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// パイプラインを実行（trigger → build → push）
    Run {
        #[command(flatten)]
        event: EventArgs,
        /// キャッシュを使用しない
        #[arg(long)]
        no_cache: bool,
        /// ビルド出力をそのまま表示
        #[arg(short, long)]
        verbose: bool,
        /// シークレットファイルのディレクトリ（1ファイル=1シークレット）
        #[arg(long, env = "PUSHGATE_SECRETS_DIR")]
        secrets_dir: Option<PathBuf>,
        /// Docker 設定ディレクトリ（config.json の場所）
        #[arg(long, env = "DOCKER_CONFIG")]
        docker_config: Option<PathBuf>,
    },
    /// 実行せずに判定結果を表示
    Plan {
        #[command(flatten)]
        event: EventArgs,
        /// JSON で出力
        #[arg(long)]
        json: bool,
    },
    /// pipeline.kdl を検証
    Validate {
        /// pipeline.kdl のパス（省略時は PUSHGATE_PIPELINE → 上方向探索）
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// バージョン情報を表示
    Version,
}

/// 終了コード: 設定エラー=1, ビルド失敗=2, プッシュ失敗=3
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::BuildFailure(_)) => 2,
        Some(PipelineError::PushFailure(_)) => 3,
        _ => 1,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // ログは stderr、ユーザー向け出力は stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    if let Err(e) = dispatch(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(exit_code(&e));
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run {
            event,
            no_cache,
            verbose,
            secrets_dir,
            docker_config,
        } => {
            commands::run::handle(commands::run::RunArgs {
                file: event.file,
                event: event.event,
                branch: event.branch,
                sha: event.sha,
                no_cache,
                verbose,
                secrets_dir,
                docker_config,
            })
            .await
        }
        Commands::Plan { event, json } => {
            commands::plan::handle(event.file, event.event, event.branch, event.sha, json).await
        }
        Commands::Validate { file } => commands::validate::handle(file).await,
        Commands::Version => {
            println!("pushgate {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
