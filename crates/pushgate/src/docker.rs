use colored::Colorize;
use pushgate_core::PipelineError;

/// Docker接続を初期化（エラーハンドリング付き）
///
/// 接続できない場合はビルドステップの失敗として扱う。
pub async fn init_docker_with_error_handling() -> pushgate_core::Result<bollard::Docker> {
    let docker = bollard::Docker::connect_with_local_defaults().map_err(connection_failure)?;

    // 接続テスト
    docker.ping().await.map_err(connection_failure)?;

    tracing::debug!("Connected to Docker engine");
    Ok(docker)
}

fn connection_failure(e: bollard::errors::Error) -> PipelineError {
    print_connection_help(&e);
    PipelineError::BuildFailure(format!("Docker接続に失敗しました: {}", e))
}

fn print_connection_help(e: &bollard::errors::Error) {
    eprintln!();
    eprintln!("{}", "✗ Docker接続エラー".red().bold());
    eprintln!();
    eprintln!("{}", "原因:".yellow());
    eprintln!("  {}", e);
    eprintln!();
    eprintln!("{}", "解決方法:".yellow());
    eprintln!("  • Dockerが起動しているか確認してください");
    eprintln!("  • DOCKER_HOST 環境変数が正しいか確認してください");
    eprintln!("  • docker ps コマンドが正常に動作するか確認してください");
}
