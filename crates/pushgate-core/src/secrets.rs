//! シークレットストア
//!
//! 認証情報は実行時にのみ解決する。値はログに出さない。

use crate::error::{PipelineError, Result};
use crate::model::CredentialPair;
use std::path::PathBuf;

/// 名前付きシークレットの取得元
pub trait SecretStore: Send + Sync {
    /// シークレットを取得。存在しない場合は None
    fn get(&self, name: &str) -> Option<String>;

    /// ストア名（ログ用）
    fn describe(&self) -> String;
}

/// プロセスの環境変数から取得
#[derive(Debug, Default, Clone)]
pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().and_then(normalize)
    }

    fn describe(&self) -> String {
        "environment".to_string()
    }
}

/// ディレクトリ内の1ファイル=1シークレット（例: /run/secrets/NAME）
#[derive(Debug, Clone)]
pub struct DirSecretStore {
    dir: PathBuf,
}

impl DirSecretStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SecretStore for DirSecretStore {
    fn get(&self, name: &str) -> Option<String> {
        // パス区切りを含む名前はディレクトリ外を指しうるので拒否
        if name.contains('/') || name.contains('\\') || name == ".." {
            return None;
        }
        let path = self.dir.join(name);
        match std::fs::read_to_string(&path) {
            Ok(content) => normalize(content),
            Err(e) => {
                tracing::trace!(path = %path.display(), error = %e, "Secret file not readable");
                None
            }
        }
    }

    fn describe(&self) -> String {
        format!("directory {}", self.dir.display())
    }
}

/// 複数ストアを順に参照し、最初に見つかった値を使う
#[derive(Default)]
pub struct ChainedSecretStore {
    stores: Vec<Box<dyn SecretStore>>,
}

impl ChainedSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, store: impl SecretStore + 'static) -> Self {
        self.stores.push(Box::new(store));
        self
    }
}

impl SecretStore for ChainedSecretStore {
    fn get(&self, name: &str) -> Option<String> {
        self.stores.iter().find_map(|s| {
            let value = s.get(name);
            if value.is_some() {
                tracing::debug!(secret = name, store = %s.describe(), "Resolved secret");
            }
            value
        })
    }

    fn describe(&self) -> String {
        self.stores
            .iter()
            .map(|s| s.describe())
            .collect::<Vec<_>>()
            .join(" > ")
    }
}

/// ユーザー名・パスワードの2つのシークレットから認証情報を組み立てる
pub fn resolve_credentials(
    store: &dyn SecretStore,
    username_secret: &str,
    password_secret: &str,
) -> Result<CredentialPair> {
    let username = store
        .get(username_secret)
        .ok_or_else(|| PipelineError::MissingSecret(username_secret.to_string()))?;
    let password = store
        .get(password_secret)
        .ok_or_else(|| PipelineError::MissingSecret(password_secret.to_string()))?;
    Ok(CredentialPair::new(username, password))
}

/// 末尾の改行を落とし、空なら未設定扱い
fn normalize(value: String) -> Option<String> {
    let trimmed = value.trim_end_matches(['\r', '\n']);
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_env_secret_store() {
        temp_env::with_vars(
            [
                ("PUSHGATE_TEST_USER", Some("robot")),
                ("PUSHGATE_TEST_EMPTY", Some("")),
            ],
            || {
                let store = EnvSecretStore;
                assert_eq!(store.get("PUSHGATE_TEST_USER").as_deref(), Some("robot"));
                assert_eq!(store.get("PUSHGATE_TEST_EMPTY"), None);
                assert_eq!(store.get("PUSHGATE_TEST_MISSING"), None);
            },
        );
    }

    #[test]
    fn test_dir_secret_store_trims_newline() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("REGISTRY_PASSWORD"), "s3cret\n").unwrap();

        let store = DirSecretStore::new(dir.path());
        assert_eq!(store.get("REGISTRY_PASSWORD").as_deref(), Some("s3cret"));
        assert_eq!(store.get("MISSING"), None);
        assert_eq!(store.get("../REGISTRY_PASSWORD"), None);
    }

    #[test]
    fn test_chained_store_first_hit_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(first.path().join("USER"), "from-first").unwrap();
        fs::write(second.path().join("USER"), "from-second").unwrap();
        fs::write(second.path().join("PASS"), "only-second").unwrap();

        let store = ChainedSecretStore::new()
            .with(DirSecretStore::new(first.path()))
            .with(DirSecretStore::new(second.path()));

        assert_eq!(store.get("USER").as_deref(), Some("from-first"));
        assert_eq!(store.get("PASS").as_deref(), Some("only-second"));
    }

    #[test]
    fn test_resolve_credentials_missing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("USER"), "robot").unwrap();
        let store = DirSecretStore::new(dir.path());

        let err = resolve_credentials(&store, "USER", "PASS").unwrap_err();
        assert!(matches!(err, PipelineError::MissingSecret(name) if name == "PASS"));
    }

    #[test]
    fn test_resolve_credentials_ok() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("USER"), "robot").unwrap();
        fs::write(dir.path().join("PASS"), "hunter2").unwrap();
        let store = DirSecretStore::new(dir.path());

        let creds = resolve_credentials(&store, "USER", "PASS").unwrap();
        assert_eq!(creds, CredentialPair::new("robot", "hunter2"));
    }
}
