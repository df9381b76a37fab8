//! レジストリ認証
//!
//! プッシュ先 `registry` のホストに対して、次の順で認証情報を探す。
//!
//! 1. シークレットストアから解決した [`CredentialPair`]
//! 2. config.json の `credHelpers`（ホスト単位の helper）
//! 3. config.json の `auths`
//! 4. config.json の `credsStore`
//! 5. どれもなければ匿名

use base64::Engine;
use bollard::auth::DockerCredentials;
use pushgate_core::CredentialPair;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Docker Hub の auths キー
const DOCKER_HUB_INDEX: &str = "https://index.docker.io/v1/";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{path} を読み込めません: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} の形式が不正です: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{host} の auths エントリが不正です: {reason}")]
    MalformedEntry { host: String, reason: String },

    #[error("docker-credential-{helper} が失敗しました ({host}): {reason}")]
    Helper {
        helper: String,
        host: String,
        reason: String,
    },
}

/// 認証情報の出どころ
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    SecretStore,
    ConfigAuths,
    Helper(String),
    Anonymous,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::SecretStore => write!(f, "secret store"),
            CredentialSource::ConfigAuths => write!(f, "config.json auths"),
            CredentialSource::Helper(name) => write!(f, "docker-credential-{}", name),
            CredentialSource::Anonymous => write!(f, "anonymous"),
        }
    }
}

/// 解決済みのログイン情報
#[derive(Debug, Clone)]
pub struct RegistryLogin {
    pub host: String,
    pub source: CredentialSource,
    pub credentials: Option<DockerCredentials>,
}

impl RegistryLogin {
    fn new(host: &str, source: CredentialSource, username: String, password: String) -> Self {
        Self {
            host: host.to_string(),
            source,
            credentials: Some(DockerCredentials {
                username: Some(username),
                password: Some(password),
                serveraddress: Some(host.to_string()),
                ..Default::default()
            }),
        }
    }

    fn anonymous(host: &str) -> Self {
        Self {
            host: host.to_string(),
            source: CredentialSource::Anonymous,
            credentials: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DockerConfig {
    #[serde(default)]
    auths: HashMap<String, AuthEntry>,
    #[serde(default)]
    cred_helpers: HashMap<String, String>,
    creds_store: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthEntry {
    auth: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

impl AuthEntry {
    /// `auth`（base64 の `user:pass`）を優先し、なければ平文フィールド
    fn login(&self, host: &str) -> Result<Option<(String, String)>, AuthError> {
        if let Some(encoded) = self.auth.as_deref().filter(|a| !a.is_empty()) {
            let malformed = |reason: String| AuthError::MalformedEntry {
                host: host.to_string(),
                reason,
            };
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| malformed(e.to_string()))?;
            let text = String::from_utf8(bytes).map_err(|e| malformed(e.to_string()))?;
            let (user, pass) = text
                .split_once(':')
                .ok_or_else(|| malformed("'user:password' 形式ではありません".to_string()))?;
            return Ok(Some((user.to_string(), pass.to_string())));
        }

        Ok(match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
            _ => None,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HelperResponse {
    username: String,
    secret: String,
}

/// プッシュ先レジストリの認証解決
#[derive(Debug, Clone)]
pub struct RegistryAuth {
    config_path: PathBuf,
}

impl RegistryAuth {
    /// `config_dir` 省略時は `$DOCKER_CONFIG`、なければ `~/.docker`
    pub fn new(config_dir: Option<PathBuf>) -> Self {
        let dir = config_dir
            .or_else(|| std::env::var_os("DOCKER_CONFIG").map(PathBuf::from))
            .or_else(|| dirs::home_dir().map(|home| home.join(".docker")))
            .unwrap_or_else(|| PathBuf::from(".docker"));

        Self {
            config_path: dir.join("config.json"),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// `registry`（例: `quay.io/example`）へプッシュするためのログイン情報を解決
    pub async fn resolve(
        &self,
        registry: &str,
        secrets: Option<&CredentialPair>,
    ) -> Result<RegistryLogin, AuthError> {
        let host = registry_host(registry);

        if let Some(pair) = secrets {
            return Ok(RegistryLogin::new(
                host,
                CredentialSource::SecretStore,
                pair.username.clone(),
                pair.password.clone(),
            ));
        }

        let config = self.load()?;
        let keys = lookup_keys(host);

        if let Some(helper) = keys.iter().find_map(|k| config.cred_helpers.get(k))
            && let Some(login) = run_helper(helper, host).await?
        {
            return Ok(login);
        }

        for key in &keys {
            if let Some(entry) = config.auths.get(key)
                && let Some((user, pass)) = entry.login(host)?
            {
                return Ok(RegistryLogin::new(
                    host,
                    CredentialSource::ConfigAuths,
                    user,
                    pass,
                ));
            }
        }

        if let Some(helper) = &config.creds_store
            && let Some(login) = run_helper(helper, host).await?
        {
            return Ok(login);
        }

        tracing::debug!(%host, "No registry credentials configured, pushing anonymously");
        Ok(RegistryLogin::anonymous(host))
    }

    /// config.json がなければ空設定
    fn load(&self) -> Result<DockerConfig, AuthError> {
        let content = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.config_path.display(), "Docker config not found");
                return Ok(DockerConfig::default());
            }
            Err(source) => {
                return Err(AuthError::ConfigRead {
                    path: self.config_path.clone(),
                    source,
                });
            }
        };

        serde_json::from_str(&content).map_err(|source| AuthError::ConfigParse {
            path: self.config_path.clone(),
            source,
        })
    }
}

/// プッシュ先からレジストリホストを取り出す
///
/// 先頭要素が `.` / `:` を含むか `localhost` ならホスト、そうでなければ Docker Hub の名前空間。
pub fn registry_host(registry: &str) -> &str {
    let first = registry
        .trim_end_matches('/')
        .split('/')
        .next()
        .unwrap_or_default();
    let is_host = first.contains('.') || first.contains(':') || first == "localhost";
    if is_host && first != "index.docker.io" {
        first
    } else {
        "docker.io"
    }
}

/// config.json 上でホストが取りうるキー
fn lookup_keys(host: &str) -> Vec<String> {
    if host == "docker.io" {
        return vec![
            DOCKER_HUB_INDEX.to_string(),
            "index.docker.io".to_string(),
            "docker.io".to_string(),
        ];
    }
    vec![
        host.to_string(),
        format!("https://{}", host),
        format!("https://{}/v1/", host),
    ]
}

/// `docker-credential-<helper> get` を実行
///
/// helper が「見つからない」と答えた場合は `None`。
async fn run_helper(helper: &str, host: &str) -> Result<Option<RegistryLogin>, AuthError> {
    let failed = |reason: String| AuthError::Helper {
        helper: helper.to_string(),
        host: host.to_string(),
        reason,
    };
    let server = if host == "docker.io" {
        DOCKER_HUB_INDEX
    } else {
        host
    };

    tracing::debug!(%helper, %host, "Querying credential helper");
    let mut child = Command::new(format!("docker-credential-{}", helper))
        .arg("get")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| failed(e.to_string()))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(server.as_bytes())
            .await
            .map_err(|e| failed(e.to_string()))?;
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| failed(e.to_string()))?;

    if !output.status.success() {
        tracing::debug!(
            %helper,
            %host,
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "Credential helper has no entry"
        );
        return Ok(None);
    }

    let response: HelperResponse =
        serde_json::from_slice(&output.stdout).map_err(|e| failed(e.to_string()))?;

    Ok(Some(RegistryLogin::new(
        host,
        CredentialSource::Helper(helper.to_string()),
        response.username,
        response.secret,
    )))
}
