use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// 既定のトリガーブランチ
pub const DEFAULT_TRIGGER_BRANCHES: [&str; 2] = ["master", "main"];

/// 既定のプッシュ対象ブランチ
pub const DEFAULT_PUSH_BRANCH: &str = "main";

/// pipeline.kdl 全体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub name: String,
    /// pipeline.kdl が置かれているディレクトリ（相対パスの基準）
    #[serde(skip)]
    pub root: PathBuf,
    pub trigger: TriggerPolicy,
    pub build: BuildSpec,
    /// None の場合は一切プッシュしない
    pub push: Option<PushSpec>,
}

impl Pipeline {
    /// ビルドコンテキストの絶対パス
    pub fn context_path(&self) -> PathBuf {
        self.root.join(&self.build.context)
    }

    /// Dockerfile の絶対パス
    pub fn dockerfile_path(&self) -> PathBuf {
        self.root.join(&self.build.dockerfile)
    }

    pub fn with_root(mut self, root: &Path) -> Self {
        self.root = root.to_path_buf();
        self
    }
}

/// トリガー条件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerPolicy {
    /// 手動実行を許可するか
    pub manual: bool,
    /// push で起動するブランチ
    pub push_branches: Vec<String>,
}

impl Default for TriggerPolicy {
    fn default() -> Self {
        Self {
            manual: true,
            push_branches: DEFAULT_TRIGGER_BRANCHES
                .iter()
                .map(|b| b.to_string())
                .collect(),
        }
    }
}

/// ビルド設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
    pub image: String,
    pub context: PathBuf,
    pub dockerfile: PathBuf,
    #[serde(default)]
    pub build_args: BTreeMap<String, String>,
}

impl BuildSpec {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            context: PathBuf::from("."),
            dockerfile: PathBuf::from("Dockerfile"),
            build_args: BTreeMap::new(),
        }
    }
}

/// プッシュ設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSpec {
    /// レジストリ（例: quay.io/org）
    pub registry: String,
    /// プッシュを許可する唯一のブランチ
    pub branch: String,
    pub username_secret: Option<String>,
    pub password_secret: Option<String>,
}

impl PushSpec {
    pub fn new(registry: impl Into<String>) -> Self {
        Self {
            registry: registry.into(),
            branch: DEFAULT_PUSH_BRANCH.to_string(),
            username_secret: None,
            password_secret: None,
        }
    }

    /// シークレット名が両方とも設定されているか
    pub fn secret_names(&self) -> Option<(&str, &str)> {
        match (&self.username_secret, &self.password_secret) {
            (Some(u), Some(p)) => Some((u.as_str(), p.as_str())),
            _ => None,
        }
    }
}
