use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// 常に付与される固定タグ
pub const LATEST_TAG: &str = "latest";

/// ビルドステップが生成し、プッシュステップが消費するイメージ参照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    /// リポジトリ名（レジストリなし、タグなし）
    pub repository: String,
    /// 付与されるタグ。先頭が `latest`、次がコミットSHA
    pub tags: Vec<String>,
}

impl ImageReference {
    /// コミットSHAからイメージ参照を作成
    ///
    /// タグは `latest` とコミットSHAの2つだけ。
    pub fn for_commit(repository: &str, sha: &str) -> Result<Self> {
        if repository.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "イメージ名が空です".to_string(),
            ));
        }
        validate_tag(sha)?;
        if sha == LATEST_TAG {
            return Err(PipelineError::InvalidTag(format!(
                "コミットタグに '{}' は使えません",
                LATEST_TAG
            )));
        }

        Ok(Self {
            repository: repository.to_string(),
            tags: vec![LATEST_TAG.to_string(), sha.to_string()],
        })
    }

    /// コミットSHAのタグ
    pub fn commit_tag(&self) -> &str {
        self.tags
            .iter()
            .find(|t| t.as_str() != LATEST_TAG)
            .map(String::as_str)
            .unwrap_or(LATEST_TAG)
    }

    /// ローカルの参照 `repository:tag`
    pub fn local(&self, tag: &str) -> String {
        format!("{}:{}", self.repository, tag)
    }

    /// レジストリ上のリポジトリ `registry/repository`
    pub fn remote_repository(&self, registry: &str) -> String {
        format!("{}/{}", registry.trim_end_matches('/'), self.repository)
    }

    /// レジストリ上の参照をすべて列挙
    pub fn remote_references(&self, registry: &str) -> Vec<String> {
        let repo = self.remote_repository(registry);
        self.tags.iter().map(|t| format!("{}:{}", repo, t)).collect()
    }
}

/// タグのバリデーション
///
/// Docker タグの制約:
/// - 128文字以下
/// - 英数字、ピリオド、ハイフン、アンダースコアのみ
/// - 先頭はピリオドまたはハイフンではない
pub fn validate_tag(tag: &str) -> Result<()> {
    if tag.is_empty() {
        return Err(PipelineError::InvalidTag("(empty)".to_string()));
    }

    if tag.len() > 128 {
        return Err(PipelineError::InvalidTag(format!(
            "Tag too long ({} characters, max 128)",
            tag.len()
        )));
    }

    if tag.starts_with('.') || tag.starts_with('-') {
        return Err(PipelineError::InvalidTag(tag.to_string()));
    }

    if let Some(c) = tag
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '.' && *c != '-' && *c != '_')
    {
        return Err(PipelineError::InvalidTag(format!(
            "Invalid character '{}' in tag: {}",
            c, tag
        )));
    }

    Ok(())
}
