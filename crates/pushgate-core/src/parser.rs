//! pipeline.kdl パーサー
//!
//! ```kdl
//! pipeline "bugzooka"
//!
//! trigger {
//!     manual
//!     push "master" "main"
//! }
//!
//! build {
//!     image "bugzooka"
//!     context "."
//!     dockerfile "Dockerfile"
//!     build-arg "APP_ENV" "production"
//! }
//!
//! push {
//!     registry "quay.io/example"
//!     branch "main"
//!     username-secret "REGISTRY_USERNAME"
//!     password-secret "REGISTRY_PASSWORD"
//! }
//! ```

use crate::error::{PipelineError, Result};
use crate::model::{BuildSpec, DEFAULT_PUSH_BRANCH, Pipeline, PushSpec, TriggerPolicy};
use kdl::{KdlDocument, KdlNode};
use std::path::{Path, PathBuf};

/// KDLファイルを Pipeline にパース
///
/// 相対パスの基準はリポジトリルート（.pushgate/ 内なら一つ上）。
pub fn parse_pipeline_file(path: &Path) -> Result<Pipeline> {
    let content = std::fs::read_to_string(path)?;
    let root = crate::discovery::repository_root(path);
    let pipeline = parse_pipeline(&content)?.with_root(&root);
    tracing::info!(
        pipeline = %pipeline.name,
        path = %path.display(),
        "Loaded pipeline definition"
    );
    Ok(pipeline)
}

/// KDL文字列を Pipeline にパース
pub fn parse_pipeline(content: &str) -> Result<Pipeline> {
    let doc: KdlDocument = content.parse()?;

    let mut name = None;
    let mut trigger = None;
    let mut build = None;
    let mut push = None;

    for node in doc.nodes() {
        match node.name().value() {
            "pipeline" => name = first_string(node),
            "trigger" => trigger = Some(parse_trigger(node)),
            "build" => build = Some(parse_build(node)?),
            "push" => push = Some(parse_push(node)?),
            other => {
                tracing::warn!(node = other, "Unknown top-level node ignored");
            }
        }
    }

    let name = name.ok_or_else(|| {
        PipelineError::InvalidConfig("pipeline ノードに名前が必要です".to_string())
    })?;
    let build = build
        .ok_or_else(|| PipelineError::InvalidConfig("build ブロックが必要です".to_string()))?;

    Ok(Pipeline {
        name,
        root: PathBuf::from("."),
        trigger: trigger.unwrap_or_default(),
        build,
        push,
    })
}

/// trigger ブロック
///
/// ブロックを書いた場合は `manual` の有無で手動実行の可否が決まる。
fn parse_trigger(node: &KdlNode) -> TriggerPolicy {
    let mut policy = TriggerPolicy {
        manual: false,
        push_branches: Vec::new(),
    };

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "manual" => policy.manual = true,
                "push" => policy.push_branches.extend(positional_strings(child)),
                other => {
                    tracing::warn!(node = other, "Unknown trigger node ignored");
                }
            }
        }
    }

    policy
}

/// build ブロック
fn parse_build(node: &KdlNode) -> Result<BuildSpec> {
    let mut image = None;
    let mut spec = BuildSpec::new(String::new());

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "image" => image = first_string(child),
                "context" => {
                    if let Some(ctx) = first_string(child) {
                        spec.context = PathBuf::from(ctx);
                    }
                }
                "dockerfile" => {
                    if let Some(dockerfile) = first_string(child) {
                        spec.dockerfile = PathBuf::from(dockerfile);
                    }
                }
                "build-arg" => {
                    let values = positional_strings(child);
                    match values.as_slice() {
                        [key, value] => {
                            spec.build_args.insert(key.clone(), value.clone());
                        }
                        _ => {
                            return Err(PipelineError::InvalidConfig(
                                "build-arg にはキーと値が必要です".to_string(),
                            ));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    spec.image = image.filter(|i| !i.trim().is_empty()).ok_or_else(|| {
        PipelineError::InvalidConfig("build に image が必要です".to_string())
    })?;

    Ok(spec)
}

/// push ブロック
fn parse_push(node: &KdlNode) -> Result<PushSpec> {
    let mut registry = None;
    let mut branch = None;
    let mut username_secret = None;
    let mut password_secret = None;

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "registry" => registry = first_string(child),
                "branch" => branch = first_string(child),
                "username-secret" => username_secret = first_string(child),
                "password-secret" => password_secret = first_string(child),
                _ => {}
            }
        }
    }

    let registry = registry
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| PipelineError::InvalidConfig("push に registry が必要です".to_string()))?;

    if username_secret.is_some() != password_secret.is_some() {
        return Err(PipelineError::InvalidConfig(
            "username-secret と password-secret は両方指定してください".to_string(),
        ));
    }

    Ok(PushSpec {
        registry,
        branch: branch.unwrap_or_else(|| DEFAULT_PUSH_BRANCH.to_string()),
        username_secret,
        password_secret,
    })
}

fn first_string(node: &KdlNode) -> Option<String> {
    positional_strings(node).into_iter().next()
}

fn positional_strings(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}
