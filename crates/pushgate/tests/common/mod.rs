use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const SHA: &str = "3f9c2a1d8e7b6c5a4f3e2d1c0b9a8f7e6d5c4b3a";

pub const PIPELINE_KDL: &str = r#"
pipeline "bugzooka"

trigger {
    manual
    push "master" "main"
}

build {
    image "bugzooka"
    dockerfile "Dockerfile"
}

push {
    registry "quay.io/example"
    branch "main"
    username-secret "REGISTRY_USERNAME"
    password-secret "REGISTRY_PASSWORD"
}
"#;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn with_pipeline(content: &str) -> Self {
        let project = Self::new();
        project.write_pipeline_kdl(content);
        project
    }

    pub fn write_pipeline_kdl(&self, content: &str) {
        fs::write(self.pipeline_path(), content).unwrap();
    }

    #[allow(dead_code)]
    pub fn write_dockerfile(&self, content: &str) {
        fs::write(self.root.path().join("Dockerfile"), content).unwrap();
    }

    pub fn pipeline_path(&self) -> PathBuf {
        self.root.path().join("pipeline.kdl")
    }

    #[allow(dead_code)]
    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }
}
