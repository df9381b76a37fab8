//! pushgate Docker steps
//!
//! Docker Engine API（bollard）を使ったビルドステップとプッシュステップ。
//! pushgate-core の [`pushgate_core::ImageBuild`] / [`pushgate_core::ImagePush`] を実装する。

pub mod auth;
pub mod builder;
pub mod context;
pub mod error;
mod progress;
pub mod pusher;

pub use auth::{AuthError, CredentialSource, RegistryAuth, RegistryLogin, registry_host};
pub use builder::ImageBuilder;
pub use context::ContextBuilder;
pub use error::{BuildError, BuildResult};
pub use pusher::ImagePusher;
