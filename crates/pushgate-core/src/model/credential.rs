use std::fmt;

/// レジストリ認証情報
///
/// プッシュステップの間だけ存在し、永続化もログ出力もしない。
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub username: String,
    pub password: String,
}

impl CredentialPair {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
