use serde::{Deserialize, Serialize};

/// Body of `POST /auth/login`.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginRequest {
    #[serde(rename = "email")]
    pub identity: String,
    #[serde(rename = "password")]
    pub secret: String,
}

impl LoginRequest {
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self { identity: identity.into(), secret: secret.into() }
    }
}

// Keep the secret out of logs.
impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest").field("identity", &self.identity).field("secret", &"<redacted>").finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
}
