//! Error model for the authorization core.
//!
//! Decode failures never leave the token store; fetch failures are reported to
//! whoever awaited the call but never corrupt the cached snapshot; login
//! rejections carry the authority's message verbatim. Authorization denial is
//! not an error at all, see `guard::GuardDecision`.

use thiserror::Error;

/// Credential could not be turned into claims. Internal to the token store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("credential is not a three-part token")]
    Shape,
    #[error("credential payload is not base64url: {0}")]
    Base64(String),
    #[error("credential payload is not valid claims json: {0}")]
    Claims(String),
    #[error("credential expired at {exp_secs}")]
    Expired { exp_secs: i64 },
}

/// Failure talking to the policy authority.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("policy authority unreachable: {message}")]
    Transport { message: String },
    #[error("policy authority returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("policy authority sent an unreadable payload: {message}")]
    Payload { message: String },
}

impl FetchError {
    pub fn transport<S: Into<String>>(msg: S) -> Self { FetchError::Transport { message: msg.into() } }
    pub fn status<S: Into<String>>(status: u16, msg: S) -> Self { FetchError::Status { status, message: msg.into() } }
    pub fn payload<S: Into<String>>(msg: S) -> Self { FetchError::Payload { message: msg.into() } }

    pub fn code_str(&self) -> &'static str {
        match self {
            FetchError::Transport { .. } => "fetch_transport",
            FetchError::Status { .. } => "fetch_status",
            FetchError::Payload { .. } => "fetch_payload",
        }
    }
}

/// Default message when the authority rejects a login without saying why.
pub const DEFAULT_AUTH_MESSAGE: &str = "Invalid credentials";

/// Login failure. `Rejected` displays the authority's message and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("{message}")]
    Rejected { message: String },
    #[error("login transport failure: {message}")]
    Transport { message: String },
    #[error("could not persist credential: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    pub fn rejected<S: Into<String>>(msg: S) -> Self { AuthError::Rejected { message: msg.into() } }

    /// Text shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Rejected { message } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        match self {
            AuthError::Rejected { .. } => "auth_rejected",
            AuthError::Transport { .. } => "auth_transport",
            AuthError::Storage(_) => "auth_storage",
        }
    }
}

/// Failure of the persisted local store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("store io error at {path}: {message}")]
    Io { path: String, message: String },
    #[error("store serialization error: {0}")]
    Serialize(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self { StorageError::Serialize(err.to_string()) }
}
