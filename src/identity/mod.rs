//! Credential handling and session lifecycle.
//! Keep the public surface thin and split implementation across sub-modules.

mod claims;
mod token_store;
mod provider;
mod session;

pub use claims::{decode_claims, decode_valid, Claims};
pub use token_store::{TokenStore, LOWEST_LEVEL};
pub use provider::{LoginRequest, LoginResponse};
pub use session::SessionLifecycle;
