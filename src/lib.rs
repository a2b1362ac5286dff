//! Client-side authorization core for the inventory front-end.
//!
//! Clearance levels map to sets of function ids. The table is fetched from a
//! policy authority, cached in memory and in a local store, and consulted
//! synchronously by the route guard, the render gate and imperative checks.

pub mod error;
pub mod storage;
pub mod identity;
pub mod policy;
pub mod guard;
pub mod notify;
pub mod config;
pub mod gate;

pub use config::GateConfig;
pub use error::{AuthError, DecodeError, FetchError, StorageError};
pub use gate::Gate;
