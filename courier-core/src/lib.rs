//! Courier core library: domain types, relay configuration, errors.
//!
//! - [`types`]: [`Document`] and the [`Credential`] newtype
//! - [`config`]: [`RelayConfig`], validated once at startup
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{RelayConfig, RelayPaths};
pub use error::ConfigError;
pub use types::{Credential, Document};
