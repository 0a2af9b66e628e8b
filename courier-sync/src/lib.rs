//! # courier-sync
//!
//! Watermark-gated relay of changed documents to a chat webhook.
//!
//! Build a [`Relay`] from a [`RelaySettings`], a [`Repository`] and a
//! [`Transport`], then call [`Relay::run`]. The production implementations
//! are [`GitRepository`] and [`WebhookClient`].

pub mod delivery;
pub mod error;
pub mod pipeline;
pub mod repo;
pub mod scan;
pub mod watermark;

pub use delivery::{DeliveryError, Transport, WebhookClient};
pub use error::RelayError;
pub use pipeline::{Relay, RelaySettings, RunOptions, RunOutcome, RunSummary};
pub use repo::{GitRepository, PullOutcome, Repository};
