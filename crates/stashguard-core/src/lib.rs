//! stashguard Core
//!
//! Core types and error handling shared across the stashguard crates.
//!
//! This crate provides:
//! - `Money`, an exact decimal amount tied to a unit
//! - Identifiers and domain records (agents, badges, replies)
//! - The shared error type and `Result` alias

pub mod error;
pub mod money;
pub mod types;

pub use error::{Error, Result};
pub use money::{Money, MoneyFormat, Unit};
pub use types::{ActionKind, Agent, AgentId, Badge, Metadata, Reply, RuleTarget, StashId};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::money::{Money, MoneyFormat, Unit};
    pub use crate::types::{ActionKind, Agent, AgentId, Badge, Reply, RuleTarget, StashId};
}
