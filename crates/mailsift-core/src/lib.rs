//! # mailsift-core
//!
//! Core triage logic for the `Mailsift` email automation tool.
//!
//! This crate provides:
//! - **Taxonomy** - ordered category rules with priorities and tiers
//! - **Decision Engine** - sender/subject classification with VIP overrides
//! - **Escalation** - age-based priority escalation
//! - **State Store** - crash-recoverable progress persistence
//! - **Batch Pipeline** - resumable, rate-limited labeling runs against an
//!   abstract backing store
//!
//! Concrete backing-store adapters (IMAP, REST APIs, local mail clients)
//! live out of tree and implement the [`MessageStore`] port.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod engine;
mod error;
pub mod escalate;
pub mod model;
pub mod pipeline;
pub mod state;
pub mod store;
pub mod taxonomy;
pub mod vip;

pub use engine::{CategorizationResult, DecisionEngine};
pub use error::{Error, Result};
pub use escalate::{EscalationResult, age_hours, escalate};
pub use model::{Action, EmailMessage, ProcessingResult};
pub use pipeline::{CursorMode, Pipeline, PipelineConfig, QuerySpec, RetryPolicy};
pub use state::{StateRecord, StateStore};
pub use store::{Capabilities, Capability, ListPage, MemoryStore, MessageStore, StoreError};
pub use taxonomy::{CategoryRule, RuleSpec, Taxonomy, Tier, TierPolicy, default_rules};
pub use vip::{VipOverride, VipRegistry};
