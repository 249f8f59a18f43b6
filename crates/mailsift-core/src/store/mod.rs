//! The backing-store port.
//!
//! The pipeline reaches the message repository only through the
//! [`MessageStore`] trait. Adapters advertise what they can do through an
//! explicit [`Capabilities`] set - the pipeline never probes for optional
//! methods - and report failures as a typed [`StoreError`] whose
//! [`StoreError::is_retryable`] classification drives the retry policy, so
//! no caller ever inspects error message text.

mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;

use crate::model::{Action, EmailMessage};

/// Errors produced by a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store is throttling; the operation may succeed after a delay.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The referenced message or category does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The credentials do not permit the operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Any other backend failure.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether retrying after a backoff delay can succeed.
    ///
    /// Only rate limiting is retryable; everything else either cannot
    /// recover by waiting or needs operator attention.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// An optional feature a store may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Multiple labels per message (Gmail-style).
    Labels,
    /// One folder per message (IMAP/Outlook-style).
    Folders,
    /// Starring/flagging messages.
    Star,
    /// Archiving (removing from inbox without deleting).
    Archive,
    /// Batched mutation calls.
    Batch,
    /// Server-side search queries.
    Search,
    /// Colored categories.
    Colors,
}

impl Capability {
    const fn bit(self) -> u8 {
        match self {
            Self::Labels => 1,
            Self::Folders => 1 << 1,
            Self::Star => 1 << 2,
            Self::Archive => 1 << 3,
            Self::Batch => 1 << 4,
            Self::Search => 1 << 5,
            Self::Colors => 1 << 6,
        }
    }
}

/// A set of [`Capability`] flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities(u8);

impl Capabilities {
    /// The empty set.
    #[must_use]
    pub const fn none() -> Self {
        Self(0)
    }

    /// Add a capability to the set.
    #[must_use]
    pub const fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    /// Whether the set contains a capability.
    #[must_use]
    pub const fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }
}

/// One page of message identifiers from a listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Message identifiers, in store order.
    pub ids: Vec<String>,
    /// Continuation token for the next page, if any.
    pub next_cursor: Option<String>,
    /// Store's estimate of the total result count, if it offers one.
    pub total_estimate: Option<usize>,
}

/// Abstract capability boundary to the message repository.
///
/// Implementations are the excluded collaborators: IMAP sessions, REST
/// clients, local mail bridges. The default batch methods fall back to the
/// sequential single-item calls; adapters with true batch APIs override
/// them.
#[async_trait]
pub trait MessageStore: Send {
    /// Stable identifier naming this store (e.g. `"gmail"`), recorded in the
    /// state file.
    fn id(&self) -> &str;

    /// The features this store supports.
    fn capabilities(&self) -> Capabilities;

    /// List up to `limit` message ids matching `query`, optionally
    /// continuing from a cursor.
    async fn list(
        &mut self,
        query: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> StoreResult<ListPage>;

    /// Fetch one message's metadata. `Ok(None)` when the id is unknown.
    async fn get_details(&mut self, id: &str) -> StoreResult<Option<EmailMessage>>;

    /// Fetch metadata for several messages.
    ///
    /// Ids the store cannot resolve are omitted from the map. The default
    /// implementation fetches sequentially.
    async fn batch_get_details(
        &mut self,
        ids: &[String],
    ) -> StoreResult<HashMap<String, EmailMessage>> {
        let mut results = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(msg) = self.get_details(id).await? {
                results.insert(id.clone(), msg);
            }
        }
        Ok(results)
    }

    /// Apply one message's mutations.
    async fn apply(&mut self, action: &Action) -> StoreResult<()>;

    /// Apply a batch of mutations.
    ///
    /// The pipeline only submits batches whose actions share identical
    /// add/remove label sets, so a store with a grouped-mutation API can
    /// translate a batch into a single call. The default implementation
    /// applies sequentially; the whole batch fails on the first error.
    async fn apply_batch(&mut self, actions: &[Action]) -> StoreResult<()> {
        for action in actions {
            self.apply(action).await?;
        }
        Ok(())
    }

    /// Ensure a category/label/folder exists, creating it if needed.
    /// Returns the store's handle for it.
    async fn ensure_category(&mut self, name: &str) -> StoreResult<String>;
}
