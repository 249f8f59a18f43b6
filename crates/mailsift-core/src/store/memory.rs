//! In-memory backing store.
//!
//! Used by the crate's tests and as a reference implementation for adapter
//! authors. Listing filters on a substring of sender + subject (empty query
//! matches everything), which is enough to exercise every pipeline path
//! without a network.

use std::collections::HashMap;

use async_trait::async_trait;

use super::{Capabilities, Capability, ListPage, MessageStore, StoreResult};
use crate::model::{Action, EmailMessage};

/// A [`MessageStore`] backed by a `Vec` of messages.
#[derive(Debug)]
pub struct MemoryStore {
    messages: Vec<EmailMessage>,
    categories: Vec<String>,
    applied: Vec<Action>,
    capabilities: Capabilities,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store with the full capability set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            categories: Vec::new(),
            applied: Vec::new(),
            capabilities: Capabilities::none()
                .with(Capability::Labels)
                .with(Capability::Star)
                .with(Capability::Archive)
                .with(Capability::Batch)
                .with(Capability::Search),
        }
    }

    /// Create an empty store advertising only the given capabilities.
    #[must_use]
    pub const fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            messages: Vec::new(),
            categories: Vec::new(),
            applied: Vec::new(),
            capabilities,
        }
    }

    /// Add a message to the store.
    pub fn push(&mut self, message: EmailMessage) {
        self.messages.push(message);
    }

    /// Actions applied so far, in submission order.
    #[must_use]
    pub fn applied(&self) -> &[Action] {
        &self.applied
    }

    /// Categories that have been ensured to exist.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    fn matches(message: &EmailMessage, query: &str) -> bool {
        query.is_empty() || message.combined_text().contains(&query.to_lowercase())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    fn id(&self) -> &str {
        "memory"
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn list(
        &mut self,
        query: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> StoreResult<ListPage> {
        let matching: Vec<&EmailMessage> = self
            .messages
            .iter()
            .filter(|m| Self::matches(m, query))
            .collect();

        let offset = cursor.and_then(|c| c.parse::<usize>().ok()).unwrap_or(0);
        let ids: Vec<String> = matching
            .iter()
            .skip(offset)
            .take(limit)
            .map(|m| m.id.clone())
            .collect();

        let consumed = offset + ids.len();
        let next_cursor = (consumed < matching.len()).then(|| consumed.to_string());

        Ok(ListPage {
            ids,
            next_cursor,
            total_estimate: Some(matching.len()),
        })
    }

    async fn get_details(&mut self, id: &str) -> StoreResult<Option<EmailMessage>> {
        Ok(self.messages.iter().find(|m| m.id == id).cloned())
    }

    async fn apply(&mut self, action: &Action) -> StoreResult<()> {
        for message in &mut self.messages {
            if message.id != action.message_id {
                continue;
            }
            for label in &action.add_labels {
                message.labels.insert(label.clone());
            }
            for label in &action.remove_labels {
                message.labels.remove(label);
            }
            if action.star {
                message.is_starred = true;
            }
        }
        self.applied.push(action.clone());
        Ok(())
    }

    async fn ensure_category(&mut self, name: &str) -> StoreResult<String> {
        if !self.categories.iter().any(|c| c == name) {
            self.categories.push(name.to_string());
        }
        Ok(name.to_string())
    }
}
