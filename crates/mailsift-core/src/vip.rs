//! VIP sender overrides.
//!
//! A VIP entry forces the tier (and optionally the label) for any message
//! whose sender matches its pattern, regardless of what the classifier would
//! decide. The registry is an explicit owned value: the decision engine
//! receives one at construction and tests build isolated registries freely.

use regex::{Regex, RegexBuilder};

use crate::taxonomy::Tier;
use crate::{Error, Result};

/// A sender-pattern override entry.
#[derive(Debug, Clone)]
pub struct VipOverride {
    /// Unique key identifying the entry.
    pub key: String,
    /// Compiled case-insensitive sender pattern.
    pub sender_pattern: Regex,
    /// Tier forced onto matching messages.
    pub tier: Tier,
    /// Whether matching messages are starred.
    pub star: bool,
    /// Optional label that bypasses the classifier entirely.
    pub label_override: Option<String>,
    /// Free-form note shown in reports.
    pub note: String,
}

/// An ordered collection of VIP overrides.
///
/// Entries are consulted in registration order; the first match wins.
#[derive(Debug, Clone, Default)]
pub struct VipRegistry {
    entries: Vec<VipOverride>,
}

impl VipRegistry {
    /// Create an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Register an override.
    ///
    /// A key that already exists is replaced in place, keeping its position
    /// in the scan order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pattern`] if the sender pattern does not compile.
    /// Malformed patterns are a configuration problem and surface here, at
    /// registration time - never during classification.
    pub fn register(
        &mut self,
        key: impl Into<String>,
        pattern: &str,
        tier: Tier,
        star: bool,
        label_override: Option<String>,
        note: impl Into<String>,
    ) -> Result<()> {
        let key = key.into();
        let sender_pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| Error::Pattern {
                rule: format!("vip:{key}"),
                source,
            })?;

        let entry = VipOverride {
            key: key.clone(),
            sender_pattern,
            tier,
            star,
            label_override,
            note: note.into(),
        };

        if let Some(existing) = self.entries.iter_mut().find(|e| e.key == key) {
            *existing = entry;
        } else {
            self.entries.push(entry);
        }
        Ok(())
    }

    /// Find the first entry whose pattern matches the sender.
    ///
    /// Only the sender is consulted, never the subject.
    #[must_use]
    pub fn check(&self, sender: &str) -> Option<&VipOverride> {
        self.entries.iter().find(|e| e.sender_pattern.is_match(sender))
    }

    /// Whether the sender matches any entry.
    #[must_use]
    pub fn is_vip(&self, sender: &str) -> bool {
        self.check(sender).is_some()
    }

    /// Registered entries in scan order.
    #[must_use]
    pub fn entries(&self) -> &[VipOverride] {
        &self.entries
    }

    /// Number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
