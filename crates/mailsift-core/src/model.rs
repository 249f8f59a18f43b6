//! Provider-agnostic message and action models.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

/// Immutable snapshot of a message as seen by the decision engine.
///
/// Backing-store adapters extract these fields from their native formats.
/// The engine never mutates a message in place; every change is expressed as
/// an [`Action`] applied through the store port.
#[derive(Debug, Clone, Default)]
pub struct EmailMessage {
    /// Store-scoped opaque identifier.
    pub id: String,
    /// The `From` header value.
    pub sender: String,
    /// The `Subject` header value.
    pub subject: String,
    /// Message date, if the store provides one.
    pub date: Option<DateTime<Utc>>,
    /// Labels/folders currently on the message.
    pub labels: BTreeSet<String>,
    /// Whether the message has been read.
    pub is_read: bool,
    /// Whether the message is starred/flagged.
    pub is_starred: bool,
}

impl EmailMessage {
    /// Create a snapshot from the fields the classifier needs.
    #[must_use]
    pub fn new(id: impl Into<String>, sender: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sender: sender.into(),
            subject: subject.into(),
            ..Self::default()
        }
    }

    /// Sender and subject combined for pattern matching.
    #[must_use]
    pub fn combined_text(&self) -> String {
        format!("{} {}", self.sender, self.subject).to_lowercase()
    }
}

/// Label/star/archive mutations to apply to one message.
///
/// Accumulated by the pipeline, submitted through the store port, then
/// discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Action {
    /// The message to act upon.
    pub message_id: String,
    /// Labels to add.
    pub add_labels: Vec<String>,
    /// Labels to remove.
    pub remove_labels: Vec<String>,
    /// Remove from the inbox without deleting.
    pub archive: bool,
    /// Star/flag the message.
    pub star: bool,
    /// Destination folder, for folder-based stores.
    pub target_folder: Option<String>,
    /// Due date for stores that flag with deadlines.
    pub due_date: Option<DateTime<Utc>>,
}

impl Action {
    /// Create an empty action for a message.
    #[must_use]
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            ..Self::default()
        }
    }

    /// The grouping key: sorted add set and sorted remove set.
    ///
    /// Messages whose actions share a key can be submitted in one mutation
    /// call.
    #[must_use]
    pub fn group_key(&self) -> (Vec<String>, Vec<String>) {
        let mut add = self.add_labels.clone();
        add.sort_unstable();
        add.dedup();
        let mut remove = self.remove_labels.clone();
        remove.sort_unstable();
        remove.dedup();
        (add, remove)
    }
}

/// Maximum number of error strings retained in a [`ProcessingResult`].
pub const MAX_RECORDED_ERRORS: usize = 50;

/// Summary of a batch processing run.
#[derive(Debug, Clone, Default)]
pub struct ProcessingResult {
    /// Messages examined this run.
    pub processed_count: u64,
    /// Messages whose mutations were submitted successfully.
    pub success_count: u64,
    /// Messages whose mutations failed.
    pub error_count: u64,
    /// Per-label counts accumulated this run.
    pub label_counts: std::collections::BTreeMap<String, u64>,
    /// Bounded list of error descriptions.
    pub errors: Vec<String>,
}

impl ProcessingResult {
    /// Increment the count for a label.
    pub fn add_label_stat(&mut self, label: &str) {
        *self.label_counts.entry(label.to_string()).or_insert(0) += 1;
    }

    /// Record an error string, keeping the list bounded.
    pub fn record_error(&mut self, error: impl Into<String>) {
        if self.errors.len() < MAX_RECORDED_ERRORS {
            self.errors.push(error.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_text_is_lowercased() {
        let msg = EmailMessage::new("1", "Alerts@Chase.COM", "Your Statement");
        assert_eq!(msg.combined_text(), "alerts@chase.com your statement");
    }

    #[test]
    fn test_group_key_sorts_and_dedupes() {
        let mut action = Action::new("1");
        action.add_labels = vec!["b".into(), "a".into(), "b".into()];
        action.remove_labels = vec!["INBOX".into()];

        let (add, remove) = action.group_key();
        assert_eq!(add, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(remove, vec!["INBOX".to_string()]);
    }

    #[test]
    fn test_identical_decisions_share_a_key() {
        let mut first = Action::new("1");
        first.add_labels = vec!["Finance/Banking".into()];
        first.remove_labels = vec!["INBOX".into()];
        let mut second = Action::new("2");
        second.add_labels = vec!["Finance/Banking".into()];
        second.remove_labels = vec!["INBOX".into()];

        assert_eq!(first.group_key(), second.group_key());
    }

    #[test]
    fn test_recorded_errors_are_bounded() {
        let mut result = ProcessingResult::default();
        for i in 0..(MAX_RECORDED_ERRORS + 10) {
            result.record_error(format!("error {i}"));
        }
        assert_eq!(result.errors.len(), MAX_RECORDED_ERRORS);
    }
}
