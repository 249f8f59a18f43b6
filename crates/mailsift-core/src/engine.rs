//! The decision engine: classification plus VIP overrides.

use crate::taxonomy::{Taxonomy, Tier};
use crate::vip::VipRegistry;

/// Full categorization of one message.
///
/// Recomputed on every call - age-based escalation means inputs can change
/// between calls, so nothing is cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorizationResult {
    /// The winning category label.
    pub label: String,
    /// Priority tier for the message.
    pub tier: Tier,
    /// Whether the category loses value as it ages.
    pub time_sensitive: bool,
    /// Whether a VIP override fired.
    pub is_vip: bool,
    /// The matching VIP entry's note, if any.
    pub vip_note: Option<String>,
}

/// Composes the taxonomy and VIP registry into one categorization entry
/// point.
///
/// The engine owns its registry - there is no process-wide VIP state, so
/// tests and embedders construct isolated engines freely.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    taxonomy: Taxonomy,
    vips: VipRegistry,
}

impl DecisionEngine {
    /// Create an engine over a taxonomy and a VIP registry.
    #[must_use]
    pub const fn new(taxonomy: Taxonomy, vips: VipRegistry) -> Self {
        Self { taxonomy, vips }
    }

    /// The taxonomy this engine classifies against.
    #[must_use]
    pub const fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// The VIP registry consulted before classification is finalized.
    #[must_use]
    pub const fn vips(&self) -> &VipRegistry {
        &self.vips
    }

    /// Categorize a message by sender and subject.
    ///
    /// VIP overrides are consulted first. A VIP match forces the tier and
    /// marks the result time-sensitive; unless the entry carries a label
    /// override, the classifier still picks the label. Without a VIP match
    /// the classifier's label determines tier and time-sensitivity from the
    /// taxonomy, degrading to tier 4 / not time-sensitive for labels the
    /// taxonomy does not know. Total: never fails, for any input.
    #[must_use]
    pub fn categorize(&self, sender: &str, subject: &str) -> CategorizationResult {
        if let Some(vip) = self.vips.check(sender) {
            let label = vip.label_override.clone().unwrap_or_else(|| {
                self.taxonomy.classify(sender, subject).to_string()
            });
            return CategorizationResult {
                label,
                tier: vip.tier,
                time_sensitive: true,
                is_vip: true,
                vip_note: (!vip.note.is_empty()).then(|| vip.note.clone()),
            };
        }

        let label = self.taxonomy.classify(sender, subject).to_string();
        CategorizationResult {
            tier: self.taxonomy.tier_for(&label),
            time_sensitive: self.taxonomy.is_time_sensitive(&label),
            label,
            is_vip: false,
            vip_note: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::taxonomy::{CATCH_ALL_PRIORITY, RuleSpec};

    fn engine_with_vips(vips: VipRegistry) -> DecisionEngine {
        let taxonomy = Taxonomy::new(&[
            RuleSpec::new("Work/Dev/GitHub", &[r"github\.com"], 1)
                .tier(Tier::Important)
                .time_sensitive(),
            RuleSpec::new("Marketing", &[r"newsletter"], 17),
            RuleSpec::new("Misc/Other", &[r".*"], CATCH_ALL_PRIORITY),
        ])
        .unwrap();
        DecisionEngine::new(taxonomy, vips)
    }

    #[test]
    fn test_plain_classification_pulls_tier_from_taxonomy() {
        let engine = engine_with_vips(VipRegistry::new());
        let result = engine.categorize("notifications@github.com", "PR Review");

        assert_eq!(result.label, "Work/Dev/GitHub");
        assert_eq!(result.tier, Tier::Important);
        assert!(result.time_sensitive);
        assert!(!result.is_vip);
    }

    #[test]
    fn test_unmatched_input_degrades_to_catch_all() {
        let engine = engine_with_vips(VipRegistry::new());
        let result = engine.categorize("stranger@example.com", "hello there");

        assert_eq!(result.label, "Misc/Other");
        assert_eq!(result.tier, Tier::Reference);
        assert!(!result.time_sensitive);
    }

    #[test]
    fn test_vip_forces_tier_but_keeps_classifier_label() {
        let mut vips = VipRegistry::new();
        vips.register("gh", r"notifications@github\.com", Tier::Critical, true, None, "CI")
            .unwrap();
        let engine = engine_with_vips(vips);

        let result = engine.categorize("notifications@github.com", "PR Review");
        assert_eq!(result.label, "Work/Dev/GitHub");
        assert_eq!(result.tier, Tier::Critical);
        assert!(result.is_vip);
        assert!(result.time_sensitive);
        assert_eq!(result.vip_note.as_deref(), Some("CI"));
    }

    #[test]
    fn test_vip_label_override_bypasses_classifier() {
        let mut vips = VipRegistry::new();
        vips.register(
            "client",
            r".*@bigclient\.com",
            Tier::Critical,
            true,
            Some("Personal".to_string()),
            "",
        )
        .unwrap();
        let engine = engine_with_vips(vips);

        let result = engine.categorize("news@bigclient.com", "newsletter digest");
        assert_eq!(result.label, "Personal");
        assert_eq!(result.tier, Tier::Critical);
        assert!(result.vip_note.is_none());
    }

    #[test]
    fn test_vip_precedence_over_tier_derivation() {
        // The classifier alone would say Marketing / tier 4; the VIP entry
        // must win.
        let mut vips = VipRegistry::new();
        vips.register("news", r"news@watched\.com", Tier::Important, true, None, "")
            .unwrap();
        let engine = engine_with_vips(vips);

        let result = engine.categorize("news@watched.com", "newsletter");
        assert_eq!(result.label, "Marketing");
        assert_eq!(result.tier, Tier::Important);
    }

    #[test]
    fn test_vip_only_matches_sender_not_subject() {
        let mut vips = VipRegistry::new();
        vips.register("ceo", r"ceo@corp\.com", Tier::Critical, true, None, "")
            .unwrap();
        let engine = engine_with_vips(vips);

        let result = engine.categorize("random@example.com", "fwd from ceo@corp.com");
        assert!(!result.is_vip);
    }
}
