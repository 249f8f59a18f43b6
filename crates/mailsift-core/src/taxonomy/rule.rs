//! Category rules and the classification scan.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::tier::Tier;
use crate::{Error, Result};

/// Priority of the mandatory catch-all rule.
pub const CATCH_ALL_PRIORITY: u32 = 999;

/// A category rule before pattern compilation.
///
/// This is the configuration-facing shape: plain strings, serde-friendly,
/// mergeable. [`Taxonomy::new`] turns a list of these into compiled rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Hierarchical category path, e.g. `"Finance/Banking"`.
    pub name: String,
    /// Ordered regex patterns matched against sender + subject.
    pub patterns: Vec<String>,
    /// Precedence: lower number wins over higher.
    pub priority: u32,
    /// Priority tier assigned to matching messages.
    #[serde(default = "default_tier")]
    pub tier: Tier,
    /// Whether messages in this category lose value as they age.
    #[serde(default)]
    pub time_sensitive: bool,
}

const fn default_tier() -> Tier {
    Tier::Reference
}

impl RuleSpec {
    /// Create a spec with the given patterns and priority.
    #[must_use]
    pub fn new(name: impl Into<String>, patterns: &[&str], priority: u32) -> Self {
        Self {
            name: name.into(),
            patterns: patterns.iter().map(ToString::to_string).collect(),
            priority,
            tier: Tier::Reference,
            time_sensitive: false,
        }
    }

    /// Set the tier.
    #[must_use]
    pub const fn tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    /// Mark the category time-sensitive.
    #[must_use]
    pub const fn time_sensitive(mut self) -> Self {
        self.time_sensitive = true;
        self
    }
}

/// A compiled category rule.
#[derive(Debug, Clone)]
pub struct CategoryRule {
    /// Hierarchical category path.
    pub name: String,
    /// Compiled case-insensitive patterns, in declaration order.
    pub patterns: Vec<Regex>,
    /// Precedence: lower number wins.
    pub priority: u32,
    /// Priority tier for matching messages.
    pub tier: Tier,
    /// Whether the category is time-sensitive.
    pub time_sensitive: bool,
}

impl CategoryRule {
    fn compile(spec: &RuleSpec) -> Result<Self> {
        let mut patterns = Vec::with_capacity(spec.patterns.len());
        for pattern in &spec.patterns {
            let compiled = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| Error::Pattern {
                    rule: spec.name.clone(),
                    source,
                })?;
            patterns.push(compiled);
        }
        Ok(Self {
            name: spec.name.clone(),
            patterns,
            priority: spec.priority,
            tier: spec.tier,
            time_sensitive: spec.time_sensitive,
        })
    }

    /// Whether any of this rule's patterns matches the combined text.
    ///
    /// Patterns are tried in order; the first hit wins and the rest are
    /// skipped.
    #[must_use]
    pub fn matches(&self, combined_text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(combined_text))
    }
}

/// An ordered table of category rules.
///
/// Declaration order is load-bearing: the classification scan walks rules in
/// the order they were declared, and only a strictly lower priority number
/// displaces the running best match. Rules therefore live in a `Vec`, never
/// a map.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    rules: Vec<CategoryRule>,
}

impl Taxonomy {
    /// Compile a rule table.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern fails to compile, a name or priority is
    /// duplicated, or no catch-all (`.*` at priority [`CATCH_ALL_PRIORITY`])
    /// is present.
    pub fn new(specs: &[RuleSpec]) -> Result<Self> {
        let mut rules = Vec::with_capacity(specs.len());
        for spec in specs {
            rules.push(CategoryRule::compile(spec)?);
        }

        let mut seen_names = std::collections::HashSet::new();
        let mut seen_priorities = std::collections::HashSet::new();
        for rule in &rules {
            if !seen_names.insert(rule.name.as_str()) {
                return Err(Error::Config(format!("duplicate rule name: {}", rule.name)));
            }
            if !seen_priorities.insert(rule.priority) {
                return Err(Error::Config(format!(
                    "duplicate priority {} on rule {}; priorities must be unique",
                    rule.priority, rule.name
                )));
            }
        }

        let has_catch_all = rules
            .iter()
            .any(|r| r.priority == CATCH_ALL_PRIORITY && r.patterns.iter().any(|p| p.as_str() == ".*"));
        if !has_catch_all {
            return Err(Error::Config(
                "taxonomy must declare a catch-all rule (`.*` at priority 999)".into(),
            ));
        }

        Ok(Self { rules })
    }

    /// The default rule table shipped with the crate.
    ///
    /// # Errors
    ///
    /// Returns an error only if the built-in table is malformed, which the
    /// crate's tests rule out.
    pub fn with_defaults() -> Result<Self> {
        Self::new(&super::default_rules())
    }

    /// Rules in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    /// Classify a message by sender and subject.
    ///
    /// Scans every rule in declaration order and returns the label of the
    /// matching rule with the lowest priority number. The scan never stops
    /// at the first match: a later-declared rule with a lower priority can
    /// still out-rank an earlier hit. Total - the catch-all guarantees a
    /// result for any input.
    #[must_use]
    pub fn classify(&self, sender: &str, subject: &str) -> &str {
        let combined = format!("{sender} {subject}").to_lowercase();

        let mut best: Option<&CategoryRule> = None;
        for rule in &self.rules {
            let best_priority = best.map_or(u32::MAX, |r| r.priority);
            if rule.priority < best_priority && rule.matches(&combined) {
                best = Some(rule);
            }
        }

        best.map_or("Misc/Other", |r| r.name.as_str())
    }

    /// Look up a rule by label name.
    #[must_use]
    pub fn rule(&self, label: &str) -> Option<&CategoryRule> {
        self.rules.iter().find(|r| r.name == label)
    }

    /// Tier for a label, defaulting to [`Tier::Reference`] when the label is
    /// not in the table.
    #[must_use]
    pub fn tier_for(&self, label: &str) -> Tier {
        self.rule(label).map_or(Tier::Reference, |r| r.tier)
    }

    /// Whether a label is time-sensitive; unknown labels are not.
    #[must_use]
    pub fn is_time_sensitive(&self, label: &str) -> bool {
        self.rule(label).is_some_and(|r| r.time_sensitive)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn small_taxonomy() -> Taxonomy {
        Taxonomy::new(&[
            RuleSpec::new("Work/Dev/GitHub", &[r"github\.com"], 1).tier(Tier::Important),
            RuleSpec::new("Finance/Banking", &[r"chase", r"statement ready"], 7)
                .tier(Tier::Important),
            RuleSpec::new("Finance/Payments", &[r"paypal", r"statement"], 8).tier(Tier::Important),
            RuleSpec::new("Misc/Other", &[r".*"], CATCH_ALL_PRIORITY),
        ])
        .unwrap()
    }

    #[test]
    fn test_scenario_a_github_wins_at_priority_one() {
        let taxonomy = small_taxonomy();
        let label = taxonomy.classify("notifications@github.com", "PR Review #4");
        assert_eq!(label, "Work/Dev/GitHub");
    }

    #[test]
    fn test_scenario_b_lower_priority_number_wins() {
        // Both Finance rules match ("chase" and "statement"); priority 7
        // beats priority 8 regardless of declaration order.
        let taxonomy = small_taxonomy();
        let label = taxonomy.classify("alerts@chase.com", "Your statement is ready");
        assert_eq!(label, "Finance/Banking");
    }

    #[test]
    fn test_late_declared_rule_can_outrank_early_match() {
        let taxonomy = Taxonomy::new(&[
            RuleSpec::new("Late", &[r"invoice"], 5),
            RuleSpec::new("Early", &[r"invoice"], 2),
            RuleSpec::new("Misc/Other", &[r".*"], CATCH_ALL_PRIORITY),
        ])
        .unwrap();
        assert_eq!(taxonomy.classify("billing@example.com", "invoice"), "Early");
    }

    #[test]
    fn test_totality_falls_back_to_catch_all() {
        let taxonomy = small_taxonomy();
        assert_eq!(taxonomy.classify("nobody@nowhere", "hello"), "Misc/Other");
        assert_eq!(taxonomy.classify("", ""), "Misc/Other");
    }

    #[test]
    fn test_classification_is_deterministic() {
        let taxonomy = small_taxonomy();
        let first = taxonomy.classify("alerts@chase.com", "statement").to_string();
        let second = taxonomy.classify("alerts@chase.com", "statement").to_string();
        assert_eq!(first, second);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let taxonomy = small_taxonomy();
        assert_eq!(
            taxonomy.classify("NOTIFICATIONS@GITHUB.COM", "REVIEW"),
            "Work/Dev/GitHub"
        );
    }

    #[test]
    fn test_duplicate_priority_rejected() {
        let result = Taxonomy::new(&[
            RuleSpec::new("A", &[r"a"], 1),
            RuleSpec::new("B", &[r"b"], 1),
            RuleSpec::new("Misc/Other", &[r".*"], CATCH_ALL_PRIORITY),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_catch_all_rejected() {
        let result = Taxonomy::new(&[RuleSpec::new("A", &[r"a"], 1)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_pattern_rejected() {
        let result = Taxonomy::new(&[
            RuleSpec::new("Broken", &[r"("], 1),
            RuleSpec::new("Misc/Other", &[r".*"], CATCH_ALL_PRIORITY),
        ]);
        assert!(matches!(result, Err(Error::Pattern { .. })));
    }

    #[test]
    fn test_tier_lookup_defaults_to_reference() {
        let taxonomy = small_taxonomy();
        assert_eq!(taxonomy.tier_for("Work/Dev/GitHub"), Tier::Important);
        assert_eq!(taxonomy.tier_for("Not/A/Label"), Tier::Reference);
    }

    #[test]
    fn test_default_table_compiles_and_is_total() {
        let taxonomy = Taxonomy::with_defaults().unwrap();
        let label = taxonomy.classify("someone@example.com", "completely unremarkable");
        assert_eq!(label, "Misc/Other");
    }

    #[test]
    fn test_default_table_scenarios() {
        let taxonomy = Taxonomy::with_defaults().unwrap();
        assert_eq!(
            taxonomy.classify("notifications@github.com", "PR Review #4"),
            "Work/Dev/GitHub"
        );
        assert_eq!(
            taxonomy.classify("alerts@chase.com", "Your statement is ready"),
            "Finance/Banking"
        );
    }
}
