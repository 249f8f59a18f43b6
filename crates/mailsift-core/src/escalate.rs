//! Age-based priority escalation.

use chrono::{DateTime, Utc};

use crate::taxonomy::Tier;

/// Hours before a time-sensitive message is pulled up to tier 2.
pub const SOFT_ESCALATION_HOURS: f64 = 24.0;

/// Hours before any message is pulled up to tier 1.
pub const HARD_ESCALATION_HOURS: f64 = 72.0;

/// Outcome of an escalation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationResult {
    /// Whether the message should change tier.
    pub should_escalate: bool,
    /// The tier going in.
    pub original_tier: Tier,
    /// The tier coming out (equal to `original_tier` when not escalating).
    pub escalated_tier: Tier,
    /// Human-readable reason for the decision.
    pub reason: &'static str,
}

impl EscalationResult {
    const fn unchanged(tier: Tier, reason: &'static str) -> Self {
        Self {
            should_escalate: false,
            original_tier: tier,
            escalated_tier: tier,
            reason,
        }
    }
}

/// Decide whether a message's tier should escalate given its age.
///
/// Ordered decision list, first applicable rule wins:
/// 1. Tier 1 never escalates.
/// 2. Under 24 hours: no escalation.
/// 3. 24-72 hours: escalate to tier 2, but only time-sensitive messages at
///    tier 3 or below.
/// 4. 72 hours and older: escalate to tier 1 unconditionally.
///
/// Escalation is monotonic toward tier 1: the result never carries a higher
/// tier number than the input. Pure - applying the new tier to an action is
/// the caller's job.
#[must_use]
pub fn escalate(current_tier: Tier, age_hours: f64, time_sensitive: bool) -> EscalationResult {
    if current_tier == Tier::Critical {
        return EscalationResult::unchanged(current_tier, "already at highest tier");
    }

    if age_hours < SOFT_ESCALATION_HOURS {
        return EscalationResult::unchanged(current_tier, "younger than 24h");
    }

    if age_hours < HARD_ESCALATION_HOURS {
        if time_sensitive && current_tier.as_number() >= 3 {
            return EscalationResult {
                should_escalate: true,
                original_tier: current_tier,
                escalated_tier: Tier::Important,
                reason: "time-sensitive and older than 24h",
            };
        }
        return EscalationResult::unchanged(current_tier, "not eligible before 72h");
    }

    EscalationResult {
        should_escalate: true,
        original_tier: current_tier,
        escalated_tier: Tier::Critical,
        reason: "older than 72h",
    }
}

/// Age of a message in hours, relative to now.
///
/// Messages without a date are treated as brand new (age 0), so they are
/// never escalated on age alone. Dates in the future also clamp to 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn age_hours(date: Option<DateTime<Utc>>) -> f64 {
    date.map_or(0.0, |d| {
        let seconds = (Utc::now() - d).num_seconds();
        if seconds <= 0 { 0.0 } else { seconds as f64 / 3600.0 }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    #[test]
    fn test_scenario_c_time_sensitive_tier3_escalates_to_2() {
        let result = escalate(Tier::Delegate, 30.0, true);
        assert!(result.should_escalate);
        assert_eq!(result.escalated_tier, Tier::Important);
    }

    #[test]
    fn test_scenario_d_72h_rule_is_unconditional() {
        let result = escalate(Tier::Important, 80.0, false);
        assert!(result.should_escalate);
        assert_eq!(result.escalated_tier, Tier::Critical);
    }

    #[test]
    fn test_tier1_never_escalates() {
        for age in [0.0, 48.0, 1000.0] {
            let result = escalate(Tier::Critical, age, true);
            assert!(!result.should_escalate);
            assert_eq!(result.escalated_tier, Tier::Critical);
        }
    }

    #[test]
    fn test_young_messages_do_not_escalate() {
        let result = escalate(Tier::Reference, 23.9, true);
        assert!(!result.should_escalate);
    }

    #[test]
    fn test_mid_window_requires_time_sensitivity() {
        assert!(!escalate(Tier::Delegate, 30.0, false).should_escalate);
    }

    #[test]
    fn test_mid_window_requires_tier_three_or_below() {
        // Tier 2 already sits above the soft target; it waits for the 72h rule.
        assert!(!escalate(Tier::Important, 30.0, true).should_escalate);
    }

    #[test]
    fn test_age_of_missing_date_is_zero() {
        assert!(age_hours(None).abs() < f64::EPSILON);
    }

    #[test]
    fn test_age_of_future_date_clamps_to_zero() {
        let future = Utc::now() + Duration::hours(5);
        assert!(age_hours(Some(future)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_age_of_old_message() {
        let old = Utc::now() - Duration::hours(30);
        let age = age_hours(Some(old));
        assert!((29.9..30.1).contains(&age));
    }

    proptest! {
        // Escalation never moves a tier away from Critical, and tier 1 input
        // never escalates.
        #[test]
        fn prop_escalation_is_monotonic(tier in 1u8..=4, age in 0.0f64..10_000.0, ts: bool) {
            let current = Tier::from_number(tier);
            let result = escalate(current, age, ts);
            prop_assert!(result.escalated_tier.as_number() <= result.original_tier.as_number());
            if current == Tier::Critical {
                prop_assert!(!result.should_escalate);
            }
            if result.should_escalate {
                prop_assert!(result.escalated_tier.as_number() < result.original_tier.as_number());
            }
        }
    }
}
