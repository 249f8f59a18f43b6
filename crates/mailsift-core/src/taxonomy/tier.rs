//! Priority tiers and their routing policies.

use serde::{Deserialize, Serialize};

/// One of four fixed priority levels, Eisenhower style.
///
/// Lower numbers are more urgent. Escalation only ever moves a message
/// toward [`Tier::Critical`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tier {
    /// Tier 1: needs attention now. Kept in the inbox and starred.
    Critical,
    /// Tier 2: important but not burning. Starred, filed out of the inbox.
    Important,
    /// Tier 3: someone or something else can handle it.
    Delegate,
    /// Tier 4: keep for the record, never surface.
    Reference,
}

impl Tier {
    /// The numeric tier, 1 through 4.
    #[must_use]
    pub const fn as_number(self) -> u8 {
        match self {
            Self::Critical => 1,
            Self::Important => 2,
            Self::Delegate => 3,
            Self::Reference => 4,
        }
    }

    /// Parse a numeric tier. Out-of-range values clamp to the nearest tier.
    #[must_use]
    pub const fn from_number(n: u8) -> Self {
        match n {
            0 | 1 => Self::Critical,
            2 => Self::Important,
            3 => Self::Delegate,
            _ => Self::Reference,
        }
    }

    /// Routing policy for this tier.
    #[must_use]
    pub const fn policy(self) -> &'static TierPolicy {
        match self {
            Self::Critical => &TierPolicy {
                name: "Critical",
                color: "red",
                folder: None,
                keep_in_inbox: true,
                star: true,
            },
            Self::Important => &TierPolicy {
                name: "Important",
                color: "orange",
                folder: Some("Priority/Important"),
                keep_in_inbox: false,
                star: true,
            },
            Self::Delegate => &TierPolicy {
                name: "Delegate",
                color: "blue",
                folder: Some("Priority/Delegate"),
                keep_in_inbox: false,
                star: false,
            },
            Self::Reference => &TierPolicy {
                name: "Reference",
                color: "gray",
                folder: Some("Archive/Reference"),
                keep_in_inbox: false,
                star: false,
            },
        }
    }
}

impl TryFrom<u8> for Tier {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        if (1..=4).contains(&n) {
            Ok(Self::from_number(n))
        } else {
            Err(format!("tier must be 1-4, got {n}"))
        }
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> Self {
        tier.as_number()
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.as_number(), self.policy().name)
    }
}

/// Routing behavior attached to a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPolicy {
    /// Display name.
    pub name: &'static str,
    /// Color for stores that support colored categories.
    pub color: &'static str,
    /// Destination folder for folder-based stores, if any.
    pub folder: Option<&'static str>,
    /// Whether messages at this tier stay in the inbox.
    pub keep_in_inbox: bool,
    /// Whether messages at this tier are starred.
    pub star: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_number_roundtrip() {
        for tier in [Tier::Critical, Tier::Important, Tier::Delegate, Tier::Reference] {
            assert_eq!(Tier::from_number(tier.as_number()), tier);
        }
    }

    #[test]
    fn test_out_of_range_clamps() {
        assert_eq!(Tier::from_number(0), Tier::Critical);
        assert_eq!(Tier::from_number(9), Tier::Reference);
    }

    #[test]
    fn test_critical_stays_in_inbox_and_stars() {
        let policy = Tier::Critical.policy();
        assert!(policy.keep_in_inbox);
        assert!(policy.star);
        assert!(policy.folder.is_none());
    }

    #[test]
    fn test_reference_is_archived_and_unstarred() {
        let policy = Tier::Reference.policy();
        assert!(!policy.keep_in_inbox);
        assert!(!policy.star);
    }

    #[test]
    fn test_serde_numeric_form() {
        let json = serde_json::to_string(&Tier::Important).unwrap();
        assert_eq!(json, "2");
        let parsed: Tier = serde_json::from_str("3").unwrap();
        assert_eq!(parsed, Tier::Delegate);
    }
}
