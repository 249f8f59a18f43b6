//! Category taxonomy: ordered rules, priorities, and tiers.

mod defaults;
mod rule;
mod tier;

pub use defaults::default_rules;
pub use rule::{CATCH_ALL_PRIORITY, CategoryRule, RuleSpec, Taxonomy};
pub use tier::{Tier, TierPolicy};
