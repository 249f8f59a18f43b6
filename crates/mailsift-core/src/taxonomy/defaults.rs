//! The default rule table.
//!
//! Ordered roughly from most to least specific; priorities are unique so
//! classification stays deterministic. Priority 999 is the mandatory
//! catch-all.

use super::rule::{CATCH_ALL_PRIORITY, RuleSpec};
use super::tier::Tier;

/// Build the default category rules.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn default_rules() -> Vec<RuleSpec> {
    vec![
        // Work / Development
        RuleSpec::new(
            "Work/Dev/GitHub",
            &[r"github\.com", r"notifications@github", r"@reply\.github\.com", r"copilot"],
            1,
        )
        .tier(Tier::Important)
        .time_sensitive(),
        RuleSpec::new(
            "Work/Dev/Code-Review",
            &[r"coderabb", r"sourcery", r"qodo", r"codacy", r"llamapre"],
            2,
        )
        .tier(Tier::Important)
        .time_sensitive(),
        RuleSpec::new(
            "Work/Dev/Infrastructure",
            &[
                r"cloudflare",
                r"vercel",
                r"netlify",
                r"digitalocean",
                r"railway",
                r"render\.com",
                r"newrelic",
                r"gitkraken",
                r"notion\.so",
                r"backblaze",
                r"termius",
            ],
            3,
        )
        .tier(Tier::Important),
        // AI Services
        RuleSpec::new(
            "AI/Services",
            &[
                r"openai",
                r"anthropic",
                r"claude",
                r"x\.ai",
                r"xai\.com",
                r"perplexity",
                r"meta\.com",
                r"ollama",
            ],
            4,
        )
        .tier(Tier::Delegate),
        RuleSpec::new("AI/Grok", &[r"grok", r"x\.ai.*grok"], 5).tier(Tier::Delegate),
        RuleSpec::new(
            "AI/Data Exports",
            &[r"data export", r"export is ready", r"download.*data"],
            6,
        )
        .tier(Tier::Delegate),
        // Finance & Payments
        RuleSpec::new(
            "Finance/Banking",
            &[
                r"chase",
                r"capital.?one",
                r"experian",
                r"chime",
                r"bankofamerica",
                r"wellsfargo",
                r"citi",
                r"usbank",
                r"ally",
                r"marcus",
                r"regions",
                r"pnc",
                r"lendingtree",
                r"moneylion",
                r"nelnet",
                r"studentaid",
                r"loan",
                r"credit score",
                r"credit card",
                r"apr",
                r"refinance",
                r"overdraft",
                r"credit report",
                r"collections",
                r"settlement",
                r"debt",
            ],
            7,
        )
        .tier(Tier::Important)
        .time_sensitive(),
        RuleSpec::new(
            "Finance/Payments",
            &[
                r"paypal",
                r"stripe",
                r"cash.?app",
                r"square",
                r"braintree",
                r"plaid",
                r"venmo",
                r"zelle",
                r"xfinity",
                r"spectrum",
                r"discover",
                r"american.?express",
                r"statement",
                r"invoice",
                r"payment.*due",
                r"billing issue",
                r"past due",
                r"overdue",
                r"declined",
                r"failed payment",
                r"autopay",
                r"renewal",
                r"subscription",
            ],
            8,
        )
        .tier(Tier::Important)
        .time_sensitive(),
        // Security & account safety
        RuleSpec::new(
            "Tech/Security",
            &[
                r"1password",
                r"security.*alert",
                r"login.*detected",
                r"new.*device",
                r"password.*reset",
                r"verification.*code",
                r"confirming.*login",
                r"sign in",
                r"unusual activity",
                r"suspicious",
                r"two[- ]factor",
                r"2fa",
            ],
            9,
        )
        .tier(Tier::Important)
        .time_sensitive(),
        // Commerce & Shopping
        RuleSpec::new(
            "Shopping",
            &[
                r"amazon",
                r"ebay",
                r"etsy",
                r"walmart",
                r"target",
                r"bestbuy",
                r"costco",
                r"wayfair",
                r"nike",
                r"nordstrom",
                r"order.*confirm",
                r"shipped",
                r"tracking",
                r"flash sale",
            ],
            10,
        ),
        // Travel
        RuleSpec::new(
            "Travel",
            &[
                r"united\.com",
                r"aa\.com",
                r"delta\.com",
                r"southwest",
                r"jetblue",
                r"alaskaair",
                r"marriott",
                r"hilton",
                r"hyatt",
                r"airbnb",
                r"vrbo",
                r"booking\.com",
                r"hotels\.com",
                r"expedia",
                r"kayak",
                r"priceline",
                r"itinerary",
                r"boarding.*pass",
                r"flight.*confirm",
            ],
            11,
        )
        .tier(Tier::Delegate)
        .time_sensitive(),
        // Entertainment & Media
        RuleSpec::new(
            "Entertainment",
            &[r"fandango", r"audible", r"netflix", r"spotify", r"letterboxd", r"rotten.?tomato"],
            12,
        ),
        // Education
        RuleSpec::new(
            "Education/Research",
            &[
                r"coursera",
                r"udemy",
                r"skillshare",
                r"edx",
                r"khanacademy",
                r"scholar\.google",
                r"researchgate",
                r"arxiv",
                r"academia\.edu",
            ],
            13,
        )
        .tier(Tier::Delegate),
        // Professional Services
        RuleSpec::new(
            "Professional/Jobs",
            &[
                r"indeed",
                r"linkedin.*jobs",
                r"glassdoor",
                r"ziprecruiter",
                r"monster",
                r"training overdue",
                r"compliance",
            ],
            14,
        )
        .tier(Tier::Delegate),
        // Domain Services
        RuleSpec::new(
            "Services/Domain",
            &[r"namecheap", r"godaddy", r"domain.*renew", r"dns"],
            15,
        )
        .tier(Tier::Delegate),
        // Notifications (service catch-all)
        RuleSpec::new(
            "Notification",
            &[
                r"notification",
                r"alert",
                r"reminder",
                r"automatic.?appointment",
                r"automatic reply",
                r"auto-reply",
            ],
            16,
        ),
        // Marketing
        RuleSpec::new(
            "Marketing",
            &[
                r"unsubscribe",
                r"newsletter",
                r"promo",
                r"special.*offer",
                r"discount",
                r"substack",
                r"beehiiv",
                r"last chance",
                r"coupon",
                r"offer ends",
                r"free shipping",
                r"clearance",
            ],
            17,
        ),
        // Personal
        RuleSpec::new("Personal", &[r"family", r"\bmom\b", r"\bdad\b"], 18)
            .tier(Tier::Critical),
        // Awaiting Action
        RuleSpec::new("Awaiting Reply", &[r"awaiting.*reply", r"pending.*response"], 19)
            .tier(Tier::Critical)
            .time_sensitive(),
        // Default catch-all routed to a generic folder
        RuleSpec::new("Misc/Other", &[r".*"], CATCH_ALL_PRIORITY),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_priorities_are_unique() {
        let rules = default_rules();
        let mut priorities: Vec<u32> = rules.iter().map(|r| r.priority).collect();
        priorities.sort_unstable();
        priorities.dedup();
        assert_eq!(priorities.len(), rules.len());
    }

    #[test]
    fn test_exactly_one_catch_all() {
        let rules = default_rules();
        let catch_alls: Vec<_> = rules
            .iter()
            .filter(|r| r.patterns.iter().any(|p| p == ".*"))
            .collect();
        assert_eq!(catch_alls.len(), 1);
        assert_eq!(catch_alls[0].priority, CATCH_ALL_PRIORITY);
        assert_eq!(catch_alls[0].name, "Misc/Other");
    }

    #[test]
    fn test_catch_all_is_lowest_precedence() {
        let rules = default_rules();
        let max_regular = rules
            .iter()
            .filter(|r| r.priority != CATCH_ALL_PRIORITY)
            .map(|r| r.priority)
            .max()
            .unwrap();
        assert!(max_regular < CATCH_ALL_PRIORITY);
    }
}
