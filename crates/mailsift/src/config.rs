//! Configuration loading.
//!
//! Precedence, highest to lowest: environment variables (`MAILSIFT_*`), the
//! YAML config file, built-in defaults. A missing config file is not an
//! error; the defaults alone are a working setup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use mailsift_core::pipeline::{
    DEFAULT_FETCH_CHUNK_SIZE, DEFAULT_MUTATE_CHUNK_SIZE, DEFAULT_PAGE_SIZE,
};
use mailsift_core::{
    DecisionEngine, PipelineConfig, RuleSpec, Taxonomy, Tier, VipRegistry, default_rules,
};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "MAILSIFT_CONFIG";

/// A VIP sender entry as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VipSenderConfig {
    /// Sender regex.
    pub pattern: String,
    /// Forced tier (1-4).
    #[serde(default = "default_vip_tier")]
    pub tier: u8,
    /// Whether to star matching messages.
    #[serde(default = "default_true")]
    pub star: bool,
    /// Optional label that bypasses classification.
    #[serde(default)]
    pub label_override: Option<String>,
    /// Free-form note.
    #[serde(default)]
    pub note: String,
}

const fn default_vip_tier() -> u8 {
    1
}

const fn default_true() -> bool {
    true
}

/// Main configuration container.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum ids per listing page.
    pub page_size: usize,
    /// Detail-fetch sub-batch size.
    pub fetch_chunk_size: usize,
    /// Maximum actions per mutation call.
    pub mutate_chunk_size: usize,
    /// Pause between pages, in seconds.
    pub throttle_seconds: f64,
    /// Stop after this many messages per run.
    pub limit: Option<u64>,
    /// Decide everything, submit nothing.
    pub dry_run: bool,
    /// Run the escalator against message age while labeling.
    pub escalate_by_age: bool,
    /// Path of the processing state file.
    pub state_file: PathBuf,
    /// Label to strip when a message reclassifies away from it.
    pub remove_source_label: Option<String>,
    /// Rules merged over the defaults by name.
    pub custom_rules: Vec<RuleSpec>,
    /// VIP senders, registered in key order.
    pub vip_senders: BTreeMap<String, VipSenderConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            fetch_chunk_size: DEFAULT_FETCH_CHUNK_SIZE,
            mutate_chunk_size: DEFAULT_MUTATE_CHUNK_SIZE,
            throttle_seconds: 1.0,
            limit: None,
            dry_run: false,
            escalate_by_age: false,
            state_file: PathBuf::from("mailsift_state.json"),
            remove_source_label: None,
            custom_rules: Vec::new(),
            vip_senders: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load configuration with full precedence applied.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named config file cannot be read or
    /// parsed. Files found through the search path fail soft with a warning.
    pub fn load(explicit_path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = if let Some(path) = explicit_path {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            serde_yaml::from_str(&contents)
                .with_context(|| format!("parsing config file {}", path.display()))?
        } else if let Some(path) = find_config_file() {
            match load_yaml(&path) {
                Some(config) => {
                    info!("loaded config from {}", path.display());
                    config
                }
                None => Self::default(),
            }
        } else {
            debug!("no config file found, using defaults");
            Self::default()
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply `MAILSIFT_*` environment overrides via the given lookup.
    pub fn apply_env_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(v) = get("MAILSIFT_PAGE_SIZE").and_then(|v| v.parse().ok()) {
            self.page_size = v;
        }
        if let Some(v) = get("MAILSIFT_LIMIT").and_then(|v| v.parse().ok()) {
            self.limit = Some(v);
        }
        if let Some(v) = get("MAILSIFT_DRY_RUN") {
            self.dry_run = matches!(v.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(v) = get("MAILSIFT_STATE_FILE") {
            self.state_file = PathBuf::from(v);
        }
        if let Some(v) = get("MAILSIFT_THROTTLE_SECONDS").and_then(|v| v.parse().ok()) {
            self.throttle_seconds = v;
        }
    }

    /// The default rule table with custom rules merged over it by name.
    ///
    /// A custom rule whose name matches a default replaces it in place;
    /// new names append after the defaults, ahead of nothing - declaration
    /// order of the defaults is preserved.
    #[must_use]
    pub fn merged_rules(&self) -> Vec<RuleSpec> {
        let mut rules = default_rules();
        for custom in &self.custom_rules {
            if let Some(existing) = rules.iter_mut().find(|r| r.name == custom.name) {
                *existing = custom.clone();
            } else {
                // Keep the catch-all last.
                let insert_at = rules
                    .iter()
                    .position(|r| r.patterns.iter().any(|p| p == ".*"))
                    .unwrap_or(rules.len());
                rules.insert(insert_at, custom.clone());
            }
        }
        rules
    }

    /// Build the decision engine: merged taxonomy plus registered VIPs.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule or VIP pattern is malformed or the merged
    /// table violates a taxonomy invariant.
    pub fn build_engine(&self) -> anyhow::Result<DecisionEngine> {
        let taxonomy = Taxonomy::new(&self.merged_rules()).context("building taxonomy")?;

        let mut vips = VipRegistry::new();
        for (key, vip) in &self.vip_senders {
            vips.register(
                key.clone(),
                &vip.pattern,
                Tier::from_number(vip.tier),
                vip.star,
                vip.label_override.clone(),
                vip.note.clone(),
            )
            .with_context(|| format!("registering VIP sender {key}"))?;
        }
        if !vips.is_empty() {
            info!("loaded {} VIP senders from config", vips.len());
        }

        Ok(DecisionEngine::new(taxonomy, vips))
    }

    /// Pipeline tunables derived from this config.
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            page_size: self.page_size,
            fetch_chunk_size: self.fetch_chunk_size,
            mutate_chunk_size: self.mutate_chunk_size,
            throttle: Duration::from_secs_f64(self.throttle_seconds.max(0.0)),
            limit: self.limit,
            escalate_by_age: self.escalate_by_age,
            dry_run: self.dry_run,
            remove_source_label: self.remove_source_label.clone(),
            ..PipelineConfig::default()
        }
    }
}

fn load_yaml(path: &Path) -> Option<Config> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!("failed to read config {}: {e}", path.display());
            return None;
        }
    };
    match serde_yaml::from_str(&contents) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("failed to parse config {}: {e}", path.display());
            None
        }
    }
}

/// Locate the first existing config file.
///
/// Checks `MAILSIFT_CONFIG`, then `~/.config/mailsift/config.yaml`, then
/// `./mailsift.yaml`.
#[must_use]
pub fn find_config_file() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let mut candidates = Vec::new();
    if let Some(home) = std::env::var_os("HOME") {
        candidates.push(PathBuf::from(home).join(".config/mailsift/config.yaml"));
    }
    candidates.push(PathBuf::from("mailsift.yaml"));

    candidates.into_iter().find(|p| p.exists())
}

/// Sample configuration file contents.
#[must_use]
pub const fn sample_config() -> &'static str {
    r#"# Mailsift configuration
# Place this file at ~/.config/mailsift/config.yaml

# Maximum message ids requested per listing page
page_size: 500

# Detail-fetch sub-batch size
fetch_chunk_size: 20

# Maximum actions per mutation call
mutate_chunk_size: 1000

# Pause between pages (seconds)
throttle_seconds: 1.0

# Stop after this many messages per run (omit for no limit)
# limit: 1000

# Decide everything, submit nothing
dry_run: false

# Escalate old messages while labeling
escalate_by_age: false

# Processing state file (one per store/query combination)
state_file: "mailsift_state.json"

# Label to strip when a message reclassifies away from it
# remove_source_label: "Misc/Other"

# Rules merged over the defaults by name
# custom_rules:
#   - name: "Work/Clients"
#     patterns:
#       - "client-domain\\.com"
#     priority: 20
#     tier: 2
#     time_sensitive: true

# VIP senders always get priority treatment
# vip_senders:
#   ceo:
#     pattern: "ceo@company\\.com"
#     tier: 1
#     star: true
#     note: "CEO"
#   key-client:
#     pattern: ".*@important-client\\.com"
#     tier: 1
#     label_override: "Personal"
#     note: "Key client domain"
"#
}
