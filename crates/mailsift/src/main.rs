//! `Mailsift` - rule-driven email triage CLI.
//!
//! The self-contained surface: one-off classification, rule inspection,
//! state-file management, and configuration scaffolding. Labeling runs
//! against a live backing store are driven by the adapter crates through
//! [`mailsift_core::Pipeline`].

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use mailsift_core::{StateStore, escalate};

#[derive(Parser)]
#[command(name = "mailsift", version, about = "Rule-driven email triage")]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Explicit config file path.
    #[arg(long, global = true, env = config::CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify a message and print the decision.
    Classify {
        /// The From header value.
        #[arg(long)]
        sender: String,
        /// The Subject header value.
        #[arg(long, default_value = "")]
        subject: String,
        /// Also run the escalator for a message this many hours old.
        #[arg(long)]
        age_hours: Option<f64>,
    },
    /// List the active category rules in declaration order.
    Rules,
    /// Inspect or reset the processing state file.
    State {
        #[command(subcommand)]
        action: StateAction,
    },
    /// Generate or display configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum StateAction {
    /// Print the stored cursor, totals, and label history.
    Show {
        /// State file path (defaults to the configured one).
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Delete the state file and start fresh.
    Clear {
        /// State file path (defaults to the configured one).
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a commented sample config file.
    Init {
        /// Destination path (defaults to stdout).
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Print the resolved configuration as YAML.
    Show,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "mailsift=debug,mailsift_core=debug"
    } else {
        "mailsift=info,mailsift_core=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Classify {
            sender,
            subject,
            age_hours,
        } => cmd_classify(&config, &sender, &subject, age_hours),
        Command::Rules => cmd_rules(&config),
        Command::State { action } => cmd_state(&config, &action),
        Command::Config { action } => cmd_config(&config, &action),
    }
}

fn cmd_classify(
    config: &Config,
    sender: &str,
    subject: &str,
    age_hours: Option<f64>,
) -> anyhow::Result<()> {
    let engine = config.build_engine()?;
    let result = engine.categorize(sender, subject);
    let policy = result.tier.policy();

    println!("Label:          {}", result.label);
    println!("Tier:           {}", result.tier);
    println!("Time-sensitive: {}", result.time_sensitive);
    println!("Starred:        {}", policy.star);
    println!("Keep in inbox:  {}", policy.keep_in_inbox);
    if result.is_vip {
        println!(
            "VIP:            yes{}",
            result
                .vip_note
                .as_deref()
                .map(|n| format!(" ({n})"))
                .unwrap_or_default()
        );
    }

    if let Some(age) = age_hours {
        let esc = escalate(result.tier, age, result.time_sensitive);
        if esc.should_escalate {
            println!(
                "Escalation:     tier {} -> {} ({})",
                esc.original_tier.as_number(),
                esc.escalated_tier.as_number(),
                esc.reason
            );
        } else {
            println!("Escalation:     none ({})", esc.reason);
        }
    }

    Ok(())
}

fn cmd_rules(config: &Config) -> anyhow::Result<()> {
    let engine = config.build_engine()?;

    println!("{:<4} {:<28} {:<14} {:<5} Patterns", "Prio", "Label", "Tier", "TS");
    for rule in engine.taxonomy().rules() {
        println!(
            "{:<4} {:<28} {:<14} {:<5} {}",
            rule.priority,
            rule.name,
            rule.tier.policy().name,
            if rule.time_sensitive { "yes" } else { "no" },
            rule.patterns.len(),
        );
    }

    let vips = engine.vips();
    if !vips.is_empty() {
        println!("\nVIP senders:");
        for vip in vips.entries() {
            println!(
                "  {:<20} tier {} {}",
                vip.key,
                vip.tier.as_number(),
                vip.note
            );
        }
    }

    Ok(())
}

fn cmd_state(config: &Config, action: &StateAction) -> anyhow::Result<()> {
    match action {
        StateAction::Show { file } => {
            let path = file.clone().unwrap_or_else(|| config.state_file.clone());
            let store = StateStore::open(&path);
            let record = store.record();

            println!("State file:      {}", path.display());
            println!("Resumable:       {}", store.is_resumable());
            println!(
                "Cursor:          {}",
                record.next_cursor.as_deref().unwrap_or("-")
            );
            println!("Total processed: {}", record.total_processed);
            println!(
                "Backing store:   {}",
                record.backing_store_id.as_deref().unwrap_or("-")
            );
            println!(
                "Last run:        {}",
                record
                    .last_run
                    .map_or_else(|| "-".to_string(), |t| t.to_rfc3339())
            );

            if !record.history.is_empty() {
                println!("\nLabel history:");
                let mut counts: Vec<_> = record.history.iter().collect();
                counts.sort_by(|a, b| b.1.cmp(a.1));
                for (label, count) in counts {
                    println!("  {label:<30} {count}");
                }
            }
        }
        StateAction::Clear { file } => {
            let path = file.clone().unwrap_or_else(|| config.state_file.clone());
            let mut store = StateStore::open(&path);
            store.clear();
            println!("Cleared state file {}", path.display());
        }
    }
    Ok(())
}

fn cmd_config(config: &Config, action: &ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init { path } => {
            if let Some(path) = path {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("creating {}", parent.display()))?;
                }
                std::fs::write(path, config::sample_config())
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("Wrote sample config to {}", path.display());
            } else {
                print!("{}", config::sample_config());
            }
        }
        ConfigAction::Show => {
            let yaml = serde_yaml::to_string(config).context("serializing config")?;
            print!("{yaml}");
        }
    }
    Ok(())
}
