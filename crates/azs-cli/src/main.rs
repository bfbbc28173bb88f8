//! AntiZombieScroll CLI
//!
//! Developer tool for inspecting site policies, linting the selector tables
//! and generating TypeScript bindings for the extension's JavaScript glue.

use std::fs;
use std::path::Path;

use clap::{Parser, Subcommand};
use ts_rs::TS;

use azs_core::route::{extract_path, section};
use azs_core::selector::SelectorList;
use azs_core::settings::{Feature, FeatureFlags, Message};
use azs_core::sites::{all_tables, classify_url, policy_for};

#[derive(Parser)]
#[command(name = "azs-cli")]
#[command(about = "AntiZombieScroll policy inspection and tooling")]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the site a URL belongs to
    Classify {
        /// Page URL
        url: String,
    },

    /// Print the policy installed for a URL
    Policy {
        /// Page URL
        url: String,

        /// Override a setting, e.g. `--set youtube-feed-hidden=true`
        #[arg(long = "set", value_name = "KEY=BOOL")]
        overrides: Vec<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Parse every built-in selector with the core engine
    Lint,

    /// Print the default settings object
    Defaults,

    /// Export TypeScript bindings for the message and feature types
    Bindings {
        /// Output directory
        #[arg(short, long, default_value = "bindings")]
        out_dir: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_default_env().filter_level(level).init();

    let result = match cli.command {
        Commands::Classify { url } => cmd_classify(&url),
        Commands::Policy {
            url,
            overrides,
            json,
        } => cmd_policy(&url, &overrides, json),
        Commands::Lint => cmd_lint(),
        Commands::Defaults => cmd_defaults(),
        Commands::Bindings { out_dir } => cmd_bindings(&out_dir),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_classify(url: &str) -> Result<(), String> {
    let path = extract_path(url);
    match classify_url(url) {
        Some(site) => println!("{site} (section: /{})", section(path)),
        None => println!("none"),
    }
    Ok(())
}

/// Parse a `key=bool` override.
fn parse_override(text: &str) -> Result<(Feature, bool), String> {
    let (key, value) = text
        .split_once('=')
        .ok_or_else(|| format!("Expected KEY=BOOL, got '{}'", text))?;
    let feature = Feature::from_key(key.trim()).ok_or_else(|| {
        let known: Vec<&str> = Feature::ALL.iter().map(|f| f.key()).collect();
        format!("Unknown setting '{}' (known: {})", key, known.join(", "))
    })?;
    let value = value
        .trim()
        .parse::<bool>()
        .map_err(|_| format!("Setting '{}' needs true or false, got '{}'", key, value))?;
    Ok((feature, value))
}

fn cmd_policy(url: &str, overrides: &[String], json: bool) -> Result<(), String> {
    let mut flags = FeatureFlags::default();
    for text in overrides {
        let (feature, value) = parse_override(text)?;
        flags.set(feature, value);
    }

    let site = classify_url(url);
    let policy = policy_for(site, url, &flags);

    if json {
        let text = serde_json::to_string_pretty(&policy)
            .map_err(|e| format!("Failed to serialize policy: {}", e))?;
        println!("{text}");
        return Ok(());
    }

    println!("Policy for {}", url);
    println!("  Site:        {}", site.map_or("none", |s| s.name()));
    if let Some(feature) = site.map(|s| s.feature()) {
        println!("  Setting:     {} = {}", feature.key(), flags.get(feature));
    }
    println!("  View:        {:?}", policy.view);
    match &policy.gate {
        Some(gate) => {
            println!("  Gate:        {:?}", gate.mode);
            println!("  Allowed:     {} regions", gate.allow.len());
            for pattern in &gate.allow {
                println!("    {pattern}");
            }
            println!("  Clipped:     {} containers", gate.clip.len());
            for pattern in &gate.clip {
                println!("    {pattern}");
            }
        }
        None => println!("  Gate:        off"),
    }
    println!("  Suppressed:  {} patterns", policy.suppress.len());
    for pattern in &policy.suppress {
        println!("    {pattern}");
    }

    Ok(())
}

fn cmd_lint() -> Result<(), String> {
    let mut checked = 0usize;
    let mut failures = Vec::new();

    for (table, patterns) in all_tables() {
        for pattern in patterns {
            checked += 1;
            match SelectorList::parse(pattern) {
                Ok(list) => log::debug!("{table}: {pattern} ({} selectors)", list.len()),
                Err(e) => failures.push(format!("{table}: {e}")),
            }
        }
    }

    for failure in &failures {
        println!("  {failure}");
    }
    println!("Checked {} selectors, {} invalid", checked, failures.len());

    if failures.is_empty() {
        Ok(())
    } else {
        Err(format!("{} selectors failed to parse", failures.len()))
    }
}

fn cmd_defaults() -> Result<(), String> {
    let stored = serde_json::Value::Object(FeatureFlags::default().to_stored());
    let text = serde_json::to_string_pretty(&stored)
        .map_err(|e| format!("Failed to serialize defaults: {}", e))?;
    println!("{text}");
    Ok(())
}

fn cmd_bindings(out_dir: &str) -> Result<(), String> {
    fs::create_dir_all(out_dir)
        .map_err(|e| format!("Failed to create '{}': {}", out_dir, e))?;

    Feature::export_all_to(out_dir).map_err(|e| format!("Failed to export Feature: {}", e))?;
    Message::export_all_to(out_dir).map_err(|e| format!("Failed to export Message: {}", e))?;

    println!("Wrote TypeScript bindings to '{}'", Path::new(out_dir).display());
    Ok(())
}
