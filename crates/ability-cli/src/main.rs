//! CLI entry point for the voice ability host.
//!
//! This binary provides the `abilities` command with subcommands for
//! listing abilities, validating manifests, and running a console session
//! where stdin stands in for the microphone.

mod cli;
mod config;
mod console;
mod helpers;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ability_skills::{AbilityHost, InvocationReport, MANIFEST_FILE, SessionOutcome, load_manifest};
use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};

use crate::cli::{Cli, Commands};
use crate::config::{AppConfig, StorageBackend, StorageConfig};
use crate::console::ConsoleSpeech;
use crate::helpers::{build_host, build_model, build_storage, init_tracing};

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;
    init_tracing(&config.general.log_level);

    match cli.command {
        Commands::List => cmd_list(&config).await,
        Commands::Validate { dirs } => cmd_validate(&dirs),
        Commands::Run { ability, user } => cmd_run(&config, ability, user).await,
    }
}

// ---------------------------------------------------------------------------
// Subcommand: list
// ---------------------------------------------------------------------------

async fn cmd_list(config: &AppConfig) -> Result<()> {
    let host = offline_host(config).await?;

    println!();
    for info in host.abilities() {
        println!("  {:<16} {}", info.id, info.description);
        println!("  {:<16} hotwords: {}", "", info.hotwords.join(", "));
    }
    println!();
    Ok(())
}

/// A host that never touches the network or the user's files.
async fn offline_host(config: &AppConfig) -> Result<AbilityHost> {
    let offline = AppConfig {
        storage: StorageConfig {
            backend: StorageBackend::Memory,
            ..config.storage.clone()
        },
        ..config.clone()
    };
    let storage = build_storage(&offline, &offline.general.user).await?;
    let model = build_model(&offline)?;
    build_host(&offline, model, storage)
}

// ---------------------------------------------------------------------------
// Subcommand: validate
// ---------------------------------------------------------------------------

fn cmd_validate(dirs: &[PathBuf]) -> Result<()> {
    let mut checked = 0usize;
    let mut failed = 0usize;

    for dir in dirs {
        let paths = manifest_paths(dir)
            .with_context(|| format!("failed to read {}", dir.display()))?;
        if paths.is_empty() {
            println!("  {}: no {MANIFEST_FILE} found", dir.display());
        }
        for path in paths {
            checked += 1;
            if !report_manifest(&path) {
                failed += 1;
            }
        }
    }

    println!();
    println!("  {checked} manifest(s) checked, {failed} with errors");
    if failed > 0 {
        bail!("{failed} manifest(s) failed validation");
    }
    Ok(())
}

/// `dir/config.json` if present, otherwise `dir/*/config.json`.
fn manifest_paths(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let direct = dir.join(MANIFEST_FILE);
    if direct.is_file() {
        return Ok(vec![direct]);
    }
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let candidate = entry?.path().join(MANIFEST_FILE);
        if candidate.is_file() {
            paths.push(candidate);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Print the findings for one manifest.  Returns `false` on errors.
fn report_manifest(path: &Path) -> bool {
    let manifest = match load_manifest(path) {
        Ok(manifest) => manifest,
        Err(e) => {
            println!("  error  {}: {e}", path.display());
            return false;
        }
    };

    let report = manifest.validate();
    for error in &report.errors {
        println!("  error  {}: {error}", path.display());
    }
    for warning in &report.warnings {
        println!("  warn   {}: {warning}", path.display());
    }
    if report.is_ok() {
        println!("  ok     {} ({})", manifest.unique_name, path.display());
    }
    report.is_ok()
}

// ---------------------------------------------------------------------------
// Subcommand: run
// ---------------------------------------------------------------------------

async fn cmd_run(config: &AppConfig, ability: Option<String>, user: Option<String>) -> Result<()> {
    let user = user.unwrap_or_else(|| config.general.user.clone());
    let storage = build_storage(config, &user).await?;
    let model = build_model(config)?;
    let host = build_host(config, model, storage)?;
    let speech = Arc::new(ConsoleSpeech::new());

    println!();
    println!("  Voice abilities v{}", env!("CARGO_PKG_VERSION"));

    if let Some(id) = ability {
        println!();
        let report = host.invoke(&id, speech.clone(), "").await?;
        after_session(&report);
        return Ok(());
    }

    let hotwords: Vec<String> = host
        .abilities()
        .into_iter()
        .filter_map(|info| info.hotwords.into_iter().next())
        .collect();
    println!("  Say something like: {}. Type 'quit' to exit.", hotwords.join(", "));
    println!();

    while let Some(line) = speech.next_line("> ").await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("quit") {
            info!("user requested exit");
            break;
        }

        match host.handle_utterance(trimmed, speech.clone()).await? {
            Some(report) => after_session(&report),
            None => println!("  (no ability matched; try {})", hotwords.join(", ")),
        }
        if speech.is_closed() {
            break;
        }
    }
    Ok(())
}

fn after_session(report: &InvocationReport) {
    match &report.outcome {
        SessionOutcome::Completed => {}
        SessionOutcome::Failed(reason) => {
            warn!(ability = %report.ability, reason = %reason, "session failed");
        }
        SessionOutcome::TimedOut => warn!(ability = %report.ability, "session timed out"),
    }
    if report.resume_calls != 1 {
        warn!(
            ability = %report.ability,
            resume_calls = report.resume_calls,
            "normal flow was not resumed exactly once"
        );
    }
    println!("[resumed normal flow]");
    println!();
}
