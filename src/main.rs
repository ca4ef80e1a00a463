// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Seaport - transports sea-modules packages into CMD modules
//!
//! This is the main entry point for the seaport CLI.
//!
//! ## Features
//!
//! - Layered configuration (user file, `seaport.toml`, environment, flags)
//! - Entries transported concurrently on the blocking pool

mod cli;
mod config;
mod dest;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cli::Cli;
use owo_colors::OwoColorize;
use seaport_core::{FileRecord, Transport};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point - uses tokio runtime for async operations.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let cwd = tokio::fs::canonicalize(&cli.cwd)
        .await
        .with_context(|| format!("no such directory {}", cli.cwd.display()))?;
    let config = config::load(&cwd, cli.overrides())?;
    let transport = Arc::new(Transport::on_disk(config.into_options(&cwd)?)?);

    let entries = collect_entries(&cwd, &cli.entries)?;
    if entries.is_empty() {
        bail!("no entry matches {}", cli.entries.join(", "));
    }

    let mut tasks = Vec::with_capacity(entries.len());
    for path in entries {
        let contents = tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let record = FileRecord::new(path, &cwd, contents);
        let transport = Arc::clone(&transport);
        tasks.push(tokio::task::spawn_blocking(move || transport.run(vec![record])));
    }

    let mut records = Vec::new();
    for task in tasks {
        records.extend(task.await??);
    }
    if cli.concat {
        records = seaport_core::concat(records).into_iter().collect();
    }

    let out = cli.out.clone().unwrap_or_else(|| cwd.join("dist"));
    let mut written = HashSet::new();
    for record in &records {
        let target = dest::destination(&out, record);
        // entries sharing a dependency produce it more than once
        if !written.insert(target.clone()) {
            continue;
        }
        dest::write(&target, record).await?;
        println!("{} {}", "wrote".green(), target.display());
    }

    info!("Wrote {} file(s) to {}", written.len(), out.display());
    Ok(())
}

/// Files matching `patterns` under `cwd`, in pattern order, without repeats
fn collect_entries(cwd: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for pattern in patterns {
        let full = cwd.join(pattern);
        let matches = glob::glob(&full.to_string_lossy())
            .with_context(|| format!("invalid entry pattern '{}'", pattern))?;
        for path in matches {
            let path = path?;
            if path.is_file() && seen.insert(path.clone()) {
                entries.push(path);
            }
        }
    }
    Ok(entries)
}
