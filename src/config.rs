// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Layered configuration
//!
//! Later layers win field by field: defaults, the user file, the project
//! `seaport.toml`, `SEAPORT_*` variables, then flags.

use anyhow::{Context, Result};
use seaport_core::options::Patterns;
use seaport_core::TransportConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Project configuration file name
pub const PROJECT_FILE: &str = "seaport.toml";

/// Load every layer and put `overrides` on top
pub fn load(cwd: &Path, overrides: TransportConfig) -> Result<TransportConfig> {
    let mut config = TransportConfig::default();

    if let Some(path) = user_config_path() {
        if path.exists() {
            config.merge(read(&path)?);
        }
    }

    let project = cwd.join(PROJECT_FILE);
    if project.exists() {
        config.merge(read(&project)?);
    }

    config.merge(from_env(|key| std::env::var(key).ok()));
    config.merge(overrides);
    Ok(config)
}

/// `<config dir>/seaport/config.toml`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("seaport").join("config.toml"))
}

fn read(path: &Path) -> Result<TransportConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config = toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// The layer given by `SEAPORT_*` variables, looked up through `var`
pub fn from_env<F>(var: F) -> TransportConfig
where
    F: Fn(&str) -> Option<String>,
{
    let list = |key: &str| {
        var(key).map(|value| {
            Patterns::Many(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .collect(),
            )
        })
    };

    TransportConfig {
        module_dir: var("SEAPORT_MODULE_DIR"),
        include: var("SEAPORT_INCLUDE"),
        ignore: list("SEAPORT_IGNORE"),
        skip: list("SEAPORT_SKIP"),
        idleading: var("SEAPORT_IDLEADING"),
        ..Default::default()
    }
}
