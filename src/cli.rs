// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Command line arguments

use clap::Parser;
use seaport_core::options::{Patterns, RenameConfig};
use seaport_core::TransportConfig;
use std::path::PathBuf;

/// seaport - transport sea-modules packages into CMD modules
#[derive(Parser, Debug)]
#[command(name = "seaport")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Entry files, as glob patterns relative to --cwd
    #[arg(required = true)]
    pub entries: Vec<String>,

    /// Project directory holding package.json
    #[arg(long, default_value = ".")]
    pub cwd: PathBuf,

    /// Directory of installed packages
    #[arg(long)]
    pub module_dir: Option<String>,

    /// Inclusion mode: none, self, relative, all, standalone or umd
    #[arg(long)]
    pub include: Option<String>,

    /// Packages or module ids left untouched (repeatable)
    #[arg(long)]
    pub ignore: Vec<String>,

    /// Packages or module ids rewritten but never emitted (repeatable)
    #[arg(long)]
    pub skip: Vec<String>,

    /// Prefix of every module id
    #[arg(long)]
    pub idleading: Option<String>,

    /// Static suffix inserted before output extensions
    #[arg(long, conflicts_with = "hash")]
    pub suffix: Option<String>,

    /// Append the first LEN hex digits of the content SHA-1
    #[arg(long, value_name = "LEN")]
    pub hash: Option<usize>,

    /// Output directory (default: <cwd>/dist)
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Join all output into one file
    #[arg(long)]
    pub concat: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The configuration layer given by flags
    pub fn overrides(&self) -> TransportConfig {
        let patterns = |values: &[String]| (!values.is_empty()).then(|| Patterns::Many(values.to_vec()));
        let rename = match (&self.suffix, self.hash) {
            (None, None) => None,
            (suffix, hash) => Some(RenameConfig {
                suffix: suffix.clone(),
                hash,
            }),
        };

        TransportConfig {
            module_dir: self.module_dir.clone(),
            include: self.include.clone(),
            ignore: patterns(&self.ignore),
            skip: patterns(&self.skip),
            rename,
            idleading: self.idleading.clone(),
            ..Default::default()
        }
    }
}
