// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Writing output records

use anyhow::{Context, Result};
use seaport_core::FileRecord;
use std::path::{Path, PathBuf};

/// Where `record` lands under `out`
pub fn destination(out: &Path, record: &FileRecord) -> PathBuf {
    out.join(record.relative())
}

/// Write `record` to `target`, creating parent directories
pub async fn write(target: &Path, record: &FileRecord) -> Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    tokio::fs::write(target, &record.contents)
        .await
        .with_context(|| format!("writing {}", target.display()))
}
