// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use crate::expiry::ExpiringProgramme;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;

/// Layout of the Unix `date` command, always rendered in UTC.
const LAST_UPDATED_FORMAT: &str = "%a %b %e %H:%M:%S UTC %Y";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digest {
    pub last_updated: String,
    #[serde(default)]
    pub progs: Vec<ExpiringProgramme>,
}

pub fn format_last_updated(at: DateTime<Utc>) -> String {
    at.format(LAST_UPDATED_FORMAT).to_string()
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "digest".into());
    name.push(".tmp");
    path.with_file_name(name)
}

impl Digest {
    pub fn new(progs: Vec<ExpiringProgramme>, at: DateTime<Utc>) -> Self {
        Self {
            last_updated: format_last_updated(at),
            progs,
        }
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        json.with_context(|| "Failed to serialize digest")
    }

    /// Writes next to the target first and renames over it, so readers never
    /// see a half-written file.
    pub async fn write<P: AsRef<Path>>(&self, path: P, pretty: bool) -> Result<()> {
        let path = path.as_ref();
        let content = self.to_json(pretty)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                async_fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
        }

        let tmp = temp_path(path);
        if let Err(e) = async_fs::write(&tmp, content).await {
            let _ = async_fs::remove_file(&tmp).await;
            return Err(e).with_context(|| format!("Failed to write {}", tmp.display()));
        }

        if let Err(e) = async_fs::rename(&tmp, path).await {
            let _ = async_fs::remove_file(&tmp).await;
            return Err(e).with_context(|| format!("Failed to replace {}", path.display()));
        }

        Ok(())
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = async_fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read digest: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse digest: {}", path.display()))
    }
}
