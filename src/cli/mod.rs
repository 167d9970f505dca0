// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use anyhow::Result;
use std::path::PathBuf;

use vod_expiry::{Config, NhkApi};

pub mod categories;
pub mod config;
pub mod report;
pub mod scan;

pub use categories::CategoriesCommand;
pub use config::ConfigCommand;
pub use report::ReportCommand;
pub use scan::ScanCommand;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => anyhow::bail!("Invalid format: {}. Use 'text' or 'json'", s),
        }
    }
}

/// Effective configuration plus where it came from
pub struct CommandContext {
    pub config: Config,
    pub config_path: PathBuf,
}

impl CommandContext {
    pub fn new(config: Config, config_path: PathBuf) -> Self {
        Self {
            config,
            config_path,
        }
    }

    pub fn api(&self) -> Result<NhkApi> {
        NhkApi::new(&self.config.api)
    }
}
