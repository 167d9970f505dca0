// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::CommandContext;
use anyhow::Result;
use chrono::Utc;
use std::path::PathBuf;
use tracing::info;

use vod_expiry::ScanOptions;

pub struct ScanCommand {
    pub file: Option<PathBuf>,
    pub window_hours: Option<u64>,
    pub max_pages: Option<usize>,
    pub pretty: bool,
}

impl ScanCommand {
    /// Command-line values win over the config file.
    fn apply(&self, context: &mut CommandContext) {
        let config = &mut context.config;
        if let Some(file) = &self.file {
            config.output.file = file.clone();
        }
        if let Some(hours) = self.window_hours {
            config.scan.window_hours = hours;
        }
        if let Some(pages) = self.max_pages {
            config.scan.max_pages = pages;
        }
        if self.pretty {
            config.output.pretty = true;
        }
    }

    pub async fn execute(self, mut context: CommandContext) -> Result<()> {
        self.apply(&mut context);

        let options = ScanOptions::from_config(&context.config)?;
        let api = context.api()?;

        let digest = vod_expiry::scan(&api, &options, Utc::now()).await?;

        let output = &context.config.output;
        info!("Writing to {}...", output.file.display());
        digest.write(&output.file, output.pretty).await?;

        Ok(())
    }
}
