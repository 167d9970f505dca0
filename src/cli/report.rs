// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::{CommandContext, OutputFormat};
use anyhow::Result;
use chrono::Utc;
use std::path::PathBuf;

use vod_expiry::Digest;
use vod_expiry::report::{build_rows, render_text};

pub struct ReportCommand {
    pub file: Option<PathBuf>,
    pub format: OutputFormat,
}

impl ReportCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        let path = self.file.unwrap_or(context.config.output.file);
        let digest = Digest::load(&path).await?;
        let rows = build_rows(&digest, Utc::now());

        match self.format {
            OutputFormat::Text => {
                if rows.is_empty() {
                    eprintln!("No expiring programmes in {}", path.display());
                }
                print!("{}", render_text(&digest, &rows));
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            }
        }

        Ok(())
    }
}
