// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::CommandContext;
use anyhow::{Context, Result};

use vod_expiry::Config;

pub enum ConfigCommand {
    Init { force: bool },
    Show,
}

impl ConfigCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        match self {
            Self::Init { force } => {
                let path = &context.config_path;
                if path.exists() && !force {
                    anyhow::bail!(
                        "Config file already exists: {} (use --force to overwrite)",
                        path.display()
                    );
                }
                Config::default().save(path)?;
                println!("Wrote default configuration to {}", path.display());
            }
            Self::Show => {
                let content = toml::to_string_pretty(&context.config)
                    .with_context(|| "Failed to serialize config to TOML")?;
                println!("# {}", context.config_path.display());
                print!("{}", content);
            }
        }

        Ok(())
    }
}
