// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use super::{CommandContext, OutputFormat};
use anyhow::Result;
use serde_json::json;

pub struct CategoriesCommand {
    pub format: OutputFormat,
}

impl CategoriesCommand {
    pub async fn execute(self, context: CommandContext) -> Result<()> {
        let api = context.api()?;
        let categories = api.get_categories().await?;

        match self.format {
            OutputFormat::Text => {
                let width = categories.iter().map(|c| c.id.len()).max().unwrap_or(0);
                for category in &categories {
                    println!("{:>width$}  {}", category.id, category.name, width = width);
                }
                eprintln!("{} categories", categories.len());
            }
            OutputFormat::Json => {
                let results: Vec<_> = categories
                    .iter()
                    .map(|c| json!({ "id": c.id, "name": c.name }))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&results)?);
            }
        }

        Ok(())
    }
}
