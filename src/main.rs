// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use anyhow::Result;
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use vod_expiry::Config;

mod cli;
use cli::{
    CategoriesCommand, CommandContext, ConfigCommand, OutputFormat, ReportCommand, ScanCommand,
};

fn cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Cyan.on_default())
}

#[derive(Parser)]
#[command(name = "vod-expiry")]
#[command(about = "Lists NHK World on-demand episodes that are about to expire")]
#[command(version)]
#[command(styles = cargo_style())]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging to file (vod-expiry_debug.log)
    #[arg(long, global = true)]
    debug_log: bool,

    /// Config file (default: <config dir>/vod-expiry/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan every category and write the digest (default if no command given)
    Scan(ScanArgs),

    /// Print a digest sorted by expiry with the time left
    Report {
        /// Digest to read (defaults to the configured output file)
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// List programme categories
    Categories {
        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Fetch a raw API path and print the JSON
    Api {
        /// Path below the API root, e.g. showsapi/v1/en/categories/
        path: String,
    },

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigSubCommand),
}

#[derive(Parser, Default)]
struct ScanArgs {
    /// Output file for the digest
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Include episodes expiring within this many hours
    #[arg(long)]
    window_hours: Option<u64>,

    /// Maximum pages read per category
    #[arg(long, value_parser = parse_page_cap)]
    max_pages: Option<usize>,

    /// Pretty-print the digest
    #[arg(long)]
    pretty: bool,
}

#[derive(Subcommand)]
enum ConfigSubCommand {
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

fn parse_page_cap(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    if cli.debug_log {
        let file = File::create("vod-expiry_debug.log")?;
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_level(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(file_layer)
            .with(
                EnvFilter::from_default_env()
                    .add_directive("vod_expiry=debug".parse()?)
                    .add_directive("hyper_util=error".parse()?),
            )
            .init();
    } else if cli.verbose {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::from_default_env()
                    .add_directive(tracing::Level::DEBUG.into())
                    .add_directive("hyper_util=error".parse()?),
            )
            .init();
    } else if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("hyper_util=error".parse()?),
            )
            .init();
    } else {
        // Progress lines for the scheduled job
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(EnvFilter::new("vod_expiry=info"))
            .init();
    }

    Ok(())
}

async fn run_api_command(context: &CommandContext, path: &str) -> Result<()> {
    let api = context.api()?;
    let result = api.get_raw(path).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);

    // A broken file must not stop `config init --force` from replacing it
    let config = match &cli.command {
        Some(Commands::Config(ConfigSubCommand::Init { .. })) => Config::default(),
        _ => Config::load_or_default(&config_path)?,
    };
    let context = CommandContext::new(config, config_path);

    match cli.command {
        None => {
            let args = ScanArgs::default();
            scan_command(args).execute(context).await?;
        }
        Some(Commands::Scan(args)) => {
            scan_command(args).execute(context).await?;
        }
        Some(Commands::Report { file, format }) => {
            let cmd = ReportCommand {
                file,
                format: OutputFormat::from_str(&format)?,
            };
            cmd.execute(context).await?;
        }
        Some(Commands::Categories { format }) => {
            let cmd = CategoriesCommand {
                format: OutputFormat::from_str(&format)?,
            };
            cmd.execute(context).await?;
        }
        Some(Commands::Api { path }) => {
            run_api_command(&context, &path).await?;
        }
        Some(Commands::Config(config_cmd)) => {
            let cmd = match config_cmd {
                ConfigSubCommand::Init { force } => ConfigCommand::Init { force },
                ConfigSubCommand::Show => ConfigCommand::Show,
            };
            cmd.execute(context).await?;
        }
    }

    Ok(())
}

fn scan_command(args: ScanArgs) -> ScanCommand {
    ScanCommand {
        file: args.file,
        window_hours: args.window_hours,
        max_pages: args.max_pages,
        pretty: args.pretty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_command_means_scan_with_defaults() {
        let cli = Cli::try_parse_from(["vod-expiry"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_scan_flags() {
        let cli = Cli::try_parse_from([
            "vod-expiry",
            "scan",
            "-f",
            "out.json",
            "--window-hours",
            "48",
            "--max-pages",
            "10",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Scan(args)) => {
                assert_eq!(args.file, Some(PathBuf::from("out.json")));
                assert_eq!(args.window_hours, Some(48));
                assert_eq!(args.max_pages, Some(10));
                assert!(!args.pretty);
            }
            _ => panic!("expected scan"),
        }
    }

    #[test]
    fn rejects_zero_page_cap() {
        assert!(Cli::try_parse_from(["vod-expiry", "scan", "--max-pages", "0"]).is_err());
    }
}
