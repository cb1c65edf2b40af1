//! # reqfile-cli
//!
//! Inspect and resolve pip-style requirements manifests.
//!
//! This is the main entry point for the `reqfile` tool. It handles command
//! parsing, sets up logging and error reporting, and dispatches to the
//! command handlers.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use std::process::ExitCode;
use tracing::{error, info};

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Inspect and resolve pip-style requirements manifests
#[derive(Parser)]
#[command(name = "reqfile", version, about = "Requirements manifest inspector")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Use this config file instead of the nearest reqfile.toml
    #[arg(long, global = true, value_name = "PATH", env = "REQFILE_CONFIG")]
    pub config: Option<Utf8PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the entries of one manifest
    Parse {
        /// Manifest to read (defaults to the configured manifest)
        file: Option<Utf8PathBuf>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Follow inclusions and print the declarations that apply
    Resolve(ResolveArgs),
    /// Show the inclusion tree
    Tree {
        file: Option<Utf8PathBuf>,
    },
    /// Report malformed lines and conflicting declarations
    Check(ResolveArgs),
    /// Show version information
    Version,
    #[command(external_subcommand)]
    External(Vec<String>),
}

/// Environment selection shared by `resolve` and `check`
#[derive(Args, Debug, Clone, Default)]
pub struct ResolveArgs {
    /// Root manifest (defaults to the configured manifest)
    pub file: Option<Utf8PathBuf>,

    /// Print JSON instead of manifest text
    #[arg(long)]
    pub json: bool,

    /// Python version markers are evaluated for, e.g. 3.11
    #[arg(long, value_name = "VERSION")]
    pub python_version: Option<String>,

    /// Target platform as `sys_platform` (linux, darwin, win32)
    #[arg(long, value_name = "PLATFORM")]
    pub platform: Option<String>,

    /// Extra to enable for `extra == "..."` markers (repeatable)
    #[arg(long = "extra", value_name = "EXTRA")]
    pub extras: Vec<String>,

    /// Override a marker variable (repeatable)
    #[arg(long = "marker", value_name = "NAME=VALUE", value_parser = parse_key_value)]
    pub markers: Vec<(String, String)>,

    /// Keep going when declarations conflict
    #[arg(long)]
    pub allow_conflicts: bool,

    /// Allow pre-release versions
    #[arg(long)]
    pub pre: bool,

    /// Also list declarations excluded by their markers
    #[arg(long)]
    pub show_excluded: bool,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    info!("Starting reqfile v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}", ErrorFormatter::new().format_report(&err));
            ExitCode::FAILURE
        },
    }
}

fn run_cli(cli: Cli) -> anyhow::Result<ExitCode> {
    // Create Tokio runtime for async operations
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| reqfile_core::ReqError::io("Failed to create async runtime", e))?;

    rt.block_on(async {
        let ctx = CommandContext::new(cli.config)?;

        let status = match cli.command {
            Some(command) => commands::dispatch_command(command, &ctx).await?,
            None => commands::show_help(&ctx),
        };
        Ok::<_, anyhow::Error>(ExitCode::from(status))
    })
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("REQFILE_LOG").unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "reqfile={level},reqfile_core={level},reqfile_manifest={level},reqfile_config={level},reqfile_resolver={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("reqfile encountered an unexpected error: {}", panic_info);
        eprintln!("reqfile crashed! This is a bug.");
        eprintln!("Please report this at: https://github.com/reqfile/reqfile/issues");
        eprintln!("Error: {}", panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("platform_machine=aarch64").unwrap(),
            ("platform_machine".to_string(), "aarch64".to_string())
        );
        assert!(parse_key_value("platform_machine").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_cli_parses_resolve_flags() {
        let cli = Cli::try_parse_from([
            "reqfile",
            "resolve",
            "optional.txt",
            "--python-version",
            "2.7",
            "--extra",
            "docs",
            "--extra",
            "fuzzy",
            "--marker",
            "platform_machine=arm64",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        let Some(Commands::Resolve(args)) = cli.command else {
            panic!("expected resolve");
        };
        assert_eq!(args.file.as_deref().map(|p| p.as_str()), Some("optional.txt"));
        assert_eq!(args.python_version.as_deref(), Some("2.7"));
        assert_eq!(args.extras, vec!["docs", "fuzzy"]);
        assert_eq!(args.markers.len(), 1);
    }

    #[test]
    fn test_unknown_command_is_external() {
        let cli = Cli::try_parse_from(["reqfile", "resolv", "x.txt"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::External(ref args)) if args[0] == "resolv"));
    }
}
