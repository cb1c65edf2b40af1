//! Command implementations and dispatch logic.
//!
//! Each command is an async function that takes its arguments and a
//! [`CommandContext`] and reports whether the run found problems.

use std::process::ExitCode;

use camino::{Utf8Path, Utf8PathBuf};
use reqfile_config::{ConfigLayering, ConfigLoader, Overrides, Settings};
use reqfile_core::error::{ReqError, ReqResult};
use reqfile_resolver::ResolveOptions;
use tracing::info;

pub mod check;
pub mod parse;
pub mod resolve;
pub mod tree;


use crate::{output::OutputHandler, Commands, ResolveArgs};

/// Outcome of a command that ran to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    /// The command ran but found problems worth a non-zero exit
    Problems,
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Success => ExitCode::SUCCESS,
            Status::Problems => ExitCode::FAILURE,
        }
    }
}

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: Utf8PathBuf,
    /// `--config` given on the command line
    pub config_path: Option<Utf8PathBuf>,
    pub output: OutputHandler,
}

impl CommandContext {
    /// Create a new command context in the current directory
    pub fn new(config_path: Option<Utf8PathBuf>) -> ReqResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| ReqError::io("Failed to get current directory", e))?;
        let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|path| ReqError::ConfigValidation {
            field: "cwd".to_string(),
            reason: format!("current directory is not valid UTF-8: {}", path.display()),
        })?;

        Ok(Self {
            cwd,
            config_path,
            output: OutputHandler::new(),
        })
    }

    /// Merge config files, `REQFILE_*` variables and command-line overrides
    pub async fn settings(&self, overrides: Overrides) -> ReqResult<Settings> {
        let loader = ConfigLoader::new(self.cwd.clone());
        let global = loader.load_global_config().await?;
        let project = match &self.config_path {
            Some(path) => Some(loader.load_explicit_config(path).await?),
            None => loader.load_project_config().await?,
        };

        ConfigLayering::new()
            .with_global(global)
            .with_project(project)
            .with_env(ConfigLayering::collect_env_overrides())
            .with_cli(overrides)
            .merge()
    }

    /// Manifest named on the command line, or the configured default
    pub fn manifest_path(&self, file: Option<&Utf8Path>, settings: &Settings) -> Utf8PathBuf {
        let path = file.unwrap_or_else(|| Utf8Path::new(&settings.default_manifest));
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    /// Path as shown to the user, relative to the working directory when possible
    pub fn display_path<'a>(&self, path: &'a Utf8Path) -> &'a Utf8Path {
        path.strip_prefix(&self.cwd).unwrap_or(path)
    }
}

impl ResolveArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            python_version: self.python_version.clone(),
            platform: self.platform.clone(),
            extras: self.extras.clone(),
            allow_conflicts: self.allow_conflicts,
            allow_prereleases: self.pre,
            environment: self.markers.clone(),
        }
    }
}

/// Resolver options for merged settings
pub fn resolve_options(settings: &Settings) -> ResolveOptions {
    ResolveOptions {
        environment: settings.environment.clone(),
        extras: settings.extras.clone(),
        allow_conflicts: settings.allow_conflicts,
        allow_prereleases: settings.allow_prereleases,
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> anyhow::Result<Status> {
    match command {
        Commands::Parse { file, json } => {
            info!("Parsing manifest {:?} (json: {})", file, json);
            parse::execute(file, json, ctx).await
        },
        Commands::Resolve(args) => {
            info!("Resolving manifest {:?}", args.file);
            resolve::execute(args, ctx).await
        },
        Commands::Tree { file } => {
            info!("Showing inclusion tree for {:?}", file);
            tree::execute(file, ctx).await
        },
        Commands::Check(args) => {
            info!("Checking manifest {:?}", args.file);
            check::execute(args, ctx).await
        },
        Commands::Version => {
            info!("Showing version information");
            Ok(show_version(ctx))
        },
        Commands::External(args) => unknown_command(&args, ctx),
    }
}

fn unknown_command(args: &[String], ctx: &CommandContext) -> anyhow::Result<Status> {
    let name = args.first().map(String::as_str).unwrap_or_default();
    ctx.output.error(&format!("Unknown command '{}'", name));
    if let Some(suggestion) = suggest_similar_command(name) {
        ctx.output.info(&format!("Did you mean '{}'?", suggestion));
    }
    ctx.output.info("Run 'reqfile help' to see available commands.");
    anyhow::bail!("Unknown command: {}", name)
}

/// Show help information
pub fn show_help(ctx: &CommandContext) -> Status {
    ctx.output.info("reqfile - inspect and resolve requirements manifests");
    ctx.output.info("");
    ctx.output.info("Usage: reqfile [COMMAND] [OPTIONS]");
    ctx.output.info("");
    ctx.output.info("Commands:");
    ctx.output.info("  parse [FILE]     List the entries of one manifest");
    ctx.output.info("  resolve [FILE]   Follow inclusions and print what applies");
    ctx.output.info("  tree [FILE]      Show the inclusion tree");
    ctx.output.info("  check [FILE]     Report malformed lines and conflicts");
    ctx.output.info("  version          Show version information");
    ctx.output.info("");
    ctx.output.info("Run 'reqfile <command> --help' for more information on a command.");
    Status::Success
}

fn show_version(ctx: &CommandContext) -> Status {
    let target = format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS);

    ctx.output.plain(&format!("reqfile v{}", env!("CARGO_PKG_VERSION")));
    ctx.output.info(&format!("Built: {}", env!("BUILD_DATE")));
    ctx.output.info(&format!("Target: {}", target));
    ctx.output.info(&format!("Rust: {}", env!("RUSTC_VERSION")));
    Status::Success
}

/// Suggest similar commands based on edit distance
pub fn suggest_similar_command(input: &str) -> Option<String> {
    let commands = ["parse", "resolve", "tree", "check", "version", "help"];

    commands
        .iter()
        .map(|command| (edit_distance(input, command), *command))
        .filter(|(distance, _)| *distance <= 2)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, command)| command.to_string())
}

/// Levenshtein distance between two strings
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut current = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        previous = current;
    }
    previous[b.len()]
}
