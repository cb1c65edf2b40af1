//! `reqfile check` command implementation.
//!
//! Reads every manifest reachable from the root and reports malformed lines,
//! include cycles and conflicting declarations. Any problem gives a non-zero
//! exit status.

use reqfile_resolver::Resolver;
use serde::Serialize;

use super::{resolve_options, CommandContext, Status};
use crate::output::errors::ErrorFormatter;
use crate::ResolveArgs;

#[derive(Debug, Serialize)]
struct Report {
    manifests: usize,
    included: usize,
    excluded: usize,
    problems: Vec<String>,
}

/// Execute the `reqfile check` command
pub async fn execute(args: ResolveArgs, ctx: &CommandContext) -> anyhow::Result<Status> {
    let settings = ctx.settings(args.overrides()).await?;
    let path = ctx.manifest_path(args.file.as_deref(), &settings);

    let resolver = Resolver::new(resolve_options(&settings));
    let report = match resolver.check(&path).await {
        Ok(resolution) => Report {
            manifests: resolution.manifests.len(),
            included: resolution.included.len(),
            excluded: resolution.excluded.len(),
            problems: resolution
                .conflicts
                .iter()
                .map(|conflict| format!("conflict: {}", conflict))
                .collect(),
        },
        // A manifest that cannot be read or parsed is itself the finding
        Err(err) if !err.is_io() || path.exists() => {
            if !args.json {
                eprint!("{}", ErrorFormatter::new().format_error(&err));
            }
            Report {
                manifests: 0,
                included: 0,
                excluded: 0,
                problems: vec![err.to_string()],
            }
        },
        Err(err) => return Err(err.into()),
    };

    let status = if report.problems.is_empty() {
        Status::Success
    } else {
        Status::Problems
    };

    if args.json {
        ctx.output.plain(&serde_json::to_string_pretty(&report)?);
        return Ok(status);
    }

    if report.manifests > 0 {
        for problem in &report.problems {
            ctx.output.warn(problem);
        }
    }
    match status {
        Status::Success => ctx.output.success(&format!(
            "{}: {} manifests, {} declarations ({} excluded by markers), no problems",
            ctx.display_path(&path),
            report.manifests,
            report.included,
            report.excluded
        )),
        Status::Problems => ctx.output.error(&format!(
            "{}: {} problem(s) found",
            ctx.display_path(&path),
            report.problems.len()
        )),
    }
    Ok(status)
}
