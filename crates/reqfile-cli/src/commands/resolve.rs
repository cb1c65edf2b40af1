//! `reqfile resolve` command implementation.
//!
//! Follows inclusions from the root manifest and prints the declarations that
//! apply to the selected environment as manifest text.

use reqfile_resolver::{Resolution, Resolver};

use super::{resolve_options, CommandContext, Status};
use crate::ResolveArgs;

/// Execute the `reqfile resolve` command
pub async fn execute(args: ResolveArgs, ctx: &CommandContext) -> anyhow::Result<Status> {
    let settings = ctx.settings(args.overrides()).await?;
    let path = ctx.manifest_path(args.file.as_deref(), &settings);

    let resolver = Resolver::new(resolve_options(&settings));
    let resolution = resolver.resolve(&path).await?;

    if args.json {
        ctx.output.plain(&serde_json::to_string_pretty(&resolution)?);
        return Ok(Status::Success);
    }

    ctx.output.plain(resolution.render().trim_end());
    for conflict in &resolution.conflicts {
        ctx.output.warn(&format!("conflict: {}", conflict));
    }
    if args.show_excluded {
        for line in excluded_lines(&resolution) {
            ctx.output.info(&line);
        }
    }
    Ok(Status::Success)
}

/// `# excluded: name (origin): marker` for each excluded declaration
pub fn excluded_lines(resolution: &Resolution) -> Vec<String> {
    resolution
        .excluded
        .iter()
        .map(|excluded| {
            format!(
                "# excluded: {} ({}): {}",
                excluded.declaration.name(),
                excluded.declaration.origin(),
                excluded.reason
            )
        })
        .collect()
}
