//! `reqfile tree` command implementation.

use camino::Utf8PathBuf;
use reqfile_config::Overrides;
use reqfile_resolver::{InclusionGraph, Resolver};

use super::{resolve_options, CommandContext, Status};

/// Execute the `reqfile tree` command
pub async fn execute(file: Option<Utf8PathBuf>, ctx: &CommandContext) -> anyhow::Result<Status> {
    let settings = ctx.settings(Overrides::default()).await?;
    let path = ctx.manifest_path(file.as_deref(), &settings);

    let resolver = Resolver::new(resolve_options(&settings));
    let (graph, _) = resolver.load_graph(&path).await?;

    for line in graph.render_tree().lines() {
        ctx.output.plain(line);
    }
    for (_, url, _) in graph.remote_includes() {
        ctx.output.info(&format!("{} is remote and was not read", url));
    }

    // The tree is still useful with a cycle; report it and exit non-zero
    if let Some(cycle) = graph.find_cycle() {
        ctx.output.warn(&format!("include cycle: {}", InclusionGraph::format_cycle(&cycle)));
        return Ok(Status::Problems);
    }
    Ok(Status::Success)
}
