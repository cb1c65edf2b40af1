//! `reqfile parse` command implementation.
//!
//! Reads one manifest without following its inclusions and lists its entries.

use camino::Utf8PathBuf;
use reqfile_config::Overrides;
use reqfile_manifest::{load_from_file, Entry, Manifest};

use super::{CommandContext, Status};

/// Execute the `reqfile parse` command
pub async fn execute(file: Option<Utf8PathBuf>, json: bool, ctx: &CommandContext) -> anyhow::Result<Status> {
    let settings = ctx.settings(Overrides::default()).await?;
    let path = ctx.manifest_path(file.as_deref(), &settings);
    let manifest = load_from_file(&path).await?;

    if json {
        ctx.output.plain(&serde_json::to_string_pretty(&manifest)?);
        return Ok(Status::Success);
    }

    for line in render_entries(&manifest) {
        ctx.output.plain(&line);
    }
    ctx.output.info(&summary(&manifest));
    Ok(Status::Success)
}

/// One line per entry: line number, kind, and details
pub fn render_entries(manifest: &Manifest) -> Vec<String> {
    manifest
        .entries
        .iter()
        .map(|entry| {
            let body = match entry {
                Entry::Requirement(decl) => {
                    let mut text = decl.name().to_string();
                    if let Some(constraint) = decl.requirement.constraint() {
                        text.push_str(&format!("  {}", constraint));
                    }
                    if let Some(url) = decl.requirement.url() {
                        text.push_str(&format!("  @ {}", url));
                    }
                    if let Some(condition) = decl.requirement.condition() {
                        text.push_str(&format!("  [{}]", condition));
                    }
                    if let Some(comment) = &decl.comment {
                        text.push_str(&format!("  # {}", comment));
                    }
                    text
                },
                Entry::Include(include) => format!("{} {}", include.kind.flag(), include.target),
                other => other.to_string(),
            };
            format!("{:>4}  {}", entry.line(), body)
        })
        .collect()
}

fn summary(manifest: &Manifest) -> String {
    format!(
        "{} declarations, {} includes, {} options",
        manifest.declarations().count(),
        manifest.includes().count(),
        manifest.options().count() + manifest.editables().count()
    )
}
