//! Resolution of a root manifest and everything it includes
//!
//! Resolution runs in three passes: load every reachable manifest into the
//! inclusion graph, walk the graph depth first to collect declarations in
//! file order, then evaluate markers and look for conflicts.

use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use reqfile_core::error::ReqError;
use reqfile_core::types::{MarkerEnvironment, PackageName};
use reqfile_core::utils::{normalize_path, IncludeTarget};
use reqfile_manifest::{Declaration, Editable, Entry, IncludeKind, ManifestCache};
use serde::Serialize;
use tracing::{debug, info};

use crate::conflict::{detect_conflicts, Conflict};
use crate::graph::{IncludeEdge, InclusionGraph};
use crate::options::ResolvedOptions;
use crate::ResolverResult;

/// Settings a resolution runs with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Environment markers are evaluated against
    pub environment: MarkerEnvironment,
    /// Extras satisfying `extra == "..."` markers
    pub extras: Vec<String>,
    /// Report conflicts instead of failing on them
    pub allow_conflicts: bool,
    /// Treat the resolution as if `--pre` were given
    pub allow_prereleases: bool,
}

/// Resolver for one environment
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    options: ResolveOptions,
}

/// A declaration left out because its marker is false
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Excluded {
    #[serde(flatten)]
    pub declaration: Declaration,
    /// Marker text that evaluated false
    pub reason: String,
}

/// Result of resolving a root manifest
#[derive(Debug, Serialize)]
pub struct Resolution {
    pub root: Utf8PathBuf,
    /// Declarations that apply, in depth-first include order
    pub included: Vec<Declaration>,
    pub excluded: Vec<Excluded>,
    /// Constraint declarations that apply to the environment
    pub constraints: Vec<Declaration>,
    pub editables: Vec<Editable>,
    pub options: ResolvedOptions,
    /// Empty unless conflicts were allowed or the resolution came from `check`
    pub conflicts: Vec<Conflict>,
    /// Manifests in depth-first order
    pub manifests: Vec<Utf8PathBuf>,
    #[serde(skip)]
    pub graph: InclusionGraph,
    pub resolution_time_ms: u64,
}

/// Declarations gathered by the depth-first walk, before marker evaluation
#[derive(Debug, Default)]
struct Collected {
    requirements: Vec<Declaration>,
    constraints: Vec<Declaration>,
    editables: Vec<Editable>,
    options: ResolvedOptions,
}

impl Resolver {
    pub fn new(options: ResolveOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Resolve `root`, failing on the first conflict unless conflicts are allowed
    pub async fn resolve(&self, root: &Utf8Path) -> ResolverResult<Resolution> {
        let resolution = self.check(root).await?;
        if !self.options.allow_conflicts {
            if let Some(conflict) = resolution.conflicts.first() {
                return Err(conflict.clone().into());
            }
        }
        Ok(resolution)
    }

    /// Resolve `root` and report conflicts in the result instead of failing
    pub async fn check(&self, root: &Utf8Path) -> ResolverResult<Resolution> {
        let start_time = Instant::now();
        let root = normalize_path(root);

        let (graph, cache) = self.load_graph(&root).await?;
        graph.validate_no_cycles()?;
        graph.validate_no_remote()?;

        let mut collected = Collected::default();
        let mut visited = HashSet::new();
        visited.insert((root.clone(), false));
        collect(&cache, &root, false, &mut visited, &mut collected);

        let mut included = Vec::new();
        let mut excluded = Vec::new();
        for decl in collected.requirements {
            if self.applies(&decl)? {
                included.push(decl);
            } else {
                debug!(package = %decl.name(), origin = %decl.origin(), "excluded by marker");
                let reason = decl.requirement.condition().unwrap_or_default().to_string();
                excluded.push(Excluded {
                    declaration: decl,
                    reason,
                });
            }
        }

        let mut constraints = Vec::new();
        for decl in collected.constraints {
            if self.applies(&decl)? {
                constraints.push(decl);
            }
        }

        let conflicts = detect_conflicts(&included, &constraints);
        let mut options = collected.options;
        options.pre |= self.options.allow_prereleases;

        let resolution_time_ms = start_time.elapsed().as_millis() as u64;
        info!(
            root = %root,
            manifests = graph.manifest_count(),
            included = included.len(),
            excluded = excluded.len(),
            conflicts = conflicts.len(),
            "resolved manifest"
        );

        Ok(Resolution {
            manifests: graph.depth_first_order(),
            root,
            included,
            excluded,
            constraints,
            editables: collected.editables,
            options,
            conflicts,
            graph,
            resolution_time_ms,
        })
    }

    /// Load `root` and every local manifest it includes, breadth first.
    /// URL includes are recorded in the graph but not fetched.
    pub async fn load_graph(&self, root: &Utf8Path) -> ResolverResult<(InclusionGraph, ManifestCache)> {
        let root = normalize_path(root);
        let mut cache = ManifestCache::new();
        let mut graph = InclusionGraph::new();
        graph.add_manifest(&root);

        let mut queue: VecDeque<(Utf8PathBuf, Option<String>)> = VecDeque::from([(root, None)]);
        while let Some((path, included_from)) = queue.pop_front() {
            let manifest = cache
                .get_or_load(&path)
                .await
                .map_err(|e| with_origin(e, included_from.as_deref()))?;

            for include in manifest.includes() {
                let seen = graph.contains(&include.target);
                graph.add_include(
                    &path,
                    &include.target,
                    IncludeEdge {
                        kind: include.kind,
                        line: include.line,
                    },
                );

                match &include.target {
                    IncludeTarget::Path(target) if !seen => {
                        debug!(from = %path, target = %target, kind = include.kind.flag(), "queued include");
                        queue.push_back((target.clone(), Some(format!("{}:{}", path, include.line))));
                    },
                    IncludeTarget::Path(_) => {},
                    IncludeTarget::Url(url) => {
                        debug!(from = %path, url = %url, "remote include not fetched");
                    },
                }
            }
        }

        Ok((graph, cache))
    }

    fn applies(&self, decl: &Declaration) -> ResolverResult<bool> {
        decl.requirement
            .applies_to(&self.options.environment, &self.options.extras)
            .map_err(|e| ReqError::parse(decl.source.as_str(), decl.line, e.to_string()))
    }
}

/// Walk `path` depth first; `-r` entries are replaced in place by the target's
/// declarations and everything below a `-c` counts as a constraint
fn collect(
    cache: &ManifestCache,
    path: &Utf8Path,
    constraint: bool,
    visited: &mut HashSet<(Utf8PathBuf, bool)>,
    out: &mut Collected,
) {
    let Some(manifest) = cache.get(path) else {
        return;
    };

    for entry in &manifest.entries {
        match entry {
            Entry::Requirement(decl) if constraint => out.constraints.push(decl.clone()),
            Entry::Requirement(decl) => out.requirements.push(decl.clone()),
            Entry::Include(include) => {
                let IncludeTarget::Path(target) = &include.target else {
                    continue;
                };
                let as_constraint = constraint || include.kind == IncludeKind::Constraints;
                if visited.insert((target.clone(), as_constraint)) {
                    collect(cache, target, as_constraint, visited, out);
                }
            },
            Entry::Editable(editable) => {
                if !constraint {
                    out.editables.push(editable.clone());
                }
            },
            Entry::Option(option) => out.options.apply(&option.option),
        }
    }
}

/// Name the include directive when an included manifest cannot be read
fn with_origin(err: ReqError, included_from: Option<&str>) -> ReqError {
    match (err, included_from) {
        (ReqError::Io { message, source }, Some(origin)) => ReqError::Io {
            message: format!("{} (included from {})", message, origin),
            source,
        },
        (err, _) => err,
    }
}

impl Resolution {
    /// Included declarations for `name`
    pub fn declarations_for<'a>(&'a self, name: &'a PackageName) -> impl Iterator<Item = &'a Declaration> {
        self.included
            .iter()
            .filter(move |decl| &decl.requirement.name == name)
    }

    /// Constraints restricting `name`
    pub fn constraints_for<'a>(&'a self, name: &'a PackageName) -> impl Iterator<Item = &'a Declaration> {
        self.constraints
            .iter()
            .filter(move |decl| &decl.requirement.name == name)
    }

    pub fn is_included(&self, name: &str) -> bool {
        match PackageName::new(name) {
            Ok(name) => self.declarations_for(&name).next().is_some(),
            Err(_) => false,
        }
    }

    /// Render the included declarations and merged options as manifest text
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in self.options.to_lines() {
            out.push_str(&line);
            out.push('\n');
        }
        for editable in &self.editables {
            out.push_str(&Entry::Editable(editable.clone()).to_string());
            out.push('\n');
        }
        for decl in &self.included {
            out.push_str(&decl.requirement.to_string());
            for hash in &decl.hashes {
                out.push_str(" --hash=");
                out.push_str(hash);
            }
            out.push('\n');
        }
        out
    }
}
