//! Inclusion graph implementation using petgraph
//!
//! Nodes are manifest files and edges are `-r`/`-c` directives. The first
//! manifest added is the root of the resolution. Remote manifests named by
//! URL are kept as leaves; they are never loaded, so they include nothing.

use camino::{Utf8Path, Utf8PathBuf};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use reqfile_core::error::{ReqError, ReqResult};
use reqfile_core::utils::IncludeTarget;
use reqfile_manifest::IncludeKind;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use url::Url;

/// A manifest taking part in a resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestNode {
    pub target: IncludeTarget,
}

impl ManifestNode {
    /// Local path, `None` for a remote manifest
    pub fn path(&self) -> Option<&Utf8Path> {
        match &self.target {
            IncludeTarget::Path(path) => Some(path.as_path()),
            IncludeTarget::Url(_) => None,
        }
    }
}

/// An include directive between two manifests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IncludeEdge {
    pub kind: IncludeKind,
    /// Line of the directive in the including manifest
    pub line: usize,
}

/// Directed graph of manifests and the directives that include them
#[derive(Debug, Default)]
pub struct InclusionGraph {
    graph: DiGraph<ManifestNode, IncludeEdge>,
    node_map: HashMap<IncludeTarget, NodeIndex>,
    root: Option<NodeIndex>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unseen,
    Active,
    Done,
}

impl InclusionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a local manifest node; adding the same path twice returns the same index
    pub fn add_manifest(&mut self, path: &Utf8Path) -> NodeIndex {
        self.add_node(&IncludeTarget::Path(path.to_path_buf()))
    }

    fn add_node(&mut self, target: &IncludeTarget) -> NodeIndex {
        if let Some(index) = self.node_map.get(target) {
            return *index;
        }

        let index = self.graph.add_node(ManifestNode {
            target: target.clone(),
        });
        self.node_map.insert(target.clone(), index);
        if self.root.is_none() {
            self.root = Some(index);
        }
        index
    }

    /// Record that `from` includes `to`, adding either node if needed
    pub fn add_include(&mut self, from: &Utf8Path, to: &IncludeTarget, edge: IncludeEdge) -> NodeIndex {
        let from_index = self.add_manifest(from);
        let to_index = self.add_node(to);
        self.graph.add_edge(from_index, to_index, edge);
        to_index
    }

    pub fn contains(&self, target: &IncludeTarget) -> bool {
        self.node_map.contains_key(target)
    }

    pub fn root(&self) -> Option<&Utf8Path> {
        self.root.and_then(|index| self.graph[index].path())
    }

    pub fn manifest_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn include_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Includes naming a URL as `(including manifest, url, edge)`, in load order
    pub fn remote_includes(&self) -> Vec<(&Utf8Path, &Url, IncludeEdge)> {
        self.graph
            .edge_references()
            .filter_map(|edge| {
                let from = self.graph[edge.source()].path()?;
                match &self.graph[edge.target()].target {
                    IncludeTarget::Url(url) => Some((from, url, *edge.weight())),
                    IncludeTarget::Path(_) => None,
                }
            })
            .collect()
    }

    /// Fail on the first include that names a URL
    pub fn validate_no_remote(&self) -> ReqResult<()> {
        match self.remote_includes().first() {
            Some((from, url, edge)) => Err(ReqError::UnsupportedInclude {
                path: format!("{}:{}", from, edge.line),
                target: url.to_string(),
                reason: "remote manifests are not fetched".to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Direct includes of `path` in line order
    pub fn children(&self, path: &Utf8Path) -> Vec<(&IncludeTarget, IncludeEdge)> {
        match self.node_map.get(&IncludeTarget::Path(path.to_path_buf())) {
            Some(index) => self
                .children_of(*index)
                .into_iter()
                .map(|(child, edge)| (&self.graph[child].target, edge))
                .collect(),
            None => Vec::new(),
        }
    }

    fn children_of(&self, index: NodeIndex) -> Vec<(NodeIndex, IncludeEdge)> {
        let mut children: Vec<_> = self
            .graph
            .edges(index)
            .map(|edge| (edge.target(), *edge.weight()))
            .collect();
        children.sort_by_key(|(_, edge)| edge.line);
        children
    }

    /// Find an include cycle, returned closed (`a, b, a`)
    pub fn find_cycle(&self) -> Option<Vec<Utf8PathBuf>> {
        if !petgraph::algo::is_cyclic_directed(&self.graph) {
            return None;
        }

        let mut state = vec![Visit::Unseen; self.graph.node_count()];
        let mut stack = Vec::new();
        let starts = self.root.into_iter().chain(self.graph.node_indices());
        for start in starts {
            if state[start.index()] == Visit::Unseen {
                if let Some(cycle) = self.cycle_from(start, &mut state, &mut stack) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn cycle_from(
        &self,
        node: NodeIndex,
        state: &mut [Visit],
        stack: &mut Vec<NodeIndex>,
    ) -> Option<Vec<Utf8PathBuf>> {
        state[node.index()] = Visit::Active;
        stack.push(node);

        for (next, _) in self.children_of(node) {
            match state[next.index()] {
                Visit::Active => {
                    let start = stack.iter().position(|n| *n == next).unwrap_or(0);
                    // Remote nodes have no outgoing edges, so a cycle is all local
                    let cycle = stack[start..]
                        .iter()
                        .chain(std::iter::once(&next))
                        .filter_map(|n| self.graph[*n].path().map(Utf8Path::to_path_buf))
                        .collect();
                    return Some(cycle);
                },
                Visit::Unseen => {
                    if let Some(cycle) = self.cycle_from(next, state, stack) {
                        return Some(cycle);
                    }
                },
                Visit::Done => {},
            }
        }

        stack.pop();
        state[node.index()] = Visit::Done;
        None
    }

    /// Format cycle as "a -> b -> a"
    pub fn format_cycle(cycle: &[Utf8PathBuf]) -> String {
        cycle
            .iter()
            .map(|path| path.as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Check for cycles and return an `IncludeCycle` error if found
    pub fn validate_no_cycles(&self) -> ReqResult<()> {
        match self.find_cycle() {
            Some(cycle) => Err(ReqError::IncludeCycle {
                cycle: Self::format_cycle(&cycle),
            }),
            None => Ok(()),
        }
    }

    /// Local manifests reachable from the root, depth first in line order
    pub fn depth_first_order(&self) -> Vec<Utf8PathBuf> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        if let Some(root) = self.root {
            self.preorder(root, &mut seen, &mut order);
        }
        order
    }

    fn preorder(&self, node: NodeIndex, seen: &mut HashSet<NodeIndex>, order: &mut Vec<Utf8PathBuf>) {
        if !seen.insert(node) {
            return;
        }
        if let Some(path) = self.graph[node].path() {
            order.push(path.to_path_buf());
        }
        for (child, _) in self.children_of(node) {
            self.preorder(child, seen, order);
        }
    }

    /// ASCII tree of the includes below the root.
    ///
    /// Paths are shown relative to the root's directory. A manifest reached a
    /// second time is marked with `(*)` and not expanded again.
    pub fn render_tree(&self) -> String {
        let Some(root) = self.root else {
            return String::new();
        };

        let base = self.graph[root]
            .path()
            .and_then(Utf8Path::parent)
            .map(Utf8Path::to_path_buf)
            .unwrap_or_default();
        let mut out = format!("{}\n", self.display_path(root, &base));
        let mut expanded = HashSet::from([root]);
        self.render_children(root, &base, "", &mut expanded, &mut out);
        out
    }

    fn render_children(
        &self,
        node: NodeIndex,
        base: &Utf8Path,
        prefix: &str,
        expanded: &mut HashSet<NodeIndex>,
        out: &mut String,
    ) {
        let children = self.children_of(node);
        let count = children.len();
        for (i, (child, edge)) in children.into_iter().enumerate() {
            let last = i + 1 == count;
            let branch = if last { "└── " } else { "├── " };
            let first_visit = expanded.insert(child);

            out.push_str(prefix);
            out.push_str(branch);
            out.push_str(edge.kind.flag());
            out.push(' ');
            out.push_str(&self.display_path(child, base));
            if !first_visit {
                out.push_str(" (*)");
            }
            out.push('\n');

            if first_visit {
                let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
                self.render_children(child, base, &child_prefix, expanded, out);
            }
        }
    }

    fn display_path(&self, node: NodeIndex, base: &Utf8Path) -> String {
        let path = match &self.graph[node].target {
            IncludeTarget::Path(path) => path,
            IncludeTarget::Url(url) => return url.to_string(),
        };
        if base.as_str().is_empty() {
            return path.to_string();
        }
        path.strip_prefix(base)
            .map(|relative| relative.to_string())
            .unwrap_or_else(|_| path.to_string())
    }
}
