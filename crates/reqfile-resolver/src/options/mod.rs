//! Merging installer options across manifests

use reqfile_manifest::GlobalOption;
use serde::Serialize;
use tracing::debug;

/// Installer options in effect for the whole resolution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_url: Option<String>,
    pub extra_index_urls: Vec<String>,
    pub find_links: Vec<String>,
    pub trusted_hosts: Vec<String>,
    pub only_binary: Vec<String>,
    pub no_binary: Vec<String>,
    pub no_index: bool,
    pub pre: bool,
    pub prefer_binary: bool,
}

impl ResolvedOptions {
    /// Fold one option into the set. The first index URL wins; list options
    /// keep their first occurrence; flags only switch on.
    pub fn apply(&mut self, option: &GlobalOption) {
        match option {
            GlobalOption::IndexUrl(url) => match &self.index_url {
                Some(existing) if existing != url => {
                    debug!(kept = %existing, ignored = %url, "ignoring later --index-url");
                },
                Some(_) => {},
                None => self.index_url = Some(url.clone()),
            },
            GlobalOption::ExtraIndexUrl(url) => push_unique(&mut self.extra_index_urls, url),
            GlobalOption::FindLinks(location) => push_unique(&mut self.find_links, location),
            GlobalOption::TrustedHost(host) => push_unique(&mut self.trusted_hosts, host),
            GlobalOption::OnlyBinary(packages) => push_list(&mut self.only_binary, packages),
            GlobalOption::NoBinary(packages) => push_list(&mut self.no_binary, packages),
            GlobalOption::NoIndex => self.no_index = true,
            GlobalOption::Pre => self.pre = true,
            GlobalOption::PreferBinary => self.prefer_binary = true,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Render back to manifest lines
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(url) = &self.index_url {
            lines.push(GlobalOption::IndexUrl(url.clone()).to_string());
        }
        if self.no_index {
            lines.push(GlobalOption::NoIndex.to_string());
        }
        lines.extend(self.extra_index_urls.iter().map(|u| GlobalOption::ExtraIndexUrl(u.clone()).to_string()));
        lines.extend(self.find_links.iter().map(|l| GlobalOption::FindLinks(l.clone()).to_string()));
        lines.extend(self.trusted_hosts.iter().map(|h| GlobalOption::TrustedHost(h.clone()).to_string()));
        if !self.only_binary.is_empty() {
            lines.push(GlobalOption::OnlyBinary(self.only_binary.join(",")).to_string());
        }
        if !self.no_binary.is_empty() {
            lines.push(GlobalOption::NoBinary(self.no_binary.join(",")).to_string());
        }
        if self.pre {
            lines.push(GlobalOption::Pre.to_string());
        }
        if self.prefer_binary {
            lines.push(GlobalOption::PreferBinary.to_string());
        }
        lines
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|existing| existing == value) {
        list.push(value.to_string());
    }
}

/// `--only-binary`/`--no-binary` take comma separated names
fn push_list(list: &mut Vec<String>, packages: &str) {
    for package in packages.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        push_unique(list, package);
    }
}
