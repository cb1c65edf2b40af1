//! PEP 440 version type.
//!
//! Parses the normalized and the permitted alternative spellings
//! (`1.0-alpha.1`, `v2.0`, `1.0-1`) into one canonical representation and
//! orders versions the way Python packaging tools do.

use crate::error::{ReqError, ReqResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// PEP 440 version (`[N!]N(.N)*[{a|b|rc}N][.postN][.devN][+local]`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub epoch: u64,
    pub release: Vec<u64>,
    pub pre: Option<PreRelease>,
    pub post: Option<u64>,
    pub dev: Option<u64>,
    pub local: Vec<LocalSegment>,
}

/// Pre-release marker (`a1`, `b2`, `rc3`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PreRelease {
    pub kind: PreReleaseKind,
    pub number: u64,
}

/// Pre-release phase, ordered alpha < beta < release candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreReleaseKind {
    Alpha,
    Beta,
    Rc,
}

/// One dot-separated piece of a local version label.
///
/// Variant order matters: alphanumeric segments sort before numeric ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LocalSegment {
    String(String),
    Number(u64),
}

impl Version {
    /// Create a final release from its numeric components
    pub fn new(release: impl Into<Vec<u64>>) -> Self {
        Self {
            epoch: 0,
            release: release.into(),
            pre: None,
            post: None,
            dev: None,
            local: Vec::new(),
        }
    }

    /// Parse a version string
    pub fn parse(input: &str) -> ReqResult<Self> {
        Parser::new(input).parse()
    }

    /// Builder helper: set the pre-release marker
    pub fn with_pre(mut self, kind: PreReleaseKind, number: u64) -> Self {
        self.pre = Some(PreRelease { kind, number });
        self
    }

    /// Builder helper: set the post-release number
    pub fn with_post(mut self, number: u64) -> Self {
        self.post = Some(number);
        self
    }

    /// Builder helper: set the dev-release number
    pub fn with_dev(mut self, number: u64) -> Self {
        self.dev = Some(number);
        self
    }

    /// A pre-release is any version with a pre or dev segment
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    pub fn is_postrelease(&self) -> bool {
        self.post.is_some()
    }

    pub fn is_local(&self) -> bool {
        !self.local.is_empty()
    }

    /// This version without its local label
    pub fn public(&self) -> Version {
        Version {
            local: Vec::new(),
            ..self.clone()
        }
    }

    /// Final release with the same epoch and release numbers
    pub fn base(&self) -> Version {
        Version {
            epoch: self.epoch,
            ..Version::new(self.release.clone())
        }
    }

    /// Release numbers without insignificant trailing zeros
    fn trimmed_release(&self) -> &[u64] {
        let len = self
            .release
            .iter()
            .rposition(|&n| n != 0)
            .map_or(0, |idx| idx + 1);
        &self.release[..len]
    }

    fn pre_key(&self) -> PreKey {
        match (self.pre, self.post, self.dev) {
            (None, None, Some(_)) => PreKey::DevOnly,
            (None, _, _) => PreKey::Final,
            (Some(pre), _, _) => PreKey::Pre(pre),
        }
    }

    fn dev_key(&self) -> DevKey {
        match self.dev {
            Some(n) => DevKey::Dev(n),
            None => DevKey::Released,
        }
    }

    fn local_key(&self) -> Option<&[LocalSegment]> {
        if self.local.is_empty() {
            None
        } else {
            Some(&self.local)
        }
    }
}

/// Sort key for the pre-release position of a version
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum PreKey {
    DevOnly,
    Pre(PreRelease),
    Final,
}

/// Sort key for the dev position of a version
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum DevKey {
    Dev(u64),
    Released,
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.epoch.hash(state);
        self.trimmed_release().hash(state);
        self.pre.hash(state);
        self.post.hash(state);
        self.dev.hash(state);
        self.local.hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| self.trimmed_release().cmp(other.trimmed_release()))
            .then_with(|| self.pre_key().cmp(&other.pre_key()))
            .then_with(|| self.post.cmp(&other.post))
            .then_with(|| self.dev_key().cmp(&other.dev_key()))
            .then_with(|| self.local_key().cmp(&other.local_key()))
    }
}

impl FromStr for Version {
    type Err = ReqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = ReqError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Version::parse(&value)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }

        let release: Vec<String> = self.release.iter().map(u64::to_string).collect();
        f.write_str(&release.join("."))?;

        if let Some(pre) = self.pre {
            write!(f, "{}{}", pre.kind, pre.number)?;
        }
        if let Some(post) = self.post {
            write!(f, ".post{}", post)?;
        }
        if let Some(dev) = self.dev {
            write!(f, ".dev{}", dev)?;
        }
        if !self.local.is_empty() {
            let local: Vec<String> = self.local.iter().map(LocalSegment::to_string).collect();
            write!(f, "+{}", local.join("."))?;
        }

        Ok(())
    }
}

impl fmt::Display for PreReleaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PreReleaseKind::Alpha => "a",
            PreReleaseKind::Beta => "b",
            PreReleaseKind::Rc => "rc",
        })
    }
}

impl fmt::Display for LocalSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalSegment::String(s) => f.write_str(s),
            LocalSegment::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Cursor over a lowercased version string
struct Parser<'a> {
    input: &'a str,
    text: String,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            text: input.trim().to_ascii_lowercase(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> ReqError {
        ReqError::InvalidVersion {
            input: self.input.to_string(),
            reason: reason.into(),
        }
    }

    fn rest(&self) -> &str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn eat(&mut self, prefix: &str) -> bool {
        if self.rest().starts_with(prefix) {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }

    fn eat_separator(&mut self) -> bool {
        match self.peek() {
            Some(b'.' | b'-' | b'_') => {
                self.pos += 1;
                true
            },
            _ => false,
        }
    }

    fn number(&mut self) -> ReqResult<Option<u64>> {
        let digits = self
            .rest()
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        if digits == 0 {
            return Ok(None);
        }
        let raw = &self.text[self.pos..self.pos + digits];
        let value = raw
            .parse()
            .map_err(|_| self.error(format!("number '{}' is too large", raw)))?;
        self.pos += digits;
        Ok(Some(value))
    }

    fn parse(mut self) -> ReqResult<Version> {
        if self.text.is_empty() {
            return Err(self.error("version is empty"));
        }

        self.eat("v");

        // Epoch is only present when the first number is followed by '!'
        let mut epoch = 0;
        let checkpoint = self.pos;
        if let Some(n) = self.number()? {
            if self.eat("!") {
                epoch = n;
            } else {
                self.pos = checkpoint;
            }
        }

        let release = self.release()?;
        let pre = self.pre()?;
        let post = self.post()?;
        let dev = self.dev()?;
        let local = self.local()?;

        if self.pos != self.text.len() {
            return Err(self.error(format!("unexpected trailing '{}'", self.rest())));
        }

        Ok(Version {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }

    fn release(&mut self) -> ReqResult<Vec<u64>> {
        let mut release = Vec::new();
        match self.number()? {
            Some(n) => release.push(n),
            None => return Err(self.error("release must start with a number")),
        }

        loop {
            let checkpoint = self.pos;
            if !self.eat(".") {
                break;
            }
            match self.number()? {
                Some(n) => release.push(n),
                None => {
                    self.pos = checkpoint;
                    break;
                },
            }
        }

        Ok(release)
    }

    fn pre(&mut self) -> ReqResult<Option<PreRelease>> {
        let checkpoint = self.pos;
        self.eat_separator();

        // Longer spellings first so "alpha" is not read as "a" + "lpha"
        let kind = if self.eat("alpha") || self.eat("a") {
            PreReleaseKind::Alpha
        } else if self.eat("beta") || self.eat("b") {
            PreReleaseKind::Beta
        } else if self.eat("preview") || self.eat("pre") || self.eat("rc") || self.eat("c") {
            PreReleaseKind::Rc
        } else {
            self.pos = checkpoint;
            return Ok(None);
        };

        let before_number = self.pos;
        self.eat_separator();
        let number = match self.number()? {
            Some(n) => n,
            None => {
                self.pos = before_number;
                0
            },
        };

        Ok(Some(PreRelease { kind, number }))
    }

    fn post(&mut self) -> ReqResult<Option<u64>> {
        let checkpoint = self.pos;

        // Implicit post release: "1.0-1"
        if self.eat("-") {
            if let Some(n) = self.number()? {
                return Ok(Some(n));
            }
            self.pos = checkpoint;
        }

        self.eat_separator();
        if self.eat("post") || self.eat("rev") || self.eat("r") {
            let before_number = self.pos;
            self.eat_separator();
            return match self.number()? {
                Some(n) => Ok(Some(n)),
                None => {
                    self.pos = before_number;
                    Ok(Some(0))
                },
            };
        }

        self.pos = checkpoint;
        Ok(None)
    }

    fn dev(&mut self) -> ReqResult<Option<u64>> {
        let checkpoint = self.pos;
        self.eat_separator();
        if !self.eat("dev") {
            self.pos = checkpoint;
            return Ok(None);
        }

        let before_number = self.pos;
        self.eat_separator();
        match self.number()? {
            Some(n) => Ok(Some(n)),
            None => {
                self.pos = before_number;
                Ok(Some(0))
            },
        }
    }

    fn local(&mut self) -> ReqResult<Vec<LocalSegment>> {
        if !self.eat("+") {
            return Ok(Vec::new());
        }

        let label = self.rest().to_string();
        self.pos = self.text.len();

        let mut segments = Vec::new();
        for part in label.split(['.', '-', '_']) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_alphanumeric()) {
                return Err(self.error(format!("invalid local version label '{}'", label)));
            }
            let segment = match part.parse::<u64>() {
                Ok(n) if part.bytes().all(|b| b.is_ascii_digit()) => LocalSegment::Number(n),
                _ => LocalSegment::String(part.to_string()),
            };
            segments.push(segment);
        }

        Ok(segments)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_version() -> impl Strategy<Value = Version> {
        (
            0u64..3,
            prop::collection::vec(0u64..20, 1..4),
            prop::option::of((0usize..3, 0u64..5)),
            prop::option::of(0u64..5),
            prop::option::of(0u64..5),
        )
            .prop_map(|(epoch, release, pre, post, dev)| Version {
                epoch,
                release,
                pre: pre.map(|(kind, number)| PreRelease {
                    kind: [PreReleaseKind::Alpha, PreReleaseKind::Beta, PreReleaseKind::Rc][kind],
                    number,
                }),
                post,
                dev,
                local: Vec::new(),
            })
    }

    proptest! {
        #[test]
        fn display_round_trips(version in arb_version()) {
            let parsed = Version::parse(&version.to_string()).unwrap();
            prop_assert_eq!(parsed.to_string(), version.to_string());
        }

        #[test]
        fn ordering_is_transitive(a in arb_version(), b in arb_version(), c in arb_version()) {
            if a < b && b < c {
                prop_assert!(a < c, "{} < {} < {} but not {} < {}", a, b, c, a, c);
            }
            if a > b && b > c {
                prop_assert!(a > c, "{} > {} > {} but not {} > {}", a, b, c, a, c);
            }
        }
    }
}
