//! Version specifiers (`==3.0.4`, `>=2.0,<3`, `~=1.4.2`, `==1.*`).

use super::version::Version;
use crate::error::{ReqError, ReqResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a single specifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecifierOp {
    Equal,          // ==1.0
    EqualStar,      // ==1.0.*
    NotEqual,       // !=1.0
    NotEqualStar,   // !=1.0.*
    Less,           // <1.0
    LessEqual,      // <=1.0
    Greater,        // >1.0
    GreaterEqual,   // >=1.0
    Compatible,     // ~=1.0
    ArbitraryEqual, // ===1.0
}

/// One `op version` clause
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionSpecifier {
    op: SpecifierOp,
    literal: String,
    version: Option<Version>,
}

/// Comma-separated specifier set; a version matches when every clause matches
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionSpecifiers(Vec<VersionSpecifier>);

impl SpecifierOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecifierOp::Equal | SpecifierOp::EqualStar => "==",
            SpecifierOp::NotEqual | SpecifierOp::NotEqualStar => "!=",
            SpecifierOp::Less => "<",
            SpecifierOp::LessEqual => "<=",
            SpecifierOp::Greater => ">",
            SpecifierOp::GreaterEqual => ">=",
            SpecifierOp::Compatible => "~=",
            SpecifierOp::ArbitraryEqual => "===",
        }
    }

    /// Split a leading operator off `input`
    fn split(input: &str) -> Option<(SpecifierOp, &str)> {
        // Longest operators first
        const OPS: [(&str, SpecifierOp); 8] = [
            ("===", SpecifierOp::ArbitraryEqual),
            ("==", SpecifierOp::Equal),
            ("!=", SpecifierOp::NotEqual),
            ("<=", SpecifierOp::LessEqual),
            (">=", SpecifierOp::GreaterEqual),
            ("~=", SpecifierOp::Compatible),
            ("<", SpecifierOp::Less),
            (">", SpecifierOp::Greater),
        ];

        OPS.iter()
            .find_map(|(token, op)| input.strip_prefix(token).map(|rest| (*op, rest)))
    }
}

impl VersionSpecifier {
    /// Parse a single clause such as `>= 2.0`
    pub fn parse(input: &str) -> ReqResult<Self> {
        let trimmed = input.trim();
        let invalid = |reason: &str| ReqError::InvalidSpecifier {
            input: trimmed.to_string(),
            reason: reason.to_string(),
        };

        let (mut op, rest) =
            SpecifierOp::split(trimmed).ok_or_else(|| invalid("missing comparison operator"))?;
        let literal = rest.trim();
        if literal.is_empty() {
            return Err(invalid("missing version"));
        }

        if op == SpecifierOp::ArbitraryEqual {
            return Ok(Self {
                op,
                literal: literal.to_string(),
                version: Version::parse(literal).ok(),
            });
        }

        let version_text = match literal.strip_suffix(".*") {
            Some(prefix) => {
                op = match op {
                    SpecifierOp::Equal => SpecifierOp::EqualStar,
                    SpecifierOp::NotEqual => SpecifierOp::NotEqualStar,
                    _ => return Err(invalid("'.*' is only allowed with == and !=")),
                };
                prefix
            },
            None => literal,
        };

        let version = Version::parse(version_text).map_err(|e| match e {
            ReqError::InvalidVersion { reason, .. } => invalid(&reason),
            other => other,
        })?;

        match op {
            SpecifierOp::EqualStar | SpecifierOp::NotEqualStar
                if version.is_prerelease() || version.is_postrelease() || version.is_local() =>
            {
                return Err(invalid("a '.*' prefix may only contain release numbers"));
            },
            SpecifierOp::Compatible if version.release.len() < 2 => {
                return Err(invalid("'~=' needs at least two release numbers"));
            },
            SpecifierOp::Less
            | SpecifierOp::LessEqual
            | SpecifierOp::Greater
            | SpecifierOp::GreaterEqual
            | SpecifierOp::Compatible
                if version.is_local() =>
            {
                return Err(invalid("local versions are only allowed with == and !="));
            },
            _ => {},
        }

        Ok(Self {
            op,
            literal: literal.to_string(),
            version: Some(version),
        })
    }

    pub fn op(&self) -> SpecifierOp {
        self.op
    }

    /// Parsed version; `None` only for `===` clauses with a non-PEP 440 literal
    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    /// Check whether `candidate` satisfies this clause
    pub fn contains(&self, candidate: &Version) -> bool {
        let Some(spec) = &self.version else {
            return candidate.to_string().eq_ignore_ascii_case(&self.literal);
        };

        match self.op {
            SpecifierOp::Equal => {
                if spec.is_local() {
                    candidate == spec
                } else {
                    &candidate.public() == spec
                }
            },
            SpecifierOp::NotEqual => {
                if spec.is_local() {
                    candidate != spec
                } else {
                    &candidate.public() != spec
                }
            },
            SpecifierOp::EqualStar => matches_prefix(candidate, spec.epoch, &spec.release),
            SpecifierOp::NotEqualStar => !matches_prefix(candidate, spec.epoch, &spec.release),
            SpecifierOp::LessEqual => &candidate.public() <= spec,
            SpecifierOp::GreaterEqual => &candidate.public() >= spec,
            SpecifierOp::Less => {
                if candidate >= spec {
                    return false;
                }
                // <1.0 must not admit 1.0rc1
                !(!spec.is_prerelease() && candidate.is_prerelease() && candidate.base() == spec.base())
            },
            SpecifierOp::Greater => {
                if candidate.public() <= *spec {
                    return false;
                }
                // >1.0 must not admit 1.0.post1 or 1.0+local
                if candidate.base() == spec.base() {
                    if !spec.is_postrelease() && candidate.is_postrelease() {
                        return false;
                    }
                    if candidate.is_local() {
                        return false;
                    }
                }
                true
            },
            SpecifierOp::Compatible => {
                let prefix = &spec.release[..spec.release.len() - 1];
                &candidate.public() >= spec && matches_prefix(candidate, spec.epoch, prefix)
            },
            SpecifierOp::ArbitraryEqual => candidate.to_string().eq_ignore_ascii_case(&self.literal),
        }
    }

    /// Exact pin (`==V` or `===V`), if this clause is one
    pub fn pinned(&self) -> Option<&Version> {
        match self.op {
            SpecifierOp::Equal | SpecifierOp::ArbitraryEqual => self.version.as_ref(),
            _ => None,
        }
    }
}

/// Release-prefix match used by `==X.*` and `~=`; the candidate is zero padded
fn matches_prefix(candidate: &Version, epoch: u64, prefix: &[u64]) -> bool {
    if candidate.epoch != epoch {
        return false;
    }
    prefix
        .iter()
        .enumerate()
        .all(|(idx, n)| candidate.release.get(idx).copied().unwrap_or(0) == *n)
}

impl VersionSpecifiers {
    /// Parse a comma-separated list; an empty string means "any version"
    pub fn parse(input: &str) -> ReqResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }

        trimmed
            .split(',')
            .map(VersionSpecifier::parse)
            .collect::<ReqResult<Vec<_>>>()
            .map(Self)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VersionSpecifier> {
        self.0.iter()
    }

    /// Check whether `version` satisfies every clause
    pub fn contains(&self, version: &Version) -> bool {
        self.0.iter().all(|spec| spec.contains(version))
    }

    /// Exact pin of the set, if any clause is one
    pub fn pinned(&self) -> Option<&Version> {
        self.0.iter().find_map(VersionSpecifier::pinned)
    }

    /// Append the clauses of `other`
    pub fn extend(&mut self, other: &VersionSpecifiers) {
        for spec in &other.0 {
            if !self.0.contains(spec) {
                self.0.push(spec.clone());
            }
        }
    }
}

impl FromStr for VersionSpecifier {
    type Err = ReqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl FromStr for VersionSpecifiers {
    type Err = ReqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionSpecifier {
    type Error = ReqError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<String> for VersionSpecifiers {
    type Error = ReqError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VersionSpecifier> for String {
    fn from(spec: VersionSpecifier) -> Self {
        spec.to_string()
    }
}

impl From<VersionSpecifiers> for String {
    fn from(specs: VersionSpecifiers) -> Self {
        specs.to_string()
    }
}

impl fmt::Display for VersionSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.as_str(), self.literal)
    }
}

impl fmt::Display for VersionSpecifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(","))
    }
}
