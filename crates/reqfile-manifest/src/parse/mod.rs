//! Manifest grammar.
//!
//! Each logical line is either an option line (first token starts with `-`)
//! or a requirement optionally followed by per-requirement options such as
//! `--hash`. Parsing is pure: the same text and path always give the same
//! entries.

use camino::Utf8Path;
use reqfile_core::error::ReqError;
use reqfile_core::types::Requirement;
use reqfile_core::utils::{expand_env_vars, resolve_target};
use tracing::debug;

use crate::entry::{Declaration, Editable, Entry, GlobalOption, Include, IncludeKind, Manifest, OptionEntry};
use crate::lines::{logical_lines, LogicalLine};
use crate::ManifestResult;

/// Hash algorithms accepted by `--hash`
const HASH_ALGORITHMS: [&str; 3] = ["sha256", "sha384", "sha512"];

/// Parse manifest text, expanding `${VAR}` from the process environment
pub fn parse_manifest(content: &str, path: &Utf8Path) -> ManifestResult<Manifest> {
    parse_manifest_with(content, path, |name| std::env::var(name).ok())
}

/// Parse manifest text with a custom `${VAR}` lookup
pub fn parse_manifest_with<F>(content: &str, path: &Utf8Path, lookup: F) -> ManifestResult<Manifest>
where
    F: Fn(&str) -> Option<String>,
{
    let mut manifest = Manifest::new(path);
    let mut pending_comment: Option<String> = None;

    for line in logical_lines(content) {
        if line.is_blank() {
            pending_comment = None;
            continue;
        }
        if line.is_comment_only() {
            let text = line.comment.unwrap_or_default();
            pending_comment = Some(match pending_comment.take() {
                Some(previous) => format!("{} {}", previous, text),
                None => text,
            });
            continue;
        }

        let content = expand_env_vars(&line.content, &lookup);
        let mut parser = LineParser {
            path,
            line: &line,
            tokens: content.split_whitespace().collect(),
            pos: 0,
        };

        if content.starts_with('-') {
            manifest.entries.extend(parser.option_line()?);
            pending_comment = None;
        } else {
            let above = pending_comment.take();
            let comment = line.comment.clone().or(above);
            manifest.entries.push(parser.requirement_line(&content, comment)?);
        }
    }

    debug!(path = %path, entries = manifest.entries.len(), "parsed manifest");
    Ok(manifest)
}

struct LineParser<'a> {
    path: &'a Utf8Path,
    line: &'a LogicalLine,
    tokens: Vec<&'a str>,
    pos: usize,
}

impl<'a> LineParser<'a> {
    fn error(&self, message: impl Into<String>) -> ReqError {
        ReqError::parse(self.path.as_str(), self.line.number, message)
    }

    fn requirement_line(&mut self, content: &'a str, comment: Option<String>) -> ManifestResult<Entry> {
        // The requirement ends where the first option token begins
        let option_start = self.tokens.iter().position(|token| token.starts_with('-'));
        let requirement_text = match option_start {
            Some(idx) => {
                let offset = token_offset(content, &self.tokens, idx);
                self.pos = idx;
                &content[..offset]
            },
            None => {
                self.pos = self.tokens.len();
                content
            },
        };

        let requirement = Requirement::parse(requirement_text).map_err(|e| self.error(e.to_string()))?;

        let mut hashes = Vec::new();
        while let Some(token) = self.next() {
            let (flag, inline) = split_flag(token);
            match flag {
                "--hash" => {
                    let value = self.value(flag, inline)?;
                    hashes.push(self.validate_hash(value)?);
                },
                other => {
                    return Err(self.error(format!(
                        "unsupported per-requirement option '{}'",
                        other
                    )));
                },
            }
        }

        Ok(Entry::Requirement(Declaration {
            requirement,
            hashes,
            comment,
            source: self.path.to_path_buf(),
            line: self.line.number,
        }))
    }

    fn option_line(&mut self) -> ManifestResult<Vec<Entry>> {
        let mut entries = Vec::new();
        let number = self.line.number;

        while let Some(token) = self.next() {
            let (flag, inline) = split_short_flag(token);

            let global = |option: GlobalOption| Entry::Option(OptionEntry { option, line: number });

            let entry = match flag {
                "-r" | "--requirement" => self.include(IncludeKind::Requirements, flag, inline)?,
                "-c" | "--constraint" => self.include(IncludeKind::Constraints, flag, inline)?,
                "-e" | "--editable" => Entry::Editable(Editable {
                    target: self.value(flag, inline)?.to_string(),
                    line: number,
                }),
                "-i" | "--index-url" => global(GlobalOption::IndexUrl(self.value(flag, inline)?.to_string())),
                "--extra-index-url" => global(GlobalOption::ExtraIndexUrl(self.value(flag, inline)?.to_string())),
                "-f" | "--find-links" => global(GlobalOption::FindLinks(self.value(flag, inline)?.to_string())),
                "--trusted-host" => global(GlobalOption::TrustedHost(self.value(flag, inline)?.to_string())),
                "--only-binary" => global(GlobalOption::OnlyBinary(self.value(flag, inline)?.to_string())),
                "--no-binary" => global(GlobalOption::NoBinary(self.value(flag, inline)?.to_string())),
                "--no-index" => {
                    self.no_value(flag, inline)?;
                    global(GlobalOption::NoIndex)
                },
                "--pre" => {
                    self.no_value(flag, inline)?;
                    global(GlobalOption::Pre)
                },
                "--prefer-binary" => {
                    self.no_value(flag, inline)?;
                    global(GlobalOption::PreferBinary)
                },
                other if other.starts_with('-') => {
                    return Err(self.error(format!("unknown option '{}'", other)));
                },
                other => {
                    return Err(self.error(format!(
                        "unexpected '{}' after options; put requirements on their own line",
                        other
                    )));
                },
            };
            entries.push(entry);
        }

        Ok(entries)
    }

    fn include(&mut self, kind: IncludeKind, flag: &str, inline: Option<&'a str>) -> ManifestResult<Entry> {
        let raw = self.value(flag, inline)?;
        Ok(Entry::Include(Include {
            kind,
            raw: raw.to_string(),
            target: resolve_target(self.path, raw),
            line: self.line.number,
        }))
    }

    fn next(&mut self) -> Option<&'a str> {
        let token = self.tokens.get(self.pos).copied();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Option argument: inline (`--flag=value`, `-rvalue`) or the next token
    fn value(&mut self, flag: &str, inline: Option<&'a str>) -> ManifestResult<&'a str> {
        if let Some(value) = inline {
            if value.is_empty() {
                return Err(self.error(format!("option '{}' requires a value", flag)));
            }
            return Ok(value);
        }
        match self.next() {
            Some(value) if !value.starts_with('-') => Ok(value),
            _ => Err(self.error(format!("option '{}' requires a value", flag))),
        }
    }

    fn no_value(&self, flag: &str, inline: Option<&str>) -> ManifestResult<()> {
        match inline {
            Some(_) => Err(self.error(format!("option '{}' does not take a value", flag))),
            None => Ok(()),
        }
    }

    fn validate_hash(&self, value: &str) -> ManifestResult<String> {
        let (algorithm, digest) = value
            .split_once(':')
            .ok_or_else(|| self.error(format!("hash '{}' must look like 'sha256:<hex digest>'", value)))?;

        let algorithm = algorithm.to_ascii_lowercase();
        if !HASH_ALGORITHMS.contains(&algorithm.as_str()) {
            return Err(self.error(format!(
                "unsupported hash algorithm '{}', expected one of {}",
                algorithm,
                HASH_ALGORITHMS.join(", ")
            )));
        }
        if digest.is_empty() || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(self.error(format!("hash digest '{}' is not hexadecimal", digest)));
        }

        Ok(format!("{}:{}", algorithm, digest.to_ascii_lowercase()))
    }
}

/// Byte offset of token `idx` within `content`
fn token_offset(content: &str, tokens: &[&str], idx: usize) -> usize {
    // Tokens borrow from `content`, so pointer arithmetic gives the exact offset
    tokens[idx].as_ptr() as usize - content.as_ptr() as usize
}

/// Split `--flag=value`
fn split_flag(token: &str) -> (&str, Option<&str>) {
    match token.split_once('=') {
        Some((flag, value)) if flag.starts_with("--") => (flag, Some(value)),
        _ => (token, None),
    }
}

/// Like `split_flag`, but also splits attached short values (`-rbase.txt`)
fn split_short_flag(token: &str) -> (&str, Option<&str>) {
    if token.starts_with("--") {
        return split_flag(token);
    }
    if token.starts_with('-') && token.len() > 2 && token.is_char_boundary(2) {
        return (&token[..2], Some(&token[2..]));
    }
    (token, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqfile_core::utils::IncludeTarget;

    fn parse(content: &str) -> Manifest {
        parse_manifest_with(content, Utf8Path::new("requirements/optional.txt"), |_| None).unwrap()
    }

    fn parse_err(content: &str) -> String {
        parse_manifest_with(content, Utf8Path::new("requirements/optional.txt"), |_| None)
            .unwrap_err()
            .to_string()
    }

    #[test]
    fn test_pinned_declaration() {
        let manifest = parse("chardet==3.0.4");
        let decls: Vec<_> = manifest.declarations().collect();
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].name(), "chardet");
        assert_eq!(decls[0].requirement.constraint().as_deref(), Some("==3.0.4"));
        assert_eq!(decls[0].requirement.condition(), None);
        assert_eq!(decls[0].line, 1);
    }

    #[test]
    fn test_conditional_declaration() {
        let manifest = parse("backports.csv; python_version < '3.0'");
        let decl = manifest.declarations().next().unwrap();
        assert_eq!(decl.name(), "backports.csv");
        assert_eq!(decl.requirement.constraint(), None);
        assert_eq!(decl.requirement.condition(), Some("python_version < '3.0'"));
    }

    #[test]
    fn test_requirement_include_is_not_a_declaration() {
        let manifest = parse("-r required.txt");
        assert_eq!(manifest.declarations().count(), 0);

        let include = manifest.includes().next().unwrap();
        assert_eq!(include.kind, IncludeKind::Requirements);
        assert_eq!(include.raw, "required.txt");
        assert_eq!(include.target, IncludeTarget::Path("requirements/required.txt".into()));
    }

    #[test]
    fn test_include_spellings() {
        for line in ["-r base.txt", "-rbase.txt", "--requirement base.txt", "--requirement=base.txt"] {
            let manifest = parse(line);
            let include = manifest.includes().next().unwrap();
            assert_eq!(include.raw, "base.txt", "for line {:?}", line);
        }

        let manifest = parse("-c constraints.txt");
        assert_eq!(manifest.includes().next().unwrap().kind, IncludeKind::Constraints);
    }

    #[test]
    fn test_comments_attach_to_declarations() {
        let manifest = parse(
            "# Fuzzy matching\n# (faster than difflib)\npython-Levenshtein>=0.12\n\n# orphan\n\nlxml>=2.2.0  # XML\npycountry\n",
        );
        let decls: Vec<_> = manifest.declarations().collect();
        assert_eq!(decls[0].comment.as_deref(), Some("Fuzzy matching (faster than difflib)"));
        assert_eq!(decls[1].comment.as_deref(), Some("XML"));
        assert_eq!(decls[2].comment, None);
    }

    #[test]
    fn test_comment_block_only_reaches_next_line() {
        let manifest = parse("# Format support\nlxml>=2.2.0  # XML\npycountry\n");
        let decls: Vec<_> = manifest.declarations().collect();
        assert_eq!(decls[0].comment.as_deref(), Some("XML"));
        assert_eq!(decls[1].comment, None);
    }

    #[test]
    fn test_hashes() {
        let manifest = parse("lxml==4.9.3 --hash=sha256:ABCDEF01 --hash sha512:00ff");
        let decl = manifest.declarations().next().unwrap();
        assert_eq!(decl.hashes, vec!["sha256:abcdef01", "sha512:00ff"]);
        assert_eq!(decl.requirement.constraint().as_deref(), Some("==4.9.3"));

        assert!(parse_err("lxml --hash=md5:00").contains("unsupported hash algorithm"));
        assert!(parse_err("lxml --hash=sha256:xyz").contains("not hexadecimal"));
        assert!(parse_err("lxml --hash").contains("requires a value"));
    }

    #[test]
    fn test_global_options() {
        let manifest = parse(
            "--index-url https://pypi.example/simple\n--extra-index-url=https://mirror.example/simple\n--no-index --pre\n-f ./wheels\n--trusted-host pypi.example\n--only-binary :all:\n",
        );
        let options: Vec<_> = manifest.options().cloned().collect();
        assert_eq!(
            options,
            vec![
                GlobalOption::IndexUrl("https://pypi.example/simple".to_string()),
                GlobalOption::ExtraIndexUrl("https://mirror.example/simple".to_string()),
                GlobalOption::NoIndex,
                GlobalOption::Pre,
                GlobalOption::FindLinks("./wheels".to_string()),
                GlobalOption::TrustedHost("pypi.example".to_string()),
                GlobalOption::OnlyBinary(":all:".to_string()),
            ]
        );
    }

    #[test]
    fn test_editable() {
        let manifest = parse("-e git+https://example.com/repo.git#egg=demo");
        let editable = manifest.editables().next().unwrap();
        assert_eq!(editable.target, "git+https://example.com/repo.git#egg=demo");
    }

    #[test]
    fn test_env_var_expansion() {
        let manifest = parse_manifest_with(
            "-r ${BASE}.txt\nlxml>=${LXML_MIN}",
            Utf8Path::new("requirements.txt"),
            |name| match name {
                "BASE" => Some("required".to_string()),
                "LXML_MIN" => Some("2.2.0".to_string()),
                _ => None,
            },
        )
        .unwrap();
        assert_eq!(manifest.includes().next().unwrap().raw, "required.txt");
        assert_eq!(
            manifest.declarations().next().unwrap().requirement.constraint().as_deref(),
            Some(">=2.2.0")
        );
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let err = parse_err("lxml\n\n--frobnicate\n");
        assert_eq!(
            err,
            "Failed to parse requirements/optional.txt: unknown option '--frobnicate' at line 3"
        );

        assert!(parse_err("lxml>=").contains("at line 1"));
        assert!(parse_err("-r").contains("requires a value"));
        assert!(parse_err("--pre=yes").contains("does not take a value"));
        assert!(parse_err("--pre lxml").contains("own line"));
        assert!(parse_err("lxml --install-option=x").contains("unsupported per-requirement option"));
    }

    #[test]
    fn test_render() {
        let manifest = parse("chardet==3.0.4 # detection\n-r required.txt\n--pre\n");
        assert_eq!(manifest.render(), "chardet==3.0.4  # detection\n-r required.txt\n--pre\n");
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_line() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z][a-z0-9]{0,8}".prop_map(|name| name),
            ("[a-z][a-z0-9]{0,8}", 0u32..20, 0u32..20)
                .prop_map(|(name, major, minor)| format!("{}=={}.{}", name, major, minor)),
            ("[a-z][a-z0-9]{0,8}", 2u32..4)
                .prop_map(|(name, major)| format!("{}; python_version < '{}.0'", name, major)),
            "[a-z]{1,8}".prop_map(|file| format!("-r {}.txt", file)),
            "[a-zA-Z ]{0,20}".prop_map(|text| format!("# {}", text)),
            Just(String::new()),
        ]
    }

    proptest! {
        #[test]
        fn parsing_is_idempotent(lines in prop::collection::vec(arb_line(), 0..20)) {
            let content = lines.join("\n");
            let path = Utf8Path::new("requirements.txt");
            let first = parse_manifest_with(&content, path, |_| None).unwrap();
            let second = parse_manifest_with(&content, path, |_| None).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn every_declaration_has_a_name(lines in prop::collection::vec(arb_line(), 0..20)) {
            let content = lines.join("\n");
            let manifest = parse_manifest_with(&content, Utf8Path::new("requirements.txt"), |_| None).unwrap();
            for decl in manifest.declarations() {
                prop_assert!(!decl.name().is_empty());
            }
        }
    }
}
