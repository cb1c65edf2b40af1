//! Conflict detection between declarations of the same package

use indexmap::IndexMap;
use reqfile_core::error::ReqError;
use reqfile_core::types::Version;
use reqfile_manifest::Declaration;
use serde::Serialize;
use std::fmt;

/// Two declarations that cannot both hold
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    /// Normalized package name
    pub package: String,
    /// Requirement text of the earlier declaration
    pub first: String,
    pub first_origin: String,
    pub second: String,
    pub second_origin: String,
}

impl Conflict {
    fn between(package: &str, first: &Declaration, second: &Declaration) -> Self {
        Self {
            package: package.to_string(),
            first: first.requirement.to_string(),
            first_origin: first.origin(),
            second: second.requirement.to_string(),
            second_origin: second.origin(),
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({}) conflicts with {} ({})",
            self.package, self.first, self.first_origin, self.second, self.second_origin
        )
    }
}

impl From<Conflict> for ReqError {
    fn from(conflict: Conflict) -> Self {
        ReqError::Conflict {
            package: conflict.package,
            first: conflict.first,
            first_origin: conflict.first_origin,
            second: conflict.second,
            second_origin: conflict.second_origin,
        }
    }
}

/// Detect conflicts among included declarations and the constraints on them.
///
/// Declarations are grouped by normalized name. Within a group:
/// - two exact pins (`==`/`===`) naming different versions conflict;
/// - a pin outside another declaration's specifier set conflicts;
/// - two different direct URLs conflict.
///
/// Constraints only take part for packages that are also included.
pub fn detect_conflicts(included: &[Declaration], constraints: &[Declaration]) -> Vec<Conflict> {
    let mut groups: IndexMap<&str, Vec<&Declaration>> = IndexMap::new();
    for decl in included {
        groups
            .entry(decl.requirement.name.normalized())
            .or_default()
            .push(decl);
    }
    for decl in constraints {
        if let Some(group) = groups.get_mut(decl.requirement.name.normalized()) {
            group.push(decl);
        }
    }

    let mut conflicts = Vec::new();
    for (package, decls) in &groups {
        for (i, first) in decls.iter().enumerate() {
            for second in &decls[i + 1..] {
                if clash(first, second) {
                    conflicts.push(Conflict::between(package, first, second));
                }
            }
        }
    }
    conflicts
}

fn pin(decl: &Declaration) -> Option<&Version> {
    decl.requirement.specifiers().and_then(|specs| specs.pinned())
}

fn clash(first: &Declaration, second: &Declaration) -> bool {
    if let (Some(a), Some(b)) = (first.requirement.url(), second.requirement.url()) {
        return a != b;
    }

    match (pin(first), pin(second)) {
        (Some(a), Some(b)) if a != b => true,
        (Some(version), _) => violates(version, second),
        (_, Some(version)) => violates(version, first),
        (None, None) => false,
    }
}

fn violates(version: &Version, decl: &Declaration) -> bool {
    decl.requirement
        .specifiers()
        .map_or(false, |specs| !specs.contains(version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use reqfile_core::types::Requirement;

    fn decl(text: &str, source: &str, line: usize) -> Declaration {
        Declaration {
            requirement: Requirement::parse(text).unwrap(),
            hashes: Vec::new(),
            comment: None,
            source: Utf8PathBuf::from(source),
            line,
        }
    }

    #[test]
    fn test_no_conflicts() {
        let included = vec![
            decl("chardet==3.0.4", "optional.txt", 1),
            decl("chardet>=3.0", "required.txt", 4),
            decl("lxml>=2.2.0", "optional.txt", 2),
            decl("lxml<6", "required.txt", 5),
        ];
        assert!(detect_conflicts(&included, &[]).is_empty());
    }

    #[test]
    fn test_different_pins_conflict() {
        let included = vec![
            decl("chardet==3.0.4", "optional.txt", 1),
            decl("Chardet==4.0.0", "required.txt", 3),
        ];

        let conflicts = detect_conflicts(&included, &[]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].package, "chardet");
        assert_eq!(conflicts[0].first, "chardet==3.0.4");
        assert_eq!(conflicts[0].first_origin, "optional.txt:1");
        assert_eq!(conflicts[0].second_origin, "required.txt:3");
    }

    #[test]
    fn test_equivalent_pins_agree() {
        let included = vec![
            decl("six==1.16", "a.txt", 1),
            decl("six==1.16.0", "b.txt", 1),
        ];
        assert!(detect_conflicts(&included, &[]).is_empty());
    }

    #[test]
    fn test_pin_outside_range() {
        let included = vec![
            decl("pycountry>=18.12.8", "optional.txt", 6),
            decl("pycountry==17.5.14", "legacy.txt", 2),
        ];

        let conflicts = detect_conflicts(&included, &[]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].first, "pycountry>=18.12.8");
        assert_eq!(conflicts[0].second, "pycountry==17.5.14");
    }

    #[test]
    fn test_constraints_only_apply_to_included() {
        let included = vec![decl("lxml==4.9.3", "optional.txt", 1)];
        let constraints = vec![
            decl("lxml<4", "constraints.txt", 1),
            decl("numpy==1.0", "constraints.txt", 2),
            decl("numpy==2.0", "constraints-2.txt", 1),
        ];

        let conflicts = detect_conflicts(&included, &constraints);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].package, "lxml");
        assert_eq!(conflicts[0].second_origin, "constraints.txt:1");
    }

    #[test]
    fn test_url_conflicts() {
        let included = vec![
            decl("pip @ https://example.com/pip-1.zip", "a.txt", 1),
            decl("pip @ https://example.com/pip-2.zip", "b.txt", 1),
            decl("wheel @ https://example.com/wheel.zip", "a.txt", 2),
            decl("wheel @ https://example.com/wheel.zip", "b.txt", 2),
        ];

        let conflicts = detect_conflicts(&included, &[]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].package, "pip");
    }

    #[test]
    fn test_conflict_into_error() {
        let conflict = detect_conflicts(
            &[decl("six==1.0", "a.txt", 1), decl("six==2.0", "b.txt", 1)],
            &[],
        )
        .remove(0);
        let err: ReqError = conflict.into();
        assert!(err.to_string().contains("'six'"));
        assert!(err.suggestion().is_some());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_declaration() -> impl Strategy<Value = Declaration> {
            (0usize..3, 0usize..4, 0u64..4, 1usize..50).prop_map(|(name, op, major, line)| {
                let name = ["six", "lxml", "chardet"][name];
                let op = ["==", ">=", "<", "!="][op];
                decl(&format!("{}{}{}.0", name, op, major), "generated.txt", line)
            })
        }

        fn packages(conflicts: &[Conflict]) -> Vec<String> {
            let mut packages: Vec<String> = conflicts.iter().map(|c| c.package.clone()).collect();
            packages.sort();
            packages
        }

        proptest! {
            #[test]
            fn conflicts_do_not_depend_on_order(decls in prop::collection::vec(arb_declaration(), 0..8)) {
                let mut reversed = decls.clone();
                reversed.reverse();

                prop_assert_eq!(
                    packages(&detect_conflicts(&decls, &[])),
                    packages(&detect_conflicts(&reversed, &[]))
                );
            }
        }
    }
}
