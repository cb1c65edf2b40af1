//! End-to-end tests for reading the optional-dependency manifest.

use camino::{Utf8Path, Utf8PathBuf};
use reqfile_core::types::MarkerEnvironment;
use reqfile_core::utils::IncludeTarget;
use reqfile_manifest::{load_from_file, parse_manifest_with, Entry, IncludeKind};

const OPTIONAL: &str = include_str!("fixtures/optional.txt");

fn fixture(name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn optional_manifest_entries() {
    let manifest = parse_manifest_with(OPTIONAL, Utf8Path::new("requirements/optional.txt"), |_| None).unwrap();

    assert!(matches!(manifest.entries[0], Entry::Include(ref include)
        if include.kind == IncludeKind::Requirements
            && include.target == IncludeTarget::Path("requirements/required.txt".into())));

    let names: Vec<_> = manifest.declarations().map(|d| d.name().to_string()).collect();
    assert_eq!(
        names,
        vec!["lxml", "python-Levenshtein", "chardet", "pycountry", "backports.csv"]
    );

    let comments: Vec<_> = manifest.declarations().map(|d| d.comment.clone()).collect();
    assert_eq!(comments[0].as_deref(), Some("XML-based formats (XLIFF, TMX, TBX)"));
    assert_eq!(comments[1].as_deref(), Some("Fuzzy matching"));
    assert_eq!(comments[4].as_deref(), Some("Python 2 compatibility"));
}

#[test]
fn legacy_shim_only_applies_to_python_two() {
    let manifest = parse_manifest_with(OPTIONAL, Utf8Path::new("optional.txt"), |_| None).unwrap();
    let shim = manifest
        .declarations()
        .find(|d| d.name() == "backports.csv")
        .unwrap();

    let mut env = MarkerEnvironment::default();
    assert!(!shim.requirement.applies_to(&env, &[]).unwrap());

    env.set_python_version("2.7.18").unwrap();
    assert!(shim.requirement.applies_to(&env, &[]).unwrap());
}

#[test]
fn reading_twice_is_identical() {
    let path = Utf8Path::new("optional.txt");
    let first = parse_manifest_with(OPTIONAL, path, |_| None).unwrap();
    let second = parse_manifest_with(OPTIONAL, path, |_| None).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn loads_fixture_from_disk() {
    let manifest = load_from_file(&fixture("optional.txt")).await.unwrap();
    assert_eq!(manifest.declarations().count(), 5);
    assert_eq!(
        manifest.includes().next().unwrap().target,
        IncludeTarget::Path(fixture("required.txt"))
    );
}

#[test]
fn entries_serialize_with_type_tags() {
    let manifest = parse_manifest_with("-r required.txt\nchardet==3.0.4\n--pre\n", Utf8Path::new("r.txt"), |_| None)
        .unwrap();
    let json = serde_json::to_value(&manifest.entries).unwrap();

    assert_eq!(json[0]["type"], "include");
    assert_eq!(json[0]["kind"], "requirements");
    assert_eq!(json[1]["type"], "requirement");
    assert_eq!(json[1]["requirement"]["name"], "chardet");
    assert_eq!(json[2]["type"], "option");
    assert_eq!(json[2]["option"]["option"], "pre");
}
