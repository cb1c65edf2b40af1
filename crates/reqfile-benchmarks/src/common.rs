//! Common utilities for benchmarks

use camino::Utf8PathBuf;
use criterion::Criterion;
use pprof::criterion::{Output, PProfProfiler};
use tempfile::TempDir;

/// Configure criterion with flamegraph profiling support
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(std::time::Duration::from_secs(3))
        .measurement_time(std::time::Duration::from_secs(10))
        .sample_size(100)
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
}

/// Manifest text with `count` declarations mixing pins, ranges, markers and comments
pub fn manifest_content(count: usize) -> String {
    let mut content = String::from("--index-url https://pypi.org/simple\n\n");
    for i in 0..count {
        match i % 5 {
            0 => content.push_str(&format!("package-{}=={}.{}.{}\n", i, i % 7, i % 11, i % 3)),
            1 => content.push_str(&format!("# group {}\npackage-{}>={}.0,<{}.0\n", i, i, i % 4, i % 4 + 2)),
            2 => content.push_str(&format!(
                "package-{}[extra]~={}.2 ; python_version < '3.{}'\n",
                i,
                i % 9 + 1,
                i % 12
            )),
            3 => content.push_str(&format!(
                "package-{}  # needed on {} only\n",
                i,
                if i % 2 == 0 { "linux" } else { "darwin" }
            )),
            _ => content.push_str(&format!(
                "package-{} !=1.{}.* ; sys_platform == 'win32' or extra == 'docs' \\\n    --hash=sha256:{:064x}\n",
                i, i, i
            )),
        }
    }
    content
}

/// Version strings in a spread of PEP 440 forms
pub fn version_strings(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| match i % 6 {
            0 => format!("{}.{}.{}", i % 10, i % 20, i % 30),
            1 => format!("{}.{}rc{}", i % 10, i % 20, i % 3),
            2 => format!("{}!{}.{}.post{}", i % 2, i % 10, i % 20, i % 4),
            3 => format!("{}.{}.dev{}", i % 10, i % 20, i % 5),
            4 => format!("v{}.{}-alpha.{}", i % 10, i % 20, i % 3),
            _ => format!("{}.{}+ubuntu.{}", i % 10, i % 20, i % 7),
        })
        .collect()
}

/// A tree of `files` manifests where each includes the next, on disk
pub fn manifest_chain(files: usize, declarations_per_file: usize) -> (TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().expect("create bench directory");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("UTF-8 temp path");

    for n in 0..files {
        let mut content = String::new();
        if n + 1 < files {
            content.push_str(&format!("-r level-{}.txt\n", n + 1));
        }
        content.push_str(&manifest_content(declarations_per_file).replace("package-", &format!("pkg{}-", n)));
        std::fs::write(root.join(format!("level-{}.txt", n)), content).expect("write manifest");
    }

    let path = root.join("level-0.txt");
    (dir, path)
}
