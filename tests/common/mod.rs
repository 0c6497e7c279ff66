#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use niche_analyzer::loader::{ReadOptions, SourcePaths};
use tempfile::{TempDir, tempdir};

pub const MARKET: &str = "market.tsv";
pub const QUERIES: &str = "queries.tsv";
pub const SALES_CR: &str = "ЦР_Продажи.tsv";
pub const SALES_MS: &str = "МС_Продажи.tsv";

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Paths of the bundled market, query and sales fixtures.
pub fn fixture_sources() -> SourcePaths {
    SourcePaths {
        market: fixture_path(MARKET),
        queries: fixture_path(QUERIES),
        sales: vec![fixture_path(SALES_CR), fixture_path(SALES_MS)],
    }
}

pub fn utf8_options() -> ReadOptions {
    ReadOptions::from_labels(None, None).expect("utf-8 options")
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Copies a bundled fixture into the workspace.
    pub fn copy_fixture(&self, name: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::copy(fixture_path(name), &path).expect("copy fixture");
        path
    }

    /// Joins `name` onto the workspace root without creating anything.
    pub fn file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }
}
