use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tether_core::{Config, TetherWorkspace};

/// Manages an isolated workspace directory per scenario.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    /// Creates an initialized tether workspace in a temp directory.
    ///
    /// The sample charter written by `init` is removed so every scenario
    /// starts from an empty content tree and controls exactly which
    /// entities exist.
    pub fn new() -> Result<Self> {
        let dir = TempDir::new().context("Failed to create temp directory")?;
        TetherWorkspace::init(dir.path(), Config::default())?;
        fs::remove_file(dir.path().join("charter.md")).context("Failed to remove sample charter")?;
        Ok(Self { dir })
    }

    /// Workspace root path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Opens the workspace with a fixed clock so timestamps are stable.
    pub fn open(&self) -> Result<TetherWorkspace> {
        Ok(TetherWorkspace::open(self.path())?.with_time_provider(|| 1_700_000_000))
    }

    /// Writes a task document. The id becomes the file stem.
    pub fn write_task(&self, id: &str, body: &str) -> Result<PathBuf> {
        self.write_doc(&format!("tasks/{}.md", id.to_lowercase()), body)
    }

    /// Writes an epic document.
    pub fn write_epic(&self, id: &str, body: &str) -> Result<PathBuf> {
        self.write_doc(&format!("epics/{}.md", id.to_lowercase()), body)
    }

    /// Writes a markdown document at a path relative to the root.
    pub fn write_doc(&self, rel: &str, body: &str) -> Result<PathBuf> {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, body).with_context(|| format!("Failed to write {}", rel))?;
        Ok(path)
    }

    /// Reads a document back as a string.
    pub fn read_doc(&self, rel: &str) -> Result<String> {
        fs::read_to_string(self.path().join(rel)).with_context(|| format!("Failed to read {}", rel))
    }

    /// Removes a document, simulating a local delete.
    pub fn delete_doc(&self, rel: &str) -> Result<()> {
        fs::remove_file(self.path().join(rel)).with_context(|| format!("Failed to delete {}", rel))
    }
}
