use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};

/// Persisted, append-only set of listing links that have been evaluated.
pub trait SeenStore: Send {
    /// Reads every stored link, creating the store if it does not exist yet
    fn load(&mut self) -> Result<HashSet<String>>;

    /// Appends one cycle's batch of newly seen links
    fn append(&mut self, links: &[String]) -> Result<()>;
}

/// Newline-delimited list of links, one per line
pub struct FileSeenStore {
    cache_file: PathBuf,
}

impl FileSeenStore {
    pub fn new(cache_file: impl AsRef<Path>) -> Self {
        Self {
            cache_file: cache_file.as_ref().to_path_buf(),
        }
    }

    fn open_append(&self) -> Result<fs::File> {
        if let Some(parent) = self.cache_file.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.cache_file)
            .with_context(|| format!("Failed to open cache file {}", self.cache_file.display()))
    }
}

impl SeenStore for FileSeenStore {
    fn load(&mut self) -> Result<HashSet<String>> {
        // Creates the file on first run
        self.open_append()?;

        let content = fs::read_to_string(&self.cache_file)
            .with_context(|| format!("Failed to read cache file {}", self.cache_file.display()))?;

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn append(&mut self, links: &[String]) -> Result<()> {
        if links.is_empty() {
            return Ok(());
        }

        let mut file = self.open_append()?;
        let mut batch = String::new();
        for link in links {
            batch.push_str(link);
            batch.push('\n');
        }
        file.write_all(batch.as_bytes())
            .with_context(|| format!("Failed to append to cache file {}", self.cache_file.display()))?;

        Ok(())
    }
}
