//! Scratch directories laid out like a real cache.

use std::path::{Path, PathBuf};

use mapstack::interchange::archive::write_archive;
use mapstack::interchange::compressed::gzip;
use mapstack::project::LocalIntermediaries;
use tempfile::TempDir;

pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("tables")).unwrap();
        std::fs::create_dir_all(dir.path().join("sources")).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.cache_dir().join("mappings").join(version)
    }

    /// Publish the intermediary table of `version`.
    pub fn publish_intermediaries(&self, version: &str, table: &str) {
        std::fs::write(self.dir.path().join("tables").join(format!("{version}.tiny")), table)
            .unwrap();
    }

    pub fn intermediaries(&self) -> LocalIntermediaries {
        LocalIntermediaries::new(self.dir.path().join("tables"))
    }

    pub fn source(&self, name: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.dir.path().join("sources").join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn jar_source(&self, name: &str, table: &str) -> PathBuf {
        self.source(name, write_archive("mappings/mappings.tiny", table.as_bytes()).unwrap())
    }

    pub fn gz_source(&self, name: &str, table: &str) -> PathBuf {
        self.source(name, gzip(table.as_bytes()).unwrap())
    }

    /// Files in `dir` whose name marks them as unfinished writes.
    pub fn leftovers(&self, dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|e| e == "tmp"))
            .collect()
    }
}
