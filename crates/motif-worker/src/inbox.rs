//! Directory-backed job queue.
//!
//! Jobs are `*.json` files dropped into the inbox. The oldest is processed
//! first, then moved to `done/` (or `failed/` when it cannot be parsed).

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub struct Inbox {
    root: PathBuf,
}

impl Inbox {
    /// Open the inbox, creating it and its `done/` and `failed/` folders.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join("done"))?;
        std::fs::create_dir_all(root.join("failed"))?;
        Ok(Self { root })
    }

    fn jobs(&self) -> io::Result<Vec<(SystemTime, PathBuf)>> {
        let mut jobs = Vec::new();
        for entry in std::fs::read_dir(&self.root)?.flatten() {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            jobs.push((modified, path));
        }
        jobs.sort();
        Ok(jobs)
    }

    /// Oldest pending job (by modification time, then name).
    pub fn next_job(&self) -> io::Result<Option<PathBuf>> {
        Ok(self.jobs()?.into_iter().next().map(|(_, p)| p))
    }

    pub fn pending(&self) -> io::Result<usize> {
        Ok(self.jobs()?.len())
    }

    pub fn complete(&self, job: &Path) -> io::Result<PathBuf> {
        self.move_to(job, "done")
    }

    pub fn reject(&self, job: &Path) -> io::Result<PathBuf> {
        self.move_to(job, "failed")
    }

    fn move_to(&self, job: &Path, folder: &str) -> io::Result<PathBuf> {
        let file_name = job
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "job path has no file name"))?;
        let target = self.root.join(folder).join(file_name);
        std::fs::rename(job, &target)?;
        Ok(target)
    }
}
