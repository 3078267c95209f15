use crate::utils::validation::{is_plain_file_name, sanitize_filename};
use chrono::Utc;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, warn};

/// Flat directory holding uploaded files under `<ms-timestamp>-<name>`.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the staging directory (and parents) if it does not exist yet.
    pub async fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await
    }

    /// Path of `name` inside the staging directory, or `None` if `name`
    /// would escape it.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        is_plain_file_name(name).then(|| self.dir.join(name))
    }

    /// Write `reader` to a freshly named file. The returned guard removes the
    /// file when dropped unless [`StagedFile::persist`] is called.
    pub async fn stage<R>(&self, original_name: &str, mut reader: R) -> io::Result<StagedFile>
    where
        R: AsyncRead + Unpin + Send,
    {
        let safe_name = sanitize_filename(original_name);
        let mut timestamp = Utc::now().timestamp_millis();

        // Same name within the same millisecond: move to the next free stamp
        let (name, path, mut file) = loop {
            let name = format!("{}-{}", timestamp, safe_name);
            let path = self.dir.join(&name);
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => break (name, path, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => timestamp += 1,
                Err(e) => return Err(e),
            }
        };

        let mut staged = StagedFile {
            name,
            path,
            size: 0,
            keep: false,
        };

        staged.size = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;

        debug!("Staged {} ({} bytes)", staged.path.display(), staged.size);
        Ok(staged)
    }

    /// Remove a staged file by name.
    pub async fn remove(&self, name: &str) -> io::Result<()> {
        let path = self
            .resolve(name)
            .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "invalid file name"))?;
        fs::remove_file(path).await
    }
}

/// A file written into the staging area. Removed from disk on drop.
#[derive(Debug)]
pub struct StagedFile {
    name: String,
    path: PathBuf,
    size: u64,
    keep: bool,
}

impl StagedFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Keep the file on disk and hand back its generated name.
    pub fn persist(mut self) -> String {
        self.keep = true;
        std::mem::take(&mut self.name)
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        // Drop cannot await; a single unlink is cheap enough to block on
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Cleaned up staged file {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Error cleaning up staged file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
