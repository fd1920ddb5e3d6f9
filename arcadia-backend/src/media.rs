use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("file already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid media path: {0}")]
    InvalidPath(String),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Which upload directory a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Game,
    Cover,
}

impl MediaKind {
    pub fn dir(self) -> &'static str {
        match self {
            MediaKind::Game => "games",
            MediaKind::Cover => "images",
        }
    }
}

/// Uploaded files under a static root, addressed by paths relative to it
/// (`games/<name>`, `images/<name>`) exactly as they are stored on game records.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, kind: MediaKind) -> PathBuf {
        self.root.join(kind.dir())
    }

    /// Create `games/` and `images/` under the root.
    pub async fn ensure_dirs(&self) -> Result<(), MediaError> {
        for kind in [MediaKind::Game, MediaKind::Cover] {
            let dir = self.dir(kind);
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|source| io_error(&dir, source))?;
        }
        Ok(())
    }

    /// Write a new file and return its relative path. Never overwrites.
    pub async fn save(
        &self,
        kind: MediaKind,
        file_name: &str,
        contents: &[u8],
    ) -> Result<String, MediaError> {
        let relative = format!("{}/{file_name}", kind.dir());
        let path = self.resolve(&relative)?;
        let dir = self.dir(kind);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| io_error(&dir, source))?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|source| match source.kind() {
                ErrorKind::AlreadyExists => MediaError::AlreadyExists(relative.clone()),
                _ => io_error(&path, source),
            })?;
        let written = match file.write_all(contents).await {
            Ok(()) => file.flush().await,
            Err(err) => Err(err),
        };
        if let Err(source) = written {
            drop(file);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(io_error(&path, source));
        }

        debug!(path = %relative, bytes = contents.len(), "stored upload");
        Ok(relative)
    }

    pub async fn exists(&self, relative: &str) -> bool {
        match self.resolve(relative) {
            Ok(path) => tokio::fs::try_exists(&path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Best-effort delete. Failures are logged, a file that is already gone is fine.
    pub async fn remove(&self, relative: &str) {
        let path = match self.resolve(relative) {
            Ok(path) => path,
            Err(err) => {
                warn!(error = %err, "refusing to remove file");
                return;
            }
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(path = relative, "removed upload"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(path = relative, error = %err, "failed to remove upload"),
        }
    }

    /// Map a stored relative path onto the root, refusing anything that could escape it.
    fn resolve(&self, relative: &str) -> Result<PathBuf, MediaError> {
        let path = Path::new(relative);
        let plain = !relative.is_empty()
            && path
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if plain {
            Ok(self.root.join(path))
        } else {
            Err(MediaError::InvalidPath(relative.to_string()))
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> MediaError {
    MediaError::Io {
        path: path.display().to_string(),
        source,
    }
}
