//! File-backed local cache: `<dir>/<session-id>.json`.
//!
//! Writes go to a temporary sibling first and are renamed into place, so
//! a crash mid-write leaves the previous document intact.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::model::SessionId;
use crate::{Error, Result};
use super::LocalCache;

const EXTENSION: &str = "json";

pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Open (and create if needed) a cache directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        tracing::debug!(dir = %dir.display(), "file cache opened");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session: &SessionId) -> Result<PathBuf> {
        if !session.is_path_safe() {
            return Err(Error::Storage(format!("session id {session:?} cannot be used as a file name")));
        }
        Ok(self.dir.join(format!("{}.{EXTENSION}", session.as_str())))
    }
}

impl LocalCache for FileCache {
    fn store(&self, session: &SessionId, document: &str) -> Result<()> {
        let path = self.path_for(session)?;
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(document.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn fetch(&self, session: &SessionId) -> Result<Option<String>> {
        let path = self.path_for(session)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, session: &SessionId) -> Result<bool> {
        let path = self.path_for(session)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn sessions(&self) -> Result<Vec<SessionId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(SessionId::from(stem));
            }
        }
        ids.sort();
        Ok(ids)
    }
}
