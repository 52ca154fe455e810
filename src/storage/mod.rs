//! Local byte store.
//!
//! Blobs live under `{base}/{id}/{name}`. Each record owns its own directory,
//! so removing a record's bytes is a single recursive delete. Files are
//! written owner-read/write only and become visible under their final name
//! only once fully written.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use streamdrop_common::{Error, Result, ShareId};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Permission bits for stored blobs.
#[cfg(unix)]
const BLOB_MODE: u32 = 0o600;

/// Filesystem-backed store addressed by `(id, name)`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    base_dir: PathBuf,
}

impl LocalStore {
    /// Open a store rooted at `base_dir`, creating the directory if needed.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Storage key for a blob, relative to the store root.
    ///
    /// Rejects IDs that are not share IDs and names that could escape the
    /// record's directory.
    pub fn key(id: &str, name: &str) -> Result<PathBuf> {
        check_id(id)?;
        check_name(name)?;
        Ok(Path::new(id).join(name))
    }

    /// Absolute path for a storage key.
    pub fn resolve(&self, key: &Path) -> Result<PathBuf> {
        let safe = !key.as_os_str().is_empty()
            && key.components().all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(Error::Validation(format!(
                "invalid storage key: {}",
                key.display()
            )));
        }
        Ok(self.base_dir.join(key))
    }

    /// Create the directory for `id`, failing with [`Error::Duplicate`] if it
    /// already exists. A registrar claims an ID before writing under it so a
    /// colliding ID can never overwrite another record's bytes.
    pub async fn claim(&self, id: &str) -> Result<()> {
        check_id(id)?;
        match fs::create_dir(self.base_dir.join(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(Error::Duplicate(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Write `bytes` as the blob for `(id, name)` and return its key.
    pub async fn write(&self, id: &str, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let key = Self::key(id, name)?;
        let (mut file, part) = self.create_part(&key).await?;
        file.write_all(bytes).await?;
        self.finish_part(file, &part, &key).await?;
        Ok(key)
    }

    /// Stream the file at `src` into the store. Returns the key and the
    /// number of bytes copied.
    pub async fn write_from_path(
        &self,
        id: &str,
        name: &str,
        src: &Path,
    ) -> Result<(PathBuf, u64)> {
        let key = Self::key(id, name)?;
        let mut input = File::open(src).await?;
        let (mut file, part) = self.create_part(&key).await?;
        let copied = tokio::io::copy(&mut input, &mut file).await?;
        self.finish_part(file, &part, &key).await?;
        Ok((key, copied))
    }

    async fn create_part(&self, key: &Path) -> Result<(File, PathBuf)> {
        let path = self.resolve(key)?;
        let dir = path.parent().ok_or_else(|| {
            Error::Internal(format!("storage key without parent: {}", key.display()))
        })?;
        fs::create_dir_all(dir).await?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let part = dir.join(format!(".{file_name}.part"));

        let mut opts = OpenOptions::new();
        opts.write(true).create(true).truncate(true);
        #[cfg(unix)]
        opts.mode(BLOB_MODE);
        let file = opts.open(&part).await?;
        Ok((file, part))
    }

    async fn finish_part(&self, mut file: File, part: &Path, key: &Path) -> Result<()> {
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(part, self.resolve(key)?).await?;
        Ok(())
    }

    /// Whether a blob exists for `(id, name)`.
    pub async fn exists(&self, id: &str, name: &str) -> bool {
        let Ok(key) = Self::key(id, name) else {
            return false;
        };
        match self.resolve(&key) {
            Ok(path) => fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Open the blob for `(id, name)`, returning the handle and its length.
    pub async fn open_for_read(&self, id: &str, name: &str) -> Result<(File, u64)> {
        let key = Self::key(id, name)?;
        self.open_key(&key).await
    }

    /// Open a blob by storage key, returning the handle and its length.
    ///
    /// The handle is seekable; callers position it before streaming.
    pub async fn open_key(&self, key: &Path) -> Result<(File, u64)> {
        let path = self.resolve(key)?;
        let file = match File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::not_found("blob", key.display()))
            }
            Err(e) => return Err(e.into()),
        };
        let len = file.metadata().await?.len();
        Ok((file, len))
    }

    /// Delete one blob. Deleting a missing blob succeeds.
    pub async fn delete(&self, id: &str, name: &str) -> Result<()> {
        let path = self.resolve(&Self::key(id, name)?)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete everything stored for `id`. Deleting a missing namespace
    /// succeeds.
    pub async fn delete_all(&self, id: &str) -> Result<()> {
        check_id(id)?;
        match fs::remove_dir_all(self.base_dir.join(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn check_id(id: &str) -> Result<()> {
    if ShareId::is_valid(id) {
        Ok(())
    } else {
        Err(Error::Validation(format!("invalid share id: {id:?}")))
    }
}

/// A blob name must be a single, ordinary path component.
pub fn check_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(Error::Validation(format!("invalid file name: {name:?}")));
    }
    Ok(())
}
