//! Content-addressed file storage
//!
//! Files are named `{hash}.{ext}` where `hash` is the first 16 hex chars of
//! the SHA-256 of the stored bytes. Writes go through a dot-prefixed temp
//! file and a rename so readers never observe partial content.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::normalize::{self, Normalized};
use crate::retention::RetentionPolicy;
use crate::types::{ImageKind, StoreStats, StoredImage, StoredRef};

/// Hex characters of the digest kept in filenames
const HASH_LEN: usize = 16;

const TEMP_SUFFIX: &str = ".tmp";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Reference image store rooted at a single flat directory
#[derive(Debug)]
pub struct RefStore {
    dir: PathBuf,
    max_side: u32,
    strict_decode: bool,
    policy: RetentionPolicy,
}

impl RefStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            max_side: config.max_side,
            strict_decode: config.strict_decode,
            policy: RetentionPolicy::from_config(config),
        }
    }

    /// Create the store directory and clear temp files left by an interrupted write
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;

        let mut stale = 0usize;
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if is_temp_name(name) && remove_if_present(&entry.path()).await? {
                stale += 1;
            }
        }

        info!(dir = ?self.dir, stale_temp_files = stale, "Reference store initialized");
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// First 16 hex chars of the SHA-256 of `data`
    pub fn content_hash(data: &[u8]) -> String {
        let digest = Sha256::digest(data);
        let mut hash = hex::encode(digest);
        hash.truncate(HASH_LEN);
        hash
    }

    pub fn filename_for(data: &[u8], kind: ImageKind) -> String {
        format!("{}.{}", Self::content_hash(data), kind.extension())
    }

    /// Whether `name` has the shape of a stored file (`{16 hex}.{known ext}`)
    pub fn is_valid_filename(name: &str) -> bool {
        let Some((hash, ext)) = name.split_once('.') else {
            return false;
        };
        hash.len() == HASH_LEN
            && hash
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
            && ImageKind::from_extension(ext).is_some()
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    pub async fn exists(&self, filename: &str) -> Result<bool> {
        Ok(fs::try_exists(self.path_for(filename)).await?)
    }

    /// Store `data` under its content hash and return the filename.
    ///
    /// An existing file with the same name is left untouched, including its
    /// modification time.
    pub async fn put(&self, data: &[u8], kind: ImageKind) -> Result<String> {
        let (filename, _) = self.write_if_absent(data, kind).await?;
        Ok(filename)
    }

    async fn write_if_absent(&self, data: &[u8], kind: ImageKind) -> Result<(String, bool)> {
        let filename = Self::filename_for(data, kind);
        let path = self.path_for(&filename);

        if fs::try_exists(&path).await? {
            debug!(filename = %filename, "Reference already stored");
            return Ok((filename, false));
        }

        let temp_path = self.dir.join(format!(
            ".{}.{}.{}{}",
            filename,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed),
            TEMP_SUFFIX
        ));

        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        // Concurrent writers of the same hash rename identical bytes
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!(filename = %filename, size = data.len(), "Stored reference");
        Ok((filename, true))
    }

    /// Normalize, store, then apply the retention policy.
    pub async fn ingest(&self, data: Vec<u8>, content_type: &str) -> Result<StoredRef> {
        let kind = ImageKind::from_content_type(content_type);
        let declared = content_type.to_string();
        let max_side = self.max_side;

        let (outcome, data) = tokio::task::spawn_blocking(move || {
            let outcome = normalize::inspect(&data, &declared, max_side);
            (outcome, data)
        })
        .await?;

        let data = match outcome {
            Normalized::Reencoded(resized) => resized,
            Normalized::Unchanged => data,
            Normalized::Undecodable if self.strict_decode => {
                return Err(StoreError::InvalidInput(
                    "reference image could not be decoded".to_string(),
                ));
            }
            Normalized::Undecodable => {
                debug!(content_type, size = data.len(), "Storing undecodable upload as-is");
                data
            }
        };

        let (filename, written) = self.write_if_absent(&data, kind).await?;

        match self.policy.apply(self).await {
            Ok(report) if report.removed > 0 => {
                info!(
                    removed = report.removed,
                    freed_bytes = report.freed_bytes,
                    "Retention sweep after store"
                );
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Retention sweep after store failed"),
        }

        Ok(StoredRef {
            content_hash: filename[..HASH_LEN].to_string(),
            filename,
            kind,
            size_bytes: data.len() as u64,
            deduplicated: !written,
        })
    }

    /// All stored files with their size and modification time.
    ///
    /// Files that vanish while listing are skipped.
    pub async fn list(&self) -> Result<Vec<StoredImage>> {
        let mut files = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with('.') {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            if !metadata.is_file() {
                continue;
            }

            files.push(StoredImage {
                filename: name.to_string(),
                size_bytes: metadata.len(),
                modified: DateTime::<Utc>::from(metadata.modified()?),
            });
        }

        Ok(files)
    }

    pub async fn total_size(&self) -> Result<u64> {
        Ok(self.list().await?.iter().map(|f| f.size_bytes).sum())
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        let files = self.list().await?;
        Ok(StoreStats {
            entries: files.len(),
            total_size: files.iter().map(|f| f.size_bytes).sum(),
        })
    }
}

fn is_temp_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(TEMP_SUFFIX)
}

/// Delete a file, treating "already gone" as success. Returns whether this
/// call removed it.
pub(crate) async fn remove_if_present(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
