//! TTL expiry and storage quota enforcement
//!
//! Both passes are idempotent and tolerate files disappearing underneath
//! them, so the post-write sweep and the janitor may overlap freely.

use chrono::{TimeDelta, Utc};
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::store::{remove_if_present, RefStore};
use crate::types::SweepReport;

/// Limits applied by a retention sweep; values `<= 0` disable a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub ttl_hours: i64,
    pub max_bytes: i64,
}

impl RetentionPolicy {
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            ttl_hours: config.ttl_hours,
            max_bytes: config
                .max_storage_bytes()
                .map(|b| i64::try_from(b).unwrap_or(i64::MAX))
                .unwrap_or(0),
        }
    }

    /// TTL sweep followed by quota sweep
    pub async fn apply(&self, store: &RefStore) -> Result<SweepReport> {
        let expired = store.evict_expired(self.ttl_hours).await?;
        let evicted = store.enforce_quota(self.max_bytes).await?;
        Ok(expired.merge(evicted))
    }
}

impl RefStore {
    /// Delete files whose modification time is more than `ttl_hours` ago.
    pub async fn evict_expired(&self, ttl_hours: i64) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        if ttl_hours <= 0 {
            return Ok(report);
        }
        let Some(ttl) = TimeDelta::try_hours(ttl_hours) else {
            return Ok(report);
        };

        let now = Utc::now();
        for file in self.list().await? {
            if now - file.modified <= ttl {
                continue;
            }
            if remove_if_present(&self.path_for(&file.filename)).await? {
                debug!(filename = %file.filename, modified = %file.modified, "Expired reference");
                report.removed += 1;
                report.freed_bytes += file.size_bytes;
            }
        }

        Ok(report)
    }

    /// Delete least-recently-modified files until the directory fits in `max_bytes`.
    pub async fn enforce_quota(&self, max_bytes: i64) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        if max_bytes <= 0 {
            return Ok(report);
        }
        let max_bytes = max_bytes as u64;

        let mut files = self.list().await?;
        let mut total: u64 = files.iter().map(|f| f.size_bytes).sum();
        if total <= max_bytes {
            return Ok(report);
        }

        files.sort_by(|a, b| {
            a.modified
                .cmp(&b.modified)
                .then_with(|| a.filename.cmp(&b.filename))
        });

        for file in files {
            if total <= max_bytes {
                break;
            }
            // Gone either way, so it no longer counts toward the total
            if remove_if_present(&self.path_for(&file.filename)).await? {
                debug!(filename = %file.filename, size = file.size_bytes, "Evicted reference over quota");
                report.removed += 1;
                report.freed_bytes += file.size_bytes;
            }
            total = total.saturating_sub(file.size_bytes);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageKind;
    use std::path::Path;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    async fn store_in(dir: &Path) -> RefStore {
        let store = RefStore::new(&StoreConfig {
            dir: dir.to_path_buf(),
            ..StoreConfig::default()
        });
        store.init().await.unwrap();
        store
    }

    fn age(store: &RefStore, filename: &str, secs: u64) {
        std::fs::File::options()
            .write(true)
            .open(store.path_for(filename))
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(secs))
            .unwrap();
    }

    #[tokio::test]
    async fn test_ttl_removes_only_expired() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path()).await;

        let old = store.put(b"old", ImageKind::Png).await.unwrap();
        let fresh = store.put(b"fresh", ImageKind::Png).await.unwrap();
        age(&store, &old, 3 * 3600);
        age(&store, &fresh, 30 * 60);

        let report = store.evict_expired(2).await.unwrap();

        assert_eq!(report.removed, 1);
        assert_eq!(report.freed_bytes, 3);
        assert!(!store.exists(&old).await.unwrap());
        assert!(store.exists(&fresh).await.unwrap());
    }

    #[tokio::test]
    async fn test_ttl_disabled_when_non_positive() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path()).await;

        let old = store.put(b"ancient", ImageKind::Png).await.unwrap();
        age(&store, &old, 365 * 24 * 3600);

        assert_eq!(store.evict_expired(0).await.unwrap(), SweepReport::default());
        assert_eq!(store.evict_expired(-1).await.unwrap(), SweepReport::default());
        assert!(store.exists(&old).await.unwrap());
    }

    #[tokio::test]
    async fn test_quota_keeps_newest_subset() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path()).await;

        // Four 10-byte files, oldest first
        let mut names = Vec::new();
        for (i, secs) in [400u64, 300, 200, 100].into_iter().enumerate() {
            let data = format!("file-{:05}", i);
            let name = store.put(data.as_bytes(), ImageKind::Png).await.unwrap();
            age(&store, &name, secs);
            names.push(name);
        }

        let report = store.enforce_quota(25).await.unwrap();

        assert_eq!(report.removed, 2);
        assert_eq!(report.freed_bytes, 20);
        assert!(!store.exists(&names[0]).await.unwrap());
        assert!(!store.exists(&names[1]).await.unwrap());
        assert!(store.exists(&names[2]).await.unwrap());
        assert!(store.exists(&names[3]).await.unwrap());
        assert_eq!(store.total_size().await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_quota_noop_when_under_limit() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path()).await;

        store.put(b"0123456789", ImageKind::Png).await.unwrap();

        assert_eq!(store.enforce_quota(10).await.unwrap(), SweepReport::default());
        assert_eq!(store.enforce_quota(0).await.unwrap(), SweepReport::default());
        assert_eq!(store.stats().await.unwrap().entries, 1);
    }

    #[tokio::test]
    async fn test_quota_can_empty_directory() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path()).await;

        store.put(b"0123456789", ImageKind::Png).await.unwrap();
        store.put(b"abcdefghij", ImageKind::Jpeg).await.unwrap();

        let report = store.enforce_quota(5).await.unwrap();
        assert_eq!(report.removed, 2);
        assert_eq!(store.stats().await.unwrap().entries, 0);
    }

    #[tokio::test]
    async fn test_policy_apply_runs_both_passes() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path()).await;

        let expired = store.put(b"expired-file", ImageKind::Png).await.unwrap();
        let older = store.put(b"0123456789", ImageKind::Png).await.unwrap();
        let newer = store.put(b"abcdefghij", ImageKind::Png).await.unwrap();
        age(&store, &expired, 10 * 3600);
        age(&store, &older, 120);
        age(&store, &newer, 60);

        let policy = RetentionPolicy {
            ttl_hours: 1,
            max_bytes: 15,
        };
        let report = policy.apply(&store).await.unwrap();

        assert_eq!(report.removed, 2);
        assert!(!store.exists(&expired).await.unwrap());
        assert!(!store.exists(&older).await.unwrap());
        assert!(store.exists(&newer).await.unwrap());
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetentionPolicy::from_config(&StoreConfig::default());
        assert_eq!(policy.ttl_hours, 24);
        assert_eq!(policy.max_bytes, 500 * 1024 * 1024);

        let disabled = RetentionPolicy::from_config(&StoreConfig {
            max_storage_mb: 0,
            ..StoreConfig::default()
        });
        assert_eq!(disabled.max_bytes, 0);

        let huge = RetentionPolicy::from_config(&StoreConfig {
            max_storage_mb: i64::MAX,
            ..StoreConfig::default()
        });
        assert_eq!(huge.max_bytes, i64::MAX);
    }

    #[tokio::test]
    async fn test_ttl_keeps_future_mtime() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path()).await;

        let name = store.put(b"from the future", ImageKind::Png).await.unwrap();
        std::fs::File::options()
            .write(true)
            .open(store.path_for(&name))
            .unwrap()
            .set_modified(SystemTime::now() + Duration::from_secs(2 * 3600))
            .unwrap();

        assert_eq!(store.evict_expired(1).await.unwrap(), SweepReport::default());
        assert!(store.exists(&name).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_if_present_tolerates_missing() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path()).await;

        let name = store.put(b"once", ImageKind::Png).await.unwrap();
        let path = store.path_for(&name);

        assert!(remove_if_present(&path).await.unwrap());
        assert!(!remove_if_present(&path).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_overlapping_quota_sweeps() {
        let dir = tempdir().unwrap();
        let store = std::sync::Arc::new(store_in(dir.path()).await);

        // 200 five-byte files with distinct, increasing ages
        let mut names = Vec::new();
        for i in 0..200u64 {
            let data = format!("{:05}", i);
            let name = store.put(data.as_bytes(), ImageKind::Png).await.unwrap();
            age(&store, &name, 10_000 - i);
            names.push(name);
        }

        let sweeps: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.enforce_quota(50).await })
            })
            .collect();

        let mut removed = 0;
        for sweep in sweeps {
            removed += sweep.await.unwrap().unwrap().removed;
        }

        let total = store.total_size().await.unwrap();
        assert!(total <= 50);
        assert_eq!(removed as u64, (1000 - total) / 5);
        // Whatever survives is the newest files
        let kept = store.stats().await.unwrap().entries;
        for name in &names[200 - kept..] {
            assert!(store.exists(name).await.unwrap());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_overlapping_ttl_sweeps() {
        let dir = tempdir().unwrap();
        let store = std::sync::Arc::new(store_in(dir.path()).await);

        for i in 0..50u32 {
            let name = store
                .put(format!("stale-{}", i).as_bytes(), ImageKind::Png)
                .await
                .unwrap();
            age(&store, &name, 5 * 3600);
        }
        let fresh = store.put(b"fresh", ImageKind::Png).await.unwrap();

        let sweeps: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.evict_expired(1).await })
            })
            .collect();

        let mut removed = 0;
        for sweep in sweeps {
            removed += sweep.await.unwrap().unwrap().removed;
        }

        assert_eq!(removed, 50);
        assert_eq!(store.stats().await.unwrap().entries, 1);
        assert!(store.exists(&fresh).await.unwrap());
    }
}
