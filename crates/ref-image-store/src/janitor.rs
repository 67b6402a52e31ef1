//! Periodic retention sweeps

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::store::RefStore;

/// Background task that re-applies the store's retention policy on a timer
pub struct Janitor;

impl Janitor {
    /// Spawn the sweep loop. It sweeps immediately, then every `interval`,
    /// until `cancel` fires.
    ///
    /// A failing or panicking sweep is logged and the loop carries on with
    /// the next tick.
    pub fn spawn(
        store: Arc<RefStore>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "Reference janitor started");

            loop {
                if cancel.is_cancelled() {
                    break;
                }

                let policy = store.policy();
                let sweep = AssertUnwindSafe(policy.apply(&store)).catch_unwind();
                match sweep.await {
                    Ok(Ok(report)) if report.removed > 0 => {
                        info!(
                            removed = report.removed,
                            freed_bytes = report.freed_bytes,
                            "Janitor sweep reclaimed space"
                        );
                    }
                    Ok(Ok(_)) => debug!("Janitor sweep found nothing to remove"),
                    Ok(Err(e)) => error!(error = %e, "Janitor sweep failed"),
                    Err(_) => error!("Janitor sweep panicked"),
                }

                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = cancel.cancelled() => break,
                }
            }

            info!("Reference janitor stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::types::ImageKind;
    use std::time::SystemTime;
    use tempfile::tempdir;

    fn make_stale(store: &RefStore, filename: &str) {
        std::fs::File::options()
            .write(true)
            .open(store.path_for(filename))
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(48 * 3600))
            .unwrap();
    }

    /// Poll until `filename` is removed, up to a generous deadline
    async fn wait_until_gone(store: &RefStore, filename: &str) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while tokio::time::Instant::now() < deadline {
            if !store.exists(filename).await.unwrap() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_janitor_sweeps_and_stops() {
        let dir = tempdir().unwrap();
        let store = Arc::new(RefStore::new(&StoreConfig {
            dir: dir.path().to_path_buf(),
            ttl_hours: 1,
            ..StoreConfig::default()
        }));
        store.init().await.unwrap();

        let old = store.put(b"stale", ImageKind::Png).await.unwrap();
        make_stale(&store, &old);

        let cancel = CancellationToken::new();
        let handle = Janitor::spawn(store.clone(), Duration::from_millis(20), cancel.clone());

        assert!(wait_until_gone(&store, &old).await);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("janitor did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_janitor_survives_failing_sweeps() {
        let dir = tempdir().unwrap();
        // Never created, so every sweep fails on read_dir
        let missing = dir.path().join("missing");
        let store = Arc::new(RefStore::new(&StoreConfig {
            dir: missing.clone(),
            ..StoreConfig::default()
        }));

        let cancel = CancellationToken::new();
        let handle = Janitor::spawn(store.clone(), Duration::from_millis(10), cancel.clone());

        tokio::task::yield_now().await;
        assert!(!handle.is_finished());

        // Once the directory appears a later tick succeeds
        store.init().await.unwrap();
        let fresh = store.put(b"fresh", ImageKind::Png).await.unwrap();
        let stale = store.put(b"stale", ImageKind::Png).await.unwrap();
        make_stale(&store, &stale);

        assert!(wait_until_gone(&store, &stale).await);
        assert!(store.exists(&fresh).await.unwrap());
        assert!(!handle.is_finished());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("janitor did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_janitor_exits_promptly_when_cancelled_during_sleep() {
        let dir = tempdir().unwrap();
        let store = Arc::new(RefStore::new(&StoreConfig {
            dir: dir.path().to_path_buf(),
            ..StoreConfig::default()
        }));
        store.init().await.unwrap();

        let cancel = CancellationToken::new();
        let handle = Janitor::spawn(store, Duration::from_secs(3600), cancel.clone());

        tokio::task::yield_now().await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("janitor did not stop")
            .unwrap();
    }
}
