//! Service loop: bucket initialization → watcher → upload worker → shutdown.
//!
//! [`UploadService`] owns the configuration and the storage client for the
//! lifetime of the process. The watcher pushes [`CreationEvent`]s onto an
//! unbounded channel; [`UploadService::run`] drains that channel, running at
//! most `upload.max_concurrent` uploads at once. With the default policy of 1,
//! uploads happen one at a time in the order the watcher reported them.
//!
//! # Error Handling
//! Startup failures (bucket, watcher) are returned to the caller and end the
//! process. Upload failures are reported per file and never stop the loop.

use std::future::Future;
use std::sync::Arc;

use futures::{future, StreamExt};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{error, info};

use crate::bucket::ensure_bucket;
use crate::config::ServiceConfig;
use crate::contract::{BucketInit, CreationEvent, ObjectStore, StorageError, UploadOutcome};
use crate::handler::{handle_event, report};
use crate::watcher::{DirWatcher, WatchError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("bucket initialization failed: {0}")]
    Bucket(#[from] StorageError),
    #[error(transparent)]
    Watch(#[from] WatchError),
}

pub struct UploadService<S> {
    config: ServiceConfig,
    store: Arc<S>,
}

impl<S> UploadService<S>
where
    S: ObjectStore + 'static,
{
    pub fn new(config: ServiceConfig, store: S) -> Self {
        Self {
            config,
            store: Arc::new(store),
        }
    }

    /// Check for the target bucket and create it if missing.
    pub async fn ensure_bucket(&self) -> Result<BucketInit, StorageError> {
        ensure_bucket(self.store.as_ref(), &self.config.bucket).await
    }

    /// Handle and report a single event.
    pub async fn process(&self, event: CreationEvent) -> Option<UploadOutcome> {
        let outcome = handle_event(self.store.as_ref(), &self.config.bucket, &event).await?;
        report(&outcome);
        Some(outcome)
    }

    /// Consume events until the channel closes.
    ///
    /// Each outcome is reported and dropped; only the number of attempted
    /// uploads is returned.
    pub async fn run(&self, mut events: UnboundedReceiver<CreationEvent>) -> usize {
        let limit = self.config.upload.max_concurrent.max(1);
        info!(max_concurrent = limit, "[SERVICE] Upload worker started");

        let attempted = futures::stream::poll_fn(|cx| events.poll_recv(cx))
            .map(move |event| self.process(event))
            .buffered(limit)
            .fold(0usize, |attempted, outcome| {
                future::ready(attempted + usize::from(outcome.is_some()))
            })
            .await;

        info!(attempted, "[SERVICE] Upload worker finished");
        attempted
    }
}

/// Run the whole program until `shutdown` resolves.
///
/// Startup order is fixed: bucket first, then the watcher. On shutdown the
/// watcher is stopped and the worker aborted; queued events and an upload in
/// flight are abandoned.
pub async fn serve<S, F>(service: UploadService<S>, shutdown: F) -> Result<(), ServiceError>
where
    S: ObjectStore + 'static,
    F: Future<Output = ()>,
{
    let service = Arc::new(service);

    match service.ensure_bucket().await? {
        BucketInit::Created => info!(bucket = %service.config.bucket, "[SERVICE] Created bucket"),
        BucketInit::AlreadyExists => {
            info!(bucket = %service.config.bucket, "[SERVICE] Using existing bucket")
        }
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let watcher = DirWatcher::start(&service.config.watch_dir, tx)?;

    let worker = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service.run(rx).await;
        })
    };

    shutdown.await;
    info!("[SERVICE] Shutdown requested");

    watcher.stop();
    worker.abort();
    if let Err(e) = worker.await {
        if e.is_panic() {
            error!(error = %e, "[SERVICE] Worker panicked");
        }
    }
    info!("[SERVICE] Worker stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StorageConfig, UploadPolicy};
    use crate::contract::MockObjectStore;
    use mockall::Sequence;
    use std::path::PathBuf;

    fn config(max_concurrent: usize) -> ServiceConfig {
        ServiceConfig {
            storage: StorageConfig {
                endpoint: "127.0.0.1:9000".into(),
                access_key: "minioadmin".into(),
                secret_key: "minioadmin".into(),
                secure: false,
                region: "us-east-1".into(),
            },
            bucket: "mybucket".into(),
            watch_dir: PathBuf::from("/watched"),
            upload: UploadPolicy { max_concurrent },
        }
    }

    #[tokio::test]
    async fn worker_uploads_each_file_event_once_in_order_and_skips_directories() {
        let mut seq = Sequence::new();
        let mut store = MockObjectStore::new();
        store
            .expect_put_file()
            .withf(|_, key, _| key == "a.txt")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        store
            .expect_put_file()
            .withf(|_, key, _| key == "b.txt")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));

        let service = UploadService::new(config(1), store);
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(CreationEvent::file("/watched/a.txt")).unwrap();
        tx.send(CreationEvent::dir("/watched/sub")).unwrap();
        tx.send(CreationEvent::file("/watched/b.txt")).unwrap();
        drop(tx);

        assert_eq!(service.run(rx).await, 2);
    }

    #[tokio::test]
    async fn same_name_created_twice_is_uploaded_twice() {
        let mut store = MockObjectStore::new();
        store.expect_put_file().times(2).returning(|_, _, _| Ok(()));

        let service = UploadService::new(config(1), store);
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(CreationEvent::file("/watched/a.txt")).unwrap();
        tx.send(CreationEvent::file("/watched/a.txt")).unwrap();
        drop(tx);

        assert_eq!(service.run(rx).await, 2);
    }

    #[tokio::test]
    async fn failure_does_not_stop_the_worker_and_is_not_retried() {
        let mut seq = Sequence::new();
        let mut store = MockObjectStore::new();
        store
            .expect_put_file()
            .withf(|_, key, _| key == "b.txt")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(StorageError::request("PutObject", "connection refused")));
        store
            .expect_put_file()
            .withf(|_, key, _| key == "c.txt")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));

        let service = UploadService::new(config(1), store);
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(CreationEvent::file("/watched/b.txt")).unwrap();
        tx.send(CreationEvent::file("/watched/c.txt")).unwrap();
        drop(tx);

        assert_eq!(service.run(rx).await, 2);
    }

    #[tokio::test]
    async fn concurrent_policy_still_attempts_every_file() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut store = MockObjectStore::new();
        let recorder = Arc::clone(&seen);
        store.expect_put_file().times(5).returning(move |_, key, _| {
            recorder.lock().unwrap().push(key.to_string());
            Ok(())
        });

        let service = UploadService::new(config(4), store);
        let (tx, rx) = mpsc::unbounded_channel();
        for i in 0..5 {
            tx.send(CreationEvent::file(format!("/watched/{i}.bin"))).unwrap();
        }
        drop(tx);

        assert_eq!(service.run(rx).await, 5);
        let mut keys = seen.lock().unwrap().clone();
        keys.sort();
        assert_eq!(keys, vec!["0.bin", "1.bin", "2.bin", "3.bin", "4.bin"]);
    }

    #[tokio::test]
    async fn long_running_worker_keeps_only_a_count() {
        let mut store = MockObjectStore::new();
        store.expect_put_file().times(10_000).returning(|_, _, _| Ok(()));

        let service = UploadService::new(config(8), store);
        let (tx, rx) = mpsc::unbounded_channel();
        for i in 0..10_000 {
            tx.send(CreationEvent::file(format!("/watched/{i}.log"))).unwrap();
        }
        drop(tx);

        let attempted: usize = service.run(rx).await;
        assert_eq!(attempted, 10_000);
    }

    #[tokio::test]
    async fn serve_fails_before_watching_when_bucket_check_fails() {
        let mut store = MockObjectStore::new();
        store
            .expect_bucket_exists()
            .returning(|_| Err(StorageError::request("HeadBucket", "connection refused")));
        store.expect_make_bucket().never();
        store.expect_put_file().never();

        let err = serve(UploadService::new(config(1), store), std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Bucket(_)), "{err}");
    }

    #[tokio::test]
    async fn serve_fails_when_watch_directory_is_missing() {
        let mut store = MockObjectStore::new();
        store.expect_bucket_exists().returning(|_| Ok(true));

        let mut cfg = config(1);
        cfg.watch_dir = PathBuf::from("/definitely/not/here/watch-upload");
        let err = serve(UploadService::new(cfg, store), std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Watch(_)), "{err}");
    }
}
