//! Per-event handling: turn a creation event into one upload attempt.
//!
//! The handler never propagates an error. Every storage failure becomes an
//! [`UploadOutcome::Failed`] that the caller reports and then forgets.

use std::path::Path;

use tracing::{debug, error, info};

use crate::contract::{CreationEvent, ObjectStore, UploadOutcome, UploadTask};

/// Object key for a local file: its final path segment.
pub fn object_key(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Build the upload task for `event`, or `None` when there is nothing to upload.
pub fn upload_task(event: &CreationEvent, bucket: &str) -> Option<UploadTask> {
    if event.is_dir {
        debug!(path = %event.path.display(), "[HANDLER] Ignoring directory creation");
        return None;
    }
    let key = object_key(&event.path)?;
    Some(UploadTask {
        source: event.path.clone(),
        key,
        bucket: bucket.to_string(),
    })
}

/// Perform exactly one put call for `task`.
pub async fn upload<S>(store: &S, task: &UploadTask) -> UploadOutcome
where
    S: ObjectStore + ?Sized,
{
    info!(
        bucket = %task.bucket,
        key = %task.key,
        path = %task.source.display(),
        "[HANDLER] Uploading file"
    );
    match store.put_file(&task.bucket, &task.key, &task.source).await {
        Ok(()) => UploadOutcome::Uploaded {
            key: task.key.clone(),
        },
        Err(e) => UploadOutcome::Failed {
            key: task.key.clone(),
            reason: e.to_string(),
        },
    }
}

/// Write the console line for `outcome` and the matching trace event.
pub fn report(outcome: &UploadOutcome) {
    let line = console_line(outcome);
    println!("{line}");
    if outcome.is_uploaded() {
        info!(key = %outcome.key(), "[HANDLER] Upload succeeded");
    } else {
        error!(key = %outcome.key(), detail = %line, "[HANDLER] Upload failed");
    }
    match serde_json::to_string(outcome) {
        Ok(json) => debug!(json = %json, "[HANDLER] Upload outcome"),
        Err(e) => error!(error = ?e, "[HANDLER] Failed to serialize upload outcome"),
    }
}

/// The user-facing line printed for an outcome.
pub fn console_line(outcome: &UploadOutcome) -> String {
    match outcome {
        UploadOutcome::Uploaded { key } => format!("Uploaded immediately: {key}"),
        UploadOutcome::Failed { reason, .. } => format!("Upload failed: {reason}"),
    }
}

/// Handle one creation event end to end, without reporting.
///
/// Returns `None` when the event does not lead to an upload (directories).
pub async fn handle_event<S>(store: &S, bucket: &str, event: &CreationEvent) -> Option<UploadOutcome>
where
    S: ObjectStore + ?Sized,
{
    let task = upload_task(event, bucket)?;
    Some(upload(store, &task).await)
}
