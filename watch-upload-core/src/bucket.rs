//! Bucket initialization, run once before watching begins.

use tracing::{error, info};

use crate::contract::{BucketInit, ObjectStore, StorageError};

/// Make sure `bucket` exists, creating it when it does not.
///
/// Errors are returned as-is: callers treat them as fatal for startup.
pub async fn ensure_bucket<S>(store: &S, bucket: &str) -> Result<BucketInit, StorageError>
where
    S: ObjectStore + ?Sized,
{
    let exists = store.bucket_exists(bucket).await.map_err(|e| {
        error!(bucket, error = %e, "[BUCKET] Existence check failed");
        e
    })?;

    if exists {
        info!(bucket, "[BUCKET] Bucket already exists");
        return Ok(BucketInit::AlreadyExists);
    }

    store.make_bucket(bucket).await.map_err(|e| {
        error!(bucket, error = %e, "[BUCKET] Creation failed");
        e
    })?;
    info!(bucket, "[BUCKET] Bucket created");
    Ok(BucketInit::Created)
}
