use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

pub const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings for the storage endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `host:port`, without scheme.
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    /// Use https when true, http otherwise.
    pub secure: bool,
    pub region: String,
}

impl StorageConfig {
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{scheme}://{}", self.endpoint)
    }
}

// Keeps the secret key out of logs.
impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("secure", &self.secure)
            .field("region", &self.region)
            .finish()
    }
}

/// How many uploads may run at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadPolicy {
    pub max_concurrent: usize,
}

impl Default for UploadPolicy {
    /// One upload at a time, in notification order.
    fn default() -> Self {
        Self { max_concurrent: 1 }
    }
}

/// Everything the upload service needs, fixed at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub storage: StorageConfig,
    pub bucket: String,
    pub watch_dir: PathBuf,
    #[serde(default)]
    pub upload: UploadPolicy,
}

impl ServiceConfig {
    pub fn trace_loaded(&self) {
        info!(
            endpoint = %self.storage.endpoint_url(),
            bucket = %self.bucket,
            watch_dir = %self.watch_dir.display(),
            max_concurrent = self.upload.max_concurrent,
            "Loaded ServiceConfig"
        );
        debug!(?self, "ServiceConfig loaded (full debug)");
    }
}
