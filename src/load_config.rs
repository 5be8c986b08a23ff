/// `load_config` module: Loads a static YAML config, injects secrets from the
/// environment and validates the result into the core `ServiceConfig`.
///
/// This is the only place where user-supplied YAML is parsed.
///
/// # Responsibilities
/// - Parse the YAML file into intermediate, loosely-typed structs
/// - Inject `WATCH_UPLOAD_ACCESS_KEY` / `WATCH_UPLOAD_SECRET_KEY` when set,
///   overriding the file
/// - Reject configurations the service could not run with
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use watch_upload_core::config::{ServiceConfig, StorageConfig, UploadPolicy, DEFAULT_REGION};

pub const ACCESS_KEY_ENV: &str = "WATCH_UPLOAD_ACCESS_KEY";
pub const SECRET_KEY_ENV: &str = "WATCH_UPLOAD_SECRET_KEY";

#[derive(Debug, Deserialize)]
struct RawConfig {
    storage: StorageSection,
    bucket: String,
    watch_dir: PathBuf,
    #[serde(default)]
    upload: UploadPolicy,
}

#[derive(Debug, Deserialize)]
struct StorageSection {
    endpoint: String,
    #[serde(default)]
    access_key: Option<String>,
    #[serde(default)]
    secret_key: Option<String>,
    #[serde(default)]
    secure: bool,
    #[serde(default)]
    region: Option<String>,
}

/// Env value if set and non-empty, otherwise the file value.
fn secret(env_key: &str, from_file: Option<String>) -> Result<String> {
    match std::env::var(env_key) {
        Ok(value) if !value.is_empty() => {
            info!(env = env_key, "Secret found in env");
            Ok(value)
        }
        _ => match from_file {
            Some(value) if !value.is_empty() => Ok(value),
            _ => {
                error!(env = env_key, "Secret missing from both config file and env");
                bail!("{env_key} environment variable not set and no value in config file")
            }
        },
    }
}

/// Loads a YAML config file and returns a validated `ServiceConfig`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ServiceConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = fs::read_to_string(path_ref)
        .map_err(|e| {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            e
        })
        .with_context(|| format!("Failed to read config file {:?}", path_ref))?;

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if raw.storage.endpoint.contains("://") {
        bail!(
            "storage.endpoint must be host:port without a scheme (use `secure` to pick https), got {}",
            raw.storage.endpoint
        );
    }
    if raw.bucket.trim().is_empty() {
        bail!("bucket must not be empty");
    }
    if raw.upload.max_concurrent == 0 {
        bail!("upload.max_concurrent must be at least 1");
    }

    let storage = StorageConfig {
        access_key: secret(ACCESS_KEY_ENV, raw.storage.access_key)?,
        secret_key: secret(SECRET_KEY_ENV, raw.storage.secret_key)?,
        endpoint: raw.storage.endpoint,
        secure: raw.storage.secure,
        region: raw
            .storage
            .region
            .unwrap_or_else(|| DEFAULT_REGION.to_string()),
    };

    let config = ServiceConfig {
        storage,
        bucket: raw.bucket,
        watch_dir: raw.watch_dir,
        upload: raw.upload,
    };
    config.trace_loaded();
    Ok(config)
}
