//! Service configuration.
//!
//! Loaded from a JSON file or built in code; every field has a default so
//! partial configs work. TLS is an on/off toggle carrying certificate and
//! key paths.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use trunkdec_audio::AudioFormat;

use crate::error::ServiceError;

/// TLS listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    /// PEM certificate chain path.
    pub cert_path: PathBuf,
    /// PEM private key path.
    pub key_path: PathBuf,
}

/// Everything the ingestion service needs to run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listen address.
    pub bind_addr: String,
    /// Listen port.
    pub port: u16,
    /// Root of the output directory layout.
    pub output_dir: PathBuf,
    /// Directory for uploaded temp files; the system default when unset.
    pub temp_dir: Option<PathBuf>,
    /// Bearer / X-API-Key token; no auth when unset.
    pub auth_token: Option<String>,
    /// Worker threads in the pool.
    pub max_workers: usize,
    /// Bounded job queue capacity.
    pub max_queue_size: usize,
    /// Per-job wall-clock timeout in seconds.
    pub job_timeout_secs: u64,
    /// Purge terminal jobs from the tracker after this many seconds;
    /// retained until shutdown when unset.
    pub job_retention_secs: Option<u64>,
    /// Requested audio output format (`wav`, `mp3`, `m4a`, `opus`).
    pub audio_format: String,
    /// Bitrate for converted formats; 0 selects the format default.
    pub audio_bitrate_kbps: u32,
    /// Post-processing hook script run after successful jobs.
    pub hook_script: Option<PathBuf>,
    /// Stream name reported for accepted uploads.
    pub stream_name: String,
    /// TLS termination toggle.
    pub tls: Option<TlsConfig>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            bind_addr: "0.0.0.0".to_string(),
            port: 8160,
            output_dir: PathBuf::from("."),
            temp_dir: None,
            auth_token: None,
            max_workers: 4,
            max_queue_size: 64,
            job_timeout_secs: 30,
            job_retention_secs: None,
            audio_format: "wav".to_string(),
            audio_bitrate_kbps: 0,
            hook_script: None,
            stream_name: "default".to_string(),
            tls: None,
        }
    }
}

impl ServiceConfig {
    /// Load from a JSON file.
    pub fn from_file(path: &Path) -> Result<ServiceConfig, ServiceError> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| ServiceError::Config(e.to_string()))
    }

    /// The directory uploads are spooled to.
    #[must_use]
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Reject configurations this build cannot honor before any worker
    /// starts, rather than failing every job at runtime.
    pub fn validate(&self) -> Result<(), ServiceError> {
        self.audio_format.parse::<AudioFormat>().map_err(|_| {
            ServiceError::Unsupported(format!("audio format \"{}\"", self.audio_format))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: ServiceConfig = serde_json::from_str("{\"port\": 9000}").unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.audio_format, "wav");
        assert!(config.auth_token.is_none());
        assert!(config.tls.is_none());
    }

    #[test]
    fn validate_rejects_unknown_audio_formats() {
        assert!(ServiceConfig::default().validate().is_ok());

        let config = ServiceConfig {
            audio_format: "webm".to_string(),
            ..ServiceConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ServiceError::Unsupported(_))
        ));
    }

    #[test]
    fn tls_block_parses() {
        let config: ServiceConfig = serde_json::from_str(
            "{\"tls\": {\"cert_path\": \"/etc/cert.pem\", \"key_path\": \"/etc/key.pem\"}}",
        )
        .unwrap();
        let tls = config.tls.unwrap();
        assert_eq!(tls.cert_path, PathBuf::from("/etc/cert.pem"));
    }
}
