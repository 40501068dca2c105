//! Configuration management for the pose gateway.
//!
//! Values are layered from `config/default`, `config/{RUN_MODE}` and then
//! `POSE__`-prefixed environment variables (e.g. `POSE__STORAGE__BUCKET`).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main configuration for the gateway service.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub api: ApiConfig,

    /// Object storage configuration
    pub storage: StorageConfig,

    #[serde(default)]
    pub worker: WorkerConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub notification: NotificationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service name for logging/metrics
    #[serde(default = "default_service_name")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,

    #[serde(default = "default_api_port")]
    pub port: u16,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (empty = any)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// S3-compatible object storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint URL (for MinIO, GCS interoperability, LocalStack, etc.)
    pub endpoint_url: Option<String>,

    /// Force path-style access (required for MinIO)
    #[serde(default)]
    pub force_path_style: bool,

    /// Folder holding one sub-folder per job
    #[serde(default = "default_root_prefix")]
    pub root_prefix: String,

    #[serde(default = "default_input_object")]
    pub input_object: String,

    #[serde(default = "default_video_object")]
    pub video_object: String,

    #[serde(default = "default_angles_object")]
    pub angles_object: String,

    /// Multipart upload threshold in bytes
    #[serde(default = "default_multipart_threshold")]
    pub multipart_threshold_bytes: usize,

    /// Part size for multipart uploads in bytes
    #[serde(default = "default_part_size")]
    pub part_size_bytes: usize,
}

/// Background job execution.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Jobs processed concurrently
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,

    /// Jobs waiting for a worker before requests are rejected
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    /// Parent directory for per-job scratch space (system temp dir if unset)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

/// Landmark model configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_path")]
    pub path: PathBuf,

    /// Mean keypoint score below which a frame has no subject
    #[serde(default = "default_min_pose_confidence")]
    pub min_pose_confidence: f32,

    /// ONNX Runtime intra-op threads (0 = runtime default)
    #[serde(default)]
    pub intra_threads: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// Completion webhooks sent to `notification_url`.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_notification_timeout_secs")]
    pub timeout_secs: u64,
}

// Default value functions
fn default_service_name() -> String {
    "pose-gateway".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_root_prefix() -> String {
    "exercise_videos".to_string()
}

fn default_input_object() -> String {
    "video.mp4".to_string()
}

fn default_video_object() -> String {
    "pose_video.mp4".to_string()
}

fn default_angles_object() -> String {
    "pose_angles.json".to_string()
}

fn default_multipart_threshold() -> usize {
    16 * 1024 * 1024 // 16MB
}

fn default_part_size() -> usize {
    8 * 1024 * 1024 // 8MB
}

fn default_num_workers() -> usize {
    2
}

fn default_queue_size() -> usize {
    32
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/movenet_singlepose_lightning.onnx")
}

fn default_min_pose_confidence() -> f32 {
    0.3
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_notification_timeout_secs() -> u64 {
    10
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            num_workers: default_num_workers(),
            queue_size: default_queue_size(),
            temp_dir: None,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            min_pose_confidence: default_min_pose_confidence(),
            intra_threads: 0,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: default_notification_timeout_secs(),
        }
    }
}

impl StorageConfig {
    /// Storage settings for `bucket` with every other field at its default.
    pub fn for_bucket(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: default_region(),
            endpoint_url: None,
            force_path_style: false,
            root_prefix: default_root_prefix(),
            input_object: default_input_object(),
            video_object: default_video_object(),
            angles_object: default_angles_object(),
            multipart_threshold_bytes: default_multipart_threshold(),
            part_size_bytes: default_part_size(),
        }
    }
}

impl NotificationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl GatewayConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Later sources override earlier ones:
    /// 1. `config/default`
    /// 2. `config/{RUN_MODE}`
    /// 3. Environment variables prefixed with `POSE__`
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(
                Environment::with_prefix("POSE")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("api.cors_origins"),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.storage.bucket.trim().is_empty() {
            return Err(ConfigValidationError::MissingField(
                "storage.bucket".to_string(),
            ));
        }

        for (field, value) in [
            ("storage.root_prefix", &self.storage.root_prefix),
            ("storage.input_object", &self.storage.input_object),
            ("storage.video_object", &self.storage.video_object),
            ("storage.angles_object", &self.storage.angles_object),
        ] {
            if value.is_empty() || value.contains('/') {
                return Err(ConfigValidationError::InvalidValue {
                    field: field.to_string(),
                    message: "Must be a single non-empty path segment".to_string(),
                });
            }
        }

        let objects = [
            &self.storage.input_object,
            &self.storage.video_object,
            &self.storage.angles_object,
        ];
        if objects[0] == objects[1] || objects[0] == objects[2] || objects[1] == objects[2] {
            return Err(ConfigValidationError::InvalidValue {
                field: "storage.input_object".to_string(),
                message: "Input, video and angles object names must differ".to_string(),
            });
        }

        // S3 rejects multipart parts under 5MB except the last one
        if self.storage.part_size_bytes < 5 * 1024 * 1024 {
            return Err(ConfigValidationError::InvalidValue {
                field: "storage.part_size_bytes".to_string(),
                message: "Part size must be at least 5MB".to_string(),
            });
        }

        if self.worker.num_workers == 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "worker.num_workers".to_string(),
                message: "At least one worker is required".to_string(),
            });
        }

        if self.worker.queue_size == 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "worker.queue_size".to_string(),
                message: "Queue size must be greater than 0".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.model.min_pose_confidence) {
            return Err(ConfigValidationError::InvalidValue {
                field: "model.min_pose_confidence".to_string(),
                message: "Confidence must be between 0 and 1".to_string(),
            });
        }

        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            return Err(ConfigValidationError::InvalidValue {
                field: "logging.format".to_string(),
                message: "Format must be json or pretty".to_string(),
            });
        }

        Ok(())
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Configuration with defaults everywhere and the given bucket.
    pub fn with_bucket(bucket: impl Into<String>) -> Self {
        Self {
            service: ServiceConfig::default(),
            logging: LoggingConfig::default(),
            api: ApiConfig::default(),
            storage: StorageConfig::for_bucket(bucket),
            worker: WorkerConfig::default(),
            model: ModelConfig::default(),
            metrics: MetricsConfig::default(),
            notification: NotificationConfig::default(),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
