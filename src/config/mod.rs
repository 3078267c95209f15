use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default endpoint of the remote prediction service.
pub const DEFAULT_PREDICTION_URL: &str = "https://web-production-b3332.up.railway.app/predict";

/// Runtime configuration for the gateway
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Listening port (default: 5000)
    pub port: u16,

    /// Listening address (default: "0.0.0.0")
    pub host: String,

    /// Staging directory for uploaded files (default: "./uploads")
    pub upload_dir: PathBuf,

    /// Prediction service endpoint receiving the forwarded image
    pub prediction_url: String,

    /// Optional timeout for the outbound prediction call (default: none)
    pub prediction_timeout: Option<Duration>,

    /// Allowed CORS origin, "*" for any (default: "*")
    pub cors_origin: String,

    /// Maximum accepted request body in bytes (default: unlimited)
    pub max_upload_size: Option<usize>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            host: "0.0.0.0".to_string(),
            upload_dir: PathBuf::from("uploads"),
            prediction_url: DEFAULT_PREDICTION_URL.to_string(),
            prediction_timeout: None,
            cors_origin: "*".to_string(),
            max_upload_size: None,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port),

            host: env::var("HOST").unwrap_or(default.host),

            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),

            prediction_url: env::var("PREDICTION_SERVICE_URL").unwrap_or(default.prediction_url),

            prediction_timeout: env::var("PREDICTION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .or(default.prediction_timeout),

            cors_origin: env::var("CORS_ORIGIN").unwrap_or(default.cors_origin),

            max_upload_size: env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .or(default.max_upload_size),
        }
    }

    /// Create config for tests and local development rooted at `upload_dir`
    pub fn development(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            upload_dir: upload_dir.into(),
            prediction_url: "http://127.0.0.1:8000/predict".to_string(),
            ..Self::default()
        }
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_origin.trim() == "*"
    }
}
