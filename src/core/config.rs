use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::shared::constants::DEFAULT_CLIENT_IP_HEADER;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub quota: QuotaConfig,
    pub analyzer: AnalyzerConfig,
    pub staging: StagingConfig,
    pub swagger: SwaggerConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    /// Largest accepted document, in bytes
    pub max_upload_size: usize,
    /// Request header whose first entry identifies the client for quota purposes
    pub client_ip_header: String,
    /// Upper bound on staging, extraction and analysis of one request
    pub analysis_timeout: Option<Duration>,
}

/// Per-client usage quota settings
#[derive(Debug, Clone)]
pub struct QuotaConfig {
    /// Attempts allowed per window
    pub limit: u32,
    pub window_secs: i64,
    /// Upper bound on tracked identities before eviction kicks in
    pub max_tracked_clients: usize,
    pub sweep_interval_secs: u64,
}

/// Settings for the language model used to review documents
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    /// Optional directory of `.jinja` files overriding the built-in prompts
    pub prompt_template_dir: Option<PathBuf>,
}

/// Where uploads are written while a request is in flight
#[derive(Debug, Clone)]
pub struct StagingConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            // Only error if it's not "file not found" - that's acceptable
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            quota: QuotaConfig::from_env()?,
            analyzer: AnalyzerConfig::from_env()?,
            staging: StagingConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
        })
    }
}

impl AppConfig {
    const DEFAULT_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024; // 10MB
    const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 120;

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        // Parse CORS allowed origins from comma-separated string
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_upload_size = env::var("MAX_UPLOAD_SIZE")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_UPLOAD_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| "MAX_UPLOAD_SIZE must be a valid number".to_string())?;

        let client_ip_header = env::var("CLIENT_IP_HEADER")
            .ok()
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_CLIENT_IP_HEADER.to_string());

        axum::http::HeaderName::from_bytes(client_ip_header.as_bytes())
            .map_err(|_| format!("CLIENT_IP_HEADER is not a valid header name: {}", client_ip_header))?;

        // 0 disables the overall limit
        let analysis_timeout_secs = env::var("ANALYSIS_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_ANALYSIS_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "ANALYSIS_TIMEOUT_SECS must be a valid number".to_string())?;

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
            max_upload_size,
            client_ip_header,
            analysis_timeout: (analysis_timeout_secs > 0)
                .then(|| Duration::from_secs(analysis_timeout_secs)),
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl QuotaConfig {
    const DEFAULT_LIMIT: u32 = 3;
    const DEFAULT_WINDOW_SECS: i64 = 24 * 60 * 60; // 24 hours
    const DEFAULT_MAX_TRACKED_CLIENTS: usize = 100_000;
    const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600; // 1 hour
    const MAX_WINDOW_SECS: i64 = 5 * 365 * 24 * 60 * 60; // 5 years

    pub fn from_env() -> Result<Self, String> {
        let limit = env::var("QUOTA_LIMIT")
            .unwrap_or_else(|_| Self::DEFAULT_LIMIT.to_string())
            .parse::<u32>()
            .map_err(|_| "QUOTA_LIMIT must be a valid number".to_string())?;

        let window_secs = env::var("QUOTA_WINDOW_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_WINDOW_SECS.to_string())
            .parse::<i64>()
            .map_err(|_| "QUOTA_WINDOW_SECS must be a valid number".to_string())?;

        let max_tracked_clients = env::var("QUOTA_MAX_TRACKED_CLIENTS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_TRACKED_CLIENTS.to_string())
            .parse::<usize>()
            .map_err(|_| "QUOTA_MAX_TRACKED_CLIENTS must be a valid number".to_string())?;

        let sweep_interval_secs = env::var("QUOTA_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_SWEEP_INTERVAL_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "QUOTA_SWEEP_INTERVAL_SECS must be a valid number".to_string())?;

        let config = Self {
            limit,
            window_secs,
            max_tracked_clients,
            sweep_interval_secs,
        };
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.limit == 0 {
            return Err("QUOTA_LIMIT must be at least 1".to_string());
        }
        if self.window_secs <= 0 {
            return Err("QUOTA_WINDOW_SECS must be positive".to_string());
        }
        if self.window_secs > Self::MAX_WINDOW_SECS {
            return Err(format!(
                "QUOTA_WINDOW_SECS must be at most {}",
                Self::MAX_WINDOW_SECS
            ));
        }
        if self.max_tracked_clients == 0 {
            return Err("QUOTA_MAX_TRACKED_CLIENTS must be at least 1".to_string());
        }
        if self.sweep_interval_secs == 0 {
            return Err("QUOTA_SWEEP_INTERVAL_SECS must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl AnalyzerConfig {
    const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com";
    const DEFAULT_MODEL: &'static str = "gemini-1.5-flash";
    const DEFAULT_API_KEY_ENV: &'static str = "GEMINI_API_KEY";

    pub fn from_env() -> Result<Self, String> {
        let base_url =
            env::var("ANALYZER_BASE_URL").unwrap_or_else(|_| Self::DEFAULT_BASE_URL.to_string());

        let model = env::var("ANALYZER_MODEL").unwrap_or_else(|_| Self::DEFAULT_MODEL.to_string());
        if model.trim().is_empty() {
            return Err("ANALYZER_MODEL must not be empty".to_string());
        }

        // The key itself is read at call time; only the variable name is configured here
        let api_key_env = env::var("ANALYZER_API_KEY_ENV")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_API_KEY_ENV.to_string());

        let prompt_template_dir = env::var("PROMPT_TEMPLATE_DIR")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            base_url,
            model,
            api_key_env,
            prompt_template_dir,
        })
    }
}

impl StagingConfig {
    pub fn from_env() -> Result<Self, String> {
        let dir = env::var("STAGING_DIR")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);

        Ok(Self { dir })
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        // Only use credentials if they are non-empty
        let username = env::var("SWAGGER_USERNAME").ok().filter(|s| !s.is_empty());
        let password = env::var("SWAGGER_PASSWORD").ok().filter(|s| !s.is_empty());
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "Document Review API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "AI-assisted review of uploaded PDF documents".to_string());

        Ok(Self {
            username,
            password,
            title,
            version,
            description,
        })
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}
