#[cfg(feature = "cli")]
pub mod cli;

use crate::core::upload::DEFAULT_FOLDER;
use crate::utils::error::{Result, ServiceError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_API_BASE: &str = "https://api.cloudinary.com";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub media: MediaConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub otp: OtpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: Option<String>,
    pub max_upload_bytes: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub api_base: Option<String>,
    pub folder: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres` (default) or `memory`
    pub backend: Option<String>,
    #[serde(default)]
    pub url: String,
    pub max_connections: Option<u32>,
    pub acquire_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OtpConfig {
    pub sweep_interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `compact` (default) or `json`
    pub format: Option<String>,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> &str {
        self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
    }
}

impl MediaConfig {
    pub fn api_base(&self) -> &str {
        self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    pub fn folder(&self) -> &str {
        self.folder.as_deref().unwrap_or(DEFAULT_FOLDER)
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(30)
    }
}

impl DatabaseConfig {
    pub fn backend(&self) -> &str {
        self.backend.as_deref().unwrap_or("postgres")
    }

    pub fn max_connections(&self) -> u32 {
        self.max_connections.unwrap_or(5)
    }

    pub fn acquire_timeout_seconds(&self) -> u64 {
        self.acquire_timeout_seconds.unwrap_or(5)
    }
}

impl OtpConfig {
    pub fn sweep_interval_seconds(&self) -> u64 {
        self.sweep_interval_seconds.unwrap_or(60)
    }
}

impl LoggingConfig {
    pub fn format(&self) -> &str {
        self.format.as_deref().unwrap_or("compact")
    }
}

impl ServiceConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ServiceError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ServiceError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CLOUDINARY_API_SECRET})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ServiceError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            // 未設定的變數保留原樣，交給 validate 報錯
            env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 直接從環境變數載入 (沒有配置檔時使用)
    pub fn from_env() -> Result<Self> {
        let required = |name: &str| {
            env::var(name).map_err(|_| ServiceError::MissingConfigError {
                field: name.to_string(),
            })
        };

        let backend = env::var("DATABASE_BACKEND").unwrap_or_else(|_| "postgres".to_string());
        let url = if backend == "memory" {
            env::var("DATABASE_URL").unwrap_or_default()
        } else {
            required("DATABASE_URL")?
        };

        Ok(Self {
            server: ServerConfig {
                bind_addr: env::var("BIND_ADDR").ok(),
                max_upload_bytes: env_parsed("MAX_UPLOAD_BYTES"),
            },
            media: MediaConfig {
                cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
                api_key: required("CLOUDINARY_API_KEY")?,
                api_secret: required("CLOUDINARY_API_SECRET")?,
                api_base: env::var("CLOUDINARY_API_BASE").ok(),
                folder: env::var("CLOUDINARY_FOLDER").ok(),
                timeout_seconds: env_parsed("CLOUDINARY_TIMEOUT_SECONDS"),
            },
            database: DatabaseConfig {
                backend: Some(backend),
                url,
                max_connections: env_parsed("DATABASE_MAX_CONNECTIONS"),
                acquire_timeout_seconds: None,
            },
            otp: OtpConfig {
                sweep_interval_seconds: env_parsed("OTP_SWEEP_INTERVAL_SECONDS"),
            },
            logging: LoggingConfig {
                format: env::var("LOG_FORMAT").ok(),
            },
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        validation::validate_socket_addr("server.bind_addr", self.server.bind_addr())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        self.socket_addr()?;
        validation::validate_positive_number(
            "server.max_upload_bytes",
            self.server.max_upload_bytes(),
            1,
        )?;

        validation::validate_secret("media.cloud_name", &self.media.cloud_name)?;
        validation::validate_secret("media.api_key", &self.media.api_key)?;
        validation::validate_secret("media.api_secret", &self.media.api_secret)?;
        validation::validate_url("media.api_base", self.media.api_base())?;
        validation::validate_non_empty_string("media.folder", self.media.folder())?;
        validation::validate_range("media.timeout_seconds", self.media.timeout_seconds(), 1, 600)?;

        validation::validate_one_of("database.backend", self.database.backend(), &["postgres", "memory"])?;
        if self.database.backend() == "postgres" {
            validation::validate_secret("database.url", &self.database.url)?;
            validation::validate_positive_number(
                "database.max_connections",
                self.database.max_connections() as usize,
                1,
            )?;
        }

        validation::validate_range(
            "otp.sweep_interval_seconds",
            self.otp.sweep_interval_seconds(),
            1,
            86_400,
        )?;
        validation::validate_one_of("logging.format", self.logging.format(), &["compact", "json"])?;

        Ok(())
    }
}

fn env_parsed<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Validate for ServiceConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
