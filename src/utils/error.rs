use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Record not found: {identifier}")]
    NotFoundError { identifier: String },

    #[error("Media host request failed: {message}")]
    UpstreamError { message: String },

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Upstream,
    Persistence,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ValidationError { .. } => ErrorCategory::Validation,
            Self::NotFoundError { .. } => ErrorCategory::NotFound,
            Self::UpstreamError { .. } | Self::HttpError(_) => ErrorCategory::Upstream,
            Self::DatabaseError(_) | Self::MigrationError(_) => ErrorCategory::Persistence,
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation | ErrorCategory::NotFound => ErrorSeverity::Low,
            ErrorCategory::Upstream => ErrorSeverity::Medium,
            ErrorCategory::Persistence | ErrorCategory::System => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    /// 客戶端錯誤直接回報狀態碼，其餘一律收斂為 500
    pub fn status_code(&self) -> StatusCode {
        match self.category() {
            ErrorCategory::Validation => StatusCode::BAD_REQUEST,
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the `error` field of an HTTP response. Server faults
    /// never leak their detail.
    pub fn public_message(&self) -> String {
        match self {
            Self::ValidationError { message } => message.clone(),
            Self::NotFoundError { .. } => "User not found".to_string(),
            _ => "Upload failed".to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Validation => "Check the submitted form fields",
            ErrorCategory::NotFound => "Make sure the profile exists before uploading an image",
            ErrorCategory::Upstream => {
                "Check the media host credentials and that the host is reachable"
            }
            ErrorCategory::Persistence => "Check the database connection and run migrations",
            ErrorCategory::Configuration => {
                "Check the configuration file and the CLOUDINARY_* / DATABASE_URL environment variables"
            }
            ErrorCategory::System => "Check file permissions and disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Persistence => format!("Database unavailable: {}", self),
            ErrorCategory::Upstream => format!("Media host unavailable: {}", self),
            _ => self.to_string(),
        }
    }
}
