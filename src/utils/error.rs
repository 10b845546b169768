use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration value: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to persist seen set to {path}: {message}")]
    PersistenceError { path: String, message: String },

    #[error("Message delivery failed{}: {message}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    DeliveryError { status: Option<u16>, message: String },

    #[error("An announce cycle is already running")]
    Busy,

    #[error("Background task failed: {message}")]
    TaskError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Persistence,
    Delivery,
    Concurrency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BotError {
    pub fn config(message: impl Into<String>) -> Self {
        BotError::ConfigError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            BotError::ConfigError { .. }
            | BotError::MissingConfigError { .. }
            | BotError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            BotError::ApiError(_) => ErrorCategory::Network,
            BotError::SerializationError(_) | BotError::PersistenceError { .. } => {
                ErrorCategory::Persistence
            }
            BotError::DeliveryError { .. } => ErrorCategory::Delivery,
            BotError::Busy | BotError::TaskError { .. } => ErrorCategory::Concurrency,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        if let BotError::TaskError { .. } = self {
            return ErrorSeverity::High;
        }
        match self.category() {
            ErrorCategory::Concurrency => ErrorSeverity::Low,
            ErrorCategory::Network | ErrorCategory::Delivery => ErrorSeverity::Medium,
            ErrorCategory::Persistence => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    /// Configuration errors stop the bot before (or instead of) scheduling.
    pub fn is_fatal(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        if let BotError::TaskError { .. } = self {
            return "Restart the bot; the seen set on disk is still valid";
        }
        match self.category() {
            ErrorCategory::Configuration => {
                "Check DISCORD_TOKEN, DISCORD_CHANNEL_ID and FEED_URL (or the TOML config file)"
            }
            ErrorCategory::Network => {
                "Check that the feed URL is reachable; the next cycle retries"
            }
            ErrorCategory::Persistence => {
                "Check that the state file path is writable and has free disk space"
            }
            ErrorCategory::Delivery => {
                "Check the bot's permissions in the target channel; the next cycle retries"
            }
            ErrorCategory::Concurrency => "Wait for the running check to finish",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            BotError::MissingConfigError { field } => {
                format!("Required setting '{}' is not configured", field)
            }
            BotError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            BotError::ConfigError { message } => format!("Configuration problem: {}", message),
            BotError::Busy => "A free games check is already running".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
