//! Unified error handling system
//!
//! Every engine failure flows through [`SatchelError`] so the host framework can
//! map it onto its own error-response path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

pub type SatchelResult<T> = Result<T, SatchelError>;

/// Error context providing additional information for debugging and recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Additional metadata
    pub metadata: std::collections::HashMap<String, String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            metadata: std::collections::HashMap::new(),
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Main error type for the session engine
#[derive(Error, Debug)]
pub enum SatchelError {
    /// Caller misused the session API (bad `set` arguments, invalid generated id)
    #[error("Session usage error: {message}")]
    Usage {
        message: String,
        context: ErrorContext,
    },

    /// Settings rejected at registration time
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Session cache is not ready: {operation}")]
    CacheNotReady {
        operation: String,
        context: ErrorContext,
    },

    #[error("Session cache error: {message}")]
    Backend {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    /// Sealing or unsealing the session cookie failed
    #[error("Session cookie error: {message}")]
    Cookie {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SatchelError {
    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            SatchelError::Usage { context, .. } => Some(context),
            SatchelError::Config { context, .. } => Some(context),
            SatchelError::CacheNotReady { context, .. } => Some(context),
            SatchelError::Backend { context, .. } => Some(context),
            SatchelError::Cookie { context, .. } => Some(context),
            SatchelError::Serialization(_) => None,
        }
    }

    /// Whether the error was caused by what the client sent rather than by the server
    pub fn is_client_error(&self) -> bool {
        matches!(self, SatchelError::Cookie { .. })
    }

    /// Short machine-readable code used in error responses
    pub fn code(&self) -> &'static str {
        match self {
            SatchelError::Usage { .. } => "session_usage",
            SatchelError::Config { .. } => "session_config",
            SatchelError::CacheNotReady { .. } => "session_cache_not_ready",
            SatchelError::Backend { .. } => "session_cache",
            SatchelError::Cookie { .. } => "invalid_session_cookie",
            SatchelError::Serialization(_) => "session_serialization",
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            SatchelError::Cookie { .. } => {
                warn!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Rejected session cookie"
                );
            }
            SatchelError::Config { .. } | SatchelError::Usage { .. } => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Configuration or usage error"
                );
            }
            _ => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Session error occurred"
                );
            }
        }
    }
}

/// Convenience macros for creating errors with context
#[macro_export]
macro_rules! usage_error {
    ($msg:expr, $component:expr) => {
        $crate::SatchelError::Usage {
            message: $msg.to_string(),
            context: $crate::ErrorContext::new($component),
        }
    };
    ($msg:expr, $component:expr, $operation:expr) => {
        $crate::SatchelError::Usage {
            message: $msg.to_string(),
            context: $crate::ErrorContext::new($component).with_operation($operation),
        }
    };
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::SatchelError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check the session settings passed at registration"),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::SatchelError::Config {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check the session settings passed at registration"),
        }
    };
}

#[macro_export]
macro_rules! backend_error {
    ($msg:expr, $component:expr) => {
        $crate::SatchelError::Backend {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::SatchelError::Backend {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component),
        }
    };
}

#[macro_export]
macro_rules! cookie_error {
    ($msg:expr, $component:expr) => {
        $crate::SatchelError::Cookie {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::SatchelError::Cookie {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component),
        }
    };
}
