use thiserror::Error;

/// Result type alias for the analytics engine
pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Error types for the analytics engine
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// The injected collector failed or returned an unusable sample
    #[error("Collection error: {collector}: {message}")]
    Collection { collector: String, message: String },

    /// The collector did not answer in time
    #[error("Collection timed out: {collector} after {timeout_ms}ms")]
    CollectionTimeout { collector: String, timeout_ms: u64 },

    /// An analyzer returned an error or panicked
    #[error("Analyzer error: {analyzer}: {message}")]
    Analyzer { analyzer: String, message: String },

    /// An analyzer did not finish within its budget
    #[error("Analyzer timed out: {analyzer} after {timeout_ms}ms")]
    AnalyzerTimeout { analyzer: String, timeout_ms: u64 },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid input errors
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// File system errors
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors
    #[error("Analytics error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl AnalyticsError {
    /// Create a new collection error
    pub fn collection<S: Into<String>>(collector: S, message: S) -> Self {
        Self::Collection {
            collector: collector.into(),
            message: message.into(),
        }
    }

    /// Create a new analyzer error
    pub fn analyzer<S: Into<String>>(analyzer: S, message: S) -> Self {
        Self::Analyzer {
            analyzer: analyzer.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new invalid input error
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Check if this error came from the collection step
    pub fn is_collection_failure(&self) -> bool {
        matches!(
            self,
            AnalyticsError::Collection { .. } | AnalyticsError::CollectionTimeout { .. }
        )
    }

    /// Check if this error came from one of the analyzers
    pub fn is_analyzer_failure(&self) -> bool {
        matches!(
            self,
            AnalyticsError::Analyzer { .. } | AnalyticsError::AnalyzerTimeout { .. }
        )
    }

    /// Check if this error is a configuration problem
    pub fn is_config_error(&self) -> bool {
        matches!(self, AnalyticsError::Config { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(AnalyticsError::collection("probe", "down").is_collection_failure());
        assert!(AnalyticsError::CollectionTimeout {
            collector: "probe".to_string(),
            timeout_ms: 10,
        }
        .is_collection_failure());
        assert!(AnalyticsError::analyzer("cost", "boom").is_analyzer_failure());
        assert!(AnalyticsError::AnalyzerTimeout {
            analyzer: "cost".to_string(),
            timeout_ms: 5,
        }
        .is_analyzer_failure());
        assert!(AnalyticsError::config("bad").is_config_error());
        assert!(!AnalyticsError::invalid_input("bad").is_config_error());
    }

    #[test]
    fn test_error_display() {
        let err = AnalyticsError::analyzer("security", "rule table empty");
        assert_eq!(err.to_string(), "Analyzer error: security: rule table empty");

        let err = AnalyticsError::AnalyzerTimeout {
            analyzer: "prediction".to_string(),
            timeout_ms: 250,
        };
        assert_eq!(err.to_string(), "Analyzer timed out: prediction after 250ms");
    }
}
