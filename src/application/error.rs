use std::error::Error as StdError;

use thiserror::Error;

use crate::{application::syndication::SyndicationError, infra::error::InfraError};

/// Flattened cause chain of an error, outermost first.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }

    pub fn root_cause(&self) -> &str {
        self.messages.last().map(String::as_str).unwrap_or_default()
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Syndication(#[from] SyndicationError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("validation failed: {0}")]
    Validation(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error("application::error::AppError", self)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::config::LoadError;

    #[test]
    fn report_walks_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = AppError::from(SyndicationError::Read {
            path: PathBuf::from("public/postsData.json"),
            source: io,
        });
        let report = err.report();
        assert_eq!(report.messages.len(), 2);
        assert!(report.messages[0].contains("public/postsData.json"));
        assert_eq!(report.root_cause(), "no such file");
    }

    #[test]
    fn configuration_failure_keeps_offending_key() {
        let err = AppError::from(InfraError::from(LoadError::Invalid {
            key: "logging.level",
            reason: "failed to parse: loud".to_string(),
        }));
        assert!(matches!(
            err,
            AppError::Infra(InfraError::Configuration(LoadError::Invalid { key, .. }))
                if key == "logging.level"
        ));
        assert_eq!(
            err.to_string(),
            "configuration error: invalid configuration for `logging.level`: failed to parse: loud"
        );
    }

    #[test]
    fn validation_message_is_prefixed() {
        let err = AppError::validation("unknown tag `zzz`");
        assert_eq!(err.to_string(), "validation failed: unknown tag `zzz`");
        assert_eq!(err.report().messages.len(), 1);
    }
}
