use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A backend model or store could not be loaded. Never retried.
    #[error("Failed to initialize {backend}: {reason}")]
    Initialization { backend: String, reason: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{stage} failed: {source}")]
    Backend {
        stage: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wraps a collaborator failure, keeping our own variants intact when the
    /// collaborator already produced one (e.g. a lazy load that failed).
    pub fn backend(stage: &'static str, err: anyhow::Error) -> Self {
        match err.downcast::<Error>() {
            Ok(inner) => inner,
            Err(other) => Error::Backend {
                stage,
                source: other.into(),
            },
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_initialization(&self) -> bool {
        matches!(self, Error::Initialization { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_keeps_inner_variant() {
        let inner = Error::Initialization {
            backend: "phi-2".into(),
            reason: "missing weights".into(),
        };
        let wrapped = Error::backend("generate", anyhow::Error::new(inner));
        assert!(wrapped.is_initialization());
    }

    #[test]
    fn backend_wraps_foreign_errors() {
        let err = Error::backend("caption", anyhow::anyhow!("decoder exploded"));
        assert!(matches!(err, Error::Backend { stage: "caption", .. }));
        assert_eq!(err.to_string(), "caption failed: decoder exploded");
    }
}
