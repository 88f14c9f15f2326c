//! Error handling for race classification processing.
//!
//! Distinguishes malformed input values, records that do not match the
//! expected classification schema, and integrity violations in the
//! aggregated rider data. Record-level failures are wrapped with the stage
//! (and rider, when known) they occurred in.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RaceError {
    #[error("Invalid duration '{input}': {reason}")]
    Format { input: String, reason: String },

    #[error("Schema error in field '{field}': {reason}")]
    Schema { field: String, reason: String },

    #[error("Data integrity error: {reason}")]
    DataIntegrity { reason: String },

    #[error("Stage {stage}{}", rider_suffix(.rider))]
    Stage {
        stage: String,
        rider: Option<String>,
        #[source]
        source: Box<RaceError>,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Processing interrupted: {reason}")]
    Interrupted { reason: String },
}

impl RaceError {
    pub fn format(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Format {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn data_integrity(reason: impl Into<String>) -> Self {
        Self::DataIntegrity {
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Attach stage (and optionally rider) context to an error
    pub fn in_stage(self, stage: impl Into<String>, rider: Option<String>) -> Self {
        match self {
            // Re-label rather than nest; the innermost rider is the most specific
            Self::Stage {
                rider: inner,
                source,
                ..
            } => Self::Stage {
                stage: stage.into(),
                rider: inner.or(rider),
                source,
            },
            other => Self::Stage {
                stage: stage.into(),
                rider,
                source: Box::new(other),
            },
        }
    }

    /// The error with any stage context stripped
    pub fn root(&self) -> &RaceError {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

fn rider_suffix(rider: &Option<String>) -> String {
    rider
        .as_ref()
        .map(|id| format!(", rider {}", id))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, RaceError>;
