//! Error types and handling for the `TripSmith` service

use thiserror::Error;

/// Main error type for the `TripSmith` service
///
/// Segment-level problems (airport resolution, pricing, budget) are never
/// errors; they are folded into `PlanValidation.errors`. A value of this type
/// means a whole validation pass or the pipeline itself could not proceed.
#[derive(Error, Debug)]
pub enum TripSmithError {
    /// Unparseable draft payload; carries the raw generator text
    #[error("Draft could not be parsed as an itinerary")]
    Structural { raw: String },

    /// The generator itself was unreachable
    #[error("Generator error: {message}")]
    Generator { message: String },

    /// A network call failed outright, aborting the current validation pass
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// General application errors
    #[error("Application error: {message}")]
    General { message: String },
}

impl TripSmithError {
    /// Create a new structural parse error wrapping the raw draft text
    pub fn structural<S: Into<String>>(raw: S) -> Self {
        Self::Structural { raw: raw.into() }
    }

    /// Create a new generator error
    pub fn generator<S: Into<String>>(message: S) -> Self {
        Self::Generator {
            message: message.into(),
        }
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new general error
    pub fn general<S: Into<String>>(message: S) -> Self {
        Self::General {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            TripSmithError::Structural { .. } => {
                "The generator produced output that is not a valid itinerary.".to_string()
            }
            TripSmithError::Generator { .. } => {
                "Unable to reach the itinerary generator. Please check that it is running."
                    .to_string()
            }
            TripSmithError::Transport { .. } => {
                "Unable to connect to external services. Please check your internet connection."
                    .to_string()
            }
            TripSmithError::Config { .. } => {
                "Configuration error. Please check your config file and API credentials."
                    .to_string()
            }
            TripSmithError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
            TripSmithError::General { message } => message.clone(),
        }
    }
}
