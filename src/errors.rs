//! Unified error types and result handling.
//!
//! Every fallible operation in the crate returns [`Result`]. The variants mirror the
//! failure taxonomy of the app: remote lookups can fail at the transport level
//! ([`Error::Network`], [`Error::Http`]) or succeed with nothing to show
//! ([`Error::NoResults`], [`Error::NotFound`]); local persistence failures
//! ([`Error::Persistence`]) are logged and never shown to the user.

use thiserror::Error;

/// Message shown when a search succeeds but matches nothing.
pub const MSG_NO_RESULTS: &str = "Keine Produkte gefunden.";
/// Message shown when a barcode lookup finds no product.
pub const MSG_NOT_FOUND: &str = "Produkt nicht gefunden.";
/// Message shown for any transport or connectivity failure.
pub const MSG_NETWORK: &str = "Fehler beim Laden der Daten. Bitte Internetverbindung prüfen.";

/// All errors produced by `macro-buddy`.
#[derive(Debug, Error)]
pub enum Error {
    /// The nutrition source could not be reached or answered with garbage
    #[error("Network error: {message}")]
    Network {
        /// Description of the failure
        message: String,
    },

    /// A search completed but the source reported zero matches
    #[error("No products found for '{term}'")]
    NoResults {
        /// The search term that produced no matches
        term: String,
    },

    /// A barcode lookup completed but the source has no such product
    #[error("Product not found: {code}")]
    NotFound {
        /// The barcode that was looked up
        code: String,
    },

    /// Reading or writing the local key-value area failed
    #[error("Persistence error for key '{key}': {message}")]
    Persistence {
        /// Storage key involved
        key: String,
        /// Description of the failure
        message: String,
    },

    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the failure
        message: String,
    },

    /// The session event loop has stopped
    #[error("Session closed")]
    SessionClosed,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client error (connect, timeout, TLS, body decoding)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Returns the localized, human-readable message for errors that surface in the UI.
    ///
    /// Persistence, configuration and local I/O failures are never shown to the user,
    /// so they map to `None`.
    #[must_use]
    pub const fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::Network { .. } | Self::Http(_) => Some(MSG_NETWORK),
            Self::NoResults { .. } => Some(MSG_NO_RESULTS),
            Self::NotFound { .. } => Some(MSG_NOT_FOUND),
            Self::Persistence { .. }
            | Self::Config { .. }
            | Self::SessionClosed
            | Self::Io(_)
            | Self::Json(_) => None,
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
