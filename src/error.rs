//! Error types for the widget crawler.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use widget_crawler::{Result, Crawler, DocumentId};
//!
//! async fn example(crawler: &Crawler) -> Result<()> {
//!     let widgets = crawler.try_crawl(DocumentId::new(42)).await?;
//!     println!("{} widgets", widgets.len());
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Channel | [`Error::Connect`], [`Error::ChannelClosed`] |
//! | Session | [`Error::SessionTimeout`] |
//! | External | [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when crawler configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Channel Errors
    // ========================================================================
    /// Channel could not be established.
    ///
    /// Returned when the server is unreachable or the handshake fails.
    #[error("Connection failed: {message}")]
    Connect {
        /// Description of the connection error.
        message: String,
    },

    /// Channel closed while requests were still outstanding.
    ///
    /// Returned when the remote end disappears mid-traversal.
    #[error("Channel closed before the traversal completed")]
    ChannelClosed,

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// Session exceeded its overall deadline.
    ///
    /// Returned when the crawl does not complete within the configured
    /// timeout; all in-flight work is cancelled before this surfaces.
    #[error("Session timed out after {timeout_ms}ms")]
    SessionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
        }
    }

    /// Creates a session timeout error.
    #[inline]
    pub fn session_timeout(timeout_ms: u64) -> Self {
        Self::SessionTimeout { timeout_ms }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::SessionTimeout { .. })
    }

    /// Returns `true` if this is a channel error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::ChannelClosed | Self::WebSocket(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::connect("server unreachable");
        assert_eq!(err.to_string(), "Connection failed: server unreachable");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("missing server URL");
        assert_eq!(err.to_string(), "Configuration error: missing server URL");
    }

    #[test]
    fn test_session_timeout_display() {
        let err = Error::session_timeout(60_000);
        assert_eq!(err.to_string(), "Session timed out after 60000ms");
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::session_timeout(1_000);
        let other_err = Error::connect("test");

        assert!(timeout_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        let conn_err = Error::connect("test");
        let closed_err = Error::ChannelClosed;
        let other_err = Error::config("test");

        assert!(conn_err.is_connection_error());
        assert!(closed_err.is_connection_error());
        assert!(!other_err.is_connection_error());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
