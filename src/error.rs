//! Error types for icon-fallback
//!
//! The fallback state machine itself has no error results: a failed image
//! load is absorbed by the transition table and the worst case is convergence
//! on the placeholder. Errors exist only at the boundary (HTML parsing, file
//! I/O for the CLI), and all of them use the `thiserror` crate for proper
//! error trait implementations.

use thiserror::Error;

/// Result type alias for icon-fallback operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
  /// HTML or boundary-value parsing error
  #[error("Parse error: {0}")]
  Parse(#[from] ParseError),

  /// I/O error (file reading for the CLI)
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  /// Generic error for miscellaneous issues
  #[error("{0}")]
  Other(String),
}

/// Errors raised while parsing input at the crate boundary.
#[derive(Error, Debug, Clone)]
pub enum ParseError {
  /// The HTML byte stream could not be parsed
  #[error("Invalid HTML: {message}")]
  InvalidHtml { message: String },

  /// A document readiness value was not one of loading/interactive/complete
  #[error("Invalid ready state: '{value}'")]
  InvalidReadyState { value: String },
}
