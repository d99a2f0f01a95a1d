//! Core types for devmap
//!
//! This module holds the error system shared by every other module:
//! - [`DevmapError`] - Enumerated error types covering all failure modes
//! - [`ErrorContext`] - User-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error to user-friendly format
//! - [`IntoAnyhowWithContext`] - Extension trait for error conversion
//!
//! Errors from one unit of work (one batch, one location, one marker) are logged
//! and absorbed by the surrounding operation; only the total failure of the
//! initial load surfaces as an error from a session.

pub mod error;

pub use error::{DevmapError, ErrorContext, IntoAnyhowWithContext, user_friendly_error};
