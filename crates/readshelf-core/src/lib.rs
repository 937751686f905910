//! Core types for the Readshelf server: the error taxonomy shared by the
//! cache and proxy layers, the normalized upstream record shapes, and the
//! NYT list-slug helpers.

pub mod error;
pub mod slug;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
