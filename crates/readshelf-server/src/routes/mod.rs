//! Proxy route handlers, one module per upstream source.

pub mod google_books;
pub mod nyt;
pub mod open_library;
