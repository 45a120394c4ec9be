//! Request-path routing module
//!
//! Source pattern matching plus rewrite/redirect resolution on top of it.

pub mod matcher;
pub mod rewrites;

pub use matcher::{match_source, SourceMatch};
pub use rewrites::{resolve_redirect, resolve_rewrite};
