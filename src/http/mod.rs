//! HTTP protocol layer module
//!
//! Header resolution, cache fingerprinting, content types, range parsing
//! and response builders, decoupled from the request pipeline.

pub mod fingerprint;
pub mod headers;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use fingerprint::FingerprintCache;
pub use headers::ResolvedHeaders;
pub use range::RangeOutcome;
