//! Response header resolution module
//!
//! Merges the default header set derived from file stats with headers
//! from every matching configured rule. Rule values win on collision and
//! a null rule value suppresses the header entirely.

use chrono::{DateTime, Utc};
use std::fs::Metadata;
use std::future::Future;
use std::io;
use std::path::Path;
use tokio::io::AsyncRead;

use crate::config::Config;
use crate::error::ServeError;
use crate::http::fingerprint::{mtime_millis, FingerprintCache};
use crate::http::mime;
use crate::routing::matcher;

/// Final header mapping, insertion order preserved for serialization
pub type ResolvedHeaders = Vec<(String, String)>;

/// Resolve the response headers for a target path.
///
/// With `stats` the default set carries content metadata plus exactly one
/// cache-validation header: a quoted `ETag` fingerprint when ETag mode is
/// on, a `Last-Modified` HTTP-date otherwise. Without `stats` (directory
/// or virtual path) only rule-derived headers apply. Header rules are
/// evaluated cumulatively in configuration order against the path
/// relative to `current_dir`, segments disabled.
///
/// `open` produces the byte stream for fingerprinting; it is not invoked
/// on a cache hit or when ETag mode is off.
pub async fn resolve<F, Fut, R>(
    config: &Config,
    current_dir: &Path,
    absolute_path: &Path,
    stats: Option<&Metadata>,
    cache: &FingerprintCache,
    open: F,
) -> Result<ResolvedHeaders, ServeError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = io::Result<R>>,
    R: AsyncRead + Unpin,
{
    let mut resolved: Vec<(String, Option<String>)> = Vec::new();

    if let Some(stats) = stats {
        let base = absolute_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        append(&mut resolved, "Content-Length", Some(stats.len().to_string()));
        // "inline" asks the browser to render the file and only fall
        // back to saving it when it cannot. Quotes and backslashes in
        // the name would break out of the quoted-string form.
        let escaped = base.replace('\\', "\\\\").replace('"', "\\\"");
        append(
            &mut resolved,
            "Content-Disposition",
            Some(format!("inline; filename=\"{escaped}\"")),
        );
        append(&mut resolved, "Accept-Ranges", Some("bytes".to_string()));

        // Exactly one cache-validation header, never neither
        let stream_err = |source: io::Error| ServeError::Stream {
            path: absolute_path.to_path_buf(),
            source,
        };
        if config.etag {
            let mtime = mtime_millis(stats).map_err(stream_err)?;
            let hash = cache
                .fingerprint(open, absolute_path, mtime)
                .await
                .map_err(stream_err)?;
            append(&mut resolved, "ETag", Some(format!("\"{hash}\"")));
        } else {
            let modified = stats.modified().map_err(stream_err)?;
            append(&mut resolved, "Last-Modified", Some(http_date(modified)));
        }

        let extension = absolute_path.extension().and_then(|e| e.to_str());
        if let Some(value) = mime::content_type(extension) {
            append(&mut resolved, "Content-Type", Some(value.to_string()));
        }
    }

    // All matching rules apply, not just the first; later rules win
    // per key.
    let relative = relative_request_path(current_dir, absolute_path);
    for rule in &config.headers {
        if matcher::match_source(&rule.source, &relative, false).is_some() {
            for pair in &rule.headers {
                append(&mut resolved, &pair.key, pair.value.clone());
            }
        }
    }

    // A null value at this point means "suppress this header"
    Ok(resolved
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect())
}

/// Insert or overwrite a key, keeping the position of the first insert
fn append(target: &mut Vec<(String, Option<String>)>, key: &str, value: Option<String>) {
    match target.iter_mut().find(|(k, _)| k == key) {
        Some(slot) => slot.1 = value,
        None => target.push((key.to_string(), value)),
    }
}

/// Format a timestamp per HTTP-date rules (RFC 7231 IMF-fixdate)
pub fn http_date(time: std::time::SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Slash-normalized path of the target relative to the serving root
fn relative_request_path(current_dir: &Path, absolute_path: &Path) -> String {
    let relative = absolute_path.strip_prefix(current_dir).unwrap_or(absolute_path);
    relative.to_string_lossy().replace('\\', "/")
}
