//! Static file serving module
//!
//! Locates the file a request path refers to, resolves its headers and
//! builds the response, including conditional and range handling.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::config::ServerState;
use crate::error::ServeError;
use crate::handler::RequestContext;
use crate::http::{self, headers, range, response, RangeOutcome};
use crate::logger;
use crate::routing;

const INDEX_FILE: &str = "index.html";

/// Serve the effective request path from the public root.
///
/// The path is resolved to its canonical slash-rooted form first, so
/// `.`/`..` segments collapse the same way they do for rule matching.
/// The literal path is tried before the rewritten one when it carries an
/// extension, so a catch-all rewrite never shadows real assets. Paths
/// without an extension prefer the rewrite target.
pub async fn serve(ctx: &RequestContext<'_>, state: &ServerState) -> Response<Full<Bytes>> {
    let path = routing::matcher::resolve_request_path(ctx.path);
    let rewritten = routing::resolve_rewrite(&state.rewrites, &path);

    let mut candidates: Vec<&str> = Vec::with_capacity(2);
    if Path::new(&path).extension().is_some() {
        candidates.push(&path);
        if let Some(target) = rewritten.as_deref() {
            candidates.push(target);
        }
    } else {
        if let Some(target) = rewritten.as_deref() {
            candidates.push(target);
        }
        candidates.push(&path);
    }

    for candidate in candidates {
        if let Some((absolute, stats)) = locate(state, candidate).await {
            return respond_with_file(ctx, state, &absolute, &stats).await;
        }
    }

    response::not_found()
}

/// Map a request path to a regular file under the public root, trying
/// `index.html` for directories. `None` means not found.
async fn locate(state: &ServerState, request_path: &str) -> Option<(PathBuf, std::fs::Metadata)> {
    let relative = request_path.trim_start_matches('/');
    if Path::new(relative)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        logger::log_warning(&format!("Path traversal attempt blocked: {request_path}"));
        return None;
    }

    let resolved = resolve_under_root(state, &state.public_root.join(relative))?;
    let stats = fs::metadata(&resolved).await.ok()?;

    if stats.is_dir() {
        let index = resolve_under_root(state, &resolved.join(INDEX_FILE))?;
        let stats = fs::metadata(&index).await.ok()?;
        return stats.is_file().then_some((index, stats));
    }

    Some((resolved, stats))
}

/// Canonicalize a target and, unless symlink traversal is enabled,
/// require it to stay under the public root
fn resolve_under_root(state: &ServerState, target: &Path) -> Option<PathBuf> {
    let resolved = target.canonicalize().ok()?;
    if !state.config.symlinks && !resolved.starts_with(&state.public_root) {
        logger::log_warning(&format!(
            "Symlink escape blocked: {} -> {}",
            target.display(),
            resolved.display()
        ));
        return None;
    }
    Some(resolved)
}

async fn respond_with_file(
    ctx: &RequestContext<'_>,
    state: &ServerState,
    absolute: &Path,
    stats: &std::fs::Metadata,
) -> Response<Full<Bytes>> {
    let open_path = absolute.to_path_buf();
    let resolved = headers::resolve(
        &state.config,
        &state.public_root,
        absolute,
        Some(stats),
        &state.fingerprints,
        move || fs::File::open(open_path),
    )
    .await;

    let resolved = match resolved {
        Ok(resolved) => resolved,
        Err(ServeError::Stream { path, source }) => {
            logger::log_error(&format!(
                "Failed to fingerprint '{}': {source}",
                path.display()
            ));
            return response::internal_error();
        }
        Err(e) => {
            logger::log_error(&format!("Failed to resolve headers: {e}"));
            return response::internal_error();
        }
    };

    if not_modified(ctx, &resolved) {
        return response::not_modified(&resolved);
    }

    let outcome = range::evaluate(ctx.range.as_deref(), stats.len());
    if let RangeOutcome::Unsatisfiable = outcome {
        return response::range_not_satisfiable(stats.len());
    }

    let data = match fs::read(absolute).await {
        Ok(data) => data,
        Err(e) => {
            logger::log_error(&format!("Failed to read '{}': {e}", absolute.display()));
            return response::internal_error();
        }
    };

    match outcome {
        RangeOutcome::Partial { start, end } => {
            let slice = usize::try_from(start)
                .ok()
                .zip(usize::try_from(end).ok())
                .and_then(|(s, e)| data.get(s..=e))
                .map(Bytes::copy_from_slice);
            match slice {
                Some(body) => {
                    response::partial(body, &resolved, start, end, stats.len(), ctx.is_head)
                }
                None => response::range_not_satisfiable(stats.len()),
            }
        }
        RangeOutcome::Full | RangeOutcome::Unsatisfiable => {
            response::ok(Bytes::from(data), &resolved, ctx.is_head)
        }
    }
}

/// Evaluate the conditional request headers against the resolved
/// validation header. ETag mode compares `If-None-Match` verbatim;
/// otherwise `If-Modified-Since` is parsed as an HTTP-date.
fn not_modified(ctx: &RequestContext<'_>, resolved: &http::ResolvedHeaders) -> bool {
    if let Some(client_etag) = ctx.if_none_match.as_deref() {
        if let Some((_, etag)) = resolved.iter().find(|(k, _)| k == "ETag") {
            return client_etag == etag;
        }
    }

    if let Some(since) = ctx.if_modified_since.as_deref() {
        if let Some((_, modified)) = resolved.iter().find(|(k, _)| k == "Last-Modified") {
            if let (Ok(since), Ok(modified)) = (
                chrono::DateTime::parse_from_rfc2822(since),
                chrono::DateTime::parse_from_rfc2822(modified),
            ) {
                return modified <= since;
            }
        }
    }

    false
}
