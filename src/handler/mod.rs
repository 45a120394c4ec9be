//! Request handling module
//!
//! Entry point for HTTP request processing: method validation, redirect
//! evaluation and dispatch into static file serving.

mod static_files;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Request, Response};
use percent_encoding::percent_decode_str;
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::ServerState;
use crate::http::response;
use crate::logger;
use crate::routing;

/// Request context encapsulating the pieces of the request the pipeline
/// needs after dispatch
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub is_head: bool,
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<String>,
    pub range: Option<String>,
}

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<ServerState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let raw_path = req.uri().path().to_string();

    let response = match decode_path(&raw_path) {
        Some(path) => dispatch(&req, &path, &state).await,
        None => response::bad_request(),
    };

    if state.config.logging.access_log {
        logger::log_access(method.as_str(), &raw_path, response.status().as_u16());
    }

    Ok(response)
}

/// Percent-decode a request path. `None` means the escape sequences do
/// not form valid UTF-8 and the request is unanswerable.
fn decode_path(raw: &str) -> Option<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

async fn dispatch(
    req: &Request<hyper::body::Incoming>,
    path: &str,
    state: &ServerState,
) -> Response<Full<Bytes>> {
    let method = req.method();
    if *method != Method::GET && *method != Method::HEAD {
        logger::log_warning(&format!("Method not allowed: {method}"));
        return response::method_not_allowed();
    }

    // Redirects outrank everything else
    if let Some(target) = routing::resolve_redirect(&state.config.redirects, path) {
        return response::redirect(&target);
    }

    let ctx = RequestContext {
        path,
        is_head: *method == Method::HEAD,
        if_none_match: header_string(req, "if-none-match"),
        if_modified_since: header_string(req, "if-modified-since"),
        range: header_string(req, "range"),
    };

    static_files::serve(&ctx, state).await
}

fn header_string(req: &Request<hyper::body::Incoming>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_path_unescapes_sequences() {
        assert_eq!(
            decode_path("/my%20file.txt"),
            Some("/my file.txt".to_string())
        );
        assert_eq!(
            decode_path("/caf%C3%A9/menu.html"),
            Some("/café/menu.html".to_string())
        );
        assert_eq!(decode_path("/plain/path"), Some("/plain/path".to_string()));
    }

    #[test]
    fn test_decode_path_rejects_invalid_utf8() {
        assert_eq!(decode_path("/%FF%FE"), None);
    }
}
