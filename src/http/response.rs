//! HTTP response building module
//!
//! Builders for the status codes the pipeline produces, decoupled from
//! routing and header-resolution logic.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

use crate::http::headers::ResolvedHeaders;
use crate::logger;

/// Build a 200 response carrying the resolved header set
pub fn ok(data: Bytes, headers: &ResolvedHeaders, is_head: bool) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(200);
    for (key, value) in headers {
        builder = builder.header(key, value);
    }

    let body = if is_head { Bytes::new() } else { data };
    builder.body(Full::new(body)).unwrap_or_else(|e| {
        log_build_error("200", &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Build a 206 Partial Content response for `start..=end` of `total`
pub fn partial(
    data: Bytes,
    headers: &ResolvedHeaders,
    start: u64,
    end: u64,
    total: u64,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(206);
    for (key, value) in headers {
        // the resolved length covers the whole file, not the slice
        if key != "Content-Length" {
            builder = builder.header(key, value);
        }
    }
    builder = builder
        .header("Content-Length", end - start + 1)
        .header("Content-Range", format!("bytes {start}-{end}/{total}"));

    let body = if is_head { Bytes::new() } else { data };
    builder.body(Full::new(body)).unwrap_or_else(|e| {
        log_build_error("206", &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Build a 304 Not Modified response, carrying only the cache-validation
/// headers from the resolved set
pub fn not_modified(headers: &ResolvedHeaders) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(304);
    for (key, value) in headers {
        if key == "ETag" || key == "Last-Modified" {
            builder = builder.header(key, value);
        }
    }

    builder.body(Full::new(Bytes::new())).unwrap_or_else(|e| {
        log_build_error("304", &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Build a 301 redirect response
pub fn redirect(target: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(301)
        .header("Location", target)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from("Redirecting...")))
        .unwrap_or_else(|e| {
            log_build_error("301", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build a 400 Bad Request response
pub fn bad_request() -> Response<Full<Bytes>> {
    Response::builder()
        .status(400)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from("400 Bad Request")))
        .unwrap_or_else(|e| {
            log_build_error("400", &e);
            Response::new(Full::new(Bytes::from("400 Bad Request")))
        })
}

/// Build a 404 Not Found response
pub fn not_found() -> Response<Full<Bytes>> {
    Response::builder()
        .status(404)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from("404 Not Found")))
        .unwrap_or_else(|e| {
            log_build_error("404", &e);
            Response::new(Full::new(Bytes::from("404 Not Found")))
        })
}

/// Build a 405 Method Not Allowed response
pub fn method_not_allowed() -> Response<Full<Bytes>> {
    Response::builder()
        .status(405)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Allow", "GET, HEAD")
        .body(Full::new(Bytes::from("405 Method Not Allowed")))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            Response::new(Full::new(Bytes::from("405 Method Not Allowed")))
        })
}

/// Build a 416 Range Not Satisfiable response
pub fn range_not_satisfiable(total: u64) -> Response<Full<Bytes>> {
    Response::builder()
        .status(416)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Content-Range", format!("bytes */{total}"))
        .body(Full::new(Bytes::from("Range Not Satisfiable")))
        .unwrap_or_else(|e| {
            log_build_error("416", &e);
            Response::new(Full::new(Bytes::from("Range Not Satisfiable")))
        })
}

/// Build a 500 Internal Server Error response
pub fn internal_error() -> Response<Full<Bytes>> {
    Response::builder()
        .status(500)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from("500 Internal Server Error")))
        .unwrap_or_else(|e| {
            log_build_error("500", &e);
            Response::new(Full::new(Bytes::from("500 Internal Server Error")))
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    logger::log_error(&format!("Failed to build {status} response: {error}"));
}
