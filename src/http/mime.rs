//! MIME type detection module
//!
//! Maps a file extension to a Content-Type value. Unknown extensions map
//! to nothing so the header can be omitted entirely.

/// Get the Content-Type for a file extension, or `None` when the
/// extension maps to no known type
pub fn content_type(extension: Option<&str>) -> Option<&'static str> {
    let value = match extension? {
        // Text
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "txt" | "md" => "text/plain; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "xml" => "application/xml",

        // JavaScript / WASM
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "json" | "map" => "application/json; charset=utf-8",
        "wasm" => "application/wasm",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "avif" => "image/avif",

        // Audio / video
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ogg" | "ogv" => "video/ogg",

        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",

        // Archives and documents
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",

        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        assert_eq!(content_type(Some("html")), Some("text/html; charset=utf-8"));
        assert_eq!(
            content_type(Some("js")),
            Some("application/javascript; charset=utf-8")
        );
        assert_eq!(content_type(Some("png")), Some("image/png"));
        assert_eq!(content_type(Some("woff2")), Some("font/woff2"));
    }

    #[test]
    fn test_unknown_extension_is_omitted() {
        assert_eq!(content_type(Some("xyz")), None);
        assert_eq!(content_type(None), None);
    }
}
