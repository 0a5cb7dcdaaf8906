//! MIME type resolution

/// Type forced by the `download` argument
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Type of a stored compressed archive
pub const GZIP: &str = "application/x-gzip";

/// Type used for every JSON response
pub const JSON: &str = "text/json";

/// Type used for diagnostic bodies
pub const PLAIN: &str = "text/plain";

const BY_EXTENSION: &[(&str, &str)] = &[
    (".htm", "text/html"),
    (".html", "text/html"),
    (".css", "text/css"),
    (".js", "application/javascript"),
    (".png", "image/png"),
    (".gif", "image/gif"),
    (".jpg", "image/jpeg"),
    (".ico", "image/x-icon"),
    (".xml", "text/xml"),
    (".pdf", "application/x-pdf"),
    (".zip", "application/x-zip"),
    (".gz", GZIP),
];

/// MIME type for `path`
///
/// With `download` set every object is sent as an opaque byte stream.
/// Unknown extensions are plain text.
pub fn content_type(path: &str, download: bool) -> &'static str {
    if download {
        return OCTET_STREAM;
    }

    BY_EXTENSION
        .iter()
        .find(|(ext, _)| path.ends_with(ext))
        .map(|(_, mime)| *mime)
        .unwrap_or(PLAIN)
}
