//! Request head parsing
//!
//! The head is parsed only once the blank line that terminates it is fully
//! buffered; until then [`RequestHead::parse`] reports `Ok(None)` and the
//! caller keeps collecting bytes. Nothing here ever waits for input.

use heapless::String;

use crate::args::{percent_decode, Args, ArgsError};
use crate::find;

/// Maximum request head size (request line plus headers)
pub const MAX_HEAD_LEN: usize = 1024;

/// Maximum decoded request path length
pub const MAX_URI_LEN: usize = 128;

/// Maximum multipart boundary length (RFC 2046 limit)
pub const MAX_BOUNDARY_LEN: usize = 70;

/// Errors from request parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HttpError {
    /// Request line or header is not valid HTTP/1.x
    Malformed,
    /// Head did not end within [`MAX_HEAD_LEN`] bytes
    HeadTooLarge,
    /// Request path exceeds [`MAX_URI_LEN`]
    UriTooLong,
    /// Method is not one the node understands
    UnsupportedMethod,
    /// Body uses a transfer coding other than identity
    UnsupportedEncoding,
    /// Query arguments could not be decoded
    Args(ArgsError),
    /// Output buffer too small while encoding
    BufferTooSmall,
}

impl From<ArgsError> for HttpError {
    fn from(e: ArgsError) -> Self {
        HttpError::Args(e)
    }
}

/// Request method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    /// Parse a method token (case-sensitive, as on the wire)
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "GET" => Some(Method::Get),
            "HEAD" => Some(Method::Head),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            "PATCH" => Some(Method::Patch),
            "DELETE" => Some(Method::Delete),
            "OPTIONS" => Some(Method::Options),
            _ => None,
        }
    }

    /// Wire token for this method
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }
}

/// How the request body is encoded
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BodyKind {
    /// No body
    None,
    /// `application/x-www-form-urlencoded`
    Form,
    /// `multipart/form-data` with the given boundary
    Multipart {
        /// Boundary without the leading dashes
        boundary: String<MAX_BOUNDARY_LEN>,
    },
    /// Anything else; delivered as the `plain` argument
    Plain,
}

impl BodyKind {
    /// Classify a `Content-Type` header value
    pub fn from_content_type(value: &str) -> Result<Self, HttpError> {
        let mut params = value.split(';');
        let mime = params.next().unwrap_or("").trim();

        if mime.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
            return Ok(BodyKind::Form);
        }

        if mime.eq_ignore_ascii_case("multipart/form-data") {
            let boundary = params
                .filter_map(|p| p.trim().split_once('='))
                .find(|(k, _)| k.trim().eq_ignore_ascii_case("boundary"))
                .map(|(_, v)| v.trim().trim_matches('"'))
                .filter(|b| !b.is_empty())
                .ok_or(HttpError::Malformed)?;

            let mut bounded = String::new();
            bounded.push_str(boundary).map_err(|_| HttpError::Malformed)?;
            return Ok(BodyKind::Multipart { boundary: bounded });
        }

        Ok(BodyKind::Plain)
    }
}

/// A parsed request head
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    /// Request method
    pub method: Method,
    /// Percent-decoded path, without the query string
    pub path: String<MAX_URI_LEN>,
    /// Query string arguments
    pub args: Args,
    /// Declared body length in bytes
    pub content_length: u32,
    /// Body encoding
    pub body: BodyKind,
}

impl RequestHead {
    /// Parse a request head from the start of `buf`
    ///
    /// Returns the head and the number of bytes it occupied, `Ok(None)`
    /// while the terminating blank line has not been buffered yet, or an
    /// error for a request that can never become valid.
    pub fn parse(buf: &[u8]) -> Result<Option<(Self, usize)>, HttpError> {
        let Some(end) = find(buf, b"\r\n\r\n") else {
            if buf.len() >= MAX_HEAD_LEN {
                return Err(HttpError::HeadTooLarge);
            }
            return Ok(None);
        };

        let text = core::str::from_utf8(&buf[..end]).map_err(|_| HttpError::Malformed)?;
        let mut lines = text.split("\r\n");

        let request_line = lines.next().ok_or(HttpError::Malformed)?;
        let mut parts = request_line.split(' ');
        let (Some(method), Some(target), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(HttpError::Malformed);
        };

        if !version.starts_with("HTTP/1.") {
            return Err(HttpError::Malformed);
        }
        let method = Method::parse(method).ok_or(HttpError::UnsupportedMethod)?;

        let (raw_path, query) = match target.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (target, None),
        };
        if !raw_path.starts_with('/') {
            return Err(HttpError::Malformed);
        }
        let path = percent_decode(raw_path, false).map_err(|e| match e {
            ArgsError::TooLong => HttpError::UriTooLong,
            _ => HttpError::Malformed,
        })?;

        let mut args = Args::new();
        if let Some(query) = query {
            args.parse_urlencoded(query)?;
        }

        let mut content_length = 0u32;
        let mut body = BodyKind::None;

        for line in lines {
            let (name, value) = line.split_once(':').ok_or(HttpError::Malformed)?;
            let name = name.trim();
            let value = value.trim();

            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.parse().map_err(|_| HttpError::Malformed)?;
            } else if name.eq_ignore_ascii_case("content-type") {
                body = BodyKind::from_content_type(value)?;
            } else if name.eq_ignore_ascii_case("transfer-encoding")
                && !value.eq_ignore_ascii_case("identity")
            {
                return Err(HttpError::UnsupportedEncoding);
            }
        }

        if content_length == 0 {
            body = BodyKind::None;
        } else if body == BodyKind::None {
            body = BodyKind::Plain;
        }

        Ok(Some((
            Self {
                method,
                path,
                args,
                content_length,
                body,
            },
            end + 4,
        )))
    }
}
