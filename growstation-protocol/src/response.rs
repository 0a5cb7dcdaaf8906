//! Response status and head encoding
//!
//! Every response closes the connection, so the head always carries an
//! exact `Content-Length` and `Connection: close`.

use core::fmt::Write;

use crate::encode::{ByteCounter, SliceWriter};
use crate::request::HttpError;

/// Response status codes used by the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    Ok,
    BadRequest,
    NotFound,
    PayloadTooLarge,
    InternalServerError,
    NotImplemented,
}

impl Status {
    /// Numeric status code
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::PayloadTooLarge => 413,
            Status::InternalServerError => 500,
            Status::NotImplemented => 501,
        }
    }

    /// Reason phrase
    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Bad Request",
            Status::NotFound => "Not Found",
            Status::PayloadTooLarge => "Payload Too Large",
            Status::InternalServerError => "Internal Server Error",
            Status::NotImplemented => "Not Implemented",
        }
    }
}

/// Status line and headers of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHead<'a> {
    /// Response status
    pub status: Status,
    /// `Content-Type` value
    pub content_type: &'a str,
    /// Exact body length in bytes
    pub content_length: u32,
    /// Optional `Content-Encoding` value
    pub content_encoding: Option<&'a str>,
}

impl ResponseHead<'_> {
    fn write_to<W: Write>(&self, w: &mut W) -> core::fmt::Result {
        write!(
            w,
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n",
            self.status.code(),
            self.status.reason(),
            self.content_type,
            self.content_length
        )?;
        if let Some(encoding) = self.content_encoding {
            write!(w, "Content-Encoding: {}\r\n", encoding)?;
        }
        w.write_str("Connection: close\r\n\r\n")
    }

    /// Exact encoded size in bytes
    pub fn encoded_len(&self) -> usize {
        let mut counter = ByteCounter::new();
        // Counting never fails
        let _ = self.write_to(&mut counter);
        counter.len()
    }

    /// Encode into `buf`, returning the number of bytes written
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, HttpError> {
        let needed = self.encoded_len();
        let dest = buf.get_mut(..needed).ok_or(HttpError::BufferTooSmall)?;
        let mut writer = SliceWriter::new(dest);
        self.write_to(&mut writer)
            .map_err(|_| HttpError::BufferTooSmall)?;
        Ok(writer.position())
    }
}
