//! Growstation HTTP wire layer
//!
//! This crate turns buffered bytes into requests and responses into
//! bytes for the node's file-management service. It never performs I/O
//! itself: callers hand it whatever the network stack has buffered and
//! get back how much of it was used.
//!
//! # Request flow
//!
//! ```text
//! bytes ──► RequestHead::parse ──► Args (query)
//!                 │
//!                 ├─ Form / Plain ─────► Args (body)
//!                 └─ Multipart ──► MultipartParser ──► PartEvent stream
//! ```
//!
//! Responses are encoded with an exact `Content-Length` computed in a
//! measuring pass before any byte is written.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod args;
pub mod encode;
pub mod multipart;
pub mod request;
pub mod response;

pub use args::{Arg, Args, ArgsError, MAX_ARGS, PLAIN_ARG};
pub use encode::{ByteCounter, SliceWriter};
pub use multipart::{MultipartError, MultipartParser, PartEvent, PartInfo};
pub use request::{BodyKind, HttpError, Method, RequestHead, MAX_HEAD_LEN, MAX_URI_LEN};
pub use response::{ResponseHead, Status};

/// Position of the first occurrence of `needle` in `haystack`
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
