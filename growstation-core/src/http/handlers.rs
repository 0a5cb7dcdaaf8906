//! Request handlers
//!
//! Each handler runs once the request is fully received and produces a
//! [`Reply`]. Failures become short plain-text bodies; none of them reach
//! the control loop.

use growstation_hal::storage::{FlashStore, OpenMode};
use growstation_hal::system::SystemProbe;
use growstation_protocol::{Args, Method, Status};
use serde::Serialize;

use super::content_type::{self, content_type, GZIP, OCTET_STREAM};
use super::router::Endpoint;
use crate::runtime::Device;
use crate::status::{render, ListingError, ListingStream, SystemStatus};
use crate::storage::{Download, FileStore, StoreError, UploadSummary};

/// Object served for `GET /edit`
pub const EDITOR_PAGE: &str = "/edit.htm";

/// Argument that forces an opaque download
pub const DOWNLOAD_ARG: &str = "download";

/// Required argument is missing
pub const BAD_ARGS: &str = "BAD ARGS";
/// Path is the root or cannot be normalized
pub const BAD_PATH: &str = "BAD PATH";
/// Create target already exists
pub const FILE_EXISTS: &str = "FILE EXISTS";
/// Create target could not be opened
pub const CREATE_FAILED: &str = "CREATE FAILED";
/// Store refused to remove the object
pub const DELETE_FAILED: &str = "DELETE FAILED";
/// Directory could not be walked or serialized
pub const LIST_FAILED: &str = "LIST FAILED";
/// Resolved object could not be opened
pub const READ_FAILED: &str = "READ FAILED";
/// Uploaded data did not all reach the store
pub const UPLOAD_FAILED: &str = "UPLOAD FAILED";
/// Nothing stored under the path
pub const NOT_FOUND: &str = "FileNotFound";
/// Status document does not fit the JSON buffer
pub const TOO_LARGE: &str = "RESPONSE TOO LARGE";

/// Response body source
#[derive(Debug)]
pub enum Body<F> {
    /// Fixed text
    Text(&'static str),
    /// Rendered JSON of this length at the front of the server's JSON buffer
    Json(usize),
    /// Stored object streamed from flash
    File(Download<F>),
    /// Directory listing serialized as it is sent
    Listing(ListingStream),
}

/// Response produced by a handler
#[derive(Debug)]
pub struct Reply<F> {
    /// Response status
    pub status: Status,
    /// MIME type sent as `Content-Type`
    pub content_type: &'static str,
    /// `Content-Encoding` value, if any
    pub content_encoding: Option<&'static str>,
    /// Where the body bytes come from
    pub body: Body<F>,
}

impl<F> Reply<F> {
    /// Plain-text reply
    pub fn text(status: Status, body: &'static str) -> Self {
        Self {
            status,
            content_type: content_type::PLAIN,
            content_encoding: None,
            body: Body::Text(body),
        }
    }

    /// Empty `200` acknowledgement
    pub fn ok() -> Self {
        Self::text(Status::Ok, "")
    }
}

impl<F: growstation_hal::storage::StoredFile> Reply<F> {
    /// Exact body length
    pub fn content_length(&self) -> u32 {
        match &self.body {
            Body::Text(text) => text.len() as u32,
            Body::Json(len) => *len as u32,
            Body::File(download) => download.remaining(),
            Body::Listing(listing) => listing.length() as u32,
        }
    }
}

/// A fully received request
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    /// Request method
    pub method: Method,
    /// Decoded request path
    pub path: &'a str,
    /// Query arguments followed by body arguments
    pub args: &'a Args,
    /// Upload carried by this request, once finished
    pub upload: Option<&'a UploadSummary>,
}

/// Run the handler for `endpoint`, or the static fallback for `None`
pub fn dispatch<S, P>(
    endpoint: Option<Endpoint>,
    req: &Request<'_>,
    device: &mut Device<S, P>,
    json: &mut [u8],
) -> Reply<S::File>
where
    S: FlashStore,
    P: SystemProbe,
{
    let download = req.args.has(DOWNLOAD_ARG);

    match endpoint {
        Some(Endpoint::FileList) => file_list(req, &mut device.store),
        Some(Endpoint::Editor) => serve(&mut device.store, EDITOR_PAGE, download)
            .unwrap_or_else(|| Reply::text(Status::NotFound, NOT_FOUND)),
        Some(Endpoint::FileCreate) => file_create(req, &mut device.store),
        Some(Endpoint::FileDelete) => file_delete(req, &mut device.store),
        Some(Endpoint::FileUpload) => match req.upload {
            Some(summary) if !summary.intact => {
                Reply::text(Status::InternalServerError, UPLOAD_FAILED)
            }
            _ => Reply::ok(),
        },
        Some(Endpoint::SystemStatus) => {
            json_reply(&SystemStatus::capture(&mut device.probe), json)
        }
        Some(Endpoint::SensorData) => json_reply(&device.reading, json),
        Some(Endpoint::Config) => Reply {
            content_type: content_type::JSON,
            ..Reply::text(Status::Ok, "config")
        },
        None => serve(&mut device.store, req.path, download)
            .unwrap_or_else(|| Reply::text(Status::NotFound, NOT_FOUND)),
    }
}

fn json_reply<T: Serialize, F>(doc: &T, json: &mut [u8]) -> Reply<F> {
    match render(doc, json) {
        Ok(len) => Reply {
            status: Status::Ok,
            content_type: content_type::JSON,
            content_encoding: None,
            body: Body::Json(len),
        },
        Err(e) => {
            error!("JSON response rejected: {:?}", e);
            Reply::text(Status::InternalServerError, TOO_LARGE)
        }
    }
}

fn file_list<S: FlashStore>(req: &Request<'_>, store: &mut FileStore<S>) -> Reply<S::File> {
    let Some(dir) = req.args.get("dir") else {
        return Reply::text(Status::InternalServerError, BAD_ARGS);
    };
    info!("handleFileList: {}", dir);

    match ListingStream::open(store, dir) {
        Ok(listing) => Reply {
            status: Status::Ok,
            content_type: content_type::JSON,
            content_encoding: None,
            body: Body::Listing(listing),
        },
        Err(ListingError::Store(StoreError::BadPath)) => {
            Reply::text(Status::InternalServerError, BAD_PATH)
        }
        Err(e) => {
            error!("list {} failed: {:?}", dir, e);
            Reply::text(Status::InternalServerError, LIST_FAILED)
        }
    }
}

fn file_create<S: FlashStore>(req: &Request<'_>, store: &mut FileStore<S>) -> Reply<S::File> {
    let Some(path) = req.args.nth(0) else {
        return Reply::text(Status::InternalServerError, BAD_ARGS);
    };

    match store.create(path) {
        Ok(_) => Reply::ok(),
        Err(StoreError::BadPath) => Reply::text(Status::InternalServerError, BAD_PATH),
        Err(StoreError::Exists) => Reply::text(Status::InternalServerError, FILE_EXISTS),
        Err(_) => Reply::text(Status::InternalServerError, CREATE_FAILED),
    }
}

fn file_delete<S: FlashStore>(req: &Request<'_>, store: &mut FileStore<S>) -> Reply<S::File> {
    let Some(path) = req.args.nth(0) else {
        return Reply::text(Status::InternalServerError, BAD_ARGS);
    };

    match store.delete(path) {
        Ok(_) => Reply::ok(),
        Err(StoreError::BadPath) => Reply::text(Status::InternalServerError, BAD_PATH),
        Err(StoreError::NotFound) => Reply::text(Status::NotFound, NOT_FOUND),
        Err(_) => Reply::text(Status::InternalServerError, DELETE_FAILED),
    }
}

/// Serve a stored object by request path
///
/// Returns `None` when nothing is stored under the path. The MIME type
/// comes from the requested path even when the compressed variant is
/// streamed.
pub fn serve<S: FlashStore>(
    store: &mut FileStore<S>,
    path: &str,
    download: bool,
) -> Option<Reply<S::File>> {
    info!("handleFileRead: {}", path);

    let resolved = match store.resolve(path) {
        Ok(Some(resolved)) => resolved,
        Ok(None) => return None,
        Err(e) => {
            warn!("unservable path {}: {:?}", path, e);
            return None;
        }
    };

    let mime = content_type(resolved.requested.as_str(), download);
    let content_encoding =
        (resolved.compressed && mime != GZIP && mime != OCTET_STREAM).then_some("gzip");

    match store.open(&resolved.stored, OpenMode::Read) {
        Ok(file) => Some(Reply {
            status: Status::Ok,
            content_type: mime,
            content_encoding,
            body: Body::File(Download::new(file)),
        }),
        Err(e) => {
            error!("open {} failed: {:?}", resolved.stored.as_str(), e);
            Some(Reply::text(Status::InternalServerError, READ_FAILED))
        }
    }
}
