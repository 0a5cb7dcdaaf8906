//! Route table
//!
//! Requests are matched on exact method and path. Anything unmatched goes
//! to the static fallback, which serves stored objects by path. HEAD
//! matches like GET; the server drops the body.

use growstation_protocol::Method;

/// Handler selected for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Endpoint {
    /// `GET /list?dir=..`
    FileList,
    /// `GET /edit` serves the editor page
    Editor,
    /// `PUT /edit` creates an empty object
    FileCreate,
    /// `DELETE /edit` removes an object
    FileDelete,
    /// `POST /edit` acknowledges a multipart upload
    FileUpload,
    /// `GET /all`
    SystemStatus,
    /// `GET /data`
    SensorData,
    /// `GET /config`
    Config,
}

/// One entry of the route table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// Method the route answers
    pub method: Method,
    /// Exact request path
    pub path: &'static str,
    /// Handler run on a match
    pub endpoint: Endpoint,
}

const fn route(method: Method, path: &'static str, endpoint: Endpoint) -> Route {
    Route {
        method,
        path,
        endpoint,
    }
}

/// Registered routes
pub const ROUTES: &[Route] = &[
    route(Method::Get, "/list", Endpoint::FileList),
    route(Method::Get, "/edit", Endpoint::Editor),
    route(Method::Put, "/edit", Endpoint::FileCreate),
    route(Method::Delete, "/edit", Endpoint::FileDelete),
    route(Method::Post, "/edit", Endpoint::FileUpload),
    route(Method::Get, "/config", Endpoint::Config),
    route(Method::Get, "/all", Endpoint::SystemStatus),
    route(Method::Get, "/data", Endpoint::SensorData),
];

/// Find the endpoint for a request, `None` for the static fallback
pub fn lookup(method: Method, path: &str) -> Option<Endpoint> {
    let method = match method {
        Method::Head => Method::Get,
        other => other,
    };
    ROUTES
        .iter()
        .find(|r| r.method == method && r.path == path)
        .map(|r| r.endpoint)
}
