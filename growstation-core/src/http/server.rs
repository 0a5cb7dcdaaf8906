//! Non-blocking HTTP server
//!
//! Serves one client at a time. Each call to [`HttpServer::poll`] does at
//! most one read and one write on the active connection and processes only
//! what is already buffered, so a slow client or a large transfer is
//! spread over as many loop iterations as it needs.
//!
//! ```text
//!   accept ──► Head ──► Body ──► Respond ──► close
//!               │        │          ▲
//!               └────────┴─ reject ─┘
//! ```
//!
//! Multipart file parts are handed to the upload slot as they arrive;
//! nothing else in the body is kept beyond the receive buffer.

use embassy_time::{Duration, Instant};
use embedded_io::{Read, ReadReady, Write, WriteReady};
use heapless::{String, Vec};

use growstation_hal::net::{Connection, Listener};
use growstation_hal::storage::{FlashStore, StoredFile};
use growstation_hal::system::SystemProbe;
use growstation_protocol::args::{MAX_ARG_NAME_LEN, MAX_ARG_VALUE_LEN};
use growstation_protocol::{
    Args, BodyKind, HttpError, Method, MultipartParser, PartEvent, RequestHead, ResponseHead,
    Status, PLAIN_ARG,
};

use super::handlers::{self, Body, Reply, Request};
use super::router::{self, Endpoint};
use crate::runtime::Device;
use crate::storage::{FileStore, UploadSummary};

/// Receive buffer size (request head plus in-flight body bytes)
pub const RX_BUFFER_LEN: usize = 2048;

/// Transmit buffer size
pub const TX_BUFFER_LEN: usize = 512;

/// Capacity for one rendered status document
pub const JSON_BUFFER_LEN: usize = 128;

/// Largest urlencoded or plain body accepted
pub const MAX_INLINE_BODY: usize = 512;

/// Why a connection was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CloseReason {
    /// Response fully sent
    Complete,
    /// Peer closed before the exchange completed
    PeerClosed,
    /// No progress within the idle timeout
    IdleTimeout,
    /// Transport error
    Io,
    /// Stored object or listing could not be read while streaming
    Storage,
    /// Response head could not be encoded
    Protocol,
}

/// Result of one step on the active exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Nothing could be done
    Idle,
    /// Bytes were received or sent
    Progress,
    /// Response fully sent
    Done,
}

/// Request rejected before reaching a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Reject {
    status: Status,
    body: &'static str,
}

const BAD_REQUEST: Reject = Reject {
    status: Status::BadRequest,
    body: "BAD REQUEST",
};

const PAYLOAD_TOO_LARGE: Reject = Reject {
    status: Status::PayloadTooLarge,
    body: "PAYLOAD TOO LARGE",
};

const NOT_IMPLEMENTED: Reject = Reject {
    status: Status::NotImplemented,
    body: "NOT IMPLEMENTED",
};

impl From<HttpError> for Reject {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::UnsupportedMethod | HttpError::UnsupportedEncoding => NOT_IMPLEMENTED,
            _ => BAD_REQUEST,
        }
    }
}

/// Multipart field value being collected
struct Field {
    name: String<MAX_ARG_NAME_LEN>,
    value: Vec<u8, MAX_ARG_VALUE_LEN>,
    truncated: bool,
}

impl Field {
    fn new(name: &str) -> Self {
        let mut field = Self {
            name: String::new(),
            value: Vec::new(),
            truncated: false,
        };
        field.truncated = field.name.push_str(name).is_err();
        field
    }

    fn extend(&mut self, data: &[u8]) {
        if self.value.extend_from_slice(data).is_err() {
            self.truncated = true;
        }
    }

    fn store(self, args: &mut Args) {
        if self.truncated {
            warn!("multipart field {} dropped: too long", self.name.as_str());
            return;
        }
        let Ok(value) = core::str::from_utf8(&self.value) else {
            warn!("multipart field {} dropped: not UTF-8", self.name.as_str());
            return;
        };
        if let Err(e) = args.push(&self.name, value) {
            warn!("multipart field {} dropped: {:?}", self.name.as_str(), e);
        }
    }
}

/// Destination of the current multipart part
enum Part {
    /// Between parts, or a part nobody wants
    Skip,
    /// File part feeding the upload slot
    Upload,
    /// Form field collected into the arguments
    Field(Field),
}

struct Multipart {
    parser: MultipartParser,
    part: Part,
}

enum Decoder {
    /// No body
    Empty,
    /// Urlencoded (`form`) or plain body, decoded once complete
    Inline { form: bool },
    /// Streamed multipart body
    Multipart(Multipart),
}

/// Response being transmitted
struct Outgoing<F> {
    tx: [u8; TX_BUFFER_LEN],
    tx_len: usize,
    tx_pos: usize,
    body: Body<F>,
    /// Bytes of a text or JSON body already moved into `tx`
    body_pos: usize,
}

impl<F: StoredFile> Outgoing<F> {
    /// Encode the response head; `head_only` leaves the body out
    fn new(reply: Reply<F>, head_only: bool) -> Result<Self, CloseReason> {
        let head = ResponseHead {
            status: reply.status,
            content_type: reply.content_type,
            content_length: reply.content_length(),
            content_encoding: reply.content_encoding,
        };

        let mut tx = [0u8; TX_BUFFER_LEN];
        let tx_len = head.encode(&mut tx).map_err(|_| CloseReason::Protocol)?;
        // The head still announces the length of the body left out
        let body = if head_only {
            Body::Text("")
        } else {
            reply.body
        };

        Ok(Self {
            tx,
            tx_len,
            tx_pos: 0,
            body,
            body_pos: 0,
        })
    }

    /// Move the next slice of the body into the empty transmit buffer
    fn refill<S>(&mut self, store: &mut FileStore<S>, json: &[u8]) -> Result<usize, CloseReason>
    where
        S: FlashStore<File = F>,
    {
        let source: &[u8] = match &mut self.body {
            Body::Text(text) => text.as_bytes(),
            Body::Json(len) => json.get(..*len).unwrap_or(&[]),
            Body::File(download) => {
                return download.fill(&mut self.tx).map_err(|e| {
                    error!("streaming failed: {:?}", e);
                    CloseReason::Storage
                });
            }
            Body::Listing(listing) => {
                return listing.fill(store, &mut self.tx).map_err(|e| {
                    error!("listing failed: {:?}", e);
                    CloseReason::Storage
                });
            }
        };

        let rest = source.get(self.body_pos..).unwrap_or(&[]);
        let n = rest.len().min(TX_BUFFER_LEN);
        self.tx[..n].copy_from_slice(&rest[..n]);
        self.body_pos += n;
        Ok(n)
    }

    /// Send at most one transmit buffer worth of bytes
    fn transmit<C, S>(
        &mut self,
        conn: &mut C,
        store: &mut FileStore<S>,
        json: &[u8],
    ) -> Result<Step, CloseReason>
    where
        C: Connection,
        S: FlashStore<File = F>,
    {
        if self.tx_pos == self.tx_len {
            self.tx_pos = 0;
            self.tx_len = self.refill(store, json)?;

            if self.tx_len == 0 {
                // Everything produced; close once the transport has drained
                if conn.write_ready().map_err(|_| CloseReason::Io)? {
                    conn.flush().map_err(|_| CloseReason::Io)?;
                    return Ok(Step::Done);
                }
                return Ok(Step::Idle);
            }
        }

        if !conn.write_ready().map_err(|_| CloseReason::Io)? {
            return Ok(Step::Idle);
        }

        let n = conn
            .write(&self.tx[self.tx_pos..self.tx_len])
            .map_err(|_| CloseReason::Io)?;
        if n == 0 {
            return Err(CloseReason::Io);
        }
        self.tx_pos += n;
        Ok(Step::Progress)
    }
}

enum Phase<F> {
    /// Collecting the request head
    Head,
    /// Collecting or streaming the body
    Body(Decoder),
    /// Sending the response
    Respond(Outgoing<F>),
}

/// One request/response exchange on an accepted connection
struct Exchange<C, F> {
    conn: C,
    phase: Phase<F>,
    rx: [u8; RX_BUFFER_LEN],
    rx_len: usize,
    head: Option<RequestHead>,
    args: Args,
    endpoint: Option<Endpoint>,
    /// Body bytes still on the wire
    unread: u32,
    /// Upload carried by this request, once its file part ended
    upload: Option<UploadSummary>,
    last_activity: Instant,
}

/// Drop the first `n` buffered bytes
fn consume(rx: &mut [u8], rx_len: &mut usize, n: usize) {
    let n = n.min(*rx_len);
    rx.copy_within(n..*rx_len, 0);
    *rx_len -= n;
}

impl<C: Connection, F: StoredFile> Exchange<C, F> {
    fn new(conn: C, now: Instant) -> Self {
        Self {
            conn,
            phase: Phase::Head,
            rx: [0; RX_BUFFER_LEN],
            rx_len: 0,
            head: None,
            args: Args::new(),
            endpoint: None,
            unread: 0,
            upload: None,
            last_activity: now,
        }
    }

    fn step<S, P>(&mut self, device: &mut Device<S, P>, json: &mut [u8]) -> Result<Step, CloseReason>
    where
        S: FlashStore<File = F>,
        P: SystemProbe,
    {
        let mut step = Step::Idle;

        if !matches!(self.phase, Phase::Respond(_)) && self.receive()? {
            step = Step::Progress;
            self.process(device, json)?;
        }

        if let Phase::Respond(out) = &mut self.phase {
            match out.transmit(&mut self.conn, &mut device.store, json)? {
                Step::Idle => {}
                other => step = other,
            }
        }
        Ok(step)
    }

    /// Read whatever the transport has buffered
    fn receive(&mut self) -> Result<bool, CloseReason> {
        if !self.conn.read_ready().map_err(|_| CloseReason::Io)? {
            return Ok(false);
        }

        let limit = match self.phase {
            Phase::Head => RX_BUFFER_LEN,
            _ => (self.rx_len + self.unread as usize).min(RX_BUFFER_LEN),
        };
        let spare = &mut self.rx[self.rx_len..limit];
        if spare.is_empty() {
            return Ok(false);
        }

        let n = self.conn.read(spare).map_err(|_| CloseReason::Io)?;
        if n == 0 {
            return Err(CloseReason::PeerClosed);
        }

        self.rx_len += n;
        if !matches!(self.phase, Phase::Head) {
            self.unread = self.unread.saturating_sub(n as u32);
        }
        Ok(true)
    }

    /// Advance through the request with the bytes buffered so far
    fn process<S, P>(&mut self, device: &mut Device<S, P>, json: &mut [u8]) -> Result<(), CloseReason>
    where
        S: FlashStore<File = F>,
        P: SystemProbe,
    {
        if matches!(self.phase, Phase::Head) {
            match RequestHead::parse(&self.rx[..self.rx_len]) {
                Ok(None) => return Ok(()),
                Ok(Some((head, used))) => {
                    if let Err(reject) = self.start(head, used) {
                        return self.reject(reject, device);
                    }
                }
                Err(e) => {
                    warn!("bad request: {:?}", e);
                    return self.reject(Reject::from(e), device);
                }
            }
        }

        match self.decode(device) {
            Ok(true) => self.dispatch(device, json),
            Ok(false) => Ok(()),
            Err(reject) => self.reject(reject, device),
        }
    }

    /// Take the parsed head and set up the body decoder
    fn start(&mut self, head: RequestHead, used: usize) -> Result<(), Reject> {
        consume(&mut self.rx, &mut self.rx_len, used);

        // Anything past the declared body is not part of this request
        let length = head.content_length as usize;
        self.rx_len = self.rx_len.min(length);
        self.unread = (length - self.rx_len) as u32;

        debug!("{} {}", head.method.as_str(), head.path.as_str());
        self.args = head.args.clone();
        self.endpoint = router::lookup(head.method, &head.path);

        let decoder = match &head.body {
            BodyKind::None => Decoder::Empty,
            BodyKind::Form | BodyKind::Plain if length > MAX_INLINE_BODY => {
                warn!("body of {} bytes too large", length);
                self.head = Some(head);
                return Err(PAYLOAD_TOO_LARGE);
            }
            BodyKind::Form => Decoder::Inline { form: true },
            BodyKind::Plain => Decoder::Inline { form: false },
            BodyKind::Multipart { boundary } => Decoder::Multipart(Multipart {
                parser: MultipartParser::new(boundary).map_err(|_| BAD_REQUEST)?,
                part: Part::Skip,
            }),
        };

        self.head = Some(head);
        self.phase = Phase::Body(decoder);
        Ok(())
    }

    /// Decode buffered body bytes, returning true once the body is complete
    fn decode<S, P>(&mut self, device: &mut Device<S, P>) -> Result<bool, Reject>
    where
        S: FlashStore<File = F>,
    {
        let Self {
            phase,
            rx,
            rx_len,
            args,
            endpoint,
            unread,
            upload,
            ..
        } = self;

        let Phase::Body(decoder) = phase else {
            return Ok(false);
        };

        match decoder {
            Decoder::Empty => Ok(true),
            Decoder::Inline { form } => {
                if *unread > 0 {
                    return Ok(false);
                }
                let text = core::str::from_utf8(&rx[..*rx_len]).map_err(|_| BAD_REQUEST)?;
                if *form {
                    args.parse_urlencoded(text).map_err(|_| BAD_REQUEST)?;
                } else {
                    args.push(PLAIN_ARG, text).map_err(|_| PAYLOAD_TOO_LARGE)?;
                }
                *rx_len = 0;
                Ok(true)
            }
            Decoder::Multipart(Multipart { parser, part }) => {
                let uploads = *endpoint == Some(Endpoint::FileUpload);
                let transfer = &mut device.transfer;
                let store = &mut device.store;

                let mut on_event = |event: PartEvent<'_>| match event {
                    PartEvent::Begin(info) => {
                        *part = match info.filename {
                            Some(filename) if uploads => {
                                transfer.begin(store, filename);
                                Part::Upload
                            }
                            Some(_) => Part::Skip,
                            None => Part::Field(Field::new(info.name)),
                        };
                    }
                    PartEvent::Data(data) => match part {
                        Part::Upload => transfer.write(data),
                        Part::Field(field) => field.extend(data),
                        Part::Skip => {}
                    },
                    PartEvent::End => match core::mem::replace(part, Part::Skip) {
                        Part::Upload => {
                            if let Some(summary) = transfer.finish() {
                                // Keep the first damaged upload if there were several
                                if upload.as_ref().map_or(true, |u| u.intact) {
                                    *upload = Some(summary);
                                }
                            }
                        }
                        Part::Field(field) => field.store(args),
                        Part::Skip => {}
                    },
                };

                let used = match parser.feed(&rx[..*rx_len], &mut on_event) {
                    Ok(used) => used,
                    Err(e) => {
                        warn!("multipart body rejected: {:?}", e);
                        return Err(BAD_REQUEST);
                    }
                };
                consume(rx, rx_len, used);

                if parser.is_finished() {
                    *rx_len = 0;
                    return Ok(true);
                }
                if *unread == 0 || (used == 0 && *rx_len == RX_BUFFER_LEN) {
                    warn!("multipart body ended early");
                    return Err(BAD_REQUEST);
                }
                Ok(false)
            }
        }
    }

    /// Run the handler and start the response
    fn dispatch<S, P>(&mut self, device: &mut Device<S, P>, json: &mut [u8]) -> Result<(), CloseReason>
    where
        S: FlashStore<File = F>,
        P: SystemProbe,
    {
        let Some(head) = self.head.as_ref() else {
            return Err(CloseReason::Protocol);
        };

        let request = Request {
            method: head.method,
            path: head.path.as_str(),
            args: &self.args,
            upload: self.upload.as_ref(),
        };
        let reply = handlers::dispatch(self.endpoint, &request, device, json);
        debug!(
            "{} {} -> {}",
            head.method.as_str(),
            head.path.as_str(),
            reply.status.code()
        );

        self.phase = Phase::Respond(Outgoing::new(reply, self.head_only())?);
        Ok(())
    }

    /// Answer with a fixed error and drop the rest of the request
    fn reject<S, P>(&mut self, reject: Reject, device: &mut Device<S, P>) -> Result<(), CloseReason>
    where
        S: FlashStore<File = F>,
    {
        device.transfer.abort(&mut device.store);
        self.rx_len = 0;
        let reply = Reply::text(reject.status, reject.body);
        self.phase = Phase::Respond(Outgoing::new(reply, self.head_only())?);
        Ok(())
    }

    /// HEAD requests get the response head without a body
    fn head_only(&self) -> bool {
        self.head.as_ref().is_some_and(|h| h.method == Method::Head)
    }
}

/// Cooperative HTTP server over a non-blocking listener
pub struct HttpServer<L: Listener, S: FlashStore> {
    listener: L,
    exchange: Option<Exchange<L::Conn, S::File>>,
    idle_timeout: Duration,
    json: [u8; JSON_BUFFER_LEN],
}

impl<L: Listener, S: FlashStore> HttpServer<L, S> {
    /// Create a server; connections idle longer than `idle_timeout` are dropped
    pub fn new(listener: L, idle_timeout: Duration) -> Self {
        Self {
            listener,
            exchange: None,
            idle_timeout,
            json: [0; JSON_BUFFER_LEN],
        }
    }

    /// Check whether a client is being served
    pub fn is_busy(&self) -> bool {
        self.exchange.is_some()
    }

    /// Accept a client if idle, then advance the active exchange one step
    pub fn poll<P: SystemProbe>(&mut self, now: Instant, device: &mut Device<S, P>) {
        if self.exchange.is_none() {
            match self.listener.accept() {
                Ok(Some(conn)) => {
                    trace!("client connected");
                    self.exchange = Some(Exchange::new(conn, now));
                }
                Ok(None) => return,
                Err(_) => {
                    warn!("accept failed");
                    return;
                }
            }
        }

        let Some(exchange) = self.exchange.as_mut() else {
            return;
        };

        let reason = match exchange.step(device, &mut self.json) {
            Ok(Step::Progress) => {
                exchange.last_activity = now;
                return;
            }
            Ok(Step::Idle) => {
                if now.saturating_duration_since(exchange.last_activity) <= self.idle_timeout {
                    return;
                }
                CloseReason::IdleTimeout
            }
            Ok(Step::Done) => CloseReason::Complete,
            Err(reason) => reason,
        };

        self.close(reason, device);
    }

    fn close<P>(&mut self, reason: CloseReason, device: &mut Device<S, P>) {
        // Dropping the exchange closes the connection
        self.exchange = None;

        match reason {
            CloseReason::Complete => trace!("client done"),
            CloseReason::PeerClosed => debug!("client closed connection"),
            other => warn!("connection dropped: {:?}", other),
        }

        // An upload still open here was abandoned mid-body
        device.transfer.abort(&mut device.store);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{device, MemStore, MockConn, MockListener, TestDevice};
    use std::vec::Vec as StdVec;

    type Server = HttpServer<MockListener, MemStore>;

    fn setup() -> (MemStore, TestDevice, MockListener, Server) {
        let mem = MemStore::new();
        let listener = MockListener::new();
        let server = HttpServer::new(listener.clone(), Duration::from_millis(5000));
        (mem.clone(), device(mem), listener, server)
    }

    /// Poll until the connection is closed, one millisecond per iteration
    fn run(server: &mut Server, device: &mut TestDevice, start_ms: u64) -> u64 {
        let mut ms = start_ms;
        server.poll(Instant::from_millis(ms), device);
        while server.is_busy() {
            ms += 1;
            assert!(ms - start_ms < 100_000, "server never finished");
            server.poll(Instant::from_millis(ms), device);
        }
        ms
    }

    fn request(server: &mut Server, device: &mut TestDevice, listener: &MockListener, raw: &[u8]) -> StdVec<u8> {
        let conn = MockConn::with_chunks(&[raw], true);
        listener.push(conn.clone());
        run(server, device, 0);
        conn.output()
    }

    fn body(response: &[u8]) -> &[u8] {
        let at = response
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("no head");
        &response[at + 4..]
    }

    fn multipart(filename: &str, data: &[u8]) -> StdVec<u8> {
        let mut body = StdVec::new();
        body.extend_from_slice(b"--B0und\r\nContent-Disposition: form-data; name=\"data\"; filename=\"");
        body.extend_from_slice(filename.as_bytes());
        body.extend_from_slice(b"\"\r\nContent-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n--B0und--\r\n");

        let mut raw = StdVec::new();
        raw.extend_from_slice(
            std::format!(
                "POST /edit HTTP/1.1\r\nContent-Type: multipart/form-data; boundary=B0und\r\nContent-Length: {}\r\n\r\n",
                body.len()
            )
            .as_bytes(),
        );
        raw.extend_from_slice(&body);
        raw
    }

    #[test]
    fn test_sensor_data_response() {
        let (_, mut device, listener, mut server) = setup();
        device.reading.soil = [10, 45, 80, 0];

        let out = request(&mut server, &mut device, &listener, b"GET /data HTTP/1.1\r\nHost: node\r\n\r\n");
        let text = std::str::from_utf8(&out).unwrap();

        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: text/json\r\n"));
        assert!(text.contains("Content-Length: 44\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert_eq!(body(&out), b"{\"soil0\":10,\"soil1\":45,\"soil2\":80,\"soil3\":0}");
    }

    #[test]
    fn test_head_split_across_reads() {
        let (_, mut device, listener, mut server) = setup();
        let conn = MockConn::with_chunks(
            &[b"GET /con", b"fig HTTP/1.1\r\n", b"Host: node\r", b"\n\r\n"],
            true,
        );
        listener.push(conn.clone());
        run(&mut server, &mut device, 0);

        assert_eq!(body(&conn.output()), b"config");
    }

    #[test]
    fn test_upload_streams_to_store() {
        let (mem, mut device, listener, mut server) = setup();
        let data: StdVec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();
        let raw = multipart("fw/notes.bin", &data);

        // Deliver in small pieces so the part spans many loop iterations
        let chunks: StdVec<&[u8]> = raw.chunks(97).collect();
        let conn = MockConn::with_chunks(&chunks, true);
        listener.push(conn.clone());
        run(&mut server, &mut device, 0);

        let out = conn.output();
        assert!(out.starts_with(b"HTTP/1.1 200 OK\r\n"));
        assert_eq!(body(&out), b"");
        assert_eq!(mem.contents("/fw/notes.bin").unwrap(), data);
        assert!(!device.transfer.is_active());
    }

    #[test]
    fn test_upload_integrity_gap_reported() {
        let (mem, mut device, listener, mut server) = setup();
        mem.fail_opens(true);

        let out = request(&mut server, &mut device, &listener, &multipart("x.bin", b"lost"));
        assert!(out.starts_with(b"HTTP/1.1 500 "));
        assert_eq!(body(&out), b"UPLOAD FAILED");
    }

    #[test]
    fn test_file_part_ignored_off_upload_route() {
        let (mem, mut device, listener, mut server) = setup();
        let mut raw = multipart("sneaky.txt", b"data");
        // Same body, create route
        raw.splice(0..5, b"PUT ".iter().copied());

        let out = request(&mut server, &mut device, &listener, &raw);
        assert_eq!(body(&out), b"BAD ARGS");
        assert!(mem.paths().is_empty());
    }

    #[test]
    fn test_peer_close_mid_upload_aborts() {
        let (mem, mut device, listener, mut server) = setup();
        let raw = multipart("half.bin", &[7u8; 1500]);
        let conn = MockConn::with_chunks(&[&raw[..900]], true);
        listener.push(conn.clone());
        run(&mut server, &mut device, 0);

        assert!(conn.output().is_empty());
        assert!(!device.transfer.is_active());
        assert_eq!(mem.contents("/half.bin"), None);
    }

    #[test]
    fn test_idle_timeout_aborts_upload() {
        let (mem, mut device, listener, mut server) = setup();
        let raw = multipart("slow.bin", &[7u8; 1500]);
        let conn = MockConn::with_chunks(&[&raw[..900]], false);
        listener.push(conn.clone());

        server.poll(Instant::from_millis(0), &mut device);
        server.poll(Instant::from_millis(1), &mut device);
        assert!(device.transfer.is_active());

        server.poll(Instant::from_millis(4000), &mut device);
        assert!(server.is_busy());
        server.poll(Instant::from_millis(6000), &mut device);

        assert!(!server.is_busy());
        assert!(!device.transfer.is_active());
        assert_eq!(mem.contents("/slow.bin"), None);
        assert!(conn.is_dropped());
    }

    #[test]
    fn test_form_body_arguments() {
        let (mem, mut device, listener, mut server) = setup();
        let out = request(
            &mut server,
            &mut device,
            &listener,
            b"PUT /edit HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: 15\r\n\r\npath=%2Fnew.txt",
        );

        assert!(out.starts_with(b"HTTP/1.1 200 OK\r\n"));
        assert_eq!(mem.contents("/new.txt"), Some(StdVec::new()));
    }

    #[test]
    fn test_plain_body_is_first_argument() {
        let (mem, mut device, listener, mut server) = setup();
        mem.insert("/old.txt", b"x");
        let out = request(
            &mut server,
            &mut device,
            &listener,
            b"DELETE /edit HTTP/1.1\r\nContent-Length: 8\r\n\r\n/old.txt",
        );

        assert!(out.starts_with(b"HTTP/1.1 200 OK\r\n"));
        assert_eq!(mem.contents("/old.txt"), None);
    }

    #[test]
    fn test_query_argument_precedes_body() {
        let (_, mut device, listener, mut server) = setup();
        let out = request(
            &mut server,
            &mut device,
            &listener,
            b"DELETE /edit?path=/ HTTP/1.1\r\nContent-Length: 8\r\n\r\n/old.txt",
        );
        assert_eq!(body(&out), b"BAD PATH");
    }

    #[test]
    fn test_large_download_in_chunks() {
        let (mem, mut device, listener, mut server) = setup();
        let data: StdVec<u8> = (0..5000u32).map(|i| (i % 13) as u8 + b'a').collect();
        mem.insert("/big.txt", &data);

        let out = request(&mut server, &mut device, &listener, b"GET /big.txt HTTP/1.1\r\n\r\n");
        assert!(std::str::from_utf8(&out[..120]).unwrap_or("").contains("Content-Length: 5000\r\n"));
        assert_eq!(body(&out), data.as_slice());
    }

    #[test]
    fn test_compressed_variant_headers() {
        let (mem, mut device, listener, mut server) = setup();
        mem.insert("/index.htm.gz", b"\x1f\x8bzipped");

        let out = request(&mut server, &mut device, &listener, b"GET / HTTP/1.1\r\n\r\n");
        let text = std::string::String::from_utf8_lossy(&out);
        assert!(text.contains("Content-Type: text/html\r\n"));
        assert!(text.contains("Content-Encoding: gzip\r\n"));
        assert_eq!(body(&out), b"\x1f\x8bzipped");
    }

    #[test]
    fn test_head_request_has_no_body() {
        let (mem, mut device, listener, mut server) = setup();
        mem.insert("/big.txt", &[b'a'; 3000]);

        let out = request(&mut server, &mut device, &listener, b"HEAD /big.txt HTTP/1.1\r\n\r\n");
        let text = std::str::from_utf8(&out).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Length: 3000\r\n"));
        assert_eq!(body(&out), b"");

        let out = request(&mut server, &mut device, &listener, b"HEAD /data HTTP/1.1\r\n\r\n");
        assert!(std::str::from_utf8(&out).unwrap().contains("Content-Length: 44\r\n"));
        assert_eq!(body(&out), b"");
    }

    #[test]
    fn test_long_listing_streams() {
        let (mem, mut device, listener, mut server) = setup();
        for i in 0..40 {
            mem.insert(&std::format!("/{:02}{}", i, "n".repeat(61)), b"x");
        }

        let out = request(&mut server, &mut device, &listener, b"GET /list?dir=/ HTTP/1.1\r\n\r\n");
        let text = std::str::from_utf8(&out).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        let json = body(&out);
        assert!(text.contains(&std::format!("Content-Length: {}\r\n", json.len())));
        assert_eq!(json.len(), 40 * 88 + 39 + 2);
        assert!(json.starts_with(b"[{\"type\":\"file\",\"name\":\"00"));
        assert!(json.ends_with(b"\"}]"));
    }

    #[test]
    fn test_not_found() {
        let (_, mut device, listener, mut server) = setup();
        let out = request(&mut server, &mut device, &listener, b"GET /nope HTTP/1.1\r\n\r\n");
        assert!(out.starts_with(b"HTTP/1.1 404 Not Found\r\n"));
        assert_eq!(body(&out), b"FileNotFound");
    }

    #[test]
    fn test_malformed_request_line() {
        let (_, mut device, listener, mut server) = setup();
        let out = request(&mut server, &mut device, &listener, b"GARBAGE\r\n\r\n");
        assert!(out.starts_with(b"HTTP/1.1 400 "));
    }

    #[test]
    fn test_unsupported_method() {
        let (_, mut device, listener, mut server) = setup();
        let out = request(&mut server, &mut device, &listener, b"BREW /pot HTTP/1.1\r\n\r\n");
        assert!(out.starts_with(b"HTTP/1.1 501 "));
    }

    #[test]
    fn test_oversized_form_body() {
        let (_, mut device, listener, mut server) = setup();
        let out = request(
            &mut server,
            &mut device,
            &listener,
            b"PUT /edit HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: 4096\r\n\r\npath=",
        );
        assert!(out.starts_with(b"HTTP/1.1 413 "));
    }

    #[test]
    fn test_one_client_at_a_time() {
        let (_, mut device, listener, mut server) = setup();
        let first = MockConn::with_chunks(&[b"GET /config HTTP/1.1\r\n\r\n"], true);
        let second = MockConn::with_chunks(&[b"GET /config HTTP/1.1\r\n\r\n"], true);
        listener.push(first.clone());
        listener.push(second.clone());

        server.poll(Instant::from_millis(0), &mut device);
        assert!(second.output().is_empty());
        assert_eq!(listener.pending(), 1);

        let end = run(&mut server, &mut device, 1);
        assert_eq!(body(&first.output()), b"config");
        run(&mut server, &mut device, end + 1);
        assert_eq!(body(&second.output()), b"config");
    }
}
