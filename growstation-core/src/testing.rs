//! In-memory collaborators for unit tests

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::string::{String, ToString};
use std::vec::Vec;

use embedded_io::{ErrorKind, ErrorType, Read, ReadReady, Write, WriteReady};

use growstation_hal::analog::{AnalogFrontEnd, CHANNEL_COUNT};
use growstation_hal::net::{LinkUp, Listener};
use growstation_hal::storage::{
    DirEntry, EntryKind, FlashStore, OpenMode, StorageError, StoredFile, Visit,
};
use growstation_hal::system::SystemProbe;
use growstation_hal::update::{UpdateError, UpdateObserver, UpdateSession};

use crate::config::MAX_INDEX_NAME_LEN;
use crate::http::{Body, Reply};
use crate::runtime::Device;
use crate::storage::FileStore;
use crate::status::MAX_DOCUMENT_LEN;

#[derive(Default)]
struct MemInner {
    files: BTreeMap<String, Vec<u8>>,
    fail_writes: bool,
    listed: Vec<String>,
}

/// Flat in-memory flash store; clones share contents
#[derive(Clone, Default)]
pub struct MemStore {
    inner: Rc<RefCell<MemInner>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, data: &[u8]) {
        self.inner
            .borrow_mut()
            .files
            .insert(path.to_string(), data.to_vec());
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.inner.borrow().files.get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        self.inner.borrow().files.keys().cloned().collect()
    }

    /// Every directory passed to `list`, in call order
    pub fn listed_dirs(&self) -> Vec<String> {
        self.inner.borrow().listed.clone()
    }

    /// Make every open for writing fail
    pub fn fail_opens(&self, fail: bool) {
        self.inner.borrow_mut().fail_writes = fail;
    }
}

pub struct MemFile {
    inner: Rc<RefCell<MemInner>>,
    path: String,
    mode: OpenMode,
    pos: usize,
}

impl ErrorType for MemFile {
    type Error = StorageError;
}

impl Read for MemFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError> {
        let inner = self.inner.borrow();
        let data = inner.files.get(&self.path).ok_or(StorageError::NotFound)?;
        let rest = data.get(self.pos..).unwrap_or(&[]);
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl Write for MemFile {
    fn write(&mut self, buf: &[u8]) -> Result<usize, StorageError> {
        if self.mode != OpenMode::Write {
            return Err(StorageError::Io);
        }
        let mut inner = self.inner.borrow_mut();
        let data = inner.files.get_mut(&self.path).ok_or(StorageError::NotFound)?;
        data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        Ok(())
    }
}

impl StoredFile for MemFile {
    fn size(&self) -> u32 {
        self.inner
            .borrow()
            .files
            .get(&self.path)
            .map_or(0, |d| d.len() as u32)
    }
}

impl FlashStore for MemStore {
    type File = MemFile;

    fn exists(&mut self, path: &str) -> bool {
        self.inner.borrow().files.contains_key(path)
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<MemFile, StorageError> {
        let mut inner = self.inner.borrow_mut();
        match mode {
            OpenMode::Read if !inner.files.contains_key(path) => {
                return Err(StorageError::NotFound)
            }
            OpenMode::Read => {}
            OpenMode::Write if inner.fail_writes => return Err(StorageError::Io),
            OpenMode::Write => {
                inner.files.insert(path.to_string(), Vec::new());
            }
        }

        Ok(MemFile {
            inner: self.inner.clone(),
            path: path.to_string(),
            mode,
            pos: 0,
        })
    }

    fn remove(&mut self, path: &str) -> Result<(), StorageError> {
        self.inner
            .borrow_mut()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }

    fn list(&mut self, dir: &str, visit: &mut Visit<'_>) -> Result<(), StorageError> {
        let mut prefix = dir.to_string();
        if !prefix.ends_with('/') {
            prefix.push('/');
        }

        let mut entries: Vec<DirEntry> = Vec::new();
        {
            let mut inner = self.inner.borrow_mut();
            inner.listed.push(dir.to_string());
            for (path, data) in inner.files.iter() {
                let Some(rest) = path.strip_prefix(prefix.as_str()) else {
                    continue;
                };

                let (entry_path, kind, size) = match rest.split_once('/') {
                    Some((sub, _)) => (std::format!("{}{}", prefix, sub), EntryKind::Dir, 0),
                    None => (path.clone(), EntryKind::File, data.len() as u32),
                };
                if entries.iter().any(|e| e.path.as_str() == entry_path) {
                    continue;
                }

                let mut owned = heapless::String::new();
                owned
                    .push_str(&entry_path)
                    .map_err(|_| StorageError::InvalidPath)?;
                entries.push(DirEntry {
                    path: owned,
                    size,
                    kind,
                });
            }
        }

        for entry in &entries {
            if visit(entry).is_break() {
                break;
            }
        }
        Ok(())
    }
}

struct ConnState {
    incoming: VecDeque<Vec<u8>>,
    eof: bool,
    output: Vec<u8>,
}

/// Scripted client connection; each read returns at most one chunk
#[derive(Clone)]
pub struct MockConn {
    state: Rc<RefCell<ConnState>>,
}

impl MockConn {
    /// Connection delivering `chunks`, then end-of-stream if `eof`
    pub fn with_chunks(chunks: &[&[u8]], eof: bool) -> Self {
        Self {
            state: Rc::new(RefCell::new(ConnState {
                incoming: chunks.iter().map(|c| c.to_vec()).collect(),
                eof,
                output: Vec::new(),
            })),
        }
    }

    /// Everything the server wrote so far
    pub fn output(&self) -> Vec<u8> {
        self.state.borrow().output.clone()
    }

    /// Check whether every other handle (the server's) is gone
    pub fn is_dropped(&self) -> bool {
        Rc::strong_count(&self.state) == 1
    }
}

impl ErrorType for MockConn {
    type Error = ErrorKind;
}

impl Read for MockConn {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        let mut state = self.state.borrow_mut();
        let Some(front) = state.incoming.front_mut() else {
            return if state.eof {
                Ok(0)
            } else {
                Err(ErrorKind::Other)
            };
        };

        let n = front.len().min(buf.len());
        buf[..n].copy_from_slice(&front[..n]);
        front.drain(..n);
        if front.is_empty() {
            state.incoming.pop_front();
        }
        Ok(n)
    }
}

impl ReadReady for MockConn {
    fn read_ready(&mut self) -> Result<bool, ErrorKind> {
        let state = self.state.borrow();
        Ok(!state.incoming.is_empty() || state.eof)
    }
}

impl Write for MockConn {
    fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
        self.state.borrow_mut().output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), ErrorKind> {
        Ok(())
    }
}

impl WriteReady for MockConn {
    fn write_ready(&mut self) -> Result<bool, ErrorKind> {
        Ok(true)
    }
}

/// Listener handing out queued connections
#[derive(Clone, Default)]
pub struct MockListener {
    queue: Rc<RefCell<VecDeque<MockConn>>>,
}

impl MockListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, conn: MockConn) {
        self.queue.borrow_mut().push_back(conn);
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl Listener for MockListener {
    type Conn = MockConn;
    type Error = ();

    fn accept(&mut self) -> Result<Option<MockConn>, ()> {
        Ok(self.queue.borrow_mut().pop_front())
    }
}

/// Analog front end returning fixed raw values
pub struct FixedFrontEnd {
    raw: [i16; CHANNEL_COUNT],
}

impl FixedFrontEnd {
    pub fn new(raw: [i16; CHANNEL_COUNT]) -> Self {
        Self { raw }
    }

    pub fn set(&mut self, raw: [i16; CHANNEL_COUNT]) {
        self.raw = raw;
    }
}

impl AnalogFrontEnd for FixedFrontEnd {
    fn read_raw(&mut self, channel: u8) -> i16 {
        self.raw[channel as usize % CHANNEL_COUNT]
    }
}

/// System probe with fixed values
pub struct FixedProbe {
    heap: u32,
    analog: u16,
    gpio: u32,
}

impl FixedProbe {
    pub fn new(heap: u32, analog: u16, gpio: u32) -> Self {
        Self { heap, analog, gpio }
    }
}

impl SystemProbe for FixedProbe {
    fn free_heap(&self) -> u32 {
        self.heap
    }

    fn ambient_analog(&mut self) -> u16 {
        self.analog
    }

    fn gpio_levels(&self) -> u32 {
        self.gpio
    }
}

/// One callback of a scripted update session
#[derive(Debug, Clone, Copy)]
pub enum UpdateStep {
    Start,
    Progress(u32, u32),
    Error(UpdateError),
    End,
}

/// Update session replaying one callback per poll
pub struct ScriptedUpdate {
    steps: VecDeque<UpdateStep>,
}

impl ScriptedUpdate {
    pub fn new(steps: &[UpdateStep]) -> Self {
        Self {
            steps: steps.iter().copied().collect(),
        }
    }

    pub fn idle() -> Self {
        Self::new(&[])
    }
}

impl UpdateSession for ScriptedUpdate {
    fn poll(&mut self, observer: &mut dyn UpdateObserver) {
        match self.steps.pop_front() {
            Some(UpdateStep::Start) => observer.on_start(),
            Some(UpdateStep::Progress(progress, total)) => observer.on_progress(progress, total),
            Some(UpdateStep::Error(error)) => observer.on_error(error),
            Some(UpdateStep::End) => observer.on_end(),
            None => {}
        }
    }
}

pub type TestDevice = Device<MemStore, FixedProbe>;

pub fn index_name() -> heapless::String<MAX_INDEX_NAME_LEN> {
    let mut name = heapless::String::new();
    let _ = name.push_str("index.htm");
    name
}

pub fn link_up() -> LinkUp {
    let mut hostname = heapless::String::new();
    let _ = hostname.push_str("espgrowstation");
    LinkUp {
        hostname,
        address: [192, 168, 4, 1],
    }
}

/// Device over `mem` with a probe reporting 40960 / 512 / 0x10001
pub fn device(mem: MemStore) -> TestDevice {
    Device::new(
        FileStore::new(mem, index_name()),
        FixedProbe::new(40960, 512, 0x1_0001),
    )
}

/// Collect a reply's whole body
pub fn read_body(reply: &mut Reply<MemFile>, json: &[u8], store: &mut FileStore<MemStore>) -> Vec<u8> {
    let mut out = Vec::new();
    match &mut reply.body {
        Body::Text(text) => out.extend_from_slice(text.as_bytes()),
        Body::Json(len) => out.extend_from_slice(&json[..*len]),
        Body::File(download) => {
            let mut buf = [0u8; 64];
            while !download.is_done() {
                let n = download.fill(&mut buf).unwrap();
                out.extend_from_slice(&buf[..n]);
            }
        }
        Body::Listing(listing) => {
            let mut buf = [0u8; MAX_DOCUMENT_LEN];
            while !listing.is_done() {
                let n = listing.fill(store, &mut buf).unwrap();
                out.extend_from_slice(&buf[..n]);
            }
        }
    }
    out
}
