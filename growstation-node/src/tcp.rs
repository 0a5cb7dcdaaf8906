//! Non-blocking TCP transport
//!
//! The runtime never waits on a socket. Reads only happen after
//! `read_ready`, and writes are staged in a small per-connection buffer
//! that `write_ready` drains, so a slow client only ever stalls its own
//! response.

use std::io::{self, Read as _, Write as _};
use std::net::{SocketAddr, TcpListener, TcpStream};

use growstation_hal::net::Listener;

/// Listening socket in non-blocking mode
pub struct TcpAcceptor {
    listener: TcpListener,
}

impl TcpAcceptor {
    /// Bind to `addr`
    pub fn bind(addr: SocketAddr) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        Ok(Self { listener })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Listener for TcpAcceptor {
    type Conn = TcpConn;
    type Error = io::Error;

    fn accept(&mut self) -> Result<Option<TcpConn>, io::Error> {
        match self.listener.accept() {
            Ok((stream, peer)) => {
                tracing::debug!("client connected from {}", peer);
                stream.set_nonblocking(true)?;
                stream.set_nodelay(true)?;
                Ok(Some(TcpConn::new(stream)))
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// One accepted client
pub struct TcpConn {
    stream: TcpStream,
    pending: Vec<u8>,
}

impl TcpConn {
    fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            pending: Vec::new(),
        }
    }

    /// Push staged bytes until the socket would block
    fn drain(&mut self) -> io::Result<()> {
        while !self.pending.is_empty() {
            match self.stream.write(&self.pending) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => {
                    self.pending.drain(..n);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl embedded_io::ErrorType for TcpConn {
    type Error = io::Error;
}

impl embedded_io::Read for TcpConn {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, io::Error> {
        self.stream.read(buf)
    }
}

impl embedded_io::ReadReady for TcpConn {
    fn read_ready(&mut self) -> Result<bool, io::Error> {
        let mut probe = [0u8; 1];
        match self.stream.peek(&mut probe) {
            // Ok(0) is end of stream, which a read reports
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl embedded_io::Write for TcpConn {
    fn write(&mut self, buf: &[u8]) -> Result<usize, io::Error> {
        self.pending.extend_from_slice(buf);
        self.drain()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), io::Error> {
        self.drain()
    }
}

impl embedded_io::WriteReady for TcpConn {
    fn write_ready(&mut self) -> Result<bool, io::Error> {
        self.drain()?;
        Ok(self.pending.is_empty())
    }
}
