/*!
Blocking TCP transport for the e2ee-chat channel.

Turns a duplex byte stream into whole-buffer primitives. Writes loop over
short writes and reads loop until the requested length is collected; a
zero-byte read before that point is an orderly shutdown by the peer and is
reported as `Error::PeerClosed`, never as a truncated buffer.

A [`Connection`] can be split into a [`ReadHalf`] and a [`WriteHalf`] so one
thread reads while another writes. Both halves share a [`CloseHandle`] whose
atomic flag guarantees the socket is shut down exactly once.
*/

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::core::{
    constants::sizes::FRAME_HEADER_SIZE,
    error::{Error, Result},
    message::frame::{FrameHeader, encode_frame},
};

/// Write all of `bytes`, looping over short writes.
pub fn send_exact<W: Write + ?Sized>(writer: &mut W, bytes: &[u8]) -> Result<()> {
    let mut offset = 0;
    while offset < bytes.len() {
        match writer.write(&bytes[offset..]) {
            Ok(0) => return Err(Error::SendFailed(io::ErrorKind::WriteZero.into())),
            Ok(n) => offset += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::SendFailed(e)),
        }
    }
    writer.flush().map_err(Error::SendFailed)
}

/// Read exactly `len` bytes, looping over short reads.
pub fn receive_exact<R: Read + ?Sized>(reader: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Err(Error::PeerClosed),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::ReceiveFailed(e)),
        }
    }
    Ok(buf)
}

/// Write `payload` as one length-prefixed frame.
pub fn write_frame<W: Write + ?Sized>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let frame = encode_frame(payload)?;
    send_exact(writer, &frame)
}

/// Read one length-prefixed frame, rejecting payloads above `max_len`.
pub fn read_frame<R: Read + ?Sized>(reader: &mut R, max_len: usize) -> Result<Vec<u8>> {
    let mut header = [0u8; FRAME_HEADER_SIZE];
    header.copy_from_slice(&receive_exact(reader, FRAME_HEADER_SIZE)?);
    let len = FrameHeader::from_bytes(&header).checked_len(max_len)?;
    receive_exact(reader, len)
}

/// Turn a socket timeout into `Error::Timeout`; other errors pass through.
fn classify(error: Error, timeout: Option<Duration>) -> Error {
    let kind = match &error {
        Error::SendFailed(e) | Error::ReceiveFailed(e) => e.kind(),
        _ => return error,
    };
    match (kind, timeout) {
        (io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut, Some(t)) => {
            Error::Timeout(t.as_millis() as u64)
        }
        _ => error,
    }
}

struct CloseInner {
    closed: AtomicBool,
    stream: TcpStream,
}

/// Shared, idempotent close for all halves of one connection
#[derive(Clone)]
pub struct CloseHandle {
    inner: Arc<CloseInner>,
}

impl CloseHandle {
    fn new(stream: &TcpStream) -> io::Result<Self> {
        Ok(Self {
            inner: Arc::new(CloseInner {
                closed: AtomicBool::new(false),
                stream: stream.try_clone()?,
            }),
        })
    }

    /// Shut the connection down in both directions.
    ///
    /// Returns `true` for the one call that performed the close and `false`
    /// for every later call, from any thread.
    pub fn close(&self) -> bool {
        if self
            .inner
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        // The peer may already be gone, in which case shutdown reports
        // NotConnected. The socket is released either way.
        if let Err(e) = self.inner.stream.shutdown(Shutdown::Both) {
            log::debug!("shutdown after close: {}", e);
        }
        log::debug!("connection closed");
        true
    }

    /// Whether [`CloseHandle::close`] has run
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for CloseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloseHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn closed_error(receiving: bool) -> Error {
    let e = io::Error::new(io::ErrorKind::NotConnected, "connection already closed");
    if receiving {
        Error::ReceiveFailed(e)
    } else {
        Error::SendFailed(e)
    }
}

/// An open duplex byte stream to the peer
pub struct Connection {
    stream: TcpStream,
    peer_addr: Option<SocketAddr>,
    closer: CloseHandle,
    timeout: Option<Duration>,
}

impl Connection {
    /// Open a stream to a remote listener.
    pub fn connect(host: &str, port: u16, timeout: Option<Duration>) -> Result<Self> {
        let addr = format!("{}:{}", host, port);
        let stream = match timeout {
            None => TcpStream::connect((host, port)),
            Some(timeout) => connect_with_timeout(host, port, timeout),
        }
        .map_err(|source| Error::ConnectFailed {
            addr: addr.clone(),
            source,
        })?;

        log::info!("connected to {}", addr);
        Self::from_stream(stream)
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        // Chat frames are small and latency matters more than batching
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr().ok();
        let closer = CloseHandle::new(&stream)?;
        Ok(Self {
            stream,
            peer_addr,
            closer,
            timeout: None,
        })
    }

    /// Remote address, if the OS still reports it
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Apply a read and write deadline to every blocking call; `None` blocks forever.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.stream.set_read_timeout(timeout)?;
        self.stream.set_write_timeout(timeout)?;
        self.timeout = timeout;
        Ok(())
    }

    /// Write all of `bytes`
    pub fn send_exact(&mut self, bytes: &[u8]) -> Result<()> {
        if self.closer.is_closed() {
            return Err(closed_error(false));
        }
        send_exact(&mut self.stream, bytes).map_err(|e| classify(e, self.timeout))
    }

    /// Read exactly `len` bytes
    pub fn receive_exact(&mut self, len: usize) -> Result<Vec<u8>> {
        if self.closer.is_closed() {
            return Err(closed_error(true));
        }
        receive_exact(&mut self.stream, len).map_err(|e| classify(e, self.timeout))
    }

    /// Write one frame
    pub fn send_frame(&mut self, payload: &[u8]) -> Result<()> {
        if self.closer.is_closed() {
            return Err(closed_error(false));
        }
        write_frame(&mut self.stream, payload).map_err(|e| classify(e, self.timeout))
    }

    /// Read one frame of at most `max_len` payload bytes
    pub fn receive_frame(&mut self, max_len: usize) -> Result<Vec<u8>> {
        if self.closer.is_closed() {
            return Err(closed_error(true));
        }
        read_frame(&mut self.stream, max_len).map_err(|e| classify(e, self.timeout))
    }

    /// Stop sending; the peer's reads end with `PeerClosed` once it drains.
    pub fn shutdown_write(&self) -> Result<()> {
        self.stream
            .shutdown(Shutdown::Write)
            .map_err(Error::SendFailed)
    }

    /// Close the connection; see [`CloseHandle::close`]
    pub fn close(&self) -> bool {
        self.closer.close()
    }

    /// Whether the connection has been closed locally
    pub fn is_closed(&self) -> bool {
        self.closer.is_closed()
    }

    /// A handle that can close this connection from another thread
    pub fn close_handle(&self) -> CloseHandle {
        self.closer.clone()
    }

    /// Split into independently owned read and write directions.
    pub fn split(self) -> Result<(ReadHalf, WriteHalf)> {
        let write_stream = self.stream.try_clone()?;
        let read = ReadHalf {
            stream: self.stream,
            closer: self.closer.clone(),
            timeout: self.timeout,
        };
        let write = WriteHalf {
            stream: write_stream,
            closer: self.closer,
            timeout: self.timeout,
        };
        Ok((read, write))
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("peer_addr", &self.peer_addr)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Receiving direction of a split [`Connection`]
#[derive(Debug)]
pub struct ReadHalf {
    stream: TcpStream,
    closer: CloseHandle,
    timeout: Option<Duration>,
}

impl ReadHalf {
    /// Read one frame of at most `max_len` payload bytes
    pub fn receive_frame(&mut self, max_len: usize) -> Result<Vec<u8>> {
        if self.closer.is_closed() {
            return Err(closed_error(true));
        }
        read_frame(&mut self.stream, max_len).map_err(|e| classify(e, self.timeout))
    }

    /// Shared close handle
    pub fn close_handle(&self) -> &CloseHandle {
        &self.closer
    }
}

/// Sending direction of a split [`Connection`]
#[derive(Debug)]
pub struct WriteHalf {
    stream: TcpStream,
    closer: CloseHandle,
    timeout: Option<Duration>,
}

impl WriteHalf {
    /// Write one frame
    pub fn send_frame(&mut self, payload: &[u8]) -> Result<()> {
        if self.closer.is_closed() {
            return Err(closed_error(false));
        }
        write_frame(&mut self.stream, payload).map_err(|e| classify(e, self.timeout))
    }

    /// Stop sending without closing the read direction
    pub fn shutdown_write(&self) -> Result<()> {
        self.stream
            .shutdown(Shutdown::Write)
            .map_err(Error::SendFailed)
    }

    /// Shared close handle
    pub fn close_handle(&self) -> &CloseHandle {
        &self.closer
    }
}

fn connect_with_timeout(host: &str, port: u16, timeout: Duration) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing")
    }))
}

/// A bound listening socket
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Listen on all interfaces at `port`
    pub fn listen(port: u16) -> Result<Self> {
        Self::bind(&format!("0.0.0.0:{}", port))
    }

    /// Listen on a specific address, e.g. `127.0.0.1:0`
    pub fn bind(addr: &str) -> Result<Self> {
        let inner = TcpListener::bind(addr).map_err(|source| Error::BindFailed {
            addr: addr.to_string(),
            source,
        })?;
        log::info!("listening on {}", addr);
        Ok(Self { inner })
    }

    /// Actual bound address (resolves port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.local_addr()?)
    }

    /// Block until a peer connects
    pub fn accept(&self) -> Result<Connection> {
        let (stream, addr) = self.inner.accept().map_err(Error::AcceptFailed)?;
        log::info!("accepted connection from {}", addr);
        Connection::from_stream(stream)
    }
}
