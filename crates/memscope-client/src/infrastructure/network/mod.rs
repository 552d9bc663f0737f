//! Network infrastructure for the client application.
//!
//! Provides [`TcpTransport`], the blocking TCP implementation of
//! [`memscope_core::Transport`] used against a real debug agent.
//!
//! Architecture:
//! - One `TcpTransport` owns one `TcpStream` to the agent.
//! - Writes go out immediately (`TCP_NODELAY`), since every request is small
//!   and the agent will not answer until it has the whole request.
//! - `read(n)` keeps receiving until `n` bytes have arrived or the agent
//!   closes the connection; a short result is reported by the codec.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

use memscope_core::Transport;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::infrastructure::storage::config::AgentConfig;

/// Upper bound on the buffer reserved before any bytes of a read arrive.
const RECV_BLOCK: usize = 4096;

/// Errors that can occur while establishing the agent connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// `host:port` did not resolve to any socket address.
    #[error("could not resolve agent address {addr}: {source}")]
    Resolve {
        addr: String,
        #[source]
        source: io::Error,
    },
    /// TCP connection to the agent failed.
    #[error("failed to connect to agent at {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    /// The socket could not be configured after connecting.
    #[error("socket configuration failed: {0}")]
    Io(#[from] io::Error),
}

/// A blocking TCP connection to a debug agent.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpTransport {
    /// Resolves and connects to the agent described by `config`.
    ///
    /// Every resolved address is tried in turn with the configured connect
    /// timeout; the error from the last attempt is returned if none succeed.
    pub fn connect(config: &AgentConfig) -> Result<Self, TransportError> {
        let addr_text = config.address();
        let addrs: Vec<SocketAddr> = addr_text
            .to_socket_addrs()
            .map_err(|source| TransportError::Resolve {
                addr: addr_text.clone(),
                source,
            })?
            .collect();

        let mut last_err = None;
        for addr in addrs {
            debug!(%addr, timeout = ?config.connect_timeout(), "connecting to agent");
            match TcpStream::connect_timeout(&addr, config.connect_timeout()) {
                Ok(stream) => {
                    stream.set_read_timeout(config.read_timeout())?;
                    let transport = Self::from_stream(stream)?;
                    info!(peer = %transport.peer, "connected to agent");
                    return Ok(transport);
                }
                Err(source) => {
                    warn!(%addr, "could not connect to agent: {source}");
                    last_err = Some(TransportError::Connect { addr, source });
                }
            }
        }

        Err(last_err.unwrap_or_else(|| TransportError::Resolve {
            addr: addr_text,
            source: io::Error::new(io::ErrorKind::NotFound, "no addresses resolved"),
        }))
    }

    /// Wraps an already connected stream.
    pub fn from_stream(stream: TcpStream) -> io::Result<Self> {
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        Ok(Self { stream, peer })
    }

    /// Address of the agent on the other end.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Transport for TcpTransport {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.stream.write_all(&[byte])
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data)
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.stream.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// `len` is agent-controlled; the buffer grows only as bytes arrive.
    fn read(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(len.min(RECV_BLOCK));
        (&mut self.stream).take(len as u64).read_to_end(&mut buf)?;
        Ok(buf)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
