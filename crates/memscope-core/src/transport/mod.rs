//! Byte transport abstraction.
//!
//! The protocol engine never touches sockets directly.  It talks to a
//! [`Transport`]: a blocking, duplex byte stream that can send bytes and
//! receive up to `n` bytes at a time.  Concrete implementations live
//! elsewhere:
//!
//! - `memscope-client` provides a TCP implementation for real agents.
//! - [`mock::ScriptedTransport`] replays a pre-recorded response script and
//!   records everything written to it, for tests.
//!
//! # Short reads
//!
//! [`Transport::read`] is allowed to return *fewer* bytes than requested when
//! the peer closes the stream.  It must not return more.  Turning a short
//! result into an error is the job of the [`crate::protocol::codec::WireCodec`],
//! so every transport reports short reads the same way.

use std::io;

pub mod mock;

/// Blocking duplex byte stream to a debug agent.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    /// Sends a single byte.
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;

    /// Sends every byte of `data`.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Receives a single byte.
    ///
    /// Returns an error of kind [`io::ErrorKind::UnexpectedEof`] when the
    /// stream is closed.
    fn read_byte(&mut self) -> io::Result<u8>;

    /// Receives up to `len` bytes, blocking until `len` bytes have arrived or
    /// the stream is closed.
    fn read(&mut self, len: usize) -> io::Result<Vec<u8>>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        (**self).write_byte(byte)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write(data)
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        (**self).read_byte()
    }

    fn read(&mut self, len: usize) -> io::Result<Vec<u8>> {
        (**self).read(len)
    }
}
