//! Scripted in-memory transport for tests.
//!
//! # Why a scripted transport?
//!
//! The protocol is strictly request/response, so an agent's side of a
//! conversation can be written down in advance as one flat byte sequence.
//! `ScriptedTransport` holds that sequence (the *inbound script*) and hands it
//! out as the engine reads, while recording every byte the engine writes
//! (the *outbound log*).  Tests then assert on both:
//!
//! - the engine produced the expected request bytes, and
//! - the engine consumed exactly the response bytes it should have, leaving
//!   the stream aligned for the next command.
//!
//! # Sharing
//!
//! The script lives behind an `Arc`, so cloning a `ScriptedTransport` yields a
//! second handle onto the *same* script.  Hand one clone to the engine and
//! keep the other to inspect writes afterwards:
//!
//! ```rust
//! use memscope_core::transport::mock::ScriptedTransport;
//! use memscope_core::transport::Transport;
//!
//! let script = ScriptedTransport::new();
//! script.push_u32(0);
//!
//! let mut handle = script.clone();
//! handle.write_byte(0x0E).unwrap();
//! assert_eq!(handle.read(4).unwrap(), vec![0, 0, 0, 0]);
//!
//! assert_eq!(script.written(), vec![0x0E]);
//! assert_eq!(script.remaining(), 0);
//! ```

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use super::Transport;

#[derive(Debug, Default)]
struct Script {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
    fail_writes: bool,
}

/// A transport that replays a pre-loaded inbound script and records writes.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    /// Creates a transport with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail with [`io::ErrorKind::BrokenPipe`].
    pub fn fail_writes(&self) {
        self.script.lock().fail_writes = true;
    }

    // ── Script builders ─────────────────────────────────────────────────────

    /// Appends raw bytes to the inbound script.
    pub fn push_bytes(&self, bytes: &[u8]) -> &Self {
        self.script.lock().inbound.extend(bytes.iter().copied());
        self
    }

    pub fn push_u8(&self, value: u8) -> &Self {
        self.push_bytes(&[value])
    }

    pub fn push_u16(&self, value: u16) -> &Self {
        self.push_bytes(&value.to_le_bytes())
    }

    pub fn push_u32(&self, value: u32) -> &Self {
        self.push_bytes(&value.to_le_bytes())
    }

    pub fn push_u64(&self, value: u64) -> &Self {
        self.push_bytes(&value.to_le_bytes())
    }

    /// Appends a raw 32-bit result word (`0` is success).
    pub fn push_result(&self, raw: u32) -> &Self {
        self.push_u32(raw)
    }

    /// Appends one region-info record followed by its result word.
    pub fn push_region(
        &self,
        address: u64,
        size: u64,
        memory_type: u32,
        perm: u32,
        result: u32,
    ) -> &Self {
        self.push_u64(address)
            .push_u64(size)
            .push_u32(memory_type)
            .push_u32(perm)
            .push_result(result)
    }

    /// Appends an uncompressed bulk-read chunk carrying `data`.
    pub fn push_raw_chunk(&self, data: &[u8]) -> &Self {
        self.push_u8(0).push_u32(data.len() as u32).push_bytes(data)
    }

    /// Appends a run-length compressed chunk built from `(value, count)` runs.
    pub fn push_rle_chunk(&self, runs: &[(u8, u8)]) -> &Self {
        let decompressed: u32 = runs.iter().map(|&(_, count)| u32::from(count)).sum();
        let pairs: Vec<u8> = runs.iter().flat_map(|&(value, count)| [value, count]).collect();
        self.push_u8(1)
            .push_u32(decompressed)
            .push_u32(pairs.len() as u32)
            .push_bytes(&pairs)
    }

    // ── Inspection ──────────────────────────────────────────────────────────

    /// Returns a copy of every byte written so far.
    pub fn written(&self) -> Vec<u8> {
        self.script.lock().outbound.clone()
    }

    /// Discards the outbound log.
    pub fn clear_written(&self) {
        self.script.lock().outbound.clear();
    }

    /// Number of inbound bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().inbound.len()
    }
}

impl Transport for ScriptedTransport {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.write(&[byte])
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let mut script = self.script.lock();
        if script.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "scripted write failure"));
        }
        script.outbound.extend_from_slice(data);
        Ok(())
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        self.script
            .lock()
            .inbound
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
    }

    fn read(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut script = self.script.lock();
        let take = len.min(script.inbound.len());
        Ok(script.inbound.drain(..take).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_returns_short_buffer_when_script_runs_out() {
        // Arrange
        let script = ScriptedTransport::new();
        script.push_bytes(&[1, 2, 3]);
        let mut transport = script.clone();

        // Act
        let got = transport.read(8).unwrap();

        // Assert
        assert_eq!(got, vec![1, 2, 3]);
        assert_eq!(script.remaining(), 0);
    }

    #[test]
    fn test_read_byte_on_empty_script_is_unexpected_eof() {
        let mut transport = ScriptedTransport::new();
        let err = transport.read_byte().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_clones_share_the_outbound_log() {
        // Arrange
        let script = ScriptedTransport::new();
        let mut transport = script.clone();

        // Act
        transport.write_byte(0xAB).unwrap();
        transport.write(&[0xCD, 0xEF]).unwrap();

        // Assert
        assert_eq!(script.written(), vec![0xAB, 0xCD, 0xEF]);
    }

    #[test]
    fn test_fail_writes_returns_broken_pipe() {
        let script = ScriptedTransport::new();
        script.fail_writes();
        let mut transport = script.clone();
        let err = transport.write(&[1]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(script.written().is_empty());
    }

    #[test]
    fn test_push_rle_chunk_layout() {
        // Arrange
        let script = ScriptedTransport::new();
        script.push_rle_chunk(&[(0xAA, 3), (0xBB, 2)]);
        let mut transport = script.clone();

        // Act
        let bytes = transport.read(64).unwrap();

        // Assert: flag, decompressed_len = 5, compressed_len = 4, pairs
        assert_eq!(
            bytes,
            vec![1, 5, 0, 0, 0, 4, 0, 0, 0, 0xAA, 3, 0xBB, 2]
        );
    }
}
