//! Binary codec for the debug-agent protocol.
//!
//! [`WireCodec`] wraps a [`Transport`] and speaks the protocol's primitive
//! vocabulary: opcode bytes, fixed-width little-endian integers, raw byte
//! buffers, result words, region-info records and bulk-read chunks.
//!
//! Wire conventions:
//! ```text
//! u8 / u16 / u32 / u64 / i16 / i32 / i64   little-endian, fixed width
//! result                                   u32, see ResultCode
//! region info                              [addr:8][size:8][type:4][perm:4][result:4]
//! chunk                                    see protocol::compression
//! ```
//!
//! The codec has no retry logic.  Every transport error and every short read
//! propagates to the caller unchanged; a short read leaves the stream in an
//! unknown state and the connection should be discarded.

use std::io;

use thiserror::Error;
use tracing::{trace, warn};

use crate::domain::region::MemoryRegion;
use crate::protocol::command::Command;
use crate::protocol::compression::decode_run_length;
use crate::protocol::result_code::ResultCode;
use crate::transport::Transport;

/// Errors produced while encoding requests or decoding responses.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The underlying transport failed (connection refused, reset, ...).
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// The transport returned fewer bytes than the field requires.
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// An opcode byte outside the known command set.
    #[error("unknown command opcode: 0x{0:02X}")]
    UnknownCommand(u8),

    /// The STATUS byte is not a known execution state.
    #[error("unknown debugger status: {0}")]
    UnknownStatus(u8),

    /// A region-info record carries an unknown memory type.
    #[error("unknown memory type: 0x{0:X}")]
    UnknownMemoryType(u32),

    /// A compressed chunk body could not be decoded.
    #[error("malformed chunk: {0}")]
    MalformedChunk(String),

    /// A bulk read produced a different number of bytes than requested.
    #[error("length mismatch: requested {expected} bytes, received {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// A buffer is too large for the 32-bit length field.
    #[error("length {0} does not fit in a 32-bit length field")]
    LengthOverflow(usize),
}

impl ProtocolError {
    /// `true` for connection-level failures, `false` for protocol violations.
    pub fn is_transport(&self) -> bool {
        matches!(self, ProtocolError::Transport(_) | ProtocolError::ShortRead { .. })
    }
}

/// One bulk-read chunk as it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Whether the body was run-length encoded.
    pub compressed: bool,
    /// Length the agent announced for the decoded body.
    pub declared_len: u32,
    /// The decoded body.
    pub data: Vec<u8>,
}

/// One region-info record with its memory type still undecoded.
///
/// Keeping the raw type lets callers inspect [`RegionRecord::result`] before
/// a garbage type tag on a failed record turns into a decode error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionRecord {
    pub address: u64,
    pub size: u64,
    pub memory_type: u32,
    pub permissions: u32,
    pub result: ResultCode,
}

impl RegionRecord {
    /// Decodes the record into a [`MemoryRegion`].
    pub fn region(&self) -> Result<MemoryRegion, ProtocolError> {
        MemoryRegion::from_raw(self.address, self.size, self.memory_type, self.permissions)
    }
}

/// Primitive reader/writer over a [`Transport`].
pub struct WireCodec<T> {
    transport: T,
}

impl<T: Transport> WireCodec<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    // ── Encoding ──────────────────────────────────────────────────────────────

    /// Writes the opcode byte that starts every request.
    pub fn write_command(&mut self, command: Command) -> Result<(), ProtocolError> {
        trace!(%command, "write command");
        self.write_byte(command.opcode())
    }

    pub fn write_byte(&mut self, value: u8) -> Result<(), ProtocolError> {
        Ok(self.transport.write_byte(value)?)
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        Ok(self.transport.write(data)?)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<(), ProtocolError> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), ProtocolError> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<(), ProtocolError> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a buffer length as a u32 field.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::LengthOverflow`] if `len` exceeds `u32::MAX`;
    /// nothing is written in that case.
    pub fn write_len(&mut self, len: usize) -> Result<(), ProtocolError> {
        let len = u32::try_from(len).map_err(|_| ProtocolError::LengthOverflow(len))?;
        self.write_u32(len)
    }

    // ── Decoding ──────────────────────────────────────────────────────────────

    pub fn read_byte(&mut self) -> Result<u8, ProtocolError> {
        match self.transport.read_byte() {
            Ok(b) => Ok(b),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(ProtocolError::ShortRead {
                expected: 1,
                actual: 0,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Reads exactly `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ShortRead`] if the transport yields fewer.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, ProtocolError> {
        let buf = self.transport.read(len)?;
        if buf.len() != len {
            return Err(ProtocolError::ShortRead {
                expected: len,
                actual: buf.len(),
            });
        }
        Ok(buf)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let buf = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&buf);
        Ok(out)
    }

    pub fn read_i16(&mut self) -> Result<i16, ProtocolError> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, ProtocolError> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, ProtocolError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Reads one result word.
    pub fn read_result(&mut self) -> Result<ResultCode, ProtocolError> {
        Ok(ResultCode::from_raw(self.read_u32()?))
    }

    /// Reads one region-info record and its result word without decoding the
    /// memory type.
    pub fn read_region_record(&mut self) -> Result<RegionRecord, ProtocolError> {
        Ok(RegionRecord {
            address: self.read_u64()?,
            size: self.read_u64()?,
            memory_type: self.read_u32()?,
            permissions: self.read_u32()?,
            result: self.read_result()?,
        })
    }

    /// Reads one region-info record and the result word that follows it.
    ///
    /// The result is returned rather than checked so callers decide how a
    /// failed record is treated.
    pub fn read_region_info(&mut self) -> Result<(MemoryRegion, ResultCode), ProtocolError> {
        let record = self.read_region_record()?;
        Ok((record.region()?, record.result))
    }

    /// Reads and decodes one bulk-read chunk.
    ///
    /// The whole chunk is consumed from the stream before any decoding error
    /// is reported.  The decoded length is not checked against the declared
    /// length here; a discrepancy is only logged.
    pub fn read_chunk(&mut self) -> Result<Chunk, ProtocolError> {
        let compressed = self.read_byte()? != 0;
        let declared_len = self.read_u32()?;

        let data = if compressed {
            let body_len = self.read_u32()? as usize;
            let body = self.read_bytes(body_len)?;
            decode_run_length(&body)?
        } else {
            self.read_bytes(declared_len as usize)?
        };

        trace!(compressed, declared_len, decoded = data.len(), "chunk");
        if data.len() != declared_len as usize {
            warn!(
                declared_len,
                decoded = data.len(),
                "chunk decoded to a different length than announced"
            );
        }

        Ok(Chunk {
            compressed,
            declared_len,
            data,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::region::MemoryType;
    use crate::transport::mock::ScriptedTransport;
    use crate::transport::MockTransport;

    fn codec_with(script: &ScriptedTransport) -> WireCodec<ScriptedTransport> {
        WireCodec::new(script.clone())
    }

    // ── Integer round trips ───────────────────────────────────────────────────

    #[test]
    fn test_unsigned_values_round_trip_at_every_width() {
        // Arrange: write boundary values at each width, then feed the
        // written bytes back in as the inbound script.
        let out = ScriptedTransport::new();
        let mut writer = codec_with(&out);
        for v in [0u8, 1, 0x7F, 0x80, u8::MAX] {
            writer.write_byte(v).unwrap();
        }
        for v in [0u16, 1, 0x1234, u16::MAX] {
            writer.write_u16(v).unwrap();
        }
        for v in [0u32, 1, 0xDEAD_BEEF, u32::MAX] {
            writer.write_u32(v).unwrap();
        }
        for v in [0u64, 1, 0x0123_4567_89AB_CDEF, u64::MAX] {
            writer.write_u64(v).unwrap();
        }

        let inbound = ScriptedTransport::new();
        inbound.push_bytes(&out.written());
        let mut reader = codec_with(&inbound);

        // Act / Assert
        for v in [0u8, 1, 0x7F, 0x80, u8::MAX] {
            assert_eq!(reader.read_byte().unwrap(), v);
        }
        for v in [0u16, 1, 0x1234, u16::MAX] {
            assert_eq!(reader.read_u16().unwrap(), v);
        }
        for v in [0u32, 1, 0xDEAD_BEEF, u32::MAX] {
            assert_eq!(reader.read_u32().unwrap(), v);
        }
        for v in [0u64, 1, 0x0123_4567_89AB_CDEF, u64::MAX] {
            assert_eq!(reader.read_u64().unwrap(), v);
        }
        assert_eq!(inbound.remaining(), 0);
    }

    #[test]
    fn test_integers_are_little_endian_on_the_wire() {
        let out = ScriptedTransport::new();
        let mut codec = codec_with(&out);

        codec.write_u16(0x0102).unwrap();
        codec.write_u32(0x0304_0506).unwrap();
        codec.write_u64(0x0708_090A_0B0C_0D0E).unwrap();

        assert_eq!(
            out.written(),
            vec![
                0x02, 0x01, //
                0x06, 0x05, 0x04, 0x03, //
                0x0E, 0x0D, 0x0C, 0x0B, 0x0A, 0x09, 0x08, 0x07,
            ]
        );
    }

    #[test]
    fn test_signed_reads_interpret_twos_complement() {
        let script = ScriptedTransport::new();
        script
            .push_bytes(&(-2i16).to_le_bytes())
            .push_bytes(&(-70_000i32).to_le_bytes())
            .push_bytes(&i64::MIN.to_le_bytes());
        let mut codec = codec_with(&script);

        assert_eq!(codec.read_i16().unwrap(), -2);
        assert_eq!(codec.read_i32().unwrap(), -70_000);
        assert_eq!(codec.read_i64().unwrap(), i64::MIN);
    }

    #[test]
    fn test_write_command_emits_single_opcode_byte() {
        let out = ScriptedTransport::new();
        let mut codec = codec_with(&out);

        codec.write_command(Command::GetTitleId).unwrap();

        assert_eq!(out.written(), vec![0x11]);
    }

    // ── Short reads and transport errors ─────────────────────────────────────

    #[test]
    fn test_short_read_is_reported_with_counts() {
        // Arrange: only 3 of the 8 bytes of a u64 are available
        let script = ScriptedTransport::new();
        script.push_bytes(&[1, 2, 3]);
        let mut codec = codec_with(&script);

        // Act
        let err = codec.read_u64().unwrap_err();

        // Assert
        assert!(matches!(err, ProtocolError::ShortRead { expected: 8, actual: 3 }));
        assert!(err.is_transport());
    }

    #[test]
    fn test_read_byte_on_closed_stream_is_short_read() {
        let mut codec = codec_with(&ScriptedTransport::new());
        let err = codec.read_byte().unwrap_err();
        assert!(matches!(err, ProtocolError::ShortRead { expected: 1, actual: 0 }));
    }

    #[test]
    fn test_transport_error_propagates_unchanged() {
        // Arrange
        let mut transport = MockTransport::new();
        transport
            .expect_read()
            .returning(|_| Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")));
        let mut codec = WireCodec::new(transport);

        // Act
        let err = codec.read_u32().unwrap_err();

        // Assert
        match err {
            ProtocolError::Transport(e) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn test_write_len_rejects_oversized_lengths() {
        let out = ScriptedTransport::new();
        let mut codec = codec_with(&out);

        let err = codec.write_len(u32::MAX as usize + 1).unwrap_err();

        assert!(matches!(err, ProtocolError::LengthOverflow(_)));
        assert!(!err.is_transport());
        assert!(out.written().is_empty());
    }

    // ── Results and region info ──────────────────────────────────────────────

    #[test]
    fn test_read_result_decodes_packed_word() {
        let script = ScriptedTransport::new();
        script.push_result(5 | (7 << 9));
        let mut codec = codec_with(&script);

        let result = codec.read_result().unwrap();

        assert_eq!(result.module(), 5);
        assert_eq!(result.description(), 7);
    }

    #[test]
    fn test_read_region_info_decodes_record_and_result() {
        // Arrange
        let script = ScriptedTransport::new();
        script.push_region(0x8000_0000, 0x4000, 0x05, 0x03, 0);
        let mut codec = codec_with(&script);

        // Act
        let (region, result) = codec.read_region_info().unwrap();

        // Assert
        assert_eq!(region.address(), 0x8000_0000);
        assert_eq!(region.size(), 0x4000);
        assert_eq!(region.memory_type(), MemoryType::Heap);
        assert!(region.readable() && region.writable() && !region.executable());
        assert!(result.succeeded());
        assert_eq!(script.remaining(), 0);
    }

    #[test]
    fn test_read_region_info_rejects_unknown_type_after_consuming_record() {
        let script = ScriptedTransport::new();
        script.push_region(0, 0x1000, 0x99, 0, 0);
        let mut codec = codec_with(&script);

        let err = codec.read_region_info().unwrap_err();

        assert!(matches!(err, ProtocolError::UnknownMemoryType(0x99)));
        assert_eq!(script.remaining(), 0, "record must be fully consumed");
    }

    #[test]
    fn test_read_region_record_keeps_raw_type_of_failed_record() {
        // Arrange: failed record whose type tag is garbage
        let script = ScriptedTransport::new();
        script.push_region(0, 0, 0xFFFF_FFFF, 0, 2 | (101 << 9));
        let mut codec = codec_with(&script);

        // Act
        let record = codec.read_region_record().unwrap();

        // Assert
        assert!(record.result.failed());
        assert_eq!(record.memory_type, 0xFFFF_FFFF);
        assert!(matches!(
            record.region(),
            Err(ProtocolError::UnknownMemoryType(0xFFFF_FFFF))
        ));
        assert_eq!(script.remaining(), 0);
    }

    // ── Chunks ────────────────────────────────────────────────────────────────

    #[test]
    fn test_read_raw_chunk() {
        let script = ScriptedTransport::new();
        script.push_raw_chunk(&[1, 2, 3, 4]);
        let mut codec = codec_with(&script);

        let chunk = codec.read_chunk().unwrap();

        assert!(!chunk.compressed);
        assert_eq!(chunk.declared_len, 4);
        assert_eq!(chunk.data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_read_compressed_chunk() {
        let script = ScriptedTransport::new();
        script.push_rle_chunk(&[(0xAA, 3), (0xBB, 2)]);
        let mut codec = codec_with(&script);

        let chunk = codec.read_chunk().unwrap();

        assert!(chunk.compressed);
        assert_eq!(chunk.data, vec![0xAA, 0xAA, 0xAA, 0xBB, 0xBB]);
        assert_eq!(script.remaining(), 0);
    }

    #[test]
    fn test_compressed_chunk_with_odd_body_consumes_body_then_fails() {
        // Arrange: flag=1, declared=3, body_len=3, body = AA 03 BB
        let script = ScriptedTransport::new();
        script
            .push_u8(1)
            .push_u32(3)
            .push_u32(3)
            .push_bytes(&[0xAA, 3, 0xBB])
            .push_result(0);
        let mut codec = codec_with(&script);

        // Act
        let err = codec.read_chunk().unwrap_err();

        // Assert: only the trailing result word is left
        assert!(matches!(err, ProtocolError::MalformedChunk(_)));
        assert_eq!(script.remaining(), 4);
    }

    #[test]
    fn test_chunk_declared_length_is_not_enforced() {
        // Arrange: body decodes to 2 bytes but 5 are declared
        let script = ScriptedTransport::new();
        script.push_u8(1).push_u32(5).push_u32(2).push_bytes(&[0x00, 2]);
        let mut codec = codec_with(&script);

        // Act
        let chunk = codec.read_chunk().unwrap();

        // Assert
        assert_eq!(chunk.declared_len, 5);
        assert_eq!(chunk.data, vec![0, 0]);
    }
}
