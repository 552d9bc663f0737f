//! The protocol engine: one session with a debug agent.
//!
//! [`Debugger`] owns the connection to the agent and implements every
//! command's request/response sequence on top of the primitive
//! [`WireCodec`].  It is the only type callers need to drive an agent.
//!
//! # One request at a time
//!
//! The protocol is strictly half-duplex: the agent answers each request with
//! a fixed response sequence and cannot cope with a second request arriving
//! mid-answer.  Every public method therefore takes the session lock for the
//! *whole* exchange (write request, read every response field) and releases
//! it on every exit path, including errors.  A `Debugger` can be shared
//! between threads behind an `Arc`; concurrent callers simply wait their turn.
//!
//! # How agent failures surface
//!
//! Commands disagree on what a failed result word means, and callers depend
//! on the difference:
//!
//! | Command family                                   | Failed result becomes          |
//! |--------------------------------------------------|--------------------------------|
//! | read, poke, query, get-pids, title id, attached  | `Err(DebuggerError::Agent)`    |
//! | write                                            | `Ok(code)` (final result word) |
//! | attach, detach, resume, pause, disconnect        | `Ok(code)`                     |
//! | current pid                                      | `Ok(0)`                        |
//!
//! Read and poke failures are followed by a *second* result word on the wire.
//! Both are consumed before the error is returned so the next command starts
//! on a frame boundary.

use std::io;
use std::path::PathBuf;

use memscope_core::{
    Command, DebuggerStatus, MemoryRegion, MemoryType, ProtocolError, ProtocolVersion, ResultCode,
    Transport, WireCodec,
};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors returned by [`Debugger`] operations.
#[derive(Debug, Error)]
pub enum DebuggerError {
    /// The connection failed or the agent violated the wire format.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The agent reported a failure for a command whose failures are fatal.
    #[error("{command} failed: {code}")]
    Agent { command: Command, code: ResultCode },

    /// `peek` was asked for more bytes than fit in a u64.
    #[error("peek width of {0} bytes exceeds 8")]
    UnsupportedWidth(usize),

    /// A dump file could not be written.
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DebuggerError {
    /// The agent's result code, if this is an agent-reported failure.
    pub fn agent_code(&self) -> Option<ResultCode> {
        match self {
            DebuggerError::Agent { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// State guarded by the session lock.
struct Session<T> {
    codec: WireCodec<T>,
    /// Most recent single-address query result.
    last_region: Option<MemoryRegion>,
}

impl<T: Transport> Session<T> {
    /// Reads an acknowledgement result.  On failure the agent follows up with
    /// a second result word, which is read and discarded.
    fn expect_ack(&mut self, command: Command) -> Result<(), DebuggerError> {
        let code = self.codec.read_result()?;
        if code.failed() {
            let follow_up = self.codec.read_result()?;
            warn!(%command, %code, %follow_up, "agent rejected request");
            return Err(DebuggerError::Agent { command, code });
        }
        Ok(())
    }

    /// Reads a result word that must indicate success.
    fn expect_success(&mut self, command: Command) -> Result<(), DebuggerError> {
        let code = self.codec.read_result()?;
        if code.failed() {
            warn!(%command, %code, "agent reported failure");
            return Err(DebuggerError::Agent { command, code });
        }
        Ok(())
    }

    /// Reads one region-info record whose result must indicate success.
    ///
    /// The result is checked before the memory type is decoded, so a failed
    /// record reports the agent's code even when its type tag is garbage.
    fn read_region(&mut self, command: Command) -> Result<MemoryRegion, DebuggerError> {
        let record = self.codec.read_region_record()?;
        if record.result.failed() {
            let code = record.result;
            warn!(%command, %code, "region query failed");
            return Err(DebuggerError::Agent { command, code });
        }
        Ok(record.region()?)
    }
}

/// A session with one debug agent over one transport.
pub struct Debugger<T> {
    session: Mutex<Session<T>>,
}

impl<T: Transport> Debugger<T> {
    /// Starts a session over an already connected transport.
    pub fn new(transport: T) -> Self {
        Self {
            session: Mutex::new(Session {
                codec: WireCodec::new(transport),
                last_region: None,
            }),
        }
    }

    /// Ends the session and hands back the transport.
    pub fn into_inner(self) -> T {
        self.session.into_inner().codec.into_inner()
    }

    /// The region cached by the last [`Debugger::query`] that hit the wire.
    pub fn cached_region(&self) -> Option<MemoryRegion> {
        self.session.lock().last_region
    }

    // ── Status ────────────────────────────────────────────────────────────────

    /// Queries the agent's execution state.
    ///
    /// The response also carries the agent's protocol version and a result
    /// word; both are read to keep the stream aligned but do not affect the
    /// outcome.
    pub fn get_status(&self) -> Result<DebuggerStatus, DebuggerError> {
        let mut s = self.session.lock();
        s.codec.write_command(Command::Status)?;

        let status = s.codec.read_byte()?;
        let version = ProtocolVersion {
            major: s.codec.read_byte()?,
            minor: s.codec.read_byte()?,
            patch: s.codec.read_byte()?,
        };
        let code = s.codec.read_result()?;
        debug!(status, %version, packed = version.packed(), %code, "status");

        Ok(DebuggerStatus::try_from(status)?)
    }

    // ── Memory read / write ──────────────────────────────────────────────────

    /// Reads `size` bytes starting at `addr`.
    ///
    /// # Errors
    ///
    /// - [`DebuggerError::Agent`] if the agent rejects the read or any chunk.
    /// - [`ProtocolError::LengthMismatch`] if the chunks do not add up to
    ///   exactly `size` bytes.
    pub fn read_mem(&self, addr: u64, size: u32) -> Result<Vec<u8>, DebuggerError> {
        let mut s = self.session.lock();
        debug!(addr = format_args!("{addr:#x}"), size, "read");

        s.codec.write_command(Command::Read)?;
        s.codec.write_u64(addr)?;
        s.codec.write_u32(size)?;
        s.expect_ack(Command::Read)?;

        let wanted = size as usize;
        let mut buffer = Vec::with_capacity(wanted);
        while buffer.len() < wanted {
            s.expect_ack(Command::Read)?;
            let chunk = s.codec.read_chunk()?;
            if chunk.data.is_empty() {
                return Err(ProtocolError::MalformedChunk(format!(
                    "empty chunk with {} of {wanted} bytes outstanding",
                    wanted - buffer.len()
                ))
                .into());
            }
            buffer.extend_from_slice(&chunk.data);
        }
        s.codec.read_result()?;

        if buffer.len() != wanted {
            return Err(ProtocolError::LengthMismatch {
                expected: wanted,
                actual: buffer.len(),
            }
            .into());
        }
        Ok(buffer)
    }

    /// Reads the full extent of `region`.
    pub fn read_region(&self, region: &MemoryRegion) -> Result<Vec<u8>, DebuggerError> {
        let size = u32::try_from(region.size())
            .map_err(|_| ProtocolError::LengthOverflow(region.size() as usize))?;
        self.read_mem(region.address(), size)
    }

    /// Writes `data` at `addr` and returns the agent's final result word.
    ///
    /// The payload is only sent if the agent acknowledges the request; a
    /// rejected write still returns `Ok` carrying the final result.
    pub fn write_mem(&self, addr: u64, data: &[u8]) -> Result<ResultCode, DebuggerError> {
        let mut s = self.session.lock();
        debug!(addr = format_args!("{addr:#x}"), len = data.len(), "write");

        s.codec.write_command(Command::Write)?;
        s.codec.write_u64(addr)?;
        s.codec.write_len(data.len())?;

        let ack = s.codec.read_result()?;
        if ack.succeeded() {
            s.codec.write_bytes(data)?;
        } else {
            warn!(%ack, "write rejected; payload not sent");
        }
        Ok(s.codec.read_result()?)
    }

    fn poke_with(
        &self,
        command: Command,
        addr: u64,
        write_value: impl FnOnce(&mut WireCodec<T>) -> Result<(), ProtocolError>,
    ) -> Result<(), DebuggerError> {
        let mut s = self.session.lock();
        debug!(%command, addr = format_args!("{addr:#x}"), "poke");

        s.codec.write_command(command)?;
        s.codec.write_u64(addr)?;
        write_value(&mut s.codec)?;
        s.expect_ack(command)
    }

    pub fn poke8(&self, addr: u64, value: u8) -> Result<(), DebuggerError> {
        self.poke_with(Command::Poke8, addr, |c| c.write_byte(value))
    }

    pub fn poke16(&self, addr: u64, value: u16) -> Result<(), DebuggerError> {
        self.poke_with(Command::Poke16, addr, |c| c.write_u16(value))
    }

    pub fn poke32(&self, addr: u64, value: u32) -> Result<(), DebuggerError> {
        self.poke_with(Command::Poke32, addr, |c| c.write_u32(value))
    }

    pub fn poke64(&self, addr: u64, value: u64) -> Result<(), DebuggerError> {
        self.poke_with(Command::Poke64, addr, |c| c.write_u64(value))
    }

    // ── Peek ──────────────────────────────────────────────────────────────────

    /// Reads `size` bytes (at most 8) at `addr` as a little-endian integer.
    pub fn peek(&self, addr: u64, size: usize) -> Result<u64, DebuggerError> {
        if size > 8 {
            return Err(DebuggerError::UnsupportedWidth(size));
        }
        let bytes = self.read_mem(addr, size as u32)?;
        Ok(bytes
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    pub fn peek8(&self, addr: u64) -> Result<u8, DebuggerError> {
        Ok(self.peek(addr, 1)? as u8)
    }

    pub fn peek16(&self, addr: u64) -> Result<u16, DebuggerError> {
        Ok(self.peek(addr, 2)? as u16)
    }

    pub fn peek32(&self, addr: u64) -> Result<u32, DebuggerError> {
        Ok(self.peek(addr, 4)? as u32)
    }

    pub fn peek64(&self, addr: u64) -> Result<u64, DebuggerError> {
        self.peek(addr, 8)
    }

    // ── Execution control ────────────────────────────────────────────────────

    /// Sends an argument-less command and returns its result word as-is.
    fn simple(&self, command: Command) -> Result<ResultCode, DebuggerError> {
        let mut s = self.session.lock();
        s.codec.write_command(command)?;
        let code = s.codec.read_result()?;
        debug!(%command, %code, "simple command");
        Ok(code)
    }

    pub fn attach(&self, pid: u64) -> Result<ResultCode, DebuggerError> {
        let mut s = self.session.lock();
        s.codec.write_command(Command::Attach)?;
        s.codec.write_u64(pid)?;
        let code = s.codec.read_result()?;
        debug!(pid, %code, "attach");
        Ok(code)
    }

    pub fn detach(&self) -> Result<ResultCode, DebuggerError> {
        self.simple(Command::Detach)
    }

    pub fn resume(&self) -> Result<ResultCode, DebuggerError> {
        self.simple(Command::Continue)
    }

    pub fn pause(&self) -> Result<ResultCode, DebuggerError> {
        self.simple(Command::Pause)
    }

    pub fn disconnect(&self) -> Result<ResultCode, DebuggerError> {
        self.simple(Command::Disconnect)
    }

    // ── Region queries ───────────────────────────────────────────────────────

    /// Returns the region containing `addr`.
    ///
    /// If the previously queried region already contains `addr` it is
    /// returned without contacting the agent.
    pub fn query(&self, addr: u64) -> Result<MemoryRegion, DebuggerError> {
        let mut s = self.session.lock();
        if let Some(region) = s.last_region.filter(|r| r.contains(addr)) {
            return Ok(region);
        }

        s.codec.write_command(Command::QueryMemory)?;
        s.codec.write_u64(addr)?;
        let region = s.read_region(Command::QueryMemory)?;
        debug!(addr = format_args!("{addr:#x}"), %region, "query");

        s.last_region = Some(region);
        Ok(region)
    }

    /// Enumerates up to `max_count` regions starting at `start`.
    ///
    /// Enumeration stops early after the first [`MemoryType::Reserved`]
    /// region, which is included in the result.
    pub fn query_multi(
        &self,
        start: u64,
        max_count: u32,
    ) -> Result<Vec<MemoryRegion>, DebuggerError> {
        let mut s = self.session.lock();
        s.codec.write_command(Command::QueryMemoryMulti)?;
        s.codec.write_u64(start)?;
        s.codec.write_u32(max_count)?;

        let mut regions = Vec::new();
        for _ in 0..max_count {
            let region = s.read_region(Command::QueryMemoryMulti)?;
            regions.push(region);
            if region.memory_type() == MemoryType::Reserved {
                break;
            }
        }
        s.codec.read_result()?;

        debug!(start = format_args!("{start:#x}"), max_count, found = regions.len(), "query multi");
        Ok(regions)
    }

    // ── Process queries ──────────────────────────────────────────────────────

    /// The pid of the process currently running on the target, or `0` if the
    /// agent cannot tell.
    pub fn get_current_pid(&self) -> Result<u64, DebuggerError> {
        let mut s = self.session.lock();
        s.codec.write_command(Command::CurrentPid)?;
        let pid = s.codec.read_u64()?;
        let code = s.codec.read_result()?;
        if code.failed() {
            debug!(%code, "no current process");
            return Ok(0);
        }
        Ok(pid)
    }

    pub fn get_attached_pid(&self) -> Result<u64, DebuggerError> {
        let mut s = self.session.lock();
        s.codec.write_command(Command::GetAttachedPid)?;
        let pid = s.codec.read_u64()?;
        s.expect_success(Command::GetAttachedPid)?;
        Ok(pid)
    }

    pub fn get_pids(&self) -> Result<Vec<u64>, DebuggerError> {
        let mut s = self.session.lock();
        s.codec.write_command(Command::GetPids)?;
        let count = s.codec.read_u32()?;
        let pids = (0..count)
            .map(|_| s.codec.read_u64())
            .collect::<Result<Vec<_>, _>>()?;
        s.expect_success(Command::GetPids)?;
        Ok(pids)
    }

    pub fn get_title_id(&self, pid: u64) -> Result<u64, DebuggerError> {
        let mut s = self.session.lock();
        s.codec.write_command(Command::GetTitleId)?;
        s.codec.write_u64(pid)?;
        let title_id = s.codec.read_u64()?;
        s.expect_success(Command::GetTitleId)?;
        Ok(title_id)
    }

    /// Title id of the current process, or `0` if there is none.
    pub fn get_current_title_id(&self) -> Result<u64, DebuggerError> {
        match self.get_current_pid()? {
            0 => Ok(0),
            pid => self.get_title_id(pid),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
