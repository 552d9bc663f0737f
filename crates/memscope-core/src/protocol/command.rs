//! Command opcodes and the agent status enumeration.
//!
//! Every request on the wire starts with a single opcode byte.  The opcode
//! fully determines the rest of the request layout and the shape of the
//! response:
//!
//! ```text
//! opcode  request (after opcode)        response
//! ──────  ────────────────────────────  ─────────────────────────────────────
//! 0x01    -                             u8 status, u8×3 version, u32 result
//! 0x02-05 u64 addr, u8/u16/u32/u64      u32 result [u32 result if failed]
//! 0x06    u64 addr, u32 size            u32 result, N×(u32 result, chunk), u32 result
//! 0x07    u64 addr, u32 len             u32 result, [payload], u32 result
//! 0x08    -                             u32 result
//! 0x09    -                             u32 result
//! 0x0A    u64 pid                       u32 result
//! 0x0B    -                             u32 result
//! 0x0C    u64 addr                      region info
//! 0x0D    u64 start, u32 max_count      k×region info, u32 result
//! 0x0E    -                             u64 pid, u32 result
//! 0x0F    -                             u64 pid, u32 result
//! 0x10    -                             u32 count, u64×count, u32 result
//! 0x11    u64 pid                       u64 title id, u32 result
//! 0x12    -                             u32 result
//! ```
//!
//! All multi-byte integers are little-endian.

use std::fmt;

use serde::Serialize;

use super::codec::ProtocolError;

// ── Opcodes ───────────────────────────────────────────────────────────────────

/// All opcodes understood by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum Command {
    Status = 0x01,
    Poke8 = 0x02,
    Poke16 = 0x03,
    Poke32 = 0x04,
    Poke64 = 0x05,
    Read = 0x06,
    Write = 0x07,
    Continue = 0x08,
    Pause = 0x09,
    Attach = 0x0A,
    Detach = 0x0B,
    QueryMemory = 0x0C,
    QueryMemoryMulti = 0x0D,
    CurrentPid = 0x0E,
    GetAttachedPid = 0x0F,
    GetPids = 0x10,
    GetTitleId = 0x11,
    Disconnect = 0x12,
    /// Defined by the agent; no request layout is published for it.
    ReadMulti = 0x13,
    /// Defined by the agent; no request layout is published for it.
    SetBreakpoint = 0x14,
}

impl Command {
    /// The opcode byte written on the wire.
    pub fn opcode(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Command::Status),
            0x02 => Ok(Command::Poke8),
            0x03 => Ok(Command::Poke16),
            0x04 => Ok(Command::Poke32),
            0x05 => Ok(Command::Poke64),
            0x06 => Ok(Command::Read),
            0x07 => Ok(Command::Write),
            0x08 => Ok(Command::Continue),
            0x09 => Ok(Command::Pause),
            0x0A => Ok(Command::Attach),
            0x0B => Ok(Command::Detach),
            0x0C => Ok(Command::QueryMemory),
            0x0D => Ok(Command::QueryMemoryMulti),
            0x0E => Ok(Command::CurrentPid),
            0x0F => Ok(Command::GetAttachedPid),
            0x10 => Ok(Command::GetPids),
            0x11 => Ok(Command::GetTitleId),
            0x12 => Ok(Command::Disconnect),
            0x13 => Ok(Command::ReadMulti),
            0x14 => Ok(Command::SetBreakpoint),
            other => Err(ProtocolError::UnknownCommand(other)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(0x{:02X})", self, self.opcode())
    }
}

// ── Agent status ──────────────────────────────────────────────────────────────

/// Execution state reported by the STATUS command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum DebuggerStatus {
    Stopped = 0,
    Running = 1,
    Paused = 2,
}

impl TryFrom<u8> for DebuggerStatus {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DebuggerStatus::Stopped),
            1 => Ok(DebuggerStatus::Running),
            2 => Ok(DebuggerStatus::Paused),
            other => Err(ProtocolError::UnknownStatus(other)),
        }
    }
}

/// Agent protocol version carried in the STATUS response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl ProtocolVersion {
    /// The 24-bit packed form `major << 16 | minor << 8 | patch`.
    pub fn packed(self) -> u32 {
        (u32::from(self.major) << 16) | (u32::from(self.minor) << 8) | u32::from(self.patch)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
