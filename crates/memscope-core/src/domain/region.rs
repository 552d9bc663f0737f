//! Memory regions of the target's address space.
//!
//! The agent describes the target's address space as a list of contiguous
//! regions.  Each region has a start address, a size, a *memory type* telling
//! what the kernel uses it for, and a read/write/execute permission mask.
//!
//! ```text
//!   address                      next_address
//!      │◄──────────── size ──────────►│
//!      ├──────────────────────────────┤
//!      │ type = CodeStatic, perm = R-X │
//!      └──────────────────────────────┘
//! ```
//!
//! `contains` is half-open: `address` is inside the region, `next_address`
//! is not.

use std::fmt;
use std::ops::Range;

use serde::Serialize;

use crate::protocol::codec::ProtocolError;

/// Permission bits carried in [`MemoryRegion::permissions`].
pub mod permissions {
    pub const READ: u8 = 1 << 0;
    pub const WRITE: u8 = 1 << 1;
    pub const EXECUTE: u8 = 1 << 2;
}

// ── Memory type ───────────────────────────────────────────────────────────────

/// Kernel-assigned purpose of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u32)]
pub enum MemoryType {
    Unmapped = 0x00,
    Io = 0x01,
    Normal = 0x02,
    CodeStatic = 0x03,
    CodeMutable = 0x04,
    Heap = 0x05,
    Shared = 0x06,
    WeirdMapped = 0x07,
    ModuleCodeStatic = 0x08,
    ModuleCodeMutable = 0x09,
    IpcBuffer0 = 0x0A,
    Mapped = 0x0B,
    ThreadLocal = 0x0C,
    IsolatedTransfer = 0x0D,
    Transfer = 0x0E,
    Process = 0x0F,
    /// Marks the end of the mapped address space in region enumerations.
    Reserved = 0x10,
    IpcBuffer1 = 0x11,
    IpcBuffer3 = 0x12,
    KernelStack = 0x13,
    CodeReadOnly = 0x14,
    CodeWritable = 0x15,
}

impl TryFrom<u32> for MemoryType {
    type Error = ProtocolError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        let ty = match value {
            0x00 => MemoryType::Unmapped,
            0x01 => MemoryType::Io,
            0x02 => MemoryType::Normal,
            0x03 => MemoryType::CodeStatic,
            0x04 => MemoryType::CodeMutable,
            0x05 => MemoryType::Heap,
            0x06 => MemoryType::Shared,
            0x07 => MemoryType::WeirdMapped,
            0x08 => MemoryType::ModuleCodeStatic,
            0x09 => MemoryType::ModuleCodeMutable,
            0x0A => MemoryType::IpcBuffer0,
            0x0B => MemoryType::Mapped,
            0x0C => MemoryType::ThreadLocal,
            0x0D => MemoryType::IsolatedTransfer,
            0x0E => MemoryType::Transfer,
            0x0F => MemoryType::Process,
            0x10 => MemoryType::Reserved,
            0x11 => MemoryType::IpcBuffer1,
            0x12 => MemoryType::IpcBuffer3,
            0x13 => MemoryType::KernelStack,
            0x14 => MemoryType::CodeReadOnly,
            0x15 => MemoryType::CodeWritable,
            other => return Err(ProtocolError::UnknownMemoryType(other)),
        };
        Ok(ty)
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ── Region ────────────────────────────────────────────────────────────────────

/// One contiguous span of the target's address space.
///
/// Regions come from agent responses only; see [`MemoryRegion::from_raw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MemoryRegion {
    address: u64,
    size: u64,
    memory_type: MemoryType,
    permissions: u8,
}

impl MemoryRegion {
    /// Decodes a region from the raw fields of a region-info record.
    ///
    /// The permission field is 32 bits on the wire; only its low byte carries
    /// flags.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownMemoryType`] for an unknown type tag.
    pub fn from_raw(
        address: u64,
        size: u64,
        memory_type: u32,
        permissions: u32,
    ) -> Result<Self, ProtocolError> {
        Ok(Self {
            address,
            size,
            memory_type: MemoryType::try_from(memory_type)?,
            permissions: (permissions & 0xFF) as u8,
        })
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn memory_type(&self) -> MemoryType {
        self.memory_type
    }

    pub fn permissions(&self) -> u8 {
        self.permissions
    }

    /// First address past the end of the region.
    ///
    /// Saturates at `u64::MAX` for a region ending at the top of the space.
    pub fn next_address(&self) -> u64 {
        self.address.saturating_add(self.size)
    }

    pub fn range(&self) -> Range<u64> {
        self.address..self.next_address()
    }

    pub fn readable(&self) -> bool {
        self.permissions & permissions::READ != 0
    }

    pub fn writable(&self) -> bool {
        self.permissions & permissions::WRITE != 0
    }

    pub fn executable(&self) -> bool {
        self.permissions & permissions::EXECUTE != 0
    }

    /// Permission mask rendered as `RWX`, with `-` for missing flags.
    pub fn perm_str(&self) -> String {
        let mut s = String::with_capacity(3);
        s.push(if self.readable() { 'R' } else { '-' });
        s.push(if self.writable() { 'W' } else { '-' });
        s.push(if self.executable() { 'X' } else { '-' });
        s
    }

    /// `true` if `addr` lies in `[address, next_address)`.
    pub fn contains(&self, addr: u64) -> bool {
        self.address <= addr && addr < self.next_address()
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MemoryRegion(addr=0x{:08x}, size=0x{:04x}, type={}, perm={})",
            self.address,
            self.size,
            self.memory_type,
            self.perm_str()
        )
    }
}
