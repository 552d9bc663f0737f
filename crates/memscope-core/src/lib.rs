//! # memscope-core
//!
//! Shared library for memscope containing the debug-agent wire codec, result
//! codes, and the memory-region model.
//!
//! It has no dependencies on sockets or the file system; the client crate
//! plugs a TCP connection in through the [`transport::Transport`] trait.
//!
//! # Architecture overview
//!
//! memscope talks to a *debug agent* running on a target device.  The agent
//! exposes the target's address space: you can list its regions, read and
//! write memory, and pause or resume the process being debugged.  The protocol
//! is binary, little-endian and strictly half-duplex: one request, one
//! response, then the next request.
//!
//! This crate defines:
//!
//! - **`transport`** – The blocking byte-stream trait every connection
//!   implements, plus a scripted in-memory implementation for tests.
//!
//! - **`protocol`** – How bytes travel over the wire: opcodes, packed result
//!   words, the primitive [`protocol::WireCodec`], and run-length decoding
//!   of bulk-read chunks.
//!
//! - **`domain`** – [`MemoryRegion`] and [`MemoryType`], the value types that
//!   describe the target's address space.

pub mod domain;
pub mod protocol;
pub mod transport;

// Re-export the most-used types at the crate root so callers can write
// `memscope_core::MemoryRegion` instead of the full module path.
pub use domain::region::{MemoryRegion, MemoryType};
pub use protocol::codec::{ProtocolError, WireCodec};
pub use protocol::command::{Command, DebuggerStatus, ProtocolVersion};
pub use protocol::result_code::ResultCode;
pub use transport::Transport;
