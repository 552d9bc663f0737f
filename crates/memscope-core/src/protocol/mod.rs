//! Protocol module containing opcodes, result codes and the binary codec.

pub mod codec;
pub mod command;
pub mod compression;
pub mod result_code;

pub use codec::{Chunk, ProtocolError, RegionRecord, WireCodec};
pub use command::{Command, DebuggerStatus, ProtocolVersion};
pub use result_code::ResultCode;
