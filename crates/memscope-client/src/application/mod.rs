//! Application layer use cases for the client.
//!
//! # What use cases does the client have?
//!
//! - **`debugger`** – The protocol engine.  One [`debugger::Debugger`] owns one
//!   agent connection and turns each command into its exact request/response
//!   exchange, serialised by a session lock.
//!
//! - **`dump`** – Reads memory through the engine and writes it to files,
//!   one `{address}.dmp` file per region.
//!
//! - **`scan`** – Picks the regions worth reading out of an enumeration and
//!   searches them for a byte pattern.

pub mod debugger;
pub mod dump;
pub mod scan;
