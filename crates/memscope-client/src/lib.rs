//! memscope-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does memscope-client do? (for beginners)
//!
//! A *debug agent* runs on the target device and listens on TCP port 7331.
//! It can enumerate the address space of a process, read and write its
//! memory, and pause or resume it.  This crate is the host side:
//!
//! 1. Opens a TCP connection to the agent ([`infrastructure::network`]).
//! 2. Drives the binary request/response protocol through a single
//!    [`application::debugger::Debugger`] session.
//! 3. Builds higher-level workflows on top: dumping regions to disk and
//!    scanning readable memory for a byte pattern.
//! 4. Exposes all of it through the `memscope` command-line tool.

/// Application layer: the protocol engine and the workflows built on it.
pub mod application;

/// Infrastructure layer: TCP transport and configuration storage.
pub mod infrastructure;
