//! Infrastructure layer for the client application.
//!
//! Contains the OS-facing adapters: the TCP socket that carries the protocol
//! and the TOML configuration file.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `memscope_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`network`** – [`network::TcpTransport`], the blocking TCP implementation
//!   of `memscope_core::Transport`.
//!
//! - **`storage`** – Loads and saves `config.toml` from the platform
//!   configuration directory.

pub mod network;
pub mod storage;
