//! IPC bridge to the Wayfire compositor.
//!
//! # Architecture
//!
//! - **protocol**: Message types (Request, WireMessage -> Message/Event/Reply)
//! - **codec**: Little-endian length-prefixed JSON framing for AsyncRead/AsyncWrite
//! - **transport**: Socket discovery and connection

pub mod codec;
pub mod protocol;
pub mod transport;
