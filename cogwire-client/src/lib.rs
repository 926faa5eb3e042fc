//! # CogWire Client
//!
//! Purpose: Provide a minimal, synchronous client for the CogServer
//! s-expression shell, a newline-delimited text protocol spoken over a
//! single persistent TCP connection.
//!
//! ## Design Principles
//! 1. **One Socket, One Exchange**: A session owns exactly one connection
//!    and runs one request/response pair at a time; there is no pipelining.
//! 2. **Explicit State**: The session is either connected or it is not,
//!    with a single lock guarding the transition; no half-open states, no
//!    double-checked flags.
//! 3. **Boundary-Aware Framing**: Replies are newline-terminated except the
//!    initial greeting; the receive loop models that quirk explicitly.
//! 4. **Fail Fast**: Every failure carries the host or the system error
//!    text; nothing is retried internally.

mod client;
mod uri;
mod wire;

pub use client::{ClientError, ClientResult, CogClient, CogStats};
