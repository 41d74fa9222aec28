//! Blocking connection/transport layer: one TCP connection per endpoint, a pool of
//! them, and client/server facades built on top of [`crate::giop`] framing.
//!
//! A state-carrying connection object owns the socket, with a `Drop` impl that
//! makes a best-effort graceful close, and a pool keyed by endpoint identity.

mod client;
mod connection;
mod pool;
mod server;

pub use client::{Client, Invocation};
pub use connection::{Connection, ConnectionState};
pub use pool::ConnectionPool;
pub use server::{HandlerFn, Server, ServerBuilder, WILDCARD_OPERATION};
