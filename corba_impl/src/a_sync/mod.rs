//! `tokio`-based connection/transport layer: the async twin of [`crate::sync`],
//! built on the same framing in [`crate::giop`] and the same lifecycle shape.
//!
//! A cloned [`tokio::net::TcpStream`] splits into a buffered reader half and a
//! buffered writer half, rather than `tokio::io::split`, so each half can be driven
//! independently without holding the other's lock. Unlike the blocking pool,
//! connections here are multiplexed: every concurrent invocation against one
//! endpoint shares a single socket, with one background reader task per connection
//! correlating Replies to pending requests by request id.

mod client;
mod connection;
mod pool;
mod server;

pub use client::{Client, Invocation};
pub use connection::ConnectionState;
pub use pool::{ConnectionPool, SharedConnection};
pub use server::{HandlerFn, Server, ServerBuilder, WILDCARD_OPERATION};
