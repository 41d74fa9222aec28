//! Asynchronous CORBA 3.4 ORB runtime, built on [`tokio`](https://crates.io/crates/tokio).
//!
//! `corba_async` implements the same CORBA General Inter-ORB Protocol (GIOP) client
//! and server over IIOP as its synchronous sibling,
//! [`corba`](https://docs.rs/corba) — the Common Data Representation (CDR) codec, the
//! TypeCode model, a TypeCode-driven value codec, Interoperable Object References
//! (IORs), and GIOP/IIOP message framing — but drives connections with non-blocking
//! I/O and, unlike the blocking driver, multiplexes many concurrent invocations over
//! one TCP connection rather than checking connections in and out exclusively.
//!
//! See [code examples](crate::code_examples) for an overview.

// only enables the `doc_cfg` feature when the `docsrs` configuration attribute is defined
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_debug_implementations)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

#[cfg(feature = "bb8_pool")]
mod bb8;

/// CDR encoding/decoding: primitives, alignment, encapsulations.
pub use corba_impl::cdr;

/// Connection, pool, and transport tuning knobs.
pub use corba_impl::config::{
    CdrBufferConfig, CodeSetsConfig, ConnectionConfig, FragmentConfig, PoolConfig, TransportConfig,
};

pub use corba_impl::error::{CompletionStatus, CorbaError, CorbaResult, SystemException};

/// GIOP message framing and the wire-level message types.
pub use corba_impl::giop;

/// Interoperable Object References: tagged profiles/components and `IOR:`/`corbaloc:`
/// stringified forms.
pub use corba_impl::ior::{self, IiopProfileBody, Ior, TaggedComponent, TaggedProfile};

/// The TypeCode model.
pub use corba_impl::typecode::{self, TCKind, TypeCode};

/// The TypeCode-driven value codec: encodes/decodes tagged [`value::Value`]s
/// against a `TypeCode`.
pub use corba_impl::value::{self, Value};

pub use corba_impl::a_sync::{
    Client, ConnectionPool, ConnectionState, HandlerFn, Invocation, Server, ServerBuilder,
    SharedConnection, WILDCARD_OPERATION,
};

/// Per-connection traffic counters, as returned by [`SharedConnection::stats`].
pub use corba_impl::stats::ConnectionStatistics;

#[cfg_attr(docsrs, doc(cfg(feature = "bb8_pool")))]
#[cfg(feature = "bb8_pool")]
pub use bb8::ConnectionManager;

pub mod code_examples;
