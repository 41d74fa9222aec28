//! Synchronous CORBA 3.4 ORB runtime, written completely in Rust.
//!
//! `corba` implements a CORBA General Inter-ORB Protocol (GIOP) client and server over
//! IIOP: the Common Data Representation (CDR) codec, the TypeCode model, a
//! TypeCode-driven value codec, Interoperable Object References (IORs) in both
//! binary and stringified (`IOR:`/`corbaloc:`) form, and blocking GIOP/IIOP message
//! framing and transport.
//!
//! For use cases that need non-blocking I/O, use `corba`'s asynchronous sibling,
//! [`corba_async`](https://docs.rs/corba_async). The two crates share the same
//! wire-level implementation and differ only in how connections are driven.
//!
//! See [code examples](crate::code_examples) for an overview.

// only enables the `doc_cfg` feature when the `docsrs` configuration attribute is defined
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_debug_implementations)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

#[cfg(feature = "r2d2_pool")]
mod r2d2;

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

pub use corba_impl::sync::{
    Client, Connection, ConnectionPool, ConnectionState, HandlerFn, Invocation, Server,
    ServerBuilder, WILDCARD_OPERATION,
};

/// Per-connection traffic counters, as returned by [`Connection::stats`].
pub use corba_impl::stats::ConnectionStatistics;

#[cfg_attr(docsrs, doc(cfg(feature = "r2d2_pool")))]
#[cfg(feature = "r2d2_pool")]
pub use r2d2::ConnectionManager;

pub mod code_examples;
