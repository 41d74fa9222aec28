//! Code examples.
//!
//! # 1. Building an IOR
//!
//! An object reference can be built directly (e.g. from configuration) or parsed from
//! its stringified `IOR:` or `corbaloc:` form (see [`Ior::decode`] and
//! [`crate::ior::parse_stringified_ior`]):
//!
//! ```rust
//! use corba::Ior;
//!
//! let ior = Ior::create_simple(
//!     "IDL:acme.com/Accounts/Ledger:1.0",
//!     "orb.example.org",
//!     9001,
//!     b"ledger-1".to_vec(),
//! );
//! assert!(!ior.is_nil());
//! ```
//!
//! # 2. Invoking an operation
//!
//! The most generic way to invoke an operation is [`Client::invoke`], which takes an
//! [`Ior`], an operation name, and an already CDR-encoded argument list (built with
//! [`crate::value::encode`] against the operation's TypeCodes), and returns an
//! [`Invocation`].
//!
//! ```rust,no_run
//! use corba::{Client, CorbaResult, Invocation, Ior, TransportConfig};
//!
//! # fn foo() -> CorbaResult<()> {
//! let client = Client::new(TransportConfig::default());
//! let ior = Ior::create_simple("IDL:acme.com/Accounts/Ledger:1.0", "orb.example.org", 9001, b"ledger-1".to_vec());
//!
//! match client.invoke(&ior, "balance", vec![], true)? {
//!     Some(Invocation::Reply { body }) => {
//!         // decode `body` against the operation's result TypeCode
//!         # let _ = body;
//!     }
//!     Some(Invocation::UserException { body }) => {
//!         // a declared exception was raised; decode `body` against its TypeCode
//!         # let _ = body;
//!     }
//!     Some(Invocation::SystemException { .. }) => {
//!         // the peer reported a CORBA system exception
//!     }
//!     Some(Invocation::LocationForward { ior, .. }) => {
//!         // retry the same invocation against `ior`
//!         # let _ = ior;
//!     }
//!     None => {} // oneway request: no reply was requested
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # 3. Connection and retry tuning
//!
//! [`TransportConfig`] controls per-invocation retry behavior; [`ConnectionConfig`]
//! and [`PoolConfig`] control the underlying TCP connections and their pooling:
//!
//! ```rust
//! use corba::{Client, ConnectionConfig, FragmentConfig, PoolConfig, TransportConfig};
//!
//! let client = Client::with_configs(
//!     TransportConfig::default().with_max_retries(2),
//!     ConnectionConfig::default().with_connect_timeout_ms(2_000),
//!     FragmentConfig::default(),
//!     PoolConfig::default(),
//! );
//! # let _ = client;
//! ```
//!
//! # 4. Serving operations
//!
//! A [`Server`] dispatches incoming Requests to handlers registered by operation name,
//! falling back to [`WILDCARD_OPERATION`] for anything unclaimed:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use corba::giop::{GiopMessage, ReplyStatus};
//! use corba::{CorbaResult, Server};
//!
//! # fn foo() -> CorbaResult<()> {
//! let server = Server::builder()
//!     .register_handler(
//!         "balance",
//!         Arc::new(|_request: &GiopMessage, _conn| (ReplyStatus::NoException, vec![])),
//!     )
//!     .bind("0.0.0.0", 9001)?;
//!
//! server.serve(|| false)?; // runs until `should_stop` returns true
//! # Ok(())
//! # }
//! ```
//!
//! # 5. Pooling connections with r2d2
//!
//! With the `r2d2_pool` feature enabled, [`ConnectionManager`] pools raw
//! [`Connection`]s to one fixed endpoint:
//!
//! ```rust,no_run
//! # #[cfg(feature = "r2d2_pool")]
//! # fn foo() {
//! use corba::ConnectionManager;
//!
//! let pool = r2d2::Pool::builder()
//!     .max_size(15)
//!     .build(ConnectionManager::new("orb.example.org", 9001))
//!     .unwrap();
//! let mut conn = pool.get().unwrap();
//! let _ = conn.send_message(&[]);
//! # }
//! ```

#[cfg(feature = "r2d2_pool")]
#[allow(unused_imports)]
use crate::ConnectionManager;
#[allow(unused_imports)]
use crate::giop::{GiopMessage, ReplyStatus};
#[allow(unused_imports)]
use crate::{
    Client, Connection, CorbaResult, FragmentConfig, Invocation, Ior, PoolConfig, Server,
    TransportConfig, WILDCARD_OPERATION,
};
