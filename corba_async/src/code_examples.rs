//! Code examples.
//!
//! # 1. Building an IOR
//!
//! ```rust
//! use corba_async::Ior;
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
//! [`Client::invoke`] resolves the IOR to a host/port, acquires the (possibly
//! shared) connection for that endpoint, and awaits the correlated reply:
//!
//! ```rust,no_run
//! use corba_async::{Client, CorbaResult, Invocation, Ior, TransportConfig};
//!
//! # async fn foo() -> CorbaResult<()> {
//! let client = Client::new(TransportConfig::default());
//! let ior = Ior::create_simple("IDL:acme.com/Accounts/Ledger:1.0", "orb.example.org", 9001, b"ledger-1".to_vec());
//!
//! match client.invoke(&ior, "balance", vec![], true).await? {
//!     Some(Invocation::Reply { body }) => {
//!         // decode `body` against the operation's result TypeCode
//!         # let _ = body;
//!     }
//!     Some(Invocation::UserException { body }) => {
//!         # let _ = body;
//!     }
//!     Some(Invocation::SystemException { .. }) => {}
//!     Some(Invocation::LocationForward { ior, .. }) => {
//!         # let _ = ior;
//!     }
//!     None => {} // oneway request: no reply was requested
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Many concurrent calls to [`Client::invoke`] against the same endpoint share one
//! TCP connection; each invocation's Reply is correlated back to the right caller by
//! request id, not by call order.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use corba_async::{Client, CorbaResult, Ior, TransportConfig};
//!
//! # async fn foo() -> CorbaResult<()> {
//! let client = Arc::new(Client::new(TransportConfig::default()));
//! let ior = Ior::create_simple("IDL:acme.com/Accounts/Ledger:1.0", "orb.example.org", 9001, b"ledger-1".to_vec());
//!
//! let mut handles = Vec::new();
//! for _ in 0..4 {
//!     let client = client.clone();
//!     let ior = ior.clone();
//!     handles.push(tokio::spawn(async move { client.invoke(&ior, "balance", vec![], true).await }));
//! }
//! for handle in handles {
//!     let _ = handle.await;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # 3. Serving operations
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use corba_async::giop::{GiopMessage, ReplyStatus};
//! use corba_async::{CorbaResult, Server};
//!
//! # async fn foo() -> CorbaResult<()> {
//! let server = Server::builder()
//!     .register_handler(
//!         "balance",
//!         Arc::new(|_request: &GiopMessage, _peer| (ReplyStatus::NoException, vec![])),
//!     )
//!     .bind("0.0.0.0", 9001)
//!     .await?;
//!
//! server.serve().await?; // accepts forever; spawn and cancel for shutdown
//! # Ok(())
//! # }
//! ```
//!
//! # 4. Pooling connections with bb8
//!
//! With the `bb8_pool` feature enabled, [`ConnectionManager`] pools standalone
//! [`SharedConnection`]s to one fixed endpoint:
//!
//! ```rust,no_run
//! # #[cfg(feature = "bb8_pool")]
//! # async fn foo() {
//! use corba_async::ConnectionManager;
//!
//! let pool = bb8::Pool::builder()
//!     .max_size(15)
//!     .build(ConnectionManager::new("orb.example.org", 9001))
//!     .await
//!     .unwrap();
//! let conn = pool.get().await.unwrap();
//! let _ = conn.send(1, &[], false).await;
//! # }
//! ```

#[cfg(feature = "bb8_pool")]
#[allow(unused_imports)]
use crate::ConnectionManager;
#[allow(unused_imports)]
use crate::giop::{GiopMessage, ReplyStatus};
#[allow(unused_imports)]
use crate::{
    Client, CorbaResult, FragmentConfig, Invocation, Ior, PoolConfig, Server, SharedConnection,
    TransportConfig, WILDCARD_OPERATION,
};
