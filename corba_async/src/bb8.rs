//! Connection Pooling with bb8.

use std::sync::Arc;

use async_trait::async_trait;
use bb8::ManageConnection;
use log::trace;

use corba_impl::a_sync::SharedConnection;
use corba_impl::config::{ConnectionConfig, FragmentConfig};
use corba_impl::error::CorbaError;

/// Implementation of
/// [`bb8::ManageConnection`](https://docs.rs/bb8/latest/bb8/trait.ManageConnection.html#).
///
/// Pools standalone [`SharedConnection`]s to one fixed `host:port` IIOP endpoint.
/// Each pooled connection already multiplexes many concurrent invocations on its own;
/// pooling several behind `bb8` spreads invocations across more than one TCP
/// connection and reader task.
///
/// ## Example
///
/// ```rust,no_run
/// use bb8::Pool;
/// use corba_async::ConnectionManager;
///
/// # use corba_impl::error::CorbaResult;
/// # async fn foo() -> CorbaResult<()> {
/// let pool = Pool::builder()
///     .max_size(15)
///     .build(ConnectionManager::new("orb.example.org", 9001))
///     .await
///     .unwrap();
///
/// let conn = pool.get().await.unwrap();
/// let _ = conn.send(1, &[], false).await;
/// # Ok(())}
/// ```
///
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    host: String,
    port: u16,
    config: ConnectionConfig,
    fragment_config: FragmentConfig,
}
impl ConnectionManager {
    /// Creates a new `ConnectionManager` with default connection/fragment settings.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            config: ConnectionConfig::default(),
            fragment_config: FragmentConfig::default(),
        }
    }

    /// Creates a new `ConnectionManager` with the given connection/fragment settings.
    pub fn with_configs(
        host: impl Into<String>,
        port: u16,
        config: ConnectionConfig,
        fragment_config: FragmentConfig,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            config,
            fragment_config,
        }
    }
}

#[async_trait]
impl ManageConnection for ConnectionManager {
    type Connection = Arc<SharedConnection>;
    type Error = CorbaError;

    #[doc = r" Attempts to create a new connection."]
    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        trace!("ConnectionManager::connect() to {}:{}", self.host, self.port);
        SharedConnection::open(
            self.host.clone(),
            self.port,
            self.config,
            self.fragment_config,
        )
        .await
    }

    #[doc = r" Determines if the connection is still usable."]
    async fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        trace!("ConnectionManager::is_valid()");
        if conn.is_usable() {
            Ok(())
        } else {
            Err(CorbaError::comm_failure(format!(
                "pooled connection to {}:{} is no longer usable",
                self.host, self.port
            )))
        }
    }

    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        !conn.is_usable()
    }
}
