//! Connection pooling with r2d2.

use corba_impl::config::{ConnectionConfig, FragmentConfig};
use corba_impl::error::CorbaError;
use corba_impl::sync::{Connection, ConnectionState};
use log::trace;

/// Implementation of r2d2's
/// [`ManageConnection`](https://docs.rs/r2d2/*/r2d2/trait.ManageConnection.html),
/// pooling raw [`Connection`]s to one fixed `host:port` IIOP endpoint.
///
/// ## Example
///
/// ```rust,no_run
/// use corba::{ConnectionConfig, ConnectionManager, FragmentConfig};
///
/// # use corba_impl::error::CorbaResult;
/// # fn foo() -> CorbaResult<()> {
/// let pool = r2d2::Pool::builder()
///     .max_size(15)
///     .build(ConnectionManager::new("orb.example.org", 9001))
///     .unwrap();
///
/// let mut conn = pool.get().unwrap();
/// conn.send_message(&[])?;
/// # Ok(())}
/// ```
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

impl r2d2::ManageConnection for ConnectionManager {
    type Connection = Connection;
    type Error = CorbaError;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        trace!("ConnectionManager::connect() to {}:{}", self.host, self.port);
        Connection::connect(self.host.clone(), self.port, self.config, self.fragment_config)
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        trace!("ConnectionManager::is_valid()");
        if conn.state() == ConnectionState::Connected {
            Ok(())
        } else {
            Err(CorbaError::comm_failure(format!(
                "pooled connection to {}:{} is in state {:?}",
                conn.host(),
                conn.port(),
                conn.state()
            )))
        }
    }

    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        trace!("ConnectionManager::has_broken()");
        conn.state() != ConnectionState::Connected
    }
}
