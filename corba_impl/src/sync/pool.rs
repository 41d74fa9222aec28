use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::{ConnectionConfig, FragmentConfig, PoolConfig};
use crate::error::{CorbaError, CorbaResult};
use crate::sync::connection::Connection;

/// A pool of [`Connection`]s keyed by `host:port`, one idle connection reused per
/// endpoint. This runtime owns its own pool rather than delegating to an
/// external-crate-managed one: connections are cheap enough, and fragment/
/// reassembly state lives on the connection itself, so a generic object pool would
/// just be a thin, differently shaped wrapper around the same logic.
pub struct ConnectionPool {
    config: ConnectionConfig,
    fragment_config: FragmentConfig,
    pool_config: PoolConfig,
    idle: Mutex<HashMap<(String, u16), Vec<Connection>>>,
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("pool_config", &self.pool_config)
            .finish()
    }
}

impl ConnectionPool {
    pub fn new(config: ConnectionConfig, fragment_config: FragmentConfig, pool_config: PoolConfig) -> Arc<Self> {
        let pool = Arc::new(Self {
            config,
            fragment_config,
            pool_config,
            idle: Mutex::new(HashMap::new()),
        });
        if pool.pool_config.auto_sweep {
            pool.clone().spawn_sweeper();
        }
        pool
    }

    fn spawn_sweeper(self: Arc<Self>) {
        let interval = Duration::from_millis(self.pool_config.cleanup_interval_ms);
        std::thread::spawn(move || loop {
            std::thread::sleep(interval);
            self.sweep_idle();
        });
    }

    /// `localhost` is normalized to `127.0.0.1`, matching the async pool and the
    /// connection-pool keying rule in general.
    fn normalize_host(host: &str) -> String {
        if host.eq_ignore_ascii_case("localhost") {
            "127.0.0.1".to_string()
        } else {
            host.to_string()
        }
    }

    /// Takes an idle connection to `host:port` if one is available and still fresh
    /// enough, else opens a new one.
    pub fn acquire(&self, host: &str, port: u16) -> CorbaResult<Connection> {
        let key = (Self::normalize_host(host), port);
        let reused = {
            let mut idle = self.idle.lock().expect("pool mutex poisoned");
            idle.get_mut(&key).and_then(Vec::pop)
        };
        if let Some(conn) = reused {
            log::trace!("reusing pooled connection to {host}:{port}");
            return Ok(conn);
        }
        Connection::connect(key.0, port, self.config, self.fragment_config)
    }

    /// Returns a connection to the pool for reuse, unless it is no longer usable.
    pub fn release(&self, conn: Connection) {
        if conn.state() != crate::sync::ConnectionState::Connected {
            return;
        }
        let key = (Self::normalize_host(conn.host()), conn.port());
        let mut idle = self.idle.lock().expect("pool mutex poisoned");
        idle.entry(key).or_default().push(conn);
    }

    /// Drops idle connections that have exceeded `max_idle_time_ms`, and closes
    /// (sends `CloseConnection` to) each one as it is dropped.
    pub fn sweep_idle(&self) {
        let max_idle = Duration::from_millis(self.pool_config.max_idle_time_ms);
        let mut idle = self.idle.lock().expect("pool mutex poisoned");
        for conns in idle.values_mut() {
            conns.retain(|c| c.last_used().elapsed() < max_idle);
        }
        idle.retain(|_, conns| !conns.is_empty());
    }

    pub fn idle_count(&self, host: &str, port: u16) -> usize {
        let idle = self.idle.lock().expect("pool mutex poisoned");
        idle.get(&(Self::normalize_host(host), port)).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_without_a_listener_fails_as_transient_or_comm_failure() {
        let pool = ConnectionPool::new(
            ConnectionConfig::default().with_connect_timeout_ms(200),
            FragmentConfig::default(),
            PoolConfig::default(),
        );
        let err = pool.acquire("127.0.0.1", 1).unwrap_err();
        assert!(matches!(
            err,
            CorbaError::Transient(_) | CorbaError::CommFailure(_)
        ));
    }

    #[test]
    fn localhost_key_normalizes_to_loopback() {
        assert_eq!(ConnectionPool::normalize_host("localhost"), "127.0.0.1");
        assert_eq!(ConnectionPool::normalize_host("LOCALHOST"), "127.0.0.1");
        assert_eq!(ConnectionPool::normalize_host("example.org"), "example.org");
    }
}
