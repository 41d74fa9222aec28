//! Explicit, constructible configuration for every tunable enumerated by the
//! connection, pool, transport, fragment-reassembly, and CDR-buffer layers.
//!
//! No environment variables and no global state: callers build a config value and
//! hand it to the constructor that needs it.

use serde::{Deserialize, Serialize};

/// Tunables for a single TCP connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    /// Applied via `SO_KEEPALIVE` on every connect/accept.
    pub keep_alive: bool,
    pub no_delay: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 30_000,
            read_timeout_ms: 60_000,
            keep_alive: true,
            no_delay: true,
        }
    }
}

impl ConnectionConfig {
    pub fn with_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    pub fn with_read_timeout_ms(mut self, ms: u64) -> Self {
        self.read_timeout_ms = ms;
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_no_delay(mut self, no_delay: bool) -> Self {
        self.no_delay = no_delay;
        self
    }
}

/// Tunables for the connection pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub max_idle_time_ms: u64,
    pub cleanup_interval_ms: u64,
    /// Starts a background idle-sweeper task. Off by default so tests and
    /// short-lived processes don't leak a timer.
    pub auto_sweep: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_time_ms: 300_000,
            cleanup_interval_ms: 60_000,
            auto_sweep: false,
        }
    }
}

impl PoolConfig {
    pub fn with_max_idle_time_ms(mut self, ms: u64) -> Self {
        self.max_idle_time_ms = ms;
        self
    }

    pub fn with_cleanup_interval_ms(mut self, ms: u64) -> Self {
        self.cleanup_interval_ms = ms;
        self
    }

    pub fn with_auto_sweep(mut self, auto_sweep: bool) -> Self {
        self.auto_sweep = auto_sweep;
        self
    }
}

/// Tunables for request dispatch: per-request timeout and retry policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    pub request_timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            max_retries: 3,
            retry_delay_ms: 1_000,
        }
    }
}

impl TransportConfig {
    pub fn with_request_timeout_ms(mut self, ms: u64) -> Self {
        self.request_timeout_ms = ms;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay_ms(mut self, ms: u64) -> Self {
        self.retry_delay_ms = ms;
        self
    }
}

/// Tunables for fragment reassembly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentConfig {
    pub fragment_timeout_ms: u64,
    pub fragment_cleanup_interval_ms: u64,
}

impl Default for FragmentConfig {
    fn default() -> Self {
        Self {
            fragment_timeout_ms: 30_000,
            fragment_cleanup_interval_ms: 10_000,
        }
    }
}

impl FragmentConfig {
    pub fn with_fragment_timeout_ms(mut self, ms: u64) -> Self {
        self.fragment_timeout_ms = ms;
        self
    }

    pub fn with_fragment_cleanup_interval_ms(mut self, ms: u64) -> Self {
        self.fragment_cleanup_interval_ms = ms;
        self
    }
}

/// Tunables for `CdrOutput`'s backing buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdrBufferConfig {
    pub initial_capacity: usize,
    /// Multiplier applied to the current capacity when a write would overflow it.
    /// Stored as a fixed-point percentage (e.g. `200` == 2.0x) so the config stays
    /// `Eq`-able.
    pub growth_factor_percent: u32,
}

impl Default for CdrBufferConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 256,
            growth_factor_percent: 200,
        }
    }
}

impl CdrBufferConfig {
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn with_growth_factor_percent(mut self, percent: u32) -> Self {
        self.growth_factor_percent = percent;
        self
    }
}

/// The pair of code sets (char, wchar) negotiated on a connection, or assumed before
/// negotiation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSetsConfig {
    pub char_codeset: u32,
    pub wchar_codeset: u32,
}

impl Default for CodeSetsConfig {
    fn default() -> Self {
        Self {
            char_codeset: crate::DEFAULT_CHAR_CODESET,
            wchar_codeset: crate::DEFAULT_WCHAR_CODESET,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_config_has_sane_defaults() {
        let c = ConnectionConfig::default();
        assert_eq!(c.connect_timeout_ms, 30_000);
        assert_eq!(c.read_timeout_ms, 60_000);
        assert!(c.keep_alive);
        assert!(c.no_delay);
    }

    #[test]
    fn builder_methods_chain() {
        let c = ConnectionConfig::default()
            .with_connect_timeout_ms(1_000)
            .with_no_delay(false);
        assert_eq!(c.connect_timeout_ms, 1_000);
        assert!(!c.no_delay);
    }

    #[test]
    fn codesets_default_to_iso_8859_1_and_utf16() {
        let cs = CodeSetsConfig::default();
        assert_eq!(cs.char_codeset, 0x0001_0001);
        assert_eq!(cs.wchar_codeset, 0x0001_0109);
    }
}
