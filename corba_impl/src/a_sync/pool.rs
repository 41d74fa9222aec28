use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

use crate::cdr::CodeSets;
use crate::config::{ConnectionConfig, FragmentConfig, PoolConfig};
use crate::error::{CorbaError, CorbaResult};
use crate::giop::{GiopMessage, GiopVersion};
use crate::stats::{ConnectionStatistics, StatisticsCounters};

use crate::a_sync::connection::{connect_split, ConnectionState, ConnectionWriter};

type Key = (String, u16);

/// A connection shared by every concurrent invocation against one endpoint. A single
/// background reader task owns the socket's read half and the fragment-reassembly
/// table, needing no lock of its own; callers only ever touch the write half and the
/// pending-request map, each behind its own lock. The sender writes only to the
/// socket.
pub struct SharedConnection {
    host: String,
    port: u16,
    writer: AsyncMutex<ConnectionWriter>,
    pending: StdMutex<HashMap<u32, oneshot::Sender<GiopMessage>>>,
    version: StdMutex<GiopVersion>,
    state: StdMutex<ConnectionState>,
    last_used: StdMutex<Instant>,
    reader_task: StdMutex<Option<JoinHandle<()>>>,
    codesets: StdMutex<CodeSets>,
    stats: Arc<StatisticsCounters>,
}

impl std::fmt::Debug for SharedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedConnection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("state", &*self.state.lock().expect("state mutex poisoned"))
            .finish()
    }
}

impl SharedConnection {
    /// Opens a standalone shared connection to `host:port`, outside any
    /// [`ConnectionPool`]. Useful for callers (e.g. a `bb8`/`r2d2`-style external
    /// pool) that want to manage the lifecycle of individual connections
    /// themselves rather than through this crate's endpoint-multiplexing pool.
    pub async fn open(
        host: String,
        port: u16,
        config: ConnectionConfig,
        fragment_config: FragmentConfig,
    ) -> CorbaResult<Arc<Self>> {
        let stats = Arc::new(StatisticsCounters::new());
        let (reader, writer, version) =
            connect_split(host.clone(), port, config, fragment_config, stats.clone()).await?;
        let shared = Arc::new(Self {
            host,
            port,
            writer: AsyncMutex::new(writer),
            pending: StdMutex::new(HashMap::new()),
            version: StdMutex::new(version),
            state: StdMutex::new(ConnectionState::Connected),
            last_used: StdMutex::new(Instant::now()),
            reader_task: StdMutex::new(None),
            codesets: StdMutex::new(CodeSets::default()),
            stats,
        });
        shared.clone().spawn_reader(reader);
        Ok(shared)
    }

    /// The single reader task for this connection: reads framed messages forever,
    /// dispatching Replies to their waiting pending entry by request id. Replies are
    /// correlated by request id, not by order. `CloseConnection` and `MessageError`
    /// fail every outstanding pending entry and end the task. Owns `reader` outright,
    /// so it never contends with a concurrent `send`.
    fn spawn_reader(self: Arc<Self>, mut reader: crate::a_sync::connection::ConnectionReader) {
        let handle = tokio::spawn(async move {
            loop {
                let outcome = reader.receive_message().await;
                match outcome {
                    Ok(msg @ (GiopMessage::Reply { .. } | GiopMessage::LocateReply { .. })) => {
                        let request_id = match &msg {
                            GiopMessage::Reply { request_id, .. }
                            | GiopMessage::LocateReply { request_id, .. } => *request_id,
                            _ => unreachable!("matched above"),
                        };
                        if let GiopMessage::Reply { service_context, .. } = &msg {
                            if let Some(negotiated) =
                                crate::giop::ServiceContext::codesets_from_list(service_context)
                            {
                                self.set_codesets(negotiated);
                            }
                        }
                        let sender = self
                            .pending
                            .lock()
                            .expect("pending mutex poisoned")
                            .remove(&request_id);
                        match sender {
                            Some(sender) => {
                                let _ = sender.send(msg);
                            }
                            None => {
                                log::warn!(
                                    "discarding reply for unknown or timed-out request id {request_id} on {}:{}",
                                    self.host, self.port
                                );
                            }
                        }
                    }
                    Ok(GiopMessage::CloseConnection) => {
                        log::trace!("peer closed {}:{}", self.host, self.port);
                        self.fail_all(CorbaError::comm_failure("peer sent CloseConnection"));
                        break;
                    }
                    Ok(GiopMessage::MessageError) => {
                        self.fail_all(CorbaError::comm_failure("peer sent MessageError"));
                        break;
                    }
                    Ok(other) => {
                        log::warn!(
                            "dropping unexpected client-side message on {}:{}: {other:?}",
                            self.host, self.port
                        );
                    }
                    Err(CorbaError::Transient(_)) => {
                        // A read timeout leaves the socket usable; keep polling.
                        continue;
                    }
                    Err(e) => {
                        self.fail_all(e);
                        break;
                    }
                }
            }
            *self.state.lock().expect("state mutex poisoned") = ConnectionState::Closed;
        });
        *self.reader_task.lock().expect("reader_task mutex poisoned") = Some(handle);
    }

    fn fail_all(&self, err: CorbaError) {
        let mut pending = self.pending.lock().expect("pending mutex poisoned");
        for (_, sender) in pending.drain() {
            // The receiver may already be gone (timed out); dropping the sender is
            // then a no-op, which is the desired "late reply discarded" behavior.
            drop(sender.send(GiopMessage::MessageError));
        }
        drop(pending);
        log::warn!("connection to {}:{} failed: {err}", self.host, self.port);
    }

    pub fn is_usable(&self) -> bool {
        *self.state.lock().expect("state mutex poisoned") == ConnectionState::Connected
    }

    pub fn last_used(&self) -> Instant {
        *self.last_used.lock().expect("last_used mutex poisoned")
    }

    pub fn version(&self) -> GiopVersion {
        *self.version.lock().expect("version mutex poisoned")
    }

    /// The code sets currently negotiated with the peer on this connection.
    pub fn codesets(&self) -> CodeSets {
        *self.codesets.lock().expect("codesets mutex poisoned")
    }

    pub fn set_codesets(&self, codesets: CodeSets) {
        *self.codesets.lock().expect("codesets mutex poisoned") = codesets;
    }

    pub fn stats(&self) -> ConnectionStatistics {
        self.stats.snapshot()
    }

    /// Registers a pending reply channel under `request_id`, writes `bytes`, and
    /// returns the receiving half. No-op registration (returns `None`) when the
    /// caller does not want a reply (oneway).
    pub async fn send(
        &self,
        request_id: u32,
        bytes: &[u8],
        wants_reply: bool,
    ) -> CorbaResult<Option<oneshot::Receiver<GiopMessage>>> {
        let receiver = if wants_reply {
            let (tx, rx) = oneshot::channel();
            self.pending
                .lock()
                .expect("pending mutex poisoned")
                .insert(request_id, tx);
            Some(rx)
        } else {
            None
        };

        let result = {
            let mut writer = self.writer.lock().await;
            writer.send_message(bytes).await
        };
        *self.last_used.lock().expect("last_used mutex poisoned") = Instant::now();

        if let Err(e) = result {
            self.pending
                .lock()
                .expect("pending mutex poisoned")
                .remove(&request_id);
            *self.state.lock().expect("state mutex poisoned") = ConnectionState::Closed;
            return Err(e);
        }
        Ok(receiver)
    }

    /// Removes a pending entry without sending anything further; used when a local
    /// timeout fires so a later reply for the same id is silently dropped.
    pub fn forget(&self, request_id: u32) {
        self.pending
            .lock()
            .expect("pending mutex poisoned")
            .remove(&request_id);
    }

    /// Sends a best-effort `CloseConnection`, fails every pending request, and
    /// stops the reader task.
    pub async fn close(&self) {
        {
            let mut writer = self.writer.lock().await;
            writer.send_close(self.version()).await;
        }
        *self.state.lock().expect("state mutex poisoned") = ConnectionState::Closed;
        self.fail_all(CorbaError::comm_failure("connection closed by pool"));
        if let Some(handle) = self
            .reader_task
            .lock()
            .expect("reader_task mutex poisoned")
            .take()
        {
            handle.abort();
        }
    }
}

/// A pool of multiplexed [`SharedConnection`]s keyed by `host:port`. Unlike the
/// blocking pool, connections are never checked in/out exclusively: every pending
/// request shares the same socket, correlated by request id via the connection's
/// reader task.
pub struct ConnectionPool {
    config: ConnectionConfig,
    fragment_config: FragmentConfig,
    pool_config: PoolConfig,
    slots: StdMutex<HashMap<Key, Arc<AsyncMutex<Option<Arc<SharedConnection>>>>>>,
    sweeper: StdMutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("pool_config", &self.pool_config)
            .finish()
    }
}

impl ConnectionPool {
    pub fn new(
        config: ConnectionConfig,
        fragment_config: FragmentConfig,
        pool_config: PoolConfig,
    ) -> Arc<Self> {
        let pool = Arc::new(Self {
            config,
            fragment_config,
            pool_config,
            slots: StdMutex::new(HashMap::new()),
            sweeper: StdMutex::new(None),
        });
        if pool.pool_config.auto_sweep {
            pool.clone().spawn_sweeper();
        }
        pool
    }

    fn spawn_sweeper(self: Arc<Self>) {
        let interval = Duration::from_millis(self.pool_config.cleanup_interval_ms);
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                self.sweep_idle().await;
            }
        });
        *self.sweeper.lock().expect("sweeper mutex poisoned") = Some(handle);
    }

    /// `localhost` is normalized to `127.0.0.1`.
    fn normalize_host(host: &str) -> String {
        if host.eq_ignore_ascii_case("localhost") {
            "127.0.0.1".to_string()
        } else {
            host.to_string()
        }
    }

    /// Returns the shared connection for `host:port`, opening one if absent or no
    /// longer usable. Concurrent callers for the same key coalesce onto the single
    /// in-flight connect attempt via the per-key async mutex.
    pub async fn get_connection(&self, host: &str, port: u16) -> CorbaResult<Arc<SharedConnection>> {
        let key = (Self::normalize_host(host), port);
        let slot = {
            let mut slots = self.slots.lock().expect("slots mutex poisoned");
            slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(None)))
                .clone()
        };

        let mut guard = slot.lock().await;
        if let Some(conn) = guard.as_ref() {
            if conn.is_usable() {
                return Ok(conn.clone());
            }
        }
        let conn = SharedConnection::open(key.0, key.1, self.config, self.fragment_config).await?;
        *guard = Some(conn.clone());
        Ok(conn)
    }

    /// Closes every connection idle longer than `max_idle_time_ms`.
    pub async fn sweep_idle(&self) {
        let max_idle = Duration::from_millis(self.pool_config.max_idle_time_ms);
        let slots: Vec<_> = self
            .slots
            .lock()
            .expect("slots mutex poisoned")
            .values()
            .cloned()
            .collect();
        for slot in slots {
            let mut guard = slot.lock().await;
            if let Some(conn) = guard.as_ref() {
                if conn.last_used().elapsed() >= max_idle {
                    conn.close().await;
                    *guard = None;
                }
            }
        }
    }

    /// Awaits outstanding connects, sends `CloseConnection` to every active
    /// connection, then drops them.
    pub async fn close_all(&self) {
        let slots: Vec<_> = self
            .slots
            .lock()
            .expect("slots mutex poisoned")
            .values()
            .cloned()
            .collect();
        for slot in slots {
            let mut guard = slot.lock().await;
            if let Some(conn) = guard.take() {
                conn.close().await;
            }
        }
        if let Some(handle) = self.sweeper.lock().expect("sweeper mutex poisoned").take() {
            handle.abort();
        }
    }

    pub fn connection_count(&self) -> usize {
        self.slots.lock().expect("slots mutex poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_connection_without_a_listener_fails_as_transient_or_comm_failure() {
        let pool = ConnectionPool::new(
            ConnectionConfig::default().with_connect_timeout_ms(200),
            FragmentConfig::default(),
            PoolConfig::default(),
        );
        let err = pool.get_connection("127.0.0.1", 1).await.unwrap_err();
        assert!(matches!(
            err,
            CorbaError::Transient(_) | CorbaError::CommFailure(_)
        ));
    }

    #[test]
    fn localhost_normalizes_to_loopback() {
        assert_eq!(ConnectionPool::normalize_host("localhost"), "127.0.0.1");
        assert_eq!(ConnectionPool::normalize_host("LOCALHOST"), "127.0.0.1");
        assert_eq!(ConnectionPool::normalize_host("example.org"), "example.org");
    }
}
