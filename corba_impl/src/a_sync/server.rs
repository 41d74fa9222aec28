use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};

use crate::cdr::{CdrOutput, CodeSets, Endian};
use crate::config::{ConnectionConfig, FragmentConfig};
use crate::error::{CorbaError, CorbaResult};
use crate::giop::{encode_message, GiopMessage, ReplyStatus, ServiceContext};

use crate::a_sync::connection::split_accepted;

/// Identity of the peer a Request arrived from, handed to handlers instead of a raw
/// connection reference (the read/write halves are split and each task-local).
#[derive(Clone, Copy, Debug)]
pub struct PeerInfo {
    pub addr: SocketAddr,
    /// The code sets negotiated with this peer as of the Request currently being
    /// handled.
    pub codesets: CodeSets,
}

fn unknown_operation_exception_body(operation: &str) -> Vec<u8> {
    let mut out = CdrOutput::new(Endian::Big);
    out.write_string(&format!(
        "IDL:omg.org/CORBA/UNKNOWN:1.0 (no handler registered for operation {operation:?})"
    ))
    .expect("literal string is a valid CDR string");
    out.write_ulong(1);
    out.write_ulong(1);
    out.into_bytes()
}

/// Registers a handler for every operation name not otherwise claimed.
pub const WILDCARD_OPERATION: &str = "*";

/// A request handler: receives the decoded Request and the peer it arrived from,
/// and returns the Reply status plus body to send back. Oneway requests never reach
/// a reply back to the wire even if a handler returns one.
pub type HandlerFn = Arc<dyn Fn(&GiopMessage, PeerInfo) -> (ReplyStatus, Vec<u8>) + Send + Sync>;

/// Builds a [`Server`] by registering one handler per operation name, with an
/// optional `"*"` wildcard catching everything else.
#[derive(Clone, Default)]
pub struct ServerBuilder {
    handlers: HashMap<String, HandlerFn>,
    connection_config: ConnectionConfig,
    fragment_config: FragmentConfig,
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("operations", &self.handlers.keys().collect::<Vec<_>>())
            .field("connection_config", &self.connection_config)
            .field("fragment_config", &self.fragment_config)
            .finish()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            connection_config: ConnectionConfig::default(),
            fragment_config: FragmentConfig::default(),
        }
    }

    pub fn with_connection_config(mut self, config: ConnectionConfig) -> Self {
        self.connection_config = config;
        self
    }

    pub fn with_fragment_config(mut self, config: FragmentConfig) -> Self {
        self.fragment_config = config;
        self
    }

    /// Registers `handler` for `operation`. Pass [`WILDCARD_OPERATION`] to catch
    /// every operation with no dedicated handler.
    pub fn register_handler(mut self, operation: impl Into<String>, handler: HandlerFn) -> Self {
        self.handlers.insert(operation.into(), handler);
        self
    }

    pub async fn bind(self, host: &str, port: u16) -> CorbaResult<Server> {
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|e| CorbaError::comm_failure(format!("bind {host}:{port} failed: {e}")))?;
        Ok(Server {
            listener,
            handlers: Arc::new(self.handlers),
            connection_config: self.connection_config,
            fragment_config: self.fragment_config,
        })
    }
}

/// An async GIOP server: one accept loop, one `tokio` task per accepted connection,
/// dispatching Requests to registered handlers by operation name.
pub struct Server {
    listener: TcpListener,
    handlers: Arc<HashMap<String, HandlerFn>>,
    connection_config: ConnectionConfig,
    fragment_config: FragmentConfig,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("local_addr", &self.listener.local_addr().ok())
            .field("operations", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn local_addr(&self) -> CorbaResult<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| CorbaError::comm_failure(format!("local_addr failed: {e}")))
    }

    /// Accepts connections forever, spawning one task per peer. Run this on its own
    /// task; cancel the enclosing task (or select against a shutdown future) for
    /// graceful shutdown, since `tokio::net::TcpListener` has no built-in stop
    /// signal.
    pub async fn serve(&self) -> CorbaResult<()> {
        loop {
            let (stream, peer) = self
                .listener
                .accept()
                .await
                .map_err(|e| CorbaError::comm_failure(format!("accept failed: {e}")))?;
            log::trace!("accepted connection from {peer}");
            let handlers = self.handlers.clone();
            let connection_config = self.connection_config;
            let fragment_config = self.fragment_config;
            tokio::spawn(async move {
                if let Err(e) =
                    serve_one(stream, peer, handlers, connection_config, fragment_config).await
                {
                    log::warn!("connection from {peer} ended: {e}");
                }
            });
        }
    }
}

async fn serve_one(
    stream: TcpStream,
    peer: SocketAddr,
    handlers: Arc<HashMap<String, HandlerFn>>,
    connection_config: ConnectionConfig,
    fragment_config: FragmentConfig,
) -> CorbaResult<()> {
    stream
        .set_nodelay(connection_config.no_delay)
        .map_err(|e| CorbaError::comm_failure(format!("set_nodelay failed: {e}")))?;
    socket2::SockRef::from(&stream)
        .set_keepalive(connection_config.keep_alive)
        .map_err(|e| CorbaError::comm_failure(format!("set_keepalive failed: {e}")))?;
    let stats = Arc::new(crate::stats::StatisticsCounters::new());
    let (mut reader, mut writer) =
        split_accepted(stream, peer, connection_config, fragment_config, stats)?;
    let mut codesets = CodeSets::default();
    let version = crate::giop::GiopVersion::V1_2;

    loop {
        let msg = match reader.receive_message().await {
            Ok(msg) => msg,
            Err(CorbaError::Transient(_)) => continue,
            Err(e) => return Err(e),
        };

        match &msg {
            GiopMessage::Request {
                request_id,
                response_flags,
                operation,
                service_context,
                ..
            } => {
                if let Some(negotiated) = ServiceContext::codesets_from_list(service_context) {
                    codesets = negotiated;
                }
                let peer_info = PeerInfo { addr: peer, codesets };
                let handler = handlers
                    .get(operation.as_str())
                    .or_else(|| handlers.get(WILDCARD_OPERATION));
                let (status, body) = match handler {
                    Some(handler) => handler(&msg, peer_info),
                    None => (
                        ReplyStatus::SystemException,
                        unknown_operation_exception_body(operation),
                    ),
                };
                if response_flags.response_expected() {
                    let reply = GiopMessage::Reply {
                        request_id: *request_id,
                        status,
                        service_context: vec![ServiceContext::from_codesets(codesets)],
                        endian: Endian::Big,
                        body,
                    };
                    let bytes = encode_message(version, Endian::Big, &reply, false)?;
                    writer.send_message(&bytes).await?;
                }
            }
            GiopMessage::LocateRequest { request_id, .. } => {
                let reply = GiopMessage::LocateReply {
                    request_id: *request_id,
                    status: crate::giop::LocateStatus::ObjectHere,
                    body: vec![],
                };
                let bytes = encode_message(version, Endian::Big, &reply, false)?;
                writer.send_message(&bytes).await?;
            }
            GiopMessage::CancelRequest { .. } => {
                // Best-effort protocol: a reply already in flight is still sent.
            }
            GiopMessage::CloseConnection => {
                return Ok(());
            }
            GiopMessage::MessageError | GiopMessage::Fragment { .. } => {
                return Err(CorbaError::marshal(
                    "unexpected top-level MessageError/Fragment from receive_message",
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_handler_is_registered_under_star() {
        let handler: HandlerFn = Arc::new(|_msg, _peer| (ReplyStatus::NoException, vec![]));
        let builder = ServerBuilder::new().register_handler(WILDCARD_OPERATION, handler);
        assert!(builder.handlers.contains_key(WILDCARD_OPERATION));
    }

    #[test]
    fn peer_info_carries_negotiated_codesets() {
        let peer = PeerInfo {
            addr: "127.0.0.1:0".parse().unwrap(),
            codesets: CodeSets::default(),
        };
        assert_eq!(peer.codesets.char_codeset, crate::DEFAULT_CHAR_CODESET);
    }

    #[tokio::test]
    async fn bind_to_ephemeral_port_succeeds() {
        let server = Server::builder().bind("127.0.0.1", 0).await.unwrap();
        let addr = server.local_addr().unwrap();
        assert!(addr.port() > 0);
    }
}
