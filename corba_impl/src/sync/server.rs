use std::collections::HashMap;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use crate::cdr::{CdrOutput, Endian};
use crate::config::{ConnectionConfig, FragmentConfig};
use crate::error::{CorbaError, CorbaResult};
use crate::giop::{encode_message, GiopMessage, ReplyStatus, ServiceContext};
use crate::sync::connection::Connection;

/// Minimal marshaling of a `CORBA::UNKNOWN` system exception: the only shape the
/// server itself ever needs to produce, for an operation name no handler claimed.
/// Member marshaling order is `repository_id, minor_code, completion_status`,
/// the standard system exception layout.
fn unknown_operation_exception_body(operation: &str) -> Vec<u8> {
    let mut out = CdrOutput::new(Endian::Big);
    out.write_string(&format!(
        "IDL:omg.org/CORBA/UNKNOWN:1.0 (no handler registered for operation {operation:?})"
    ))
    .expect("literal string is a valid CDR string");
    out.write_ulong(1); // minor code: unknown operation
    out.write_ulong(1); // completion status: COMPLETED_NO, the request never ran
    out.into_bytes()
}

/// Registers a handler for every operation name not otherwise claimed.
pub const WILDCARD_OPERATION: &str = "*";

/// A request handler: receives the decoded Request and the connection it arrived
/// on (so it can inspect the peer), and returns the Reply status plus body to send
/// back. Oneway requests (`response_expected() == false`) never reach a reply back
/// to the wire even if a handler returns one; the server simply discards it.
pub type HandlerFn = Arc<dyn Fn(&GiopMessage, &Connection) -> (ReplyStatus, Vec<u8>) + Send + Sync>;

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
    pub fn register_handler(
        mut self,
        operation: impl Into<String>,
        handler: HandlerFn,
    ) -> Self {
        self.handlers.insert(operation.into(), handler);
        self
    }

    pub fn bind(self, host: &str, port: u16) -> CorbaResult<Server> {
        let listener = TcpListener::bind((host, port))
            .map_err(|e| CorbaError::comm_failure(format!("bind {host}:{port} failed: {e}")))?;
        Ok(Server {
            listener,
            handlers: self.handlers,
            connection_config: self.connection_config,
            fragment_config: self.fragment_config,
        })
    }
}

/// A blocking GIOP server: one accept loop, one thread per accepted connection,
/// dispatching Requests to registered handlers by operation name.
pub struct Server {
    listener: TcpListener,
    handlers: HashMap<String, HandlerFn>,
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

    pub fn local_addr(&self) -> CorbaResult<std::net::SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| CorbaError::comm_failure(format!("local_addr failed: {e}")))
    }

    /// Accepts connections until `should_stop` returns true, spawning one thread
    /// per peer. This call blocks for the server's lifetime; run it on its own
    /// thread for a graceful-shutdown-capable deployment.
    pub fn serve(&self, should_stop: impl Fn() -> bool) -> CorbaResult<()> {
        self.listener
            .set_nonblocking(true)
            .map_err(|e| CorbaError::comm_failure(format!("set_nonblocking failed: {e}")))?;
        loop {
            if should_stop() {
                return Ok(());
            }
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    log::trace!("accepted connection from {peer}");
                    let handlers = self.handlers.clone();
                    let connection_config = self.connection_config;
                    let fragment_config = self.fragment_config;
                    thread::spawn(move || {
                        if let Err(e) =
                            serve_one(stream, peer, handlers, connection_config, fragment_config)
                        {
                            log::warn!("connection from {peer} ended: {e}");
                        }
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(std::time::Duration::from_millis(20));
                }
                Err(e) => {
                    return Err(CorbaError::comm_failure(format!("accept failed: {e}")));
                }
            }
        }
    }
}

fn serve_one(
    stream: TcpStream,
    peer: std::net::SocketAddr,
    handlers: HashMap<String, HandlerFn>,
    connection_config: ConnectionConfig,
    fragment_config: FragmentConfig,
) -> CorbaResult<()> {
    stream
        .set_read_timeout(Some(std::time::Duration::from_millis(
            connection_config.read_timeout_ms,
        )))
        .map_err(|e| CorbaError::comm_failure(format!("set_read_timeout failed: {e}")))?;
    stream
        .set_nodelay(connection_config.no_delay)
        .map_err(|e| CorbaError::comm_failure(format!("set_nodelay failed: {e}")))?;
    socket2::SockRef::from(&stream)
        .set_keepalive(connection_config.keep_alive)
        .map_err(|e| CorbaError::comm_failure(format!("set_keepalive failed: {e}")))?;

    let mut conn = Connection::from_accepted(stream, peer, connection_config, fragment_config)?;

    loop {
        let msg = match conn.receive_message() {
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
                    conn.set_codesets(negotiated);
                }
                let handler = handlers
                    .get(operation.as_str())
                    .or_else(|| handlers.get(WILDCARD_OPERATION));
                let (status, body) = match handler {
                    Some(handler) => handler(&msg, &conn),
                    None => (
                        ReplyStatus::SystemException,
                        unknown_operation_exception_body(operation),
                    ),
                };
                if response_flags.response_expected() {
                    let reply = GiopMessage::Reply {
                        request_id: *request_id,
                        status,
                        service_context: vec![ServiceContext::from_codesets(conn.codesets())],
                        endian: Endian::Big,
                        body,
                    };
                    let bytes = encode_message(conn.version(), Endian::Big, &reply, false)?;
                    conn.send_message(&bytes)?;
                }
            }
            GiopMessage::LocateRequest { request_id, .. } => {
                let reply = GiopMessage::LocateReply {
                    request_id: *request_id,
                    status: crate::giop::LocateStatus::ObjectHere,
                    body: vec![],
                };
                let bytes = encode_message(conn.version(), Endian::Big, &reply, false)?;
                conn.send_message(&bytes)?;
            }
            GiopMessage::CancelRequest { .. } => {
                // Best-effort protocol: a reply already in flight for the cancelled
                // request id is still sent; the client is responsible for discarding it.
            }
            GiopMessage::CloseConnection => {
                conn.close();
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
        let handler: HandlerFn = Arc::new(|_msg, _conn| (ReplyStatus::NoException, vec![]));
        let builder = ServerBuilder::new().register_handler(WILDCARD_OPERATION, handler);
        assert!(builder.handlers.contains_key(WILDCARD_OPERATION));
    }

    #[test]
    fn bind_to_ephemeral_port_succeeds() {
        let server = Server::builder().bind("127.0.0.1", 0).unwrap();
        let addr = server.local_addr().unwrap();
        assert!(addr.port() > 0);
    }
}
