use std::collections::HashMap;
use std::io::{BufReader, BufWriter, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use crate::cdr::{CodeSets, Endian};
use crate::config::{ConnectionConfig, FragmentConfig};
use crate::error::{CorbaError, CorbaResult};
use crate::giop::{
    decode_message, GiopHeader, GiopMessage, GiopVersion, MessageType, GIOP_HEADER_LEN,
};
use crate::stats::{ConnectionStatistics, StatisticsCounters};

use crate::cdr::CdrOutput;

/// A connection's lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
    Closed,
}

/// An in-progress reassembly of a fragmented Request/Reply. Keyed by request id
/// under GIOP 1.2; under 1.0/1.1 there is no request id in `Fragment`, so the
/// single in-flight assembly for that connection is keyed by `None`: pre-1.2 does
/// not support interleaving fragmented messages.
#[derive(Debug)]
struct FragmentAssembly {
    version: GiopVersion,
    endian: Endian,
    message_type: MessageType,
    chunks: Vec<u8>,
    last_activity: Instant,
}

/// A single blocking TCP connection to a GIOP peer, framing messages and
/// reassembling fragments. Carries no TLS variant: SSLIOP crypto is out of scope.
#[derive(Debug)]
pub struct Connection {
    host: String,
    port: u16,
    config: ConnectionConfig,
    fragment_config: FragmentConfig,
    version: GiopVersion,
    state: ConnectionState,
    reader: Option<BufReader<TcpStream>>,
    writer: Option<BufWriter<TcpStream>>,
    fragments: HashMap<Option<u32>, FragmentAssembly>,
    last_used: Instant,
    stats: StatisticsCounters,
    codesets: CodeSets,
}

impl Connection {
    pub fn connect(
        host: impl Into<String>,
        port: u16,
        config: ConnectionConfig,
        fragment_config: FragmentConfig,
    ) -> CorbaResult<Self> {
        let host = host.into();
        let mut conn = Self {
            host: host.clone(),
            port,
            config,
            fragment_config,
            version: GiopVersion::V1_2,
            state: ConnectionState::Disconnected,
            reader: None,
            writer: None,
            fragments: HashMap::new(),
            last_used: Instant::now(),
            stats: StatisticsCounters::default(),
            codesets: CodeSets::default(),
        };
        conn.open()?;
        Ok(conn)
    }

    /// Wraps an already-accepted server-side socket as a `Connected` connection,
    /// skipping the client-side `connect`/timeout dance in [`Connection::connect`].
    pub fn from_accepted(
        stream: TcpStream,
        peer: std::net::SocketAddr,
        config: ConnectionConfig,
        fragment_config: FragmentConfig,
    ) -> CorbaResult<Self> {
        let write_half = stream
            .try_clone()
            .map_err(|e| CorbaError::comm_failure(format!("cloning accepted socket failed: {e}")))?;
        Ok(Self {
            host: peer.ip().to_string(),
            port: peer.port(),
            config,
            fragment_config,
            version: GiopVersion::V1_2,
            state: ConnectionState::Connected,
            reader: Some(BufReader::new(stream)),
            writer: Some(BufWriter::new(write_half)),
            fragments: HashMap::new(),
            last_used: Instant::now(),
            stats: StatisticsCounters::default(),
            codesets: CodeSets::default(),
        })
    }

    fn open(&mut self) -> CorbaResult<()> {
        self.state = ConnectionState::Connecting;
        let addr = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| {
                CorbaError::comm_failure(format!(
                    "cannot resolve {}:{}: {e}",
                    self.host, self.port
                ))
            })?
            .next()
            .ok_or_else(|| {
                CorbaError::comm_failure(format!("no addresses for {}:{}", self.host, self.port))
            })?;

        let stream = TcpStream::connect_timeout(
            &addr,
            Duration::from_millis(self.config.connect_timeout_ms),
        )
        .map_err(|e| {
            self.state = ConnectionState::Disconnected;
            CorbaError::transient(format!(
                "connect to {}:{} timed out or failed: {e}",
                self.host, self.port
            ))
        })?;

        stream
            .set_read_timeout(Some(Duration::from_millis(self.config.read_timeout_ms)))
            .map_err(|e| CorbaError::comm_failure(format!("set_read_timeout failed: {e}")))?;
        stream
            .set_nodelay(self.config.no_delay)
            .map_err(|e| CorbaError::comm_failure(format!("set_nodelay failed: {e}")))?;
        socket2::SockRef::from(&stream)
            .set_keepalive(self.config.keep_alive)
            .map_err(|e| CorbaError::comm_failure(format!("set_keepalive failed: {e}")))?;

        let write_half = stream
            .try_clone()
            .map_err(|e| CorbaError::comm_failure(format!("cloning socket failed: {e}")))?;

        self.reader = Some(BufReader::new(stream));
        self.writer = Some(BufWriter::new(write_half));
        self.state = ConnectionState::Connected;
        self.stats.record_connect();
        log::trace!("Connection to {}:{} established", self.host, self.port);
        Ok(())
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn version(&self) -> GiopVersion {
        self.version
    }

    pub fn last_used(&self) -> Instant {
        self.last_used
    }

    pub fn stats(&self) -> ConnectionStatistics {
        self.stats.snapshot()
    }

    /// The code sets currently negotiated with the peer on this connection. Starts
    /// at the defaults and is updated once a Reply carries a differing CodeSets
    /// service context.
    pub fn codesets(&self) -> CodeSets {
        self.codesets
    }

    pub fn set_codesets(&mut self, codesets: CodeSets) {
        self.codesets = codesets;
    }

    fn fail(&mut self, err: CorbaError) -> CorbaError {
        log::warn!(
            "connection to {}:{} failed, closing: {err}",
            self.host,
            self.port
        );
        self.state = ConnectionState::Closed;
        self.reader = None;
        self.writer = None;
        self.fragments.clear();
        err
    }

    /// Writes one already-framed GIOP message to the wire.
    pub fn send_message(&mut self, bytes: &[u8]) -> CorbaResult<()> {
        if self.state != ConnectionState::Connected {
            return Err(CorbaError::comm_failure(format!(
                "cannot send on a connection in state {:?}",
                self.state
            )));
        }
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| CorbaError::comm_failure("connection has no writer"))?;
        let result = writer.write_all(bytes).and_then(|()| writer.flush());
        self.last_used = Instant::now();
        if let Err(e) = result {
            return Err(self.fail(CorbaError::comm_failure(format!(
                "write to {}:{} failed: {e}",
                self.host, self.port
            ))));
        }
        self.stats.record_sent(bytes.len());
        Ok(())
    }

    fn read_physical_message(&mut self) -> CorbaResult<(GiopHeader, Vec<u8>)> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| CorbaError::comm_failure("connection has no reader"))?;

        let mut header_bytes = [0u8; GIOP_HEADER_LEN];
        reader
            .read_exact(&mut header_bytes)
            .map_err(|e| Self::read_error(&self.host, self.port, "header", &e))?;
        let mut input = crate::cdr::CdrInput::new(&header_bytes, Endian::Big);
        let header = GiopHeader::decode(&mut input)?;

        let mut body = vec![0u8; header.message_size as usize];
        reader
            .read_exact(&mut body)
            .map_err(|e| Self::read_error(&self.host, self.port, "body", &e))?;

        let mut full = Vec::with_capacity(GIOP_HEADER_LEN + body.len());
        full.extend_from_slice(&header_bytes);
        full.extend_from_slice(&body);
        self.stats.record_received(full.len());
        Ok((header, full))
    }

    /// A read timeout surfaces as `TRANSIENT` (the peer may still be alive, just
    /// slow); any other I/O failure surfaces as `COMM_FAILURE` and closes the
    /// connection.
    fn read_error(host: &str, port: u16, what: &str, e: &std::io::Error) -> CorbaError {
        match e.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => {
                CorbaError::transient(format!("read {what} from {host}:{port} timed out"))
            }
            _ => CorbaError::comm_failure(format!("read {what} from {host}:{port} failed: {e}")),
        }
    }

    fn fragment_key(header: &GiopHeader, body: &[u8]) -> CorbaResult<Option<u32>> {
        if !header.version.is_1_2_shaped() {
            return Ok(None);
        }
        if body.len() < 4 {
            return Err(CorbaError::marshal(
                "GIOP 1.2 fragmented message body is too short to carry a request id",
            ));
        }
        let id = match header.endian {
            Endian::Big => u32::from_be_bytes([body[0], body[1], body[2], body[3]]),
            Endian::Little => u32::from_le_bytes([body[0], body[1], body[2], body[3]]),
        };
        Ok(Some(id))
    }

    fn reconstruct(
        version: GiopVersion,
        endian: Endian,
        message_type: MessageType,
        chunks: Vec<u8>,
    ) -> CorbaResult<GiopMessage> {
        let mut out = CdrOutput::new(endian);
        let size_pos = GiopHeader::write_placeholder(&mut out, version, message_type, false);
        out.write_octet_array(&chunks);
        let body_len = out.position() - GIOP_HEADER_LEN;
        out.write_ulong_at(size_pos, body_len as u32)?;
        decode_message(&out.into_bytes())
    }

    /// Discards fragment assemblies that have seen no activity for longer than the
    /// configured timeout.
    pub fn sweep_expired_fragments(&mut self) {
        let timeout = Duration::from_millis(self.fragment_config.fragment_timeout_ms);
        let before = self.fragments.len();
        self.fragments
            .retain(|_, assembly| assembly.last_activity.elapsed() < timeout);
        let dropped = before - self.fragments.len();
        if dropped > 0 {
            log::warn!(
                "dropped {dropped} stale fragment assembly(ies) on {}:{}",
                self.host,
                self.port
            );
        }
    }

    /// Reads and fully reassembles the next complete GIOP message from the wire.
    pub fn receive_message(&mut self) -> CorbaResult<GiopMessage> {
        loop {
            let (header, full) = match self.read_physical_message() {
                Ok(v) => v,
                // A timeout leaves the socket usable; only a genuine I/O failure
                // tears the connection down.
                Err(e @ CorbaError::Transient(_)) => return Err(e),
                Err(e) => return Err(self.fail(e)),
            };
            self.last_used = Instant::now();
            self.version = header.version;

            if header.message_type == MessageType::Fragment {
                let body = &full[GIOP_HEADER_LEN..];
                let key = Self::fragment_key(&header, body)?;
                let continuation = if header.version.is_1_2_shaped() {
                    &body[4..]
                } else {
                    body
                };
                match self.fragments.get_mut(&key) {
                    Some(assembly) => {
                        assembly.chunks.extend_from_slice(continuation);
                        assembly.last_activity = Instant::now();
                        if !header.more_fragments {
                            let assembly = self.fragments.remove(&key).expect("just matched");
                            return Self::reconstruct(
                                assembly.version,
                                assembly.endian,
                                assembly.message_type,
                                assembly.chunks,
                            );
                        }
                    }
                    None => {
                        log::warn!(
                            "received Fragment for unknown or expired assembly on {}:{}, dropping",
                            self.host,
                            self.port
                        );
                    }
                }
                continue;
            }

            if header.more_fragments {
                let body = full[GIOP_HEADER_LEN..].to_vec();
                let key = Self::fragment_key(&header, &body)?;
                self.fragments.insert(
                    key,
                    FragmentAssembly {
                        version: header.version,
                        endian: header.endian,
                        message_type: header.message_type,
                        chunks: body,
                        last_activity: Instant::now(),
                    },
                );
                continue;
            }

            return decode_message(&full);
        }
    }

    /// Sends `CloseConnection` and transitions to `Closed`; used both for a
    /// deliberate shutdown and the best-effort `Drop` cleanup.
    pub fn close(&mut self) {
        if self.state == ConnectionState::Connected {
            self.state = ConnectionState::Closing;
            let bytes = crate::giop::encode_message(
                self.version,
                Endian::Big,
                &GiopMessage::CloseConnection,
                false,
            );
            if let (Ok(bytes), Some(writer)) = (bytes, self.writer.as_mut()) {
                if let Err(e) = writer.write_all(&bytes).and_then(|()| writer.flush()) {
                    log::warn!("best-effort CloseConnection send failed: {e}");
                }
            }
        }
        self.state = ConnectionState::Closed;
        self.reader = None;
        self.writer = None;
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_key_is_none_before_1_2() {
        let header = GiopHeader {
            version: GiopVersion::V1_1,
            endian: Endian::Big,
            more_fragments: true,
            message_type: MessageType::Fragment,
            message_size: 0,
        };
        assert_eq!(Connection::fragment_key(&header, &[]).unwrap(), None);
    }

    #[test]
    fn codesets_default_until_negotiated() {
        assert_eq!(CodeSets::default().char_codeset, crate::DEFAULT_CHAR_CODESET);
    }

    #[test]
    fn fragment_key_reads_leading_request_id_on_1_2() {
        let header = GiopHeader {
            version: GiopVersion::V1_2,
            endian: Endian::Big,
            more_fragments: true,
            message_type: MessageType::Fragment,
            message_size: 4,
        };
        let body = 42u32.to_be_bytes();
        assert_eq!(Connection::fragment_key(&header, &body).unwrap(), Some(42));
    }
}
