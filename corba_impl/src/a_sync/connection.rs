use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::cdr::{CdrOutput, Endian};
use crate::config::{ConnectionConfig, FragmentConfig};
use crate::error::{CorbaError, CorbaResult};
use crate::giop::{
    decode_message, GiopHeader, GiopMessage, GiopVersion, MessageType, GIOP_HEADER_LEN,
};
use crate::stats::StatisticsCounters;

/// A connection's lifecycle; identical state shape to [`crate::sync`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
    Closed,
}

#[derive(Debug)]
struct FragmentAssembly {
    version: GiopVersion,
    endian: Endian,
    message_type: MessageType,
    chunks: Vec<u8>,
    last_activity: Instant,
}

async fn connect_halves(
    host: &str,
    port: u16,
    config: ConnectionConfig,
) -> CorbaResult<(TcpStream, TcpStream)> {
    let connect = async {
        let std_stream = std::net::TcpStream::connect((host, port))
            .map_err(|e| CorbaError::transient(format!("connect to {host}:{port} failed: {e}")))?;
        std_stream
            .set_nodelay(config.no_delay)
            .map_err(|e| CorbaError::comm_failure(format!("set_nodelay failed: {e}")))?;
        socket2::SockRef::from(&std_stream)
            .set_keepalive(config.keep_alive)
            .map_err(|e| CorbaError::comm_failure(format!("set_keepalive failed: {e}")))?;
        let write_std = std_stream
            .try_clone()
            .map_err(|e| CorbaError::comm_failure(format!("cloning socket failed: {e}")))?;
        let read_half = TcpStream::from_std(std_stream)
            .map_err(|e| CorbaError::comm_failure(format!("wrapping read half failed: {e}")))?;
        let write_half = TcpStream::from_std(write_std)
            .map_err(|e| CorbaError::comm_failure(format!("wrapping write half failed: {e}")))?;
        Ok::<_, CorbaError>((read_half, write_half))
    };

    match timeout(Duration::from_millis(config.connect_timeout_ms), connect).await {
        Ok(Ok(halves)) => Ok(halves),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(CorbaError::transient(format!(
            "connect to {host}:{port} timed out after {}ms",
            config.connect_timeout_ms
        ))),
    }
}

/// The read half of a split connection: owns the fragment-reassembly table and is
/// driven exclusively by one reader task, so it needs no internal locking — the
/// reader task is the sole mutator of the read buffer and fragment tables. Keeps the
/// read half and write half as independently lockable halves of a cloned socket
/// rather than `tokio::io::split`'s single shared stream.
#[derive(Debug)]
pub struct ConnectionReader {
    host: String,
    port: u16,
    config: ConnectionConfig,
    fragment_config: FragmentConfig,
    reader: BufReader<TcpStream>,
    fragments: HashMap<Option<u32>, FragmentAssembly>,
    stats: Arc<StatisticsCounters>,
}

impl ConnectionReader {
    async fn read_physical_message(&mut self) -> CorbaResult<(GiopHeader, Vec<u8>)> {
        let read_timeout = Duration::from_millis(self.config.read_timeout_ms);

        let mut header_bytes = [0u8; GIOP_HEADER_LEN];
        timeout(read_timeout, self.reader.read_exact(&mut header_bytes))
            .await
            .map_err(|_| {
                CorbaError::transient(format!(
                    "read header from {}:{} timed out",
                    self.host, self.port
                ))
            })?
            .map_err(|e| {
                CorbaError::comm_failure(format!(
                    "read header from {}:{} failed: {e}",
                    self.host, self.port
                ))
            })?;
        let mut input = crate::cdr::CdrInput::new(&header_bytes, Endian::Big);
        let header = GiopHeader::decode(&mut input)?;

        let mut body = vec![0u8; header.message_size as usize];
        timeout(read_timeout, self.reader.read_exact(&mut body))
            .await
            .map_err(|_| {
                CorbaError::transient(format!(
                    "read body from {}:{} timed out",
                    self.host, self.port
                ))
            })?
            .map_err(|e| {
                CorbaError::comm_failure(format!(
                    "read body from {}:{} failed: {e}",
                    self.host, self.port
                ))
            })?;

        let mut full = Vec::with_capacity(GIOP_HEADER_LEN + body.len());
        full.extend_from_slice(&header_bytes);
        full.extend_from_slice(&body);
        self.stats.record_received(full.len());
        Ok((header, full))
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

    /// Discards fragment assemblies idle longer than `fragment_timeout`.
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
    pub async fn receive_message(&mut self) -> CorbaResult<GiopMessage> {
        loop {
            let (header, full) = self.read_physical_message().await?;

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
}

/// The write half of a split connection: one `BufWriter`, used by every concurrent
/// sender under the pool's per-connection write lock. The sender writes only to the
/// socket.
#[derive(Debug)]
pub struct ConnectionWriter {
    host: String,
    port: u16,
    writer: BufWriter<TcpStream>,
    stats: Arc<StatisticsCounters>,
}

impl ConnectionWriter {
    /// Writes one already-framed GIOP message to the wire.
    pub async fn send_message(&mut self, bytes: &[u8]) -> CorbaResult<()> {
        self.writer
            .write_all(bytes)
            .await
            .and(Ok(()))
            .map_err(|e| {
                CorbaError::comm_failure(format!(
                    "write to {}:{} failed: {e}",
                    self.host, self.port
                ))
            })?;
        self.writer.flush().await.map_err(|e| {
            CorbaError::comm_failure(format!("flush to {}:{} failed: {e}", self.host, self.port))
        })?;
        self.stats.record_sent(bytes.len());
        Ok(())
    }

    /// Best-effort `CloseConnection` send, ignoring write failures.
    pub async fn send_close(&mut self, version: GiopVersion) {
        if let Ok(bytes) =
            crate::giop::encode_message(version, Endian::Big, &GiopMessage::CloseConnection, false)
        {
            if let Err(e) = self.send_message(&bytes).await {
                log::warn!("best-effort CloseConnection send failed: {e}");
            }
        }
    }
}

/// Connects to `host:port` and splits the resulting socket into an independently
/// lockable read half and write half: one reader task per connection, and a sender
/// that never blocks on the reader's lock.
pub async fn connect_split(
    host: impl Into<String>,
    port: u16,
    config: ConnectionConfig,
    fragment_config: FragmentConfig,
    stats: Arc<StatisticsCounters>,
) -> CorbaResult<(ConnectionReader, ConnectionWriter, GiopVersion)> {
    let host = host.into();
    let (read_half, write_half) = connect_halves(&host, port, config).await?;
    log::trace!("Connection to {host}:{port} established");
    stats.record_connect();
    Ok((
        ConnectionReader {
            host: host.clone(),
            port,
            config,
            fragment_config,
            reader: BufReader::new(read_half),
            fragments: HashMap::new(),
            stats: stats.clone(),
        },
        ConnectionWriter {
            host,
            port,
            writer: BufWriter::new(write_half),
            stats,
        },
        GiopVersion::V1_2,
    ))
}

/// Wraps an already-accepted server-side socket, split the same way.
pub fn split_accepted(
    stream: TcpStream,
    peer: SocketAddr,
    config: ConnectionConfig,
    fragment_config: FragmentConfig,
    stats: Arc<StatisticsCounters>,
) -> CorbaResult<(ConnectionReader, ConnectionWriter)> {
    let std_stream = stream
        .into_std()
        .map_err(|e| CorbaError::comm_failure(format!("detaching accepted socket failed: {e}")))?;
    let write_std = std_stream
        .try_clone()
        .map_err(|e| CorbaError::comm_failure(format!("cloning accepted socket failed: {e}")))?;
    let read_half = TcpStream::from_std(std_stream)
        .map_err(|e| CorbaError::comm_failure(format!("re-wrapping read half failed: {e}")))?;
    let write_half = TcpStream::from_std(write_std)
        .map_err(|e| CorbaError::comm_failure(format!("re-wrapping write half failed: {e}")))?;
    let host = peer.ip().to_string();
    let port = peer.port();
    stats.record_connect();
    Ok((
        ConnectionReader {
            host: host.clone(),
            port,
            config,
            fragment_config,
            reader: BufReader::new(read_half),
            fragments: HashMap::new(),
            stats: stats.clone(),
        },
        ConnectionWriter {
            host,
            port,
            writer: BufWriter::new(write_half),
            stats,
        },
    ))
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
        assert_eq!(ConnectionReader::fragment_key(&header, &[]).unwrap(), None);
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
        assert_eq!(
            ConnectionReader::fragment_key(&header, &body).unwrap(),
            Some(42)
        );
    }
}
