use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::config::{ConnectionConfig, FragmentConfig, PoolConfig, TransportConfig};
use crate::error::{CorbaError, CorbaResult};
use crate::giop::{
    encode_message, GiopMessage, ReplyStatus, ResponseFlags, ServiceContext, TargetAddress,
};
use crate::ior::Ior;

use crate::a_sync::pool::ConnectionPool;

/// The outcome of a two-way invocation: either the callee answered normally or
/// asked the caller to retry elsewhere. `LOCATION_FORWARD` is not a transport
/// failure, so it is a typed outcome rather than a silent retry.
#[derive(Debug)]
pub enum Invocation {
    Reply { body: Vec<u8> },
    UserException { body: Vec<u8> },
    SystemException { body: Vec<u8> },
    LocationForward { ior: Ior, permanent: bool },
}

/// An async GIOP client: resolves an IOR to host/port, acquires the (possibly
/// shared) connection for that endpoint, frames and sends a Request, and awaits the
/// correlated Reply on a per-request channel fed by the connection's reader task.
#[derive(Debug)]
pub struct Client {
    pool: Arc<ConnectionPool>,
    transport: TransportConfig,
    next_request_id: AtomicU32,
}

impl Client {
    pub fn new(transport: TransportConfig) -> Self {
        Self::with_configs(
            transport,
            ConnectionConfig::default(),
            FragmentConfig::default(),
            PoolConfig::default(),
        )
    }

    pub fn with_configs(
        transport: TransportConfig,
        connection: ConnectionConfig,
        fragment: FragmentConfig,
        pool: PoolConfig,
    ) -> Self {
        Self {
            pool: ConnectionPool::new(connection, fragment, pool),
            transport,
            next_request_id: AtomicU32::new(1),
        }
    }

    fn alloc_request_id(&self) -> u32 {
        self.next_request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Invokes `operation` on the object addressed by `ior`, sending `body` (already
    /// CDR-encoded by the caller's value codec) as the argument list.
    /// `response_expected = false` sends the request oneway and registers no pending
    /// entry at all.
    pub async fn invoke(
        &self,
        ior: &Ior,
        operation: &str,
        body: Vec<u8>,
        response_expected: bool,
    ) -> CorbaResult<Option<Invocation>> {
        let profile = ior.iiop_profile()?.ok_or_else(|| {
            CorbaError::object_not_exist("IOR carries no IIOP profile this client can route")
        })?;

        let mut attempt = 0;
        loop {
            match self
                .try_invoke(&profile, operation, &body, response_expected)
                .await
            {
                Ok(outcome) => return Ok(outcome),
                Err(e @ CorbaError::CommFailure(_)) | Err(e @ CorbaError::Transient(_)) => {
                    attempt += 1;
                    if attempt > self.transport.max_retries {
                        return Err(e);
                    }
                    log::warn!(
                        "invocation of {operation:?} failed ({e}), retrying (attempt {attempt}/{})",
                        self.transport.max_retries
                    );
                    tokio::time::sleep(Duration::from_millis(self.transport.retry_delay_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_invoke(
        &self,
        profile: &crate::ior::IiopProfileBody,
        operation: &str,
        body: &[u8],
        response_expected: bool,
    ) -> CorbaResult<Option<Invocation>> {
        let conn = self.pool.get_connection(&profile.host, profile.port).await?;
        let version = conn.version();
        let request_id = self.alloc_request_id();

        let msg = GiopMessage::Request {
            request_id,
            response_flags: ResponseFlags::for_response_expected(response_expected),
            target: TargetAddress::KeyAddr(profile.object_key.clone()),
            operation: operation.to_string(),
            service_context: vec![ServiceContext::from_codesets(conn.codesets())],
            body: body.to_vec(),
        };
        let bytes = encode_message(version, crate::cdr::Endian::Big, &msg, false)?;

        let receiver = conn.send(request_id, &bytes, response_expected).await?;

        let Some(receiver) = receiver else {
            return Ok(None);
        };

        let reply = match timeout(
            Duration::from_millis(self.transport.request_timeout_ms),
            receiver,
        )
        .await
        {
            Ok(Ok(msg)) => msg,
            Ok(Err(_canceled)) => {
                return Err(CorbaError::comm_failure(
                    "connection closed while a reply was pending",
                ));
            }
            Err(_elapsed) => {
                conn.forget(request_id);
                return Err(CorbaError::transient(format!(
                    "invocation of {operation:?} timed out after {}ms",
                    self.transport.request_timeout_ms
                )));
            }
        };

        match reply {
            GiopMessage::Reply {
                status, endian, body, ..
            } => Ok(Some(match status {
                ReplyStatus::NoException => Invocation::Reply { body },
                ReplyStatus::UserException => Invocation::UserException { body },
                ReplyStatus::SystemException => Invocation::SystemException { body },
                ReplyStatus::LocationForward => Invocation::LocationForward {
                    ior: decode_forwarded_ior(&body, endian)?,
                    permanent: false,
                },
                ReplyStatus::LocationForwardPerm => Invocation::LocationForward {
                    ior: decode_forwarded_ior(&body, endian)?,
                    permanent: true,
                },
                ReplyStatus::NeedsAddressingMode => {
                    return Err(CorbaError::no_implement(
                        "NeedsAddressingMode reply handling is not supported",
                    ))
                }
            })),
            GiopMessage::MessageError => Err(CorbaError::comm_failure(
                "connection failed while a reply was pending",
            )),
            other => Err(CorbaError::marshal(format!(
                "unexpected GIOP message delivered to a pending request: {other:?}"
            ))),
        }
    }
}

fn decode_forwarded_ior(body: &[u8], endian: crate::cdr::Endian) -> CorbaResult<Ior> {
    let mut input = crate::cdr::CdrInput::new(body, endian);
    Ior::decode(&mut input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invoke_against_nil_ior_fails_object_not_exist() {
        let client = Client::new(TransportConfig::default().with_max_retries(0));
        let err = client
            .invoke(&Ior::nil(), "op", vec![], true)
            .await
            .unwrap_err();
        assert!(matches!(err, CorbaError::ObjectNotExist(_)));
    }
}
