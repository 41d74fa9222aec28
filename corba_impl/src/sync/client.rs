use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::{ConnectionConfig, FragmentConfig, PoolConfig, TransportConfig};
use crate::error::{CorbaError, CorbaResult};
use crate::giop::{
    encode_message, GiopMessage, ReplyStatus, ResponseFlags, ServiceContext, TargetAddress,
};
use crate::ior::Ior;
use crate::sync::pool::ConnectionPool;

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

/// A blocking GIOP client: resolves an IOR to host/port, checks out a pooled
/// connection, frames and sends a Request, and correlates the Reply by request id.
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
    /// CDR-encoded by the caller's value codec) as the argument list. `response_expected
    /// = false` sends the request oneway and returns immediately with no reply
    /// correlation performed.
    pub fn invoke(
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
            match self.try_invoke(&profile, operation, &body, response_expected) {
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
                    thread::sleep(Duration::from_millis(self.transport.retry_delay_ms));
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn try_invoke(
        &self,
        profile: &crate::ior::IiopProfileBody,
        operation: &str,
        body: &[u8],
        response_expected: bool,
    ) -> CorbaResult<Option<Invocation>> {
        let mut conn = self.pool.acquire(&profile.host, profile.port)?;
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
        conn.send_message(&bytes)?;

        if !response_expected {
            self.pool.release(conn);
            return Ok(None);
        }

        let outcome = loop {
            match conn.receive_message()? {
                GiopMessage::Reply {
                    request_id: reply_id,
                    status,
                    service_context,
                    endian,
                    body,
                } => {
                    if reply_id != request_id {
                        log::warn!(
                            "discarding reply for unrelated request id {reply_id} (expected {request_id})"
                        );
                        continue;
                    }
                    if let Some(negotiated) = ServiceContext::codesets_from_list(&service_context)
                    {
                        conn.set_codesets(negotiated);
                    }
                    break match status {
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
                    };
                }
                GiopMessage::CloseConnection => {
                    return Err(CorbaError::comm_failure(
                        "peer sent CloseConnection while a reply was pending",
                    ));
                }
                other => {
                    return Err(CorbaError::marshal(format!(
                        "unexpected GIOP message while awaiting a reply: {other:?}"
                    )));
                }
            }
        };

        self.pool.release(conn);
        Ok(Some(outcome))
    }
}

fn decode_forwarded_ior(body: &[u8], endian: crate::cdr::Endian) -> CorbaResult<Ior> {
    let mut input = crate::cdr::CdrInput::new(body, endian);
    Ior::decode(&mut input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoke_against_nil_ior_fails_object_not_exist() {
        let client = Client::new(TransportConfig::default().with_max_retries(0));
        let err = client.invoke(&Ior::nil(), "op", vec![], true).unwrap_err();
        assert!(matches!(err, CorbaError::ObjectNotExist(_)));
    }
}
