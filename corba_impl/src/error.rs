use thiserror::Error;

/// Completion status of the operation that raised a [`SystemException`], as defined
/// by the CORBA spec: whether the invoked operation ran to completion, definitely did
/// not run, or left the server in an unknown state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompletionStatus {
    Yes,
    No,
    Maybe,
}

/// A CORBA system exception: repository id, vendor minor code, and completion status.
///
/// This is the payload carried back to the caller when a GIOP Reply's status is
/// `SYSTEM_EXCEPTION` (see [`crate::giop::ReplyStatus`]); it is not itself a
/// transport failure and is returned to the caller intact rather than surfaced as a
/// [`CorbaError`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SystemException {
    pub repository_id: String,
    pub minor_code: u32,
    pub completion_status: CompletionStatus,
}

impl SystemException {
    pub fn new(
        repository_id: impl Into<String>,
        minor_code: u32,
        completion_status: CompletionStatus,
    ) -> Self {
        Self {
            repository_id: repository_id.into(),
            minor_code,
            completion_status,
        }
    }
}

/// Errors raised by the CDR codec, TypeCode model, value codec, IOR parsing, and GIOP
/// transport layers.
///
/// Each variant corresponds to one of the system-exception categories this runtime
/// raises: `MARSHAL`, `BAD_PARAM`, `COMM_FAILURE`, `TRANSIENT`,
/// `NO_IMPLEMENT`, `OBJECT_NOT_EXIST`. `DbError`-equivalent payloads (a peer's own
/// `SYSTEM_EXCEPTION` reply) are not modeled as a `CorbaError` variant: they are a
/// successful round trip carrying a [`SystemException`], not a failure of this
/// runtime.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CorbaError {
    /// Malformed CDR: truncated buffer, invalid length prefix, invalid GIOP magic,
    /// invalid byte-order flag, or a value that does not conform to the TypeCode
    /// driving its encoding/decoding.
    #[error("MARSHAL: {0}")]
    Marshal(String),

    /// A TypeCode operation was invoked on a kind for which it is not defined, an
    /// index was out of bounds, or a stringified IOR / corbaloc URL was malformed.
    #[error("BAD_PARAM: {0}")]
    BadParam(String),

    /// A TCP error occurred, or the peer closed the connection mid-operation.
    #[error("COMM_FAILURE: {0}")]
    CommFailure(String),

    /// A connect or per-request timeout elapsed.
    #[error("TRANSIENT: {0}")]
    Transient(String),

    /// The wire data names a TypeCode kind, valuetype encoding, or fixed-point value
    /// this runtime does not support: chunked valuetypes, value indirection (tag
    /// -1), recursive TypeCodes, or CORBA `fixed`.
    #[error("NO_IMPLEMENT: {0}")]
    NoImplement(String),

    /// The supplied IOR carries no profile this runtime's protocol registry can
    /// route (no IIOP endpoint could be extracted).
    #[error("OBJECT_NOT_EXIST: {0}")]
    ObjectNotExist(String),

    /// Error occured in communication with the peer.
    #[error(transparent)]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// Abbreviation of `Result<T, CorbaError>`.
pub type CorbaResult<T> = std::result::Result<T, CorbaError>;

impl CorbaError {
    pub(crate) fn marshal(msg: impl Into<String>) -> Self {
        Self::Marshal(msg.into())
    }

    pub(crate) fn bad_param(msg: impl Into<String>) -> Self {
        Self::BadParam(msg.into())
    }

    pub(crate) fn comm_failure(msg: impl Into<String>) -> Self {
        Self::CommFailure(msg.into())
    }

    pub(crate) fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub(crate) fn no_implement(msg: impl Into<String>) -> Self {
        Self::NoImplement(msg.into())
    }

    pub(crate) fn object_not_exist(msg: impl Into<String>) -> Self {
        Self::ObjectNotExist(msg.into())
    }
}
