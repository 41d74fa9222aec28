use crate::error::{CorbaError, CorbaResult};

/// Reply status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum ReplyStatus {
    NoException = 0,
    UserException = 1,
    SystemException = 2,
    LocationForward = 3,
    LocationForwardPerm = 4,
    NeedsAddressingMode = 5,
}

impl ReplyStatus {
    pub fn from_u32(v: u32) -> CorbaResult<Self> {
        Ok(match v {
            0 => Self::NoException,
            1 => Self::UserException,
            2 => Self::SystemException,
            3 => Self::LocationForward,
            4 => Self::LocationForwardPerm,
            5 => Self::NeedsAddressingMode,
            other => {
                return Err(CorbaError::marshal(format!(
                    "unrecognized GIOP reply status {other}"
                )))
            }
        })
    }
}
