use crate::error::{CorbaError, CorbaResult};

/// `LocateReply` status codes; a reduced set relative to [`super::ReplyStatus`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum LocateStatus {
    UnknownObject = 0,
    ObjectHere = 1,
    ObjectForward = 2,
    ObjectForwardPerm = 3,
    LocSystemException = 4,
    LocNeedsAddressingMode = 5,
}

impl LocateStatus {
    pub fn from_u32(v: u32) -> CorbaResult<Self> {
        Ok(match v {
            0 => Self::UnknownObject,
            1 => Self::ObjectHere,
            2 => Self::ObjectForward,
            3 => Self::ObjectForwardPerm,
            4 => Self::LocSystemException,
            5 => Self::LocNeedsAddressingMode,
            other => {
                return Err(CorbaError::marshal(format!(
                    "unrecognized GIOP locate-reply status {other}"
                )))
            }
        })
    }
}
