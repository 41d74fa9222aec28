use crate::cdr::{CdrInput, CdrOutput, Endian};
use crate::error::{CorbaError, CorbaResult};

/// `GIOP` in ASCII, the fixed magic every message opens with.
pub const GIOP_MAGIC: [u8; 4] = *b"GIOP";
/// Size of the fixed header every GIOP message carries.
pub const GIOP_HEADER_LEN: usize = 12;

/// The eight GIOP message types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Request = 0,
    Reply = 1,
    CancelRequest = 2,
    LocateRequest = 3,
    LocateReply = 4,
    CloseConnection = 5,
    MessageError = 6,
    Fragment = 7,
}

impl MessageType {
    pub fn from_u8(v: u8) -> CorbaResult<Self> {
        Ok(match v {
            0 => Self::Request,
            1 => Self::Reply,
            2 => Self::CancelRequest,
            3 => Self::LocateRequest,
            4 => Self::LocateReply,
            5 => Self::CloseConnection,
            6 => Self::MessageError,
            7 => Self::Fragment,
            other => {
                return Err(CorbaError::marshal(format!(
                    "unrecognized GIOP message type {other}"
                )))
            }
        })
    }
}

/// A GIOP protocol version. Only 1.0/1.1/1.2 are produced or accepted; anything else
/// fails to parse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GiopVersion {
    pub major: u8,
    pub minor: u8,
}

impl GiopVersion {
    pub const V1_0: Self = Self { major: 1, minor: 0 };
    pub const V1_1: Self = Self { major: 1, minor: 1 };
    pub const V1_2: Self = Self { major: 1, minor: 2 };

    /// Whether this version's Request/Reply carry a more-fragments flag bit: only on
    /// Request/Reply in 1.1+, and always on Fragment regardless of version.
    pub fn supports_fragmentation(self) -> bool {
        self.minor >= 1
    }

    /// Whether this version uses the GIOP 1.2 Request/Reply/Fragment body shape
    /// (request id leading the body, `TargetAddress`, 8-byte message-relative body
    /// alignment).
    pub fn is_1_2_shaped(self) -> bool {
        self.minor >= 2
    }
}

/// The fixed 12-byte GIOP header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GiopHeader {
    pub version: GiopVersion,
    pub endian: Endian,
    pub more_fragments: bool,
    pub message_type: MessageType,
    pub message_size: u32,
}

impl GiopHeader {
    /// Writes the 12 header bytes with `message_size` as a placeholder; returns the
    /// buffer position where the size field lands so the caller can back-patch it
    /// once the body has been written.
    pub fn write_placeholder(
        out: &mut CdrOutput,
        version: GiopVersion,
        message_type: MessageType,
        more_fragments: bool,
    ) -> usize {
        out.write_octet_array(&GIOP_MAGIC);
        out.write_octet(version.major);
        out.write_octet(version.minor);
        let mut flags = out.endian().flag_bit();
        if more_fragments {
            flags |= 0b10;
        }
        out.write_octet(flags);
        out.write_octet(message_type as u8);
        let size_pos = out.position();
        out.write_ulong(0);
        size_pos
    }

    pub fn decode(input: &mut CdrInput) -> CorbaResult<Self> {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(input.read_octet_array(4)?);
        if magic != GIOP_MAGIC {
            return Err(CorbaError::marshal(format!(
                "invalid GIOP magic {magic:02x?}, expected {GIOP_MAGIC:02x?}"
            )));
        }
        let major = input.read_octet()?;
        let minor = input.read_octet()?;
        if major != 1 || minor > 2 {
            return Err(CorbaError::marshal(format!(
                "unsupported GIOP version {major}.{minor}"
            )));
        }
        let flags = input.read_octet()?;
        let endian = Endian::from_flag(flags & 0b01 != 0);
        let more_fragments = flags & 0b10 != 0;
        let message_type = MessageType::from_u8(input.read_octet()?)?;
        let message_size = input.read_ulong()?;
        Ok(Self {
            version: GiopVersion { major, minor },
            endian,
            more_fragments,
            message_type,
            message_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let mut out = CdrOutput::new(Endian::Big);
        let size_pos =
            GiopHeader::write_placeholder(&mut out, GiopVersion::V1_2, MessageType::Request, false);
        out.write_octet_array(&[1, 2, 3]);
        let body_len = out.position() - (size_pos + 4);
        out.write_ulong_at(size_pos, body_len as u32).unwrap();
        let bytes = out.into_bytes();

        let mut input = CdrInput::new(&bytes, Endian::Big);
        let header = GiopHeader::decode(&mut input).unwrap();
        assert_eq!(header.version, GiopVersion::V1_2);
        assert_eq!(header.message_type, MessageType::Request);
        assert_eq!(header.message_size, 3);
        assert!(!header.more_fragments);
    }

    #[test]
    fn literal_1_2_request_header_bytes() {
        // GIOP 1.2 Request header, big-endian, empty body.
        let mut out = CdrOutput::new(Endian::Big);
        let size_pos =
            GiopHeader::write_placeholder(&mut out, GiopVersion::V1_2, MessageType::Request, false);
        out.write_ulong_at(size_pos, 0).unwrap();
        let bytes = out.into_bytes();
        assert_eq!(
            &bytes[0..8],
            &[0x47, 0x49, 0x4F, 0x50, 0x01, 0x02, 0x00, 0x00]
        );
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = [0u8; 12];
        let mut input = CdrInput::new(&bytes, Endian::Big);
        assert!(GiopHeader::decode(&mut input).is_err());
    }
}
