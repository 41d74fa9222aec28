use crate::cdr::{CdrInput, CdrOutput};
use crate::error::{CorbaError, CorbaResult};
use crate::ior::{Ior, TaggedProfile};

/// GIOP 1.2 response-flags octet: encodes both "is a reply expected" and the
/// synchronization scope the client asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResponseFlags(pub u8);

impl ResponseFlags {
    pub const SYNC_NONE: u8 = 0;
    pub const SYNC_WITH_TRANSPORT: u8 = 1;
    pub const SYNC_WITH_SERVER: u8 = 2;
    pub const SYNC_WITH_TARGET: u8 = 3;

    pub fn for_response_expected(expected: bool) -> Self {
        Self(if expected {
            Self::SYNC_WITH_TARGET
        } else {
            Self::SYNC_NONE
        })
    }

    /// A reply is expected only when the client asked for full target
    /// synchronization; `SYNC_WITH_TRANSPORT`/`SYNC_WITH_SERVER` are oneway variants
    /// that only promise delivery up to some intermediary.
    pub fn response_expected(self) -> bool {
        self.0 == Self::SYNC_WITH_TARGET
    }
}

/// GIOP 1.2's discriminated addressing union: how the Request names its target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetAddress {
    KeyAddr(Vec<u8>),
    ProfileAddr(TaggedProfile),
    ReferenceAddr { selected_profile_index: u32, ior: Ior },
}

impl TargetAddress {
    pub fn object_key(&self) -> Option<&[u8]> {
        match self {
            TargetAddress::KeyAddr(key) => Some(key),
            _ => None,
        }
    }

    pub fn encode(&self, out: &mut CdrOutput) -> CorbaResult<()> {
        match self {
            TargetAddress::KeyAddr(key) => {
                out.write_ushort(0);
                out.write_octet_sequence(key);
            }
            TargetAddress::ProfileAddr(profile) => {
                out.write_ushort(1);
                out.write_ulong(profile.profile_id);
                out.write_octet_sequence(&profile.profile_data);
            }
            TargetAddress::ReferenceAddr {
                selected_profile_index,
                ior,
            } => {
                out.write_ushort(2);
                out.write_ulong(*selected_profile_index);
                ior.encode(out)?;
            }
        }
        Ok(())
    }

    pub fn decode(input: &mut CdrInput) -> CorbaResult<Self> {
        Ok(match input.read_ushort()? {
            0 => TargetAddress::KeyAddr(input.read_octet_sequence()?.to_vec()),
            1 => {
                let profile_id = input.read_ulong()?;
                let profile_data = input.read_octet_sequence()?.to_vec();
                TargetAddress::ProfileAddr(TaggedProfile {
                    profile_id,
                    profile_data,
                })
            }
            2 => {
                let selected_profile_index = input.read_ulong()?;
                let ior = Ior::decode(input)?;
                TargetAddress::ReferenceAddr {
                    selected_profile_index,
                    ior,
                }
            }
            other => {
                return Err(CorbaError::marshal(format!(
                    "unrecognized TargetAddress discriminator {other}"
                )))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdr::{CdrInput, CdrOutput, Endian};

    #[test]
    fn key_addr_round_trip() {
        let addr = TargetAddress::KeyAddr(vec![1, 2, 3, 4]);
        let mut out = CdrOutput::new(Endian::Big);
        addr.encode(&mut out).unwrap();
        let bytes = out.into_bytes();
        let mut input = CdrInput::new(&bytes, Endian::Big);
        assert_eq!(TargetAddress::decode(&mut input).unwrap(), addr);
    }

    #[test]
    fn response_flags_expected_only_on_sync_with_target() {
        assert!(ResponseFlags::for_response_expected(true).response_expected());
        assert!(!ResponseFlags::for_response_expected(false).response_expected());
        assert!(!ResponseFlags(ResponseFlags::SYNC_WITH_TRANSPORT).response_expected());
    }
}
