//! IOR (Interoperable Object Reference) structure, IIOP profile body, tagged
//! components, stringified forms, and the pluggable protocol handler registry.

mod codesets_component;
mod corbaloc;
mod registry;
mod stringified;

pub use codesets_component::CodeSetsComponent;
pub use corbaloc::parse_corbaloc;
pub use registry::{ProtocolHandler, ProtocolRegistry};
pub use stringified::{parse_stringified_ior, to_stringified_ior};

use crate::cdr::{CdrInput, CdrOutput, Endian};
use crate::error::CorbaResult;

/// `{ id, bytes }` pair inside an IOR. `id == 0` is IIOP (`TAG_INTERNET_IOP`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaggedProfile {
    pub profile_id: u32,
    pub profile_data: Vec<u8>,
}

/// `{ id, bytes }` pair inside an IIOP profile body: e.g. CodeSets, ORBType, SSL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaggedComponent {
    pub component_id: u32,
    pub component_data: Vec<u8>,
}

/// An IIOP profile's decoded body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IiopProfileBody {
    pub major: u8,
    pub minor: u8,
    pub host: String,
    pub port: u16,
    pub object_key: Vec<u8>,
    pub components: Vec<TaggedComponent>,
}

impl IiopProfileBody {
    pub fn new(host: impl Into<String>, port: u16, object_key: Vec<u8>) -> Self {
        Self {
            major: 1,
            minor: 2,
            host: host.into(),
            port,
            object_key,
            components: Vec::new(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut enc = CdrOutput::new_encapsulation(Endian::Big);
        enc.write_octet(self.major);
        enc.write_octet(self.minor);
        enc.write_string(&self.host).expect("host is a valid string");
        enc.write_ushort(self.port);
        enc.write_octet_sequence(&self.object_key);
        if self.minor >= 1 {
            enc.write_ulong(self.components.len() as u32);
            for c in &self.components {
                enc.write_ulong(c.component_id);
                enc.write_octet_sequence(&c.component_data);
            }
        }
        enc.into_bytes()
    }

    /// This profile's `TAG_CODE_SETS` component, decoded, if present.
    pub fn codesets(&self) -> Option<crate::cdr::CodeSets> {
        let component = self
            .components
            .iter()
            .find(|c| c.component_id == crate::TAG_CODE_SETS)?;
        let decoded = CodeSetsComponent::decode(&component.component_data).ok()?;
        Some(crate::cdr::CodeSets::new(
            decoded.native_char_codeset,
            decoded.native_wchar_codeset,
        ))
    }

    pub fn decode(bytes: &[u8]) -> CorbaResult<Self> {
        let mut input = CdrInput::from_encapsulation(bytes)?;
        let major = input.read_octet()?;
        let minor = input.read_octet()?;
        let host = input.read_string()?;
        let port = input.read_ushort()?;
        let object_key = input.read_octet_sequence()?.to_vec();
        let mut components = Vec::new();
        if minor >= 1 && !input.is_empty() {
            let count = input.read_ulong()?;
            for _ in 0..count {
                let component_id = input.read_ulong()?;
                let component_data = input.read_octet_sequence()?.to_vec();
                components.push(TaggedComponent {
                    component_id,
                    component_data,
                });
            }
        }
        Ok(Self {
            major,
            minor,
            host,
            port,
            object_key,
            components,
        })
    }
}

/// `{ typeId, profiles }`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ior {
    pub type_id: String,
    pub profiles: Vec<TaggedProfile>,
}

impl Ior {
    pub fn new(type_id: impl Into<String>, profiles: Vec<TaggedProfile>) -> Self {
        Self {
            type_id: type_id.into(),
            profiles,
        }
    }

    pub fn is_nil(&self) -> bool {
        self.type_id.is_empty() && self.profiles.is_empty()
    }

    pub fn nil() -> Self {
        Self {
            type_id: String::new(),
            profiles: Vec::new(),
        }
    }

    /// Builds a simple single-profile IIOP IOR, the common shape for a literal
    /// IOR string round trip.
    pub fn create_simple(
        type_id: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        object_key: Vec<u8>,
    ) -> Self {
        let body = IiopProfileBody::new(host, port, object_key);
        Self::new(
            type_id,
            vec![TaggedProfile {
                profile_id: crate::TAG_INTERNET_IOP,
                profile_data: body.encode(),
            }],
        )
    }

    /// The first IIOP profile, decoded, if any is present.
    pub fn iiop_profile(&self) -> CorbaResult<Option<IiopProfileBody>> {
        for p in &self.profiles {
            if p.profile_id == crate::TAG_INTERNET_IOP {
                return Ok(Some(IiopProfileBody::decode(&p.profile_data)?));
            }
        }
        Ok(None)
    }

    /// Convenience accessor combining `iiop_profile` and `IiopProfileBody::codesets`.
    pub fn codesets(&self) -> CorbaResult<Option<crate::cdr::CodeSets>> {
        Ok(self.iiop_profile()?.and_then(|p| p.codesets()))
    }

    pub fn encode(&self, out: &mut CdrOutput) -> CorbaResult<()> {
        out.write_string(&self.type_id)?;
        out.write_ulong(self.profiles.len() as u32);
        for p in &self.profiles {
            out.write_ulong(p.profile_id);
            out.write_octet_sequence(&p.profile_data);
        }
        Ok(())
    }

    pub fn decode(input: &mut CdrInput) -> CorbaResult<Self> {
        let type_id = input.read_string()?;
        let count = input.read_ulong()?;
        let mut profiles = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let profile_id = input.read_ulong()?;
            let profile_data = input.read_octet_sequence()?.to_vec();
            profiles.push(TaggedProfile {
                profile_id,
                profile_data,
            });
        }
        Ok(Self { type_id, profiles })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_ior_exposes_iiop_endpoint() {
        let ior = Ior::create_simple("IDL:Test/Sample:1.0", "localhost", 8080, vec![1, 2, 3, 4]);
        let profile = ior.iiop_profile().unwrap().unwrap();
        assert_eq!(profile.host, "localhost");
        assert_eq!(profile.port, 8080);
        assert_eq!(profile.object_key, vec![1, 2, 3, 4]);
    }

    #[test]
    fn nil_ior_has_no_profiles() {
        assert!(Ior::nil().is_nil());
        assert!(!Ior::create_simple("x", "h", 1, vec![]).is_nil());
    }

    #[test]
    fn ior_cdr_round_trip() {
        let ior = Ior::create_simple("IDL:Test/Sample:1.0", "localhost", 8080, vec![1, 2, 3, 4]);
        let mut out = CdrOutput::new(Endian::Big);
        ior.encode(&mut out).unwrap();
        let bytes = out.into_bytes();
        let mut input = CdrInput::new(&bytes, Endian::Big);
        let decoded = Ior::decode(&mut input).unwrap();
        assert_eq!(decoded, ior);
    }
}
