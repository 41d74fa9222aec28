//! Pluggable protocol handler registry: turns a `corbaloc:` address into a
//! [`TaggedProfile`] and, in the other direction, recognizes which handler (if any)
//! understands an already-decoded profile.

use std::collections::HashMap;

use crate::error::{CorbaError, CorbaResult};
use crate::ior::corbaloc::CorbalocAddress;
use crate::ior::{IiopProfileBody, TaggedComponent, TaggedProfile};

/// A protocol named in a `corbaloc:` address (`iiop`, `ssliop`, `rir`, or a
/// caller-registered custom one).
pub trait ProtocolHandler: Send + Sync {
    /// Lower-case protocol name, e.g. `"iiop"`.
    fn name(&self) -> &str;

    /// Checks that an address is well-formed for this protocol before a profile is
    /// built from it (e.g. `rir` rejects a host/port).
    fn validate_address(&self, address: &CorbalocAddress) -> CorbaResult<()>;

    /// Builds the profile a corbaloc address of this protocol maps to.
    fn create_profile(
        &self,
        address: &CorbalocAddress,
        object_key: &[u8],
    ) -> CorbaResult<TaggedProfile>;

    /// Recovers a corbaloc-shaped address from a profile this handler produced, if
    /// it can be represented that way. Not every profile kind round-trips (e.g. an
    /// RIR marker profile carries no endpoint).
    fn parse_profile(&self, _profile: &TaggedProfile) -> CorbaResult<CorbalocAddress> {
        Err(CorbaError::no_implement(format!(
            "protocol handler {:?} does not support parsing profiles back to addresses",
            self.name()
        )))
    }

    /// Whether this handler recognizes `profile` as one it could have produced.
    fn can_handle_profile(&self, _profile: &TaggedProfile) -> bool {
        false
    }
}

struct IiopHandler;

impl ProtocolHandler for IiopHandler {
    fn name(&self) -> &str {
        "iiop"
    }

    fn validate_address(&self, address: &CorbalocAddress) -> CorbaResult<()> {
        if address.host.is_empty() {
            return Err(CorbaError::bad_param("iiop corbaloc address requires a host"));
        }
        Ok(())
    }

    fn create_profile(
        &self,
        address: &CorbalocAddress,
        object_key: &[u8],
    ) -> CorbaResult<TaggedProfile> {
        self.validate_address(address)?;
        let mut body = IiopProfileBody::new(address.host.clone(), address.port, object_key.to_vec());
        body.major = address.major;
        body.minor = address.minor;
        Ok(TaggedProfile {
            profile_id: crate::TAG_INTERNET_IOP,
            profile_data: body.encode(),
        })
    }

    fn parse_profile(&self, profile: &TaggedProfile) -> CorbaResult<CorbalocAddress> {
        let body = IiopProfileBody::decode(&profile.profile_data)?;
        Ok(CorbalocAddress {
            protocol: self.name().to_string(),
            major: body.major,
            minor: body.minor,
            host: body.host,
            port: body.port,
        })
    }

    /// Claims any `TAG_INTERNET_IOP` profile that isn't more specifically an
    /// SSLIOP one (an IIOP profile carrying an SSL tagged component), so the two
    /// handlers partition the profile space instead of both matching the same
    /// profile in an order that a `HashMap`'s iteration can't guarantee.
    fn can_handle_profile(&self, profile: &TaggedProfile) -> bool {
        profile.profile_id == crate::TAG_INTERNET_IOP
            && match IiopProfileBody::decode(&profile.profile_data) {
                Ok(body) => !body
                    .components
                    .iter()
                    .any(|c| c.component_id == crate::TAG_SSL_SEC_TRANS),
                Err(_) => false,
            }
    }
}

struct SsliopHandler;

impl ProtocolHandler for SsliopHandler {
    fn name(&self) -> &str {
        "ssliop"
    }

    fn validate_address(&self, address: &CorbalocAddress) -> CorbaResult<()> {
        if address.host.is_empty() {
            return Err(CorbaError::bad_param("ssliop corbaloc address requires a host"));
        }
        Ok(())
    }

    /// An SSLIOP endpoint is still an IIOP profile on the wire, distinguished by the
    /// presence of an SSL tagged component.
    fn create_profile(
        &self,
        address: &CorbalocAddress,
        object_key: &[u8],
    ) -> CorbaResult<TaggedProfile> {
        self.validate_address(address)?;
        let mut body = IiopProfileBody::new(address.host.clone(), address.port, object_key.to_vec());
        body.major = address.major;
        body.minor = address.minor;
        body.components.push(TaggedComponent {
            component_id: crate::TAG_SSL_SEC_TRANS,
            component_data: Vec::new(),
        });
        Ok(TaggedProfile {
            profile_id: crate::TAG_INTERNET_IOP,
            profile_data: body.encode(),
        })
    }

    fn parse_profile(&self, profile: &TaggedProfile) -> CorbaResult<CorbalocAddress> {
        let body = IiopProfileBody::decode(&profile.profile_data)?;
        Ok(CorbalocAddress {
            protocol: self.name().to_string(),
            major: body.major,
            minor: body.minor,
            host: body.host,
            port: body.port,
        })
    }

    fn can_handle_profile(&self, profile: &TaggedProfile) -> bool {
        if profile.profile_id != crate::TAG_INTERNET_IOP {
            return false;
        }
        match IiopProfileBody::decode(&profile.profile_data) {
            Ok(body) => body
                .components
                .iter()
                .any(|c| c.component_id == crate::TAG_SSL_SEC_TRANS),
            Err(_) => false,
        }
    }
}

struct RirHandler;

impl ProtocolHandler for RirHandler {
    fn name(&self) -> &str {
        "rir"
    }

    fn validate_address(&self, address: &CorbalocAddress) -> CorbaResult<()> {
        if !address.host.is_empty() || address.port.is_some() {
            return Err(CorbaError::bad_param("rir corbaloc address takes no host or port"));
        }
        Ok(())
    }

    /// Emits a marker profile carrying only the object key; resolution against the
    /// caller's initial-references table happens above this layer.
    fn create_profile(
        &self,
        address: &CorbalocAddress,
        object_key: &[u8],
    ) -> CorbaResult<TaggedProfile> {
        self.validate_address(address)?;
        Ok(TaggedProfile {
            profile_id: crate::TAG_RIR_MARKER,
            profile_data: object_key.to_vec(),
        })
    }

    fn parse_profile(&self, profile: &TaggedProfile) -> CorbaResult<CorbalocAddress> {
        if profile.profile_id != crate::TAG_RIR_MARKER {
            return Err(CorbaError::bad_param("not an rir marker profile"));
        }
        Ok(CorbalocAddress {
            protocol: self.name().to_string(),
            major: 1,
            minor: 2,
            host: String::new(),
            port: None,
        })
    }

    fn can_handle_profile(&self, profile: &TaggedProfile) -> bool {
        profile.profile_id == crate::TAG_RIR_MARKER
    }
}

/// Registry of protocol handlers, keyed by lower-case name. Constructed per
/// ORB-context rather than as a process-wide singleton, so tests and concurrent
/// ORB instances never share mutable registration state.
pub struct ProtocolRegistry {
    handlers: HashMap<String, Box<dyn ProtocolHandler>>,
}

impl std::fmt::Debug for ProtocolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolRegistry")
            .field("protocols", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProtocolRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// A registry preloaded with the built-in IIOP, SSLIOP, and RIR handlers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register(Box::new(IiopHandler))
            .expect("default iiop handler name is unique");
        registry
            .register(Box::new(SsliopHandler))
            .expect("default ssliop handler name is unique");
        registry
            .register(Box::new(RirHandler))
            .expect("default rir handler name is unique");
        registry
    }

    pub fn register(&mut self, handler: Box<dyn ProtocolHandler>) -> CorbaResult<()> {
        let key = handler.name().to_ascii_lowercase();
        if self.handlers.contains_key(&key) {
            return Err(CorbaError::bad_param(format!(
                "protocol handler {key:?} is already registered"
            )));
        }
        self.handlers.insert(key, handler);
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> Option<Box<dyn ProtocolHandler>> {
        self.handlers.remove(&name.to_ascii_lowercase())
    }

    pub fn lookup(&self, name: &str) -> Option<&dyn ProtocolHandler> {
        self.handlers.get(&name.to_ascii_lowercase()).map(|h| h.as_ref())
    }

    pub fn protocol_names(&self) -> Vec<&str> {
        self.handlers.values().map(|h| h.name()).collect()
    }

    /// Finds a registered handler that claims it could have produced `profile`.
    /// Handlers are expected to partition the profiles they claim (see
    /// `IiopHandler`/`SsliopHandler`) so this is well-defined regardless of
    /// registration or iteration order.
    pub fn find_by_profile(&self, profile: &TaggedProfile) -> Option<&dyn ProtocolHandler> {
        self.handlers
            .values()
            .find(|h| h.can_handle_profile(profile))
            .map(|h| h.as_ref())
    }
}

impl Default for ProtocolRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ior::corbaloc::CorbalocAddress;

    fn addr(protocol: &str, host: &str, port: Option<u16>) -> CorbalocAddress {
        CorbalocAddress {
            protocol: protocol.into(),
            major: 1,
            minor: 2,
            host: host.into(),
            port,
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ProtocolRegistry::with_defaults();
        assert!(registry.register(Box::new(IiopHandler)).is_err());
    }

    #[test]
    fn iiop_handler_round_trips_a_profile() {
        let registry = ProtocolRegistry::with_defaults();
        let handler = registry.lookup("IIOP").unwrap();
        let profile = handler
            .create_profile(&addr("iiop", "localhost", Some(2809)), &[1, 2, 3])
            .unwrap();
        assert!(registry.find_by_profile(&profile).is_some());
        let parsed = handler.parse_profile(&profile).unwrap();
        assert_eq!(parsed.host, "localhost");
        assert_eq!(parsed.port, Some(2809));
    }

    #[test]
    fn ssliop_profile_is_distinguished_by_component() {
        let registry = ProtocolRegistry::with_defaults();
        let ssliop = registry.lookup("ssliop").unwrap();
        let profile = ssliop
            .create_profile(&addr("ssliop", "host", Some(2810)), &[])
            .unwrap();
        let found = registry.find_by_profile(&profile).unwrap();
        assert_eq!(found.name(), "ssliop");
    }

    #[test]
    fn rir_rejects_host_and_port() {
        let rir = RirHandler;
        assert!(rir.validate_address(&addr("rir", "host", None)).is_err());
        assert!(rir.validate_address(&addr("rir", "", Some(1))).is_err());
        assert!(rir.validate_address(&addr("rir", "", None)).is_ok());
    }

    #[test]
    fn unregister_and_lookup() {
        let mut registry = ProtocolRegistry::with_defaults();
        assert!(registry.unregister("iiop").is_some());
        assert!(registry.lookup("iiop").is_none());
        assert_eq!(registry.protocol_names().len(), 2);
    }
}
