//! `corbaloc:` URL parsing: `corbaloc:` addresses `/` object-key, where
//! addresses is a comma-separated list and each address is
//! `[protocol:][version@]host[:port]`.

use percent_encoding::percent_decode_str;

use crate::error::{CorbaError, CorbaResult};
use crate::ior::registry::ProtocolRegistry;
use crate::ior::{Ior, TaggedProfile};

/// One parsed `corbaloc:` address, handed to a [`super::registry::ProtocolHandler`]
/// to build a profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorbalocAddress {
    pub protocol: String,
    pub major: u8,
    pub minor: u8,
    pub host: String,
    /// `None` only for protocols like `rir` that carry no endpoint.
    pub port: Option<u16>,
}

fn default_port(protocol: &str) -> u16 {
    match protocol {
        "ssliop" => 2810,
        _ => 2809,
    }
}

fn parse_host_port(s: &str, protocol: &str) -> CorbaResult<(String, Option<u16>)> {
    if let Some(rest) = s.strip_prefix('[') {
        let end = rest
            .find(']')
            .ok_or_else(|| CorbaError::bad_param("unterminated IPv6 literal in corbaloc address"))?;
        let host = rest[..end].to_string();
        let after = &rest[end + 1..];
        let port = match after.strip_prefix(':') {
            Some(p) => p
                .parse::<u16>()
                .map_err(|e| CorbaError::bad_param(format!("invalid corbaloc port {p:?}: {e}")))?,
            None => default_port(protocol),
        };
        Ok((host, Some(port)))
    } else if let Some(idx) = s.rfind(':') {
        let host = s[..idx].to_string();
        let port_str = &s[idx + 1..];
        let port = port_str
            .parse::<u16>()
            .map_err(|e| CorbaError::bad_param(format!("invalid corbaloc port {port_str:?}: {e}")))?;
        Ok((host, Some(port)))
    } else {
        Ok((s.to_string(), Some(default_port(protocol))))
    }
}

fn parse_version(s: &str) -> CorbaResult<(u8, u8)> {
    let mut parts = s.splitn(2, '.');
    let major = parts
        .next()
        .ok_or_else(|| CorbaError::bad_param("empty corbaloc version"))?;
    let minor = parts
        .next()
        .ok_or_else(|| CorbaError::bad_param(format!("corbaloc version {s:?} missing minor part")))?;
    let major: u8 = major
        .parse()
        .map_err(|e| CorbaError::bad_param(format!("invalid corbaloc major version {major:?}: {e}")))?;
    let minor: u8 = minor
        .parse()
        .map_err(|e| CorbaError::bad_param(format!("invalid corbaloc minor version {minor:?}: {e}")))?;
    Ok((major, minor))
}

fn parse_address(s: &str, registry: &ProtocolRegistry) -> CorbaResult<CorbalocAddress> {
    let mut rest = s;
    let mut protocol = "iiop".to_string();

    // A protocol prefix never starts with '[' (the start of a bracketed IPv6 host).
    if !rest.starts_with('[') {
        if let Some(idx) = rest.find(':') {
            let candidate = &rest[..idx];
            if registry.lookup(candidate).is_some() {
                protocol = candidate.to_ascii_lowercase();
                rest = &rest[idx + 1..];
            }
        }
    }

    let mut major = 1u8;
    let mut minor = 2u8;
    if let Some(at_idx) = rest.find('@') {
        let (maj, min) = parse_version(&rest[..at_idx])?;
        major = maj;
        minor = min;
        rest = &rest[at_idx + 1..];
    }

    if protocol == "rir" {
        if !rest.is_empty() {
            return Err(CorbaError::bad_param("rir corbaloc address takes no host or port"));
        }
        return Ok(CorbalocAddress {
            protocol,
            major,
            minor,
            host: String::new(),
            port: None,
        });
    }

    if rest.is_empty() {
        return Err(CorbaError::bad_param(format!(
            "corbaloc address {s:?} is missing a host"
        )));
    }
    let (host, port) = parse_host_port(rest, &protocol)?;
    Ok(CorbalocAddress {
        protocol,
        major,
        minor,
        host,
        port,
    })
}

/// Parses a `corbaloc:` URL into an IOR with one profile per address, all sharing
/// the same percent-decoded object key.
pub fn parse_corbaloc(url: &str) -> CorbaResult<Ior> {
    let body = url
        .strip_prefix("corbaloc:")
        .or_else(|| url.strip_prefix("Corbaloc:"))
        .ok_or_else(|| CorbaError::bad_param("corbaloc URL must start with \"corbaloc:\""))?;

    let (addr_list, key_part) = match body.find('/') {
        Some(idx) => (&body[..idx], &body[idx + 1..]),
        None => (body, ""),
    };
    if addr_list.is_empty() {
        return Err(CorbaError::bad_param(
            "corbaloc URL requires at least one address",
        ));
    }
    let object_key: Vec<u8> = percent_decode_str(key_part).collect();

    let registry = ProtocolRegistry::with_defaults();
    let mut profiles: Vec<TaggedProfile> = Vec::new();
    for addr_str in addr_list.split(',') {
        let address = parse_address(addr_str, &registry)?;
        let handler = registry.lookup(&address.protocol).ok_or_else(|| {
            CorbaError::bad_param(format!("unknown corbaloc protocol {:?}", address.protocol))
        })?;
        profiles.push(handler.create_profile(&address, &object_key)?);
    }
    Ok(Ior::new(String::new(), profiles))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_host_port_defaults_to_iiop_and_version_1_2() {
        let ior = parse_corbaloc("corbaloc:localhost:2809/NameService").unwrap();
        assert_eq!(ior.profiles.len(), 1);
        let profile = ior.iiop_profile().unwrap().unwrap();
        assert_eq!(profile.host, "localhost");
        assert_eq!(profile.port, 2809);
        assert_eq!(profile.major, 1);
        assert_eq!(profile.minor, 2);
        assert_eq!(profile.object_key, b"NameService");
    }

    #[test]
    fn explicit_protocol_and_version() {
        let ior = parse_corbaloc("corbaloc:iiop:1.0@host:1234/key").unwrap();
        let profile = ior.iiop_profile().unwrap().unwrap();
        assert_eq!(profile.major, 1);
        assert_eq!(profile.minor, 0);
        assert_eq!(profile.port, 1234);
    }

    #[test]
    fn default_port_applied_when_omitted() {
        let ior = parse_corbaloc("corbaloc:iiop:host/key").unwrap();
        let profile = ior.iiop_profile().unwrap().unwrap();
        assert_eq!(profile.port, 2809);

        let ior = parse_corbaloc("corbaloc:ssliop:host/key").unwrap();
        // ssliop still rides on an IIOP profile, distinguished by its SSL component.
        let profile = ior.iiop_profile().unwrap().unwrap();
        assert_eq!(profile.port, 2810);
        assert!(profile
            .components
            .iter()
            .any(|c| c.component_id == crate::TAG_SSL_SEC_TRANS));
    }

    #[test]
    fn ipv6_host_is_unbracketed() {
        let ior = parse_corbaloc("corbaloc:iiop:[::1]:2809/key").unwrap();
        let profile = ior.iiop_profile().unwrap().unwrap();
        assert_eq!(profile.host, "::1");
        assert_eq!(profile.port, 2809);
    }

    #[test]
    fn multi_address_shares_one_object_key() {
        let ior = parse_corbaloc("corbaloc:iiop:host1:1,iiop:host2:2/key").unwrap();
        assert_eq!(ior.profiles.len(), 2);
        for profile in &ior.profiles {
            let body = crate::ior::IiopProfileBody::decode(&profile.profile_data).unwrap();
            assert_eq!(body.object_key, b"key");
        }
    }

    #[test]
    fn object_key_is_percent_decoded() {
        let ior = parse_corbaloc("corbaloc:host/a%20b").unwrap();
        let profile = ior.iiop_profile().unwrap().unwrap();
        assert_eq!(profile.object_key, b"a b");
    }

    #[test]
    fn rir_address_has_no_endpoint() {
        let ior = parse_corbaloc("corbaloc:rir:/NameService").unwrap();
        assert_eq!(ior.profiles.len(), 1);
        assert_eq!(ior.profiles[0].profile_id, crate::TAG_RIR_MARKER);
        assert_eq!(ior.profiles[0].profile_data, b"NameService");
    }

    #[test]
    fn rir_rejects_host() {
        assert!(parse_corbaloc("corbaloc:rir:host/key").is_err());
    }

    #[test]
    fn rejects_missing_prefix() {
        assert!(parse_corbaloc("iiop:host:1/key").is_err());
    }
}
