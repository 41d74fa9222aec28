//! `IOR:` stringified object references: hex-encoded, either encapsulated
//! (CORBA 3.0+, leading byte-order octet) or non-encapsulated (CORBA 2.x, no flag).

use crate::cdr::{CdrInput, CdrOutput, Endian};
use crate::error::{CorbaError, CorbaResult};
use crate::ior::Ior;

pub fn to_stringified_ior(ior: &Ior) -> CorbaResult<String> {
    let mut enc = CdrOutput::new_encapsulation(Endian::Big);
    ior.encode(&mut enc)?;
    Ok(format!("IOR:{}", hex::encode_upper(enc.into_bytes())))
}

pub fn parse_stringified_ior(s: &str) -> CorbaResult<Ior> {
    let hex_part = s
        .strip_prefix("IOR:")
        .or_else(|| s.strip_prefix("ior:"))
        .ok_or_else(|| CorbaError::bad_param("stringified IOR must start with \"IOR:\""))?;
    if hex_part.is_empty() {
        return Ok(Ior::nil());
    }
    let bytes =
        hex::decode(hex_part).map_err(|e| CorbaError::bad_param(format!("invalid IOR hex: {e}")))?;
    if bytes.is_empty() {
        return Ok(Ior::nil());
    }

    // bytes[0] == 1 -> encapsulated little-endian; bytes[0..3] all zero ->
    // encapsulated big-endian; otherwise non-encapsulated big-endian.
    if bytes[0] == 1 {
        let mut input = CdrInput::from_encapsulation(&bytes)?;
        Ior::decode(&mut input)
    } else if bytes.len() >= 3 && bytes[0] == 0 && bytes[1] == 0 && bytes[2] == 0 {
        let mut input = CdrInput::from_encapsulation(&bytes)?;
        Ior::decode(&mut input)
    } else {
        let mut input = CdrInput::new(&bytes, Endian::Big);
        Ior::decode(&mut input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ior_stringify_round_trip() {
        let ior = Ior::create_simple("IDL:Test/Sample:1.0", "localhost", 8080, vec![1, 2, 3, 4]);
        let s = to_stringified_ior(&ior).unwrap();
        assert!(s.starts_with("IOR:"));
        let parsed = parse_stringified_ior(&s).unwrap();
        assert_eq!(parsed, ior);
        let profile = parsed.iiop_profile().unwrap().unwrap();
        assert_eq!(profile.host, "localhost");
        assert_eq!(profile.port, 8080);
        assert_eq!(profile.object_key, vec![1, 2, 3, 4]);
    }

    #[test]
    fn empty_ior_is_nil() {
        assert!(parse_stringified_ior("IOR:").unwrap().is_nil());
    }

    #[test]
    fn rejects_missing_prefix() {
        assert!(parse_stringified_ior("garbage").is_err());
    }
}
