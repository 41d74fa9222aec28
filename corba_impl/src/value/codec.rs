//! TypeCode-driven value codec: `encode(out, value, tc)` / `decode(in, tc)`.
//!
//! A mismatch between the supplied [`Value`] and the `TypeCode` driving the encode —
//! wrong variant, wrong member count, a union label with no match and no default —
//! fails with [`CorbaError::Marshal`] rather than fabricating a default: this codec
//! never silently coerces.

use crate::cdr::{CdrInput, CdrOutput};
use crate::error::{CorbaError, CorbaResult};
use crate::ior::Ior;
use crate::typecode::{TCKind, TypeCode};
use crate::value::any;
use crate::value::Value;

/// Value tags for valuetype wire encoding.
const VALUE_TAG_NULL: u32 = 0;
const VALUE_TAG_INDIRECTION: u32 = 0xFFFF_FFFF; // -1 as u32
const VALUE_TAG_STANDARD: u32 = 0x7fff_ff00;
const VALUE_TAG_CHUNKED: u32 = 0x7fff_ff01;
const VALUE_TAG_CUSTOM: u32 = 0x7fff_ff02;

fn mismatch(tc: &TypeCode, value: &Value) -> CorbaError {
    CorbaError::marshal(format!(
        "value {value:?} does not conform to TypeCode kind {:?}",
        tc.kind()
    ))
}

pub fn encode(out: &mut CdrOutput, value: &Value, tc: &TypeCode) -> CorbaResult<()> {
    match tc.kind() {
        TCKind::Null | TCKind::Void => Ok(()),
        TCKind::Boolean => match value {
            Value::Boolean(v) => {
                out.write_boolean(*v);
                Ok(())
            }
            _ => Err(mismatch(tc, value)),
        },
        TCKind::Octet => match value {
            Value::Octet(v) => {
                out.write_octet(*v);
                Ok(())
            }
            _ => Err(mismatch(tc, value)),
        },
        TCKind::Char => match value {
            Value::Char(v) => {
                out.write_char(*v);
                Ok(())
            }
            _ => Err(mismatch(tc, value)),
        },
        TCKind::WChar => match value {
            Value::WChar(v) => {
                out.write_wchar(*v);
                Ok(())
            }
            _ => Err(mismatch(tc, value)),
        },
        TCKind::Short => match value {
            Value::Short(v) => {
                out.write_short(*v);
                Ok(())
            }
            _ => Err(mismatch(tc, value)),
        },
        TCKind::UShort => match value {
            Value::UShort(v) => {
                out.write_ushort(*v);
                Ok(())
            }
            _ => Err(mismatch(tc, value)),
        },
        TCKind::Long => match value {
            Value::Long(v) => {
                out.write_long(*v);
                Ok(())
            }
            _ => Err(mismatch(tc, value)),
        },
        TCKind::ULong => match value {
            Value::ULong(v) => {
                out.write_ulong(*v);
                Ok(())
            }
            _ => Err(mismatch(tc, value)),
        },
        TCKind::LongLong => match value {
            Value::LongLong(v) => {
                out.write_longlong(*v);
                Ok(())
            }
            _ => Err(mismatch(tc, value)),
        },
        TCKind::ULongLong => match value {
            Value::ULongLong(v) => {
                out.write_ulonglong(*v);
                Ok(())
            }
            _ => Err(mismatch(tc, value)),
        },
        TCKind::Float => match value {
            Value::Float(v) => {
                out.write_float(*v);
                Ok(())
            }
            _ => Err(mismatch(tc, value)),
        },
        TCKind::Double => match value {
            Value::Double(v) => {
                out.write_double(*v);
                Ok(())
            }
            _ => Err(mismatch(tc, value)),
        },
        TCKind::String => match value {
            Value::String(s) => out.write_string(s),
            _ => Err(mismatch(tc, value)),
        },
        TCKind::WString => match value {
            Value::WString(s) => {
                out.write_wstring(s);
                Ok(())
            }
            _ => Err(mismatch(tc, value)),
        },
        TCKind::Enum => encode_enum(out, value, tc),
        TCKind::Struct | TCKind::Except => encode_struct(out, value, tc),
        TCKind::Union => encode_union(out, value, tc),
        TCKind::Sequence => encode_sequence(out, value, tc),
        TCKind::Array => encode_array(out, value, tc),
        TCKind::Alias => encode(out, value, tc.content_type()?),
        TCKind::Any => encode_any(out, value, tc),
        TCKind::ObjRef
        | TCKind::AbstractInterface
        | TCKind::LocalInterface
        | TCKind::Component
        | TCKind::Home => encode_objref(out, value, tc),
        TCKind::Value | TCKind::Event => encode_value_like(out, value, tc),
        TCKind::ValueBox => encode_value_box(out, value, tc),
        other => Err(CorbaError::no_implement(format!(
            "encoding TypeCode kind {other:?} is not supported"
        ))),
    }
}

pub fn decode(input: &mut CdrInput, tc: &TypeCode) -> CorbaResult<Value> {
    match tc.kind() {
        TCKind::Null | TCKind::Void => Ok(Value::Null),
        TCKind::Boolean => Ok(Value::Boolean(input.read_boolean()?)),
        TCKind::Octet => Ok(Value::Octet(input.read_octet()?)),
        TCKind::Char => Ok(Value::Char(input.read_char()?)),
        TCKind::WChar => Ok(Value::WChar(input.read_wchar()?)),
        TCKind::Short => Ok(Value::Short(input.read_short()?)),
        TCKind::UShort => Ok(Value::UShort(input.read_ushort()?)),
        TCKind::Long => Ok(Value::Long(input.read_long()?)),
        TCKind::ULong => Ok(Value::ULong(input.read_ulong()?)),
        TCKind::LongLong => Ok(Value::LongLong(input.read_longlong()?)),
        TCKind::ULongLong => Ok(Value::ULongLong(input.read_ulonglong()?)),
        TCKind::Float => Ok(Value::Float(input.read_float()?)),
        TCKind::Double => Ok(Value::Double(input.read_double()?)),
        TCKind::String => Ok(Value::String(input.read_string()?)),
        TCKind::WString => Ok(Value::WString(input.read_wstring()?)),
        TCKind::Enum => decode_enum(input, tc),
        TCKind::Struct | TCKind::Except => decode_struct(input, tc),
        TCKind::Union => decode_union(input, tc),
        TCKind::Sequence => decode_sequence(input, tc),
        TCKind::Array => decode_array(input, tc),
        TCKind::Alias => decode(input, tc.content_type()?),
        TCKind::Any => decode_any(input),
        TCKind::ObjRef
        | TCKind::AbstractInterface
        | TCKind::LocalInterface
        | TCKind::Component
        | TCKind::Home => decode_objref(input),
        TCKind::Value | TCKind::Event => decode_value_like(input, tc),
        TCKind::ValueBox => decode_value_box(input, tc),
        other => Err(CorbaError::no_implement(format!(
            "decoding TypeCode kind {other:?} is not supported"
        ))),
    }
}

fn enum_ordinal_of(tc: &TypeCode, name: &str) -> CorbaResult<u32> {
    let count = tc.member_count()?;
    for i in 0..count {
        if tc.member_name(i)? == name {
            return Ok(i as u32);
        }
    }
    Err(CorbaError::marshal(format!("unknown enum label {name:?}")))
}

fn encode_enum(out: &mut CdrOutput, value: &Value, tc: &TypeCode) -> CorbaResult<()> {
    let ordinal = match value {
        Value::Enum { ordinal, .. } => *ordinal,
        Value::String(name) => enum_ordinal_of(tc, name)?,
        _ => return Err(mismatch(tc, value)),
    };
    out.write_ulong(ordinal);
    Ok(())
}

fn decode_enum(input: &mut CdrInput, tc: &TypeCode) -> CorbaResult<Value> {
    let ordinal = input.read_ulong()?;
    let name = tc.member_name(ordinal as usize)?.to_string();
    Ok(Value::Enum { ordinal, name })
}

fn encode_struct(out: &mut CdrOutput, value: &Value, tc: &TypeCode) -> CorbaResult<()> {
    let Value::Struct(members) = value else {
        return Err(mismatch(tc, value));
    };
    let count = tc.member_count()?;
    for i in 0..count {
        let name = tc.member_name(i)?;
        let (_, v) = members
            .iter()
            .find(|(n, _)| n == name)
            .ok_or_else(|| CorbaError::marshal(format!("missing struct member {name:?}")))?;
        encode(out, v, tc.member_type(i)?)?;
    }
    Ok(())
}

fn decode_struct(input: &mut CdrInput, tc: &TypeCode) -> CorbaResult<Value> {
    let count = tc.member_count()?;
    let mut members = Vec::with_capacity(count);
    for i in 0..count {
        let name = tc.member_name(i)?.to_string();
        let v = decode(input, tc.member_type(i)?)?;
        members.push((name, v));
    }
    Ok(Value::Struct(members))
}

/// Resolves a union discriminator supplied by enum name to its ordinal against the
/// discriminator TypeCode.
fn resolve_discriminator(discriminator: &Value, disc_tc: &TypeCode) -> CorbaResult<Value> {
    if disc_tc.kind() == TCKind::Enum {
        if let Value::String(name) = discriminator {
            let ordinal = enum_ordinal_of(disc_tc, name)?;
            return Ok(Value::Enum {
                ordinal,
                name: name.clone(),
            });
        }
    }
    Ok(discriminator.clone())
}

/// Compares a union member label against a discriminator value. Enum discriminators
/// are written/read as plain ordinals (see typecode::wire's label writer), so an
/// `Enum` value's ordinal is compared numerically against the label.
fn labels_equal(label: &Value, discriminator: &Value) -> bool {
    match (label.as_i64(), discriminator.as_i64()) {
        (Some(a), Some(b)) => a == b,
        _ => label == discriminator,
    }
}

fn encode_union(out: &mut CdrOutput, value: &Value, tc: &TypeCode) -> CorbaResult<()> {
    let Value::Union { discriminator, member } = value else {
        return Err(mismatch(tc, value));
    };
    let disc_tc = tc.discriminator_type()?;
    let resolved = resolve_discriminator(discriminator, disc_tc)?;
    encode(out, &resolved, disc_tc)?;

    let count = tc.member_count()?;
    let mut chosen = None;
    for i in 0..count {
        if labels_equal(tc.member_label(i)?, &resolved) {
            chosen = Some(i);
            break;
        }
    }
    if chosen.is_none() {
        if let Ok(default_index) = tc.default_index() {
            if default_index >= 0 {
                chosen = Some(default_index as usize);
            }
        }
    }
    if let Some(i) = chosen {
        encode(out, member, tc.member_type(i)?)?;
    }
    Ok(())
}

fn decode_union(input: &mut CdrInput, tc: &TypeCode) -> CorbaResult<Value> {
    let disc_tc = tc.discriminator_type()?;
    let discriminator = decode(input, disc_tc)?;

    let count = tc.member_count()?;
    let mut chosen = None;
    for i in 0..count {
        if labels_equal(tc.member_label(i)?, &discriminator) {
            chosen = Some(i);
            break;
        }
    }
    if chosen.is_none() {
        if let Ok(default_index) = tc.default_index() {
            if default_index >= 0 {
                chosen = Some(default_index as usize);
            }
        }
    }
    let member = match chosen {
        Some(i) => Box::new(decode(input, tc.member_type(i)?)?),
        None => Box::new(Value::Null),
    };
    Ok(Value::Union {
        discriminator: Box::new(discriminator),
        member,
    })
}

fn encode_sequence(out: &mut CdrOutput, value: &Value, tc: &TypeCode) -> CorbaResult<()> {
    let Value::Sequence(items) = value else {
        return Err(mismatch(tc, value));
    };
    let bound = tc.length()?;
    if bound != 0 && items.len() as u32 > bound {
        return Err(CorbaError::marshal(format!(
            "sequence of {} elements exceeds bound {bound}",
            items.len()
        )));
    }
    out.write_ulong(items.len() as u32);
    let content_tc = tc.content_type()?;
    for item in items {
        encode(out, item, content_tc)?;
    }
    Ok(())
}

fn decode_sequence(input: &mut CdrInput, tc: &TypeCode) -> CorbaResult<Value> {
    let len = input.read_ulong()?;
    let bound = tc.length()?;
    if bound != 0 && len > bound {
        return Err(CorbaError::marshal(format!(
            "sequence length {len} exceeds bound {bound}"
        )));
    }
    let content_tc = tc.content_type()?;
    let mut items = Vec::with_capacity(len.min(1 << 16) as usize);
    for _ in 0..len {
        items.push(decode(input, content_tc)?);
    }
    Ok(Value::Sequence(items))
}

fn encode_array(out: &mut CdrOutput, value: &Value, tc: &TypeCode) -> CorbaResult<()> {
    let Value::Array(items) = value else {
        return Err(mismatch(tc, value));
    };
    let len = tc.length()?;
    if items.len() as u32 != len {
        return Err(CorbaError::marshal(format!(
            "array of {} elements does not match TypeCode length {len}",
            items.len()
        )));
    }
    let content_tc = tc.content_type()?;
    for item in items {
        encode(out, item, content_tc)?;
    }
    Ok(())
}

fn decode_array(input: &mut CdrInput, tc: &TypeCode) -> CorbaResult<Value> {
    let len = tc.length()?;
    let content_tc = tc.content_type()?;
    let mut items = Vec::with_capacity(len as usize);
    for _ in 0..len {
        items.push(decode(input, content_tc)?);
    }
    Ok(Value::Array(items))
}

fn encode_any(out: &mut CdrOutput, value: &Value, tc: &TypeCode) -> CorbaResult<()> {
    match value {
        Value::Any(inner_tc, inner_value) => {
            crate::typecode::encode_typecode(out, inner_tc)?;
            encode(out, inner_value, inner_tc)
        }
        other => {
            let wrapped = any::wrap_any(other.clone())?;
            encode(out, &wrapped, tc)
        }
    }
}

fn decode_any(input: &mut CdrInput) -> CorbaResult<Value> {
    let inner_tc = crate::typecode::decode_typecode(input)?;
    let inner_value = decode(input, &inner_tc)?;
    Ok(Value::Any(Box::new(inner_tc), Box::new(inner_value)))
}

fn encode_objref(out: &mut CdrOutput, value: &Value, tc: &TypeCode) -> CorbaResult<()> {
    match value {
        Value::ObjectRef(Some(ior)) => ior.encode(out),
        Value::ObjectRef(None) => Ior::nil().encode(out),
        _ => Err(mismatch(tc, value)),
    }
}

fn decode_objref(input: &mut CdrInput) -> CorbaResult<Value> {
    let ior = Ior::decode(input)?;
    Ok(if ior.is_nil() {
        Value::ObjectRef(None)
    } else {
        Value::ObjectRef(Some(Box::new(ior)))
    })
}

/// Concrete base TypeCode for a valuetype, treating a kind without one (or a kind
/// this codec doesn't track a base for) as having no base.
fn concrete_base(tc: &TypeCode) -> Option<&TypeCode> {
    tc.concrete_base_type().ok().flatten()
}

fn encode_value_members(out: &mut CdrOutput, tc: &TypeCode, members: &[(String, Value)]) -> CorbaResult<()> {
    if let Some(base_tc) = concrete_base(tc) {
        encode_value_members(out, base_tc, members)?;
    }
    let count = tc.member_count()?;
    for i in 0..count {
        let name = tc.member_name(i)?;
        let (_, v) = members
            .iter()
            .find(|(n, _)| n == name)
            .ok_or_else(|| CorbaError::marshal(format!("missing valuetype member {name:?}")))?;
        encode(out, v, tc.member_type(i)?)?;
    }
    Ok(())
}

fn decode_value_members(input: &mut CdrInput, tc: &TypeCode) -> CorbaResult<Vec<(String, Value)>> {
    let mut members = Vec::new();
    if let Some(base_tc) = concrete_base(tc) {
        members.extend(decode_value_members(input, base_tc)?);
    }
    let count = tc.member_count()?;
    for i in 0..count {
        let name = tc.member_name(i)?.to_string();
        let v = decode(input, tc.member_type(i)?)?;
        members.push((name, v));
    }
    Ok(members)
}

fn encode_value_like(out: &mut CdrOutput, value: &Value, tc: &TypeCode) -> CorbaResult<()> {
    match value {
        Value::Null => {
            out.write_ulong(VALUE_TAG_NULL);
            Ok(())
        }
        Value::Value { repository_id, members } => {
            out.write_ulong(VALUE_TAG_STANDARD);
            out.write_string(repository_id)?;
            encode_value_members(out, tc, members)
        }
        _ => Err(mismatch(tc, value)),
    }
}

fn decode_value_like(input: &mut CdrInput, tc: &TypeCode) -> CorbaResult<Value> {
    let tag = input.read_ulong()?;
    match tag {
        VALUE_TAG_NULL => Ok(Value::Null),
        VALUE_TAG_INDIRECTION => Err(CorbaError::no_implement(
            "valuetype indirection (tag -1) is not supported",
        )),
        VALUE_TAG_CHUNKED => Err(CorbaError::no_implement(
            "chunked valuetype encoding is not supported",
        )),
        VALUE_TAG_STANDARD | VALUE_TAG_CUSTOM => {
            let repository_id = input.read_string()?;
            let members = decode_value_members(input, tc)?;
            Ok(Value::Value { repository_id, members })
        }
        other if other < 0x8000_0000 => {
            // A byte length preceding the state with no repository id: skip exactly
            // that many bytes.
            input.read_octet_array(other as usize)?;
            Ok(Value::Value {
                repository_id: String::new(),
                members: Vec::new(),
            })
        }
        other => Err(CorbaError::marshal(format!(
            "unrecognized valuetype tag 0x{other:08x}"
        ))),
    }
}

fn encode_value_box(out: &mut CdrOutput, value: &Value, tc: &TypeCode) -> CorbaResult<()> {
    match value {
        Value::Null => {
            out.write_ulong(VALUE_TAG_NULL);
            Ok(())
        }
        Value::Value { repository_id, members } => {
            out.write_ulong(VALUE_TAG_STANDARD);
            out.write_string(repository_id)?;
            let (_, boxed) = members
                .first()
                .ok_or_else(|| CorbaError::marshal("value_box has no boxed member"))?;
            encode(out, boxed, tc.content_type()?)
        }
        _ => Err(mismatch(tc, value)),
    }
}

fn decode_value_box(input: &mut CdrInput, tc: &TypeCode) -> CorbaResult<Value> {
    let tag = input.read_ulong()?;
    match tag {
        VALUE_TAG_NULL => Ok(Value::Null),
        VALUE_TAG_INDIRECTION => Err(CorbaError::no_implement(
            "valuetype indirection (tag -1) is not supported",
        )),
        VALUE_TAG_STANDARD | VALUE_TAG_CUSTOM => {
            let repository_id = input.read_string()?;
            let boxed = decode(input, tc.content_type()?)?;
            Ok(Value::Value {
                repository_id,
                members: vec![("value".to_string(), boxed)],
            })
        }
        other => Err(CorbaError::marshal(format!(
            "unrecognized value_box tag 0x{other:08x}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdr::Endian;

    fn round_trip(tc: &TypeCode, value: &Value) -> Value {
        let mut out = CdrOutput::new(Endian::Big);
        encode(&mut out, value, tc).unwrap();
        let bytes = out.into_bytes();
        let mut input = CdrInput::new(&bytes, Endian::Big);
        decode(&mut input, tc).unwrap()
    }

    #[test]
    fn primitive_round_trip() {
        let tc = TypeCode::primitive(TCKind::Long);
        assert_eq!(round_trip(&tc, &Value::Long(-7)), Value::Long(-7));
    }

    #[test]
    fn struct_round_trip_preserves_member_order() {
        let tc = TypeCode::create_struct_tc(
            "IDL:A:1.0",
            "A",
            vec![
                ("x".into(), TypeCode::primitive(TCKind::Long)),
                ("y".into(), TypeCode::primitive(TCKind::String)),
            ],
        );
        // supplied out of order; decode should still come back in TypeCode order
        let value = Value::Struct(vec![
            ("y".into(), Value::String("hi".into())),
            ("x".into(), Value::Long(3)),
        ]);
        let decoded = round_trip(&tc, &value);
        assert_eq!(
            decoded,
            Value::Struct(vec![
                ("x".into(), Value::Long(3)),
                ("y".into(), Value::String("hi".into())),
            ])
        );
    }

    #[test]
    fn struct_missing_member_fails_marshal() {
        let tc = TypeCode::create_struct_tc(
            "IDL:A:1.0",
            "A",
            vec![("x".into(), TypeCode::primitive(TCKind::Long))],
        );
        let value = Value::Struct(vec![]);
        let mut out = CdrOutput::new(Endian::Big);
        assert!(matches!(encode(&mut out, &value, &tc), Err(CorbaError::Marshal(_))));
    }

    #[test]
    fn sequence_round_trip_preserves_length_and_order() {
        let tc = TypeCode::create_sequence_tc(0, TypeCode::primitive(TCKind::Long));
        let value = Value::Sequence(vec![Value::Long(1), Value::Long(2), Value::Long(3)]);
        assert_eq!(round_trip(&tc, &value), value);
    }

    #[test]
    fn array_wrong_length_fails() {
        let tc = TypeCode::create_array_tc(3, TypeCode::primitive(TCKind::Octet));
        let value = Value::Array(vec![Value::Octet(1), Value::Octet(2)]);
        let mut out = CdrOutput::new(Endian::Big);
        assert!(encode(&mut out, &value, &tc).is_err());
    }

    #[test]
    fn union_round_trips_active_arm() {
        let tc = TypeCode::create_union_tc(
            "IDL:U:1.0",
            "U",
            TypeCode::primitive(TCKind::Long),
            -1,
            vec![
                (Value::Long(1), "a".into(), TypeCode::primitive(TCKind::Short)),
                (Value::Long(2), "b".into(), TypeCode::primitive(TCKind::Double)),
            ],
        );
        let value = Value::Union {
            discriminator: Box::new(Value::Long(2)),
            member: Box::new(Value::Double(9.5)),
        };
        assert_eq!(round_trip(&tc, &value), value);
    }

    #[test]
    fn union_enum_discriminator_resolved_by_name() {
        let disc = TypeCode::create_enum_tc("IDL:Color:1.0", "Color", vec!["RED".into(), "GREEN".into()]);
        let tc = TypeCode::create_union_tc(
            "IDL:U:1.0",
            "U",
            disc,
            -1,
            vec![(Value::ULong(1), "g".into(), TypeCode::primitive(TCKind::Long))],
        );
        let value = Value::Union {
            discriminator: Box::new(Value::String("GREEN".into())),
            member: Box::new(Value::Long(42)),
        };
        let mut out = CdrOutput::new(Endian::Big);
        encode(&mut out, &value, &tc).unwrap();
        let bytes = out.into_bytes();
        let mut input = CdrInput::new(&bytes, Endian::Big);
        let decoded = decode(&mut input, &tc).unwrap();
        assert_eq!(
            decoded,
            Value::Union {
                discriminator: Box::new(Value::Enum { ordinal: 1, name: "GREEN".into() }),
                member: Box::new(Value::Long(42)),
            }
        );
    }

    #[test]
    fn any_self_description_round_trips() {
        let tc = TypeCode::primitive(TCKind::Any);
        let value = Value::Any(Box::new(TypeCode::primitive(TCKind::Long)), Box::new(Value::Long(99)));
        assert_eq!(round_trip(&tc, &value), value);
    }

    #[test]
    fn any_infers_typecode_for_raw_value() {
        let tc = TypeCode::primitive(TCKind::Any);
        let mut out = CdrOutput::new(Endian::Big);
        encode(&mut out, &Value::Long(5), &tc).unwrap();
        let bytes = out.into_bytes();
        let mut input = CdrInput::new(&bytes, Endian::Big);
        let decoded = decode(&mut input, &tc).unwrap();
        assert_eq!(
            decoded,
            Value::Any(Box::new(TypeCode::primitive(TCKind::Long)), Box::new(Value::Long(5)))
        );
    }

    #[test]
    fn valuetype_round_trip_with_inheritance() {
        let base = TypeCode::create_value_tc(
            "IDL:Base:1.0",
            "Base",
            0,
            None,
            vec![("b".into(), TypeCode::primitive(TCKind::Long), 1)],
        );
        let derived = TypeCode::create_value_tc(
            "IDL:Derived:1.0",
            "Derived",
            0,
            Some(base),
            vec![("d".into(), TypeCode::primitive(TCKind::Short), 1)],
        );
        let value = Value::Value {
            repository_id: "IDL:Derived:1.0".into(),
            members: vec![("b".into(), Value::Long(1)), ("d".into(), Value::Short(2))],
        };
        assert_eq!(round_trip(&derived, &value), value);
    }

    #[test]
    fn null_valuetype_round_trips() {
        let tc = TypeCode::create_value_tc("IDL:V:1.0", "V", 0, None, vec![]);
        assert_eq!(round_trip(&tc, &Value::Null), Value::Null);
    }

    #[test]
    fn objref_round_trips_nil_and_present() {
        let tc = TypeCode::create_interface_tc("IDL:Foo:1.0", "Foo");
        assert_eq!(round_trip(&tc, &Value::ObjectRef(None)), Value::ObjectRef(None));
        let ior = Ior::create_simple("IDL:Foo:1.0", "host", 1, vec![1]);
        let value = Value::ObjectRef(Some(Box::new(ior)));
        assert_eq!(round_trip(&tc, &value), value);
    }
}
