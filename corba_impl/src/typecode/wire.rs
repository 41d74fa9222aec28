//! Wire encoding of TypeCode descriptors themselves.
//!
//! A TypeCode is `ulong kind` optionally followed by parameters: none for true
//! primitives, inline for string/wstring/fixed, or an encapsulation for every
//! structured kind.

use crate::cdr::{CdrInput, CdrOutput, Endian};
use crate::error::{CorbaError, CorbaResult};
use crate::typecode::{Member, TCKind, TypeCode};
use crate::value::Value;

pub fn encode_typecode(out: &mut CdrOutput, tc: &TypeCode) -> CorbaResult<()> {
    out.write_ulong(tc.kind() as u32);
    match tc.kind() {
        TCKind::String | TCKind::WString => {
            out.write_ulong(tc.length()?);
        }
        TCKind::Fixed => {
            out.write_ushort(tc.fixed_digits()?);
            out.write_short(tc.fixed_scale()?);
        }
        TCKind::ObjRef
        | TCKind::AbstractInterface
        | TCKind::LocalInterface
        | TCKind::Component
        | TCKind::Home => {
            let mut enc = CdrOutput::new_encapsulation(out.endian());
            enc.write_string(tc.id()?)?;
            enc.write_string(tc.name()?)?;
            out.write_encapsulation(&enc.into_bytes());
        }
        TCKind::Struct | TCKind::Except => {
            let mut enc = CdrOutput::new_encapsulation(out.endian());
            enc.write_string(tc.id()?)?;
            enc.write_string(tc.name()?)?;
            let count = tc.member_count()?;
            enc.write_ulong(count as u32);
            for i in 0..count {
                enc.write_string(tc.member_name(i)?)?;
                encode_typecode(&mut enc, tc.member_type(i)?)?;
            }
            out.write_encapsulation(&enc.into_bytes());
        }
        TCKind::Union => {
            let mut enc = CdrOutput::new_encapsulation(out.endian());
            enc.write_string(tc.id()?)?;
            enc.write_string(tc.name()?)?;
            encode_typecode(&mut enc, tc.discriminator_type()?)?;
            enc.write_long(tc.default_index()?);
            let count = tc.member_count()?;
            enc.write_ulong(count as u32);
            let disc_kind = tc.discriminator_type()?.kind();
            for i in 0..count {
                write_label(&mut enc, tc.member_label(i)?, disc_kind)?;
                enc.write_string(tc.member_name(i)?)?;
                encode_typecode(&mut enc, tc.member_type(i)?)?;
            }
            out.write_encapsulation(&enc.into_bytes());
        }
        TCKind::Enum => {
            let mut enc = CdrOutput::new_encapsulation(out.endian());
            enc.write_string(tc.id()?)?;
            enc.write_string(tc.name()?)?;
            let count = tc.member_count()?;
            enc.write_ulong(count as u32);
            for i in 0..count {
                enc.write_string(tc.member_name(i)?)?;
            }
            out.write_encapsulation(&enc.into_bytes());
        }
        TCKind::Sequence | TCKind::Array => {
            let mut enc = CdrOutput::new_encapsulation(out.endian());
            encode_typecode(&mut enc, tc.content_type()?)?;
            enc.write_ulong(tc.length()?);
            out.write_encapsulation(&enc.into_bytes());
        }
        TCKind::Alias | TCKind::ValueBox => {
            let mut enc = CdrOutput::new_encapsulation(out.endian());
            enc.write_string(tc.id()?)?;
            enc.write_string(tc.name()?)?;
            encode_typecode(&mut enc, tc.content_type()?)?;
            out.write_encapsulation(&enc.into_bytes());
        }
        TCKind::Value | TCKind::Event => {
            let mut enc = CdrOutput::new_encapsulation(out.endian());
            enc.write_string(tc.id()?)?;
            enc.write_string(tc.name()?)?;
            enc.write_short(tc.type_modifier()?);
            match tc.concrete_base_type()? {
                Some(base) => encode_typecode(&mut enc, base)?,
                None => enc.write_ulong(TCKind::Null as u32),
            }
            let count = tc.member_count()?;
            enc.write_ulong(count as u32);
            for i in 0..count {
                enc.write_string(tc.member_name(i)?)?;
                encode_typecode(&mut enc, tc.member_type(i)?)?;
                enc.write_short(tc.member_visibility(i)?);
            }
            out.write_encapsulation(&enc.into_bytes());
        }
        // true primitives: no parameters
        _ => {}
    }
    Ok(())
}

pub fn decode_typecode(input: &mut CdrInput) -> CorbaResult<TypeCode> {
    let kind = TCKind::from_i32(input.read_ulong()? as i32)?;
    let tc = match kind {
        TCKind::String => TypeCode::create_string_tc(input.read_ulong()?),
        TCKind::WString => TypeCode::create_wstring_tc(input.read_ulong()?),
        TCKind::Fixed => {
            let digits = input.read_ushort()?;
            let scale = input.read_short()?;
            TypeCode::create_fixed_tc(digits, scale)
        }
        TCKind::ObjRef
        | TCKind::AbstractInterface
        | TCKind::LocalInterface
        | TCKind::Component
        | TCKind::Home => {
            let mut enc = input.read_encapsulation()?;
            let id = enc.read_string()?;
            let name = enc.read_string()?;
            let mut tc = TypeCode::create_interface_tc(id, name);
            tc.set_kind_for_decode(kind);
            tc
        }
        TCKind::Struct | TCKind::Except => {
            let mut enc = input.read_encapsulation()?;
            let id = enc.read_string()?;
            let name = enc.read_string()?;
            let count = enc.read_ulong()?;
            let mut members = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let member_name = enc.read_string()?;
                let member_type = decode_typecode(&mut enc)?;
                members.push((member_name, member_type));
            }
            if kind == TCKind::Except {
                TypeCode::create_exception_tc(id, name, members)
            } else {
                TypeCode::create_struct_tc(id, name, members)
            }
        }
        TCKind::Union => {
            let mut enc = input.read_encapsulation()?;
            let id = enc.read_string()?;
            let name = enc.read_string()?;
            let discriminator_type = decode_typecode(&mut enc)?;
            let default_index = enc.read_long()?;
            let count = enc.read_ulong()?;
            let disc_kind = discriminator_type.kind();
            let mut members = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let label = read_label(&mut enc, disc_kind)?;
                let member_name = enc.read_string()?;
                let member_type = decode_typecode(&mut enc)?;
                members.push((label, member_name, member_type));
            }
            TypeCode::create_union_tc(id, name, discriminator_type, default_index, members)
        }
        TCKind::Enum => {
            let mut enc = input.read_encapsulation()?;
            let id = enc.read_string()?;
            let name = enc.read_string()?;
            let count = enc.read_ulong()?;
            let mut names = Vec::with_capacity(count as usize);
            for _ in 0..count {
                names.push(enc.read_string()?);
            }
            TypeCode::create_enum_tc(id, name, names)
        }
        TCKind::Sequence | TCKind::Array => {
            let mut enc = input.read_encapsulation()?;
            let content_type = decode_typecode(&mut enc)?;
            let bound = enc.read_ulong()?;
            if kind == TCKind::Array {
                TypeCode::create_array_tc(bound, content_type)
            } else {
                TypeCode::create_sequence_tc(bound, content_type)
            }
        }
        TCKind::Alias | TCKind::ValueBox => {
            let mut enc = input.read_encapsulation()?;
            let id = enc.read_string()?;
            let name = enc.read_string()?;
            let content_type = decode_typecode(&mut enc)?;
            if kind == TCKind::ValueBox {
                TypeCode::create_value_box_tc(id, name, content_type)
            } else {
                TypeCode::create_alias_tc(id, name, content_type)
            }
        }
        TCKind::Value | TCKind::Event => {
            let mut enc = input.read_encapsulation()?;
            let id = enc.read_string()?;
            let name = enc.read_string()?;
            let type_modifier = enc.read_short()?;
            let mark = enc.position();
            let maybe_null = enc.read_ulong()?;
            let concrete_base = if maybe_null == TCKind::Null as u32 {
                None
            } else {
                enc.reset(mark);
                Some(decode_typecode(&mut enc)?)
            };
            let count = enc.read_ulong()?;
            let mut members = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let member_name = enc.read_string()?;
                let member_type = decode_typecode(&mut enc)?;
                let visibility = enc.read_short()?;
                members.push((member_name, member_type, visibility));
            }
            TypeCode::create_value_tc(id, name, type_modifier, concrete_base, members)
        }
        other if other.is_primitive() => TypeCode::primitive(other),
        other => {
            return Err(CorbaError::no_implement(format!(
                "TypeCode kind {other:?} has no decoder"
            )))
        }
    };
    Ok(tc)
}

fn write_label(out: &mut CdrOutput, label: &Value, disc_kind: TCKind) -> CorbaResult<()> {
    match disc_kind {
        TCKind::Short => out.write_short(label.as_i64().unwrap_or_default() as i16),
        TCKind::Long => out.write_long(label.as_i64().unwrap_or_default() as i32),
        TCKind::UShort => out.write_ushort(label.as_i64().unwrap_or_default() as u16),
        TCKind::ULong | TCKind::Enum => out.write_ulong(label.as_i64().unwrap_or_default() as u32),
        TCKind::Boolean => out.write_boolean(matches!(label, Value::Boolean(true))),
        TCKind::Char => out.write_char(match label {
            Value::Char(c) => *c,
            _ => 0,
        }),
        TCKind::LongLong => out.write_longlong(label.as_i64().unwrap_or_default()),
        other => {
            return Err(CorbaError::no_implement(format!(
                "union discriminator kind {other:?} is not supported"
            )))
        }
    }
    Ok(())
}

fn read_label(input: &mut CdrInput, disc_kind: TCKind) -> CorbaResult<Value> {
    Ok(match disc_kind {
        TCKind::Short => Value::Short(input.read_short()?),
        TCKind::Long => Value::Long(input.read_long()?),
        TCKind::UShort => Value::UShort(input.read_ushort()?),
        TCKind::ULong => Value::ULong(input.read_ulong()?),
        TCKind::Enum => Value::ULong(input.read_ulong()?),
        TCKind::Boolean => Value::Boolean(input.read_boolean()?),
        TCKind::Char => Value::Char(input.read_char()?),
        TCKind::LongLong => Value::LongLong(input.read_longlong()?),
        other => {
            return Err(CorbaError::no_implement(format!(
                "union discriminator kind {other:?} is not supported"
            )))
        }
    })
}

impl TypeCode {
    /// Interface-family TypeCodes (`objref`/`abstract_interface`/`local_interface`/
    /// `component`/`home`) share wire layout (id, name); this retags a freshly built
    /// `objref` TypeCode to the kind actually read off the wire.
    fn set_kind_for_decode(&mut self, kind: TCKind) {
        self.kind = kind;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdr::Endian;

    fn round_trip(tc: &TypeCode) -> TypeCode {
        let mut out = CdrOutput::new(Endian::Big);
        encode_typecode(&mut out, tc).unwrap();
        let bytes = out.into_bytes();
        let mut input = CdrInput::new(&bytes, Endian::Big);
        decode_typecode(&mut input).unwrap()
    }

    #[test]
    fn primitive_round_trip() {
        let tc = TypeCode::primitive(TCKind::Long);
        assert_eq!(round_trip(&tc), tc);
    }

    #[test]
    fn string_round_trip() {
        let tc = TypeCode::create_string_tc(42);
        assert_eq!(round_trip(&tc), tc);
    }

    #[test]
    fn struct_round_trip_nested() {
        let inner = TypeCode::create_struct_tc(
            "IDL:Inner:1.0",
            "Inner",
            vec![("a".into(), TypeCode::primitive(TCKind::Long))],
        );
        let outer = TypeCode::create_struct_tc(
            "IDL:Outer:1.0",
            "Outer",
            vec![
                ("x".into(), TypeCode::primitive(TCKind::Short)),
                ("inner".into(), inner),
            ],
        );
        assert_eq!(round_trip(&outer), outer);
    }

    #[test]
    fn sequence_round_trip() {
        let tc = TypeCode::create_sequence_tc(0, TypeCode::primitive(TCKind::Octet));
        assert_eq!(round_trip(&tc), tc);
    }

    #[test]
    fn enum_round_trip() {
        let tc = TypeCode::create_enum_tc(
            "IDL:Color:1.0",
            "Color",
            vec!["RED".into(), "GREEN".into(), "BLUE".into()],
        );
        assert_eq!(round_trip(&tc), tc);
    }

    #[test]
    fn union_round_trip() {
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
        assert_eq!(round_trip(&tc), tc);
    }

    #[test]
    fn value_round_trip_with_concrete_base() {
        let base = TypeCode::create_value_tc("IDL:Base:1.0", "Base", 0, None, vec![]);
        let tc = TypeCode::create_value_tc(
            "IDL:Derived:1.0",
            "Derived",
            0,
            Some(base),
            vec![("x".into(), TypeCode::primitive(TCKind::Long), 1)],
        );
        assert_eq!(round_trip(&tc), tc);
    }
}
