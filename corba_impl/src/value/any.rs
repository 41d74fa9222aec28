//! TypeCode inference for values encoded through an `Any` slot with no explicit type.
//!
//! An arbitrary record with no recognizable primitive shape is refused outright
//! rather than downgraded to a string.

use crate::error::{CorbaError, CorbaResult};
use crate::typecode::{TCKind, TypeCode};
use crate::value::Value;

/// Wraps a raw (non-`Any`) value into `Value::Any(inferred, value)`. Passing an
/// already-`Any` value returns it unchanged.
pub fn wrap_any(value: Value) -> CorbaResult<Value> {
    if let Value::Any(_, _) = value {
        return Ok(value);
    }
    let tc = infer_typecode(&value)?;
    Ok(Value::Any(Box::new(tc), Box::new(value)))
}

/// Infers a TypeCode from a raw value.
pub fn infer_typecode(value: &Value) -> CorbaResult<TypeCode> {
    Ok(match value {
        Value::Null => TypeCode::primitive(TCKind::Null),
        Value::Boolean(_) => TypeCode::primitive(TCKind::Boolean),
        Value::Octet(_) => TypeCode::primitive(TCKind::Octet),
        Value::Short(_) => TypeCode::primitive(TCKind::Short),
        Value::UShort(_) => TypeCode::primitive(TCKind::UShort),
        Value::Long(_) => TypeCode::primitive(TCKind::Long),
        Value::ULong(_) => TypeCode::primitive(TCKind::ULong),
        Value::LongLong(_) => TypeCode::primitive(TCKind::LongLong),
        Value::ULongLong(_) => TypeCode::primitive(TCKind::ULongLong),
        Value::Float(_) => TypeCode::primitive(TCKind::Float),
        Value::Double(_) => TypeCode::primitive(TCKind::Double),
        Value::Char(_) => TypeCode::primitive(TCKind::Char),
        Value::WChar(_) => TypeCode::primitive(TCKind::WChar),
        Value::String(_) => TypeCode::create_string_tc(0),
        Value::WString(_) => TypeCode::create_wstring_tc(0),
        Value::Sequence(items) => TypeCode::create_sequence_tc(0, infer_sequence_content(items)?),
        Value::ObjectRef(ior) => TypeCode::create_interface_tc(
            ior.as_ref().map_or_else(String::new, |i| i.type_id.clone()),
            "",
        ),
        other => {
            return Err(CorbaError::marshal(format!(
                "cannot infer a TypeCode for {other:?} through an Any slot without an explicit type"
            )))
        }
    })
}

/// The element type inferred from a sequence's first element; `any` if the sequence
/// is empty or its elements don't all infer to the same TypeCode.
fn infer_sequence_content(items: &[Value]) -> CorbaResult<TypeCode> {
    let Some(first) = items.first() else {
        return Ok(TypeCode::primitive(TCKind::Any));
    };
    let first_tc = infer_typecode(first)?;
    for item in &items[1..] {
        if infer_typecode(item)? != first_tc {
            return Ok(TypeCode::primitive(TCKind::Any));
        }
    }
    Ok(first_tc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_primitive_kinds() {
        assert_eq!(
            infer_typecode(&Value::Long(42)).unwrap(),
            TypeCode::primitive(TCKind::Long)
        );
        assert_eq!(
            infer_typecode(&Value::Double(1.5)).unwrap(),
            TypeCode::primitive(TCKind::Double)
        );
        assert_eq!(
            infer_typecode(&Value::String("hi".into())).unwrap(),
            TypeCode::create_string_tc(0)
        );
    }

    #[test]
    fn infers_uniform_sequence_element_type() {
        let seq = Value::Sequence(vec![Value::Long(1), Value::Long(2)]);
        let tc = infer_typecode(&seq).unwrap();
        assert_eq!(tc.content_type().unwrap(), &TypeCode::primitive(TCKind::Long));
    }

    #[test]
    fn mixed_sequence_infers_any_content() {
        let seq = Value::Sequence(vec![Value::Long(1), Value::String("x".into())]);
        let tc = infer_typecode(&seq).unwrap();
        assert_eq!(tc.content_type().unwrap(), &TypeCode::primitive(TCKind::Any));
    }

    #[test]
    fn empty_sequence_infers_any_content() {
        let tc = infer_typecode(&Value::Sequence(vec![])).unwrap();
        assert_eq!(tc.content_type().unwrap(), &TypeCode::primitive(TCKind::Any));
    }

    #[test]
    fn unrecognized_record_fails_rather_than_stringifying() {
        let s = Value::Struct(vec![("x".into(), Value::Long(1))]);
        assert!(infer_typecode(&s).is_err());
    }

    #[test]
    fn wrap_any_is_idempotent_on_existing_any() {
        let inner = Value::Any(Box::new(TypeCode::primitive(TCKind::Long)), Box::new(Value::Long(1)));
        let wrapped = wrap_any(inner.clone()).unwrap();
        assert_eq!(wrapped, inner);
    }
}
