//! Structural type descriptors that drive the self-describing value codec.
//!
//! Every operation is valid only for a declared subset of [`TCKind`]s; calling it on
//! any other kind fails with [`crate::CorbaError::BadParam`].

mod wire;

pub use wire::{decode_typecode, encode_typecode};

use crate::error::{CorbaError, CorbaResult};
use crate::value::Value;

/// The fixed CORBA TypeCode kind enumeration. Discriminant values are the standard
/// `tk_*` constants so the wire-encoded `kind` ulong needs no translation table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum TCKind {
    Null = 0,
    Void = 1,
    Short = 2,
    Long = 3,
    UShort = 4,
    ULong = 5,
    Float = 6,
    Double = 7,
    Boolean = 8,
    Char = 9,
    Octet = 10,
    Any = 11,
    TypeCode = 12,
    Principal = 13,
    ObjRef = 14,
    Struct = 15,
    Union = 16,
    Enum = 17,
    String = 18,
    Sequence = 19,
    Array = 20,
    Alias = 21,
    Except = 22,
    LongLong = 23,
    ULongLong = 24,
    LongDouble = 25,
    WChar = 26,
    WString = 27,
    Fixed = 28,
    Value = 29,
    ValueBox = 30,
    Native = 31,
    AbstractInterface = 32,
    LocalInterface = 33,
    Component = 34,
    Home = 35,
    Event = 36,
}

impl TCKind {
    pub fn from_i32(v: i32) -> CorbaResult<Self> {
        use TCKind::*;
        Ok(match v {
            0 => Null,
            1 => Void,
            2 => Short,
            3 => Long,
            4 => UShort,
            5 => ULong,
            6 => Float,
            7 => Double,
            8 => Boolean,
            9 => Char,
            10 => Octet,
            11 => Any,
            12 => TypeCode,
            13 => Principal,
            14 => ObjRef,
            15 => Struct,
            16 => Union,
            17 => Enum,
            18 => String,
            19 => Sequence,
            20 => Array,
            21 => Alias,
            22 => Except,
            23 => LongLong,
            24 => ULongLong,
            25 => LongDouble,
            26 => WChar,
            27 => WString,
            28 => Fixed,
            29 => Value,
            30 => ValueBox,
            31 => Native,
            32 => AbstractInterface,
            33 => LocalInterface,
            34 => Component,
            35 => Home,
            36 => Event,
            other => {
                return Err(CorbaError::marshal(format!(
                    "unrecognized TypeCode kind {other}"
                )))
            }
        })
    }

    fn is_primitive(self) -> bool {
        matches!(
            self,
            TCKind::Null
                | TCKind::Void
                | TCKind::Short
                | TCKind::Long
                | TCKind::UShort
                | TCKind::ULong
                | TCKind::Float
                | TCKind::Double
                | TCKind::Boolean
                | TCKind::Char
                | TCKind::Octet
                | TCKind::Any
                | TCKind::TypeCode
                | TCKind::Principal
                | TCKind::LongLong
                | TCKind::ULongLong
                | TCKind::LongDouble
                | TCKind::WChar
                | TCKind::Native
                | TCKind::AbstractInterface
        )
    }
}

/// One member of a struct, union, enum (name only), or valuetype.
#[derive(Clone, Debug, PartialEq)]
pub struct Member {
    pub name: String,
    pub member_type: TypeCode,
    /// Union label; `None` for struct/enum/valuetype members.
    pub label: Option<Value>,
    /// Valuetype member visibility (`PRIVATE_MEMBER` = 0, `PUBLIC_MEMBER` = 1).
    pub visibility: Option<i16>,
}

/// A structural type descriptor.
///
/// Non-primitive kinds carry whichever subset of these attributes their wire
/// encoding defines; attributes that don't apply to `kind` stay `None`/empty and
/// any introspection call for them fails with `BAD_PARAM`.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeCode {
    kind: TCKind,
    repository_id: Option<String>,
    name: Option<String>,
    members: Vec<Member>,
    content_type: Option<Box<TypeCode>>,
    bound: Option<u32>,
    digits: Option<u16>,
    scale: Option<i16>,
    discriminator_type: Option<Box<TypeCode>>,
    default_index: Option<i32>,
    type_modifier: Option<i16>,
    concrete_base_type: Option<Box<TypeCode>>,
}

fn bad_param(op: &str, kind: TCKind) -> CorbaError {
    CorbaError::bad_param(format!("{op}() is not valid for TypeCode kind {kind:?}"))
}

impl TypeCode {
    fn bare(kind: TCKind) -> Self {
        Self {
            kind,
            repository_id: None,
            name: None,
            members: Vec::new(),
            content_type: None,
            bound: None,
            digits: None,
            scale: None,
            discriminator_type: None,
            default_index: None,
            type_modifier: None,
            concrete_base_type: None,
        }
    }

    /// A primitive TypeCode (no parameters). Panics (programmer error, not runtime
    /// data) if `kind` is not actually primitive; use the dedicated `create_*_tc`
    /// factories for structured kinds instead.
    pub fn primitive(kind: TCKind) -> Self {
        assert!(
            kind.is_primitive(),
            "TypeCode::primitive called with non-primitive kind {kind:?}"
        );
        Self::bare(kind)
    }

    pub fn create_string_tc(bound: u32) -> Self {
        let mut tc = Self::bare(TCKind::String);
        tc.bound = Some(bound);
        tc
    }

    pub fn create_wstring_tc(bound: u32) -> Self {
        let mut tc = Self::bare(TCKind::WString);
        tc.bound = Some(bound);
        tc
    }

    pub fn create_fixed_tc(digits: u16, scale: i16) -> Self {
        let mut tc = Self::bare(TCKind::Fixed);
        tc.digits = Some(digits);
        tc.scale = Some(scale);
        tc
    }

    pub fn create_sequence_tc(bound: u32, content_type: TypeCode) -> Self {
        let mut tc = Self::bare(TCKind::Sequence);
        tc.bound = Some(bound);
        tc.content_type = Some(Box::new(content_type));
        tc
    }

    pub fn create_array_tc(length: u32, content_type: TypeCode) -> Self {
        let mut tc = Self::bare(TCKind::Array);
        tc.bound = Some(length);
        tc.content_type = Some(Box::new(content_type));
        tc
    }

    pub fn create_alias_tc(
        repository_id: impl Into<String>,
        name: impl Into<String>,
        content_type: TypeCode,
    ) -> Self {
        let mut tc = Self::bare(TCKind::Alias);
        tc.repository_id = Some(repository_id.into());
        tc.name = Some(name.into());
        tc.content_type = Some(Box::new(content_type));
        tc
    }

    pub fn create_struct_tc(
        repository_id: impl Into<String>,
        name: impl Into<String>,
        members: Vec<(String, TypeCode)>,
    ) -> Self {
        Self::create_struct_like_tc(TCKind::Struct, repository_id, name, members)
    }

    pub fn create_exception_tc(
        repository_id: impl Into<String>,
        name: impl Into<String>,
        members: Vec<(String, TypeCode)>,
    ) -> Self {
        Self::create_struct_like_tc(TCKind::Except, repository_id, name, members)
    }

    fn create_struct_like_tc(
        kind: TCKind,
        repository_id: impl Into<String>,
        name: impl Into<String>,
        members: Vec<(String, TypeCode)>,
    ) -> Self {
        let mut tc = Self::bare(kind);
        tc.repository_id = Some(repository_id.into());
        tc.name = Some(name.into());
        tc.members = members
            .into_iter()
            .map(|(name, member_type)| Member {
                name,
                member_type,
                label: None,
                visibility: None,
            })
            .collect();
        tc
    }

    pub fn create_union_tc(
        repository_id: impl Into<String>,
        name: impl Into<String>,
        discriminator_type: TypeCode,
        default_index: i32,
        members: Vec<(Value, String, TypeCode)>,
    ) -> Self {
        let mut tc = Self::bare(TCKind::Union);
        tc.repository_id = Some(repository_id.into());
        tc.name = Some(name.into());
        tc.discriminator_type = Some(Box::new(discriminator_type));
        tc.default_index = Some(default_index);
        tc.members = members
            .into_iter()
            .map(|(label, name, member_type)| Member {
                name,
                member_type,
                label: Some(label),
                visibility: None,
            })
            .collect();
        tc
    }

    pub fn create_enum_tc(
        repository_id: impl Into<String>,
        name: impl Into<String>,
        member_names: Vec<String>,
    ) -> Self {
        let mut tc = Self::bare(TCKind::Enum);
        tc.repository_id = Some(repository_id.into());
        tc.name = Some(name.into());
        tc.members = member_names
            .into_iter()
            .map(|name| Member {
                name,
                member_type: TypeCode::primitive(TCKind::Void),
                label: None,
                visibility: None,
            })
            .collect();
        tc
    }

    pub fn create_value_tc(
        repository_id: impl Into<String>,
        name: impl Into<String>,
        type_modifier: i16,
        concrete_base_type: Option<TypeCode>,
        members: Vec<(String, TypeCode, i16)>,
    ) -> Self {
        let mut tc = Self::bare(TCKind::Value);
        tc.repository_id = Some(repository_id.into());
        tc.name = Some(name.into());
        tc.type_modifier = Some(type_modifier);
        tc.concrete_base_type = concrete_base_type.map(Box::new);
        tc.members = members
            .into_iter()
            .map(|(name, member_type, visibility)| Member {
                name,
                member_type,
                label: None,
                visibility: Some(visibility),
            })
            .collect();
        tc
    }

    pub fn create_value_box_tc(
        repository_id: impl Into<String>,
        name: impl Into<String>,
        content_type: TypeCode,
    ) -> Self {
        let mut tc = Self::bare(TCKind::ValueBox);
        tc.repository_id = Some(repository_id.into());
        tc.name = Some(name.into());
        tc.content_type = Some(Box::new(content_type));
        tc
    }

    pub fn create_interface_tc(repository_id: impl Into<String>, name: impl Into<String>) -> Self {
        let mut tc = Self::bare(TCKind::ObjRef);
        tc.repository_id = Some(repository_id.into());
        tc.name = Some(name.into());
        tc
    }

    // --- introspection -----------------------------------------------------

    pub fn kind(&self) -> TCKind {
        self.kind
    }

    pub fn id(&self) -> CorbaResult<&str> {
        self.repository_id
            .as_deref()
            .ok_or_else(|| bad_param("id", self.kind))
    }

    pub fn name(&self) -> CorbaResult<&str> {
        self.name.as_deref().ok_or_else(|| bad_param("name", self.kind))
    }

    pub fn member_count(&self) -> CorbaResult<usize> {
        match self.kind {
            TCKind::Struct | TCKind::Except | TCKind::Union | TCKind::Enum | TCKind::Value => {
                Ok(self.members.len())
            }
            _ => Err(bad_param("member_count", self.kind)),
        }
    }

    fn member(&self, index: usize) -> CorbaResult<&Member> {
        self.member_count()?;
        self.members
            .get(index)
            .ok_or_else(|| CorbaError::bad_param(format!("member index {index} out of bounds")))
    }

    pub fn member_name(&self, index: usize) -> CorbaResult<&str> {
        Ok(self.member(index)?.name.as_str())
    }

    pub fn member_type(&self, index: usize) -> CorbaResult<&TypeCode> {
        Ok(&self.member(index)?.member_type)
    }

    pub fn member_label(&self, index: usize) -> CorbaResult<&Value> {
        if self.kind != TCKind::Union {
            return Err(bad_param("member_label", self.kind));
        }
        self.member(index)?
            .label
            .as_ref()
            .ok_or_else(|| CorbaError::bad_param("union member has no label"))
    }

    pub fn member_visibility(&self, index: usize) -> CorbaResult<i16> {
        if self.kind != TCKind::Value {
            return Err(bad_param("member_visibility", self.kind));
        }
        self.member(index)?
            .visibility
            .ok_or_else(|| CorbaError::bad_param("value member has no visibility"))
    }

    pub fn discriminator_type(&self) -> CorbaResult<&TypeCode> {
        self.discriminator_type
            .as_deref()
            .ok_or_else(|| bad_param("discriminator_type", self.kind))
    }

    pub fn default_index(&self) -> CorbaResult<i32> {
        self.default_index
            .ok_or_else(|| bad_param("default_index", self.kind))
    }

    pub fn content_type(&self) -> CorbaResult<&TypeCode> {
        self.content_type
            .as_deref()
            .ok_or_else(|| bad_param("content_type", self.kind))
    }

    pub fn length(&self) -> CorbaResult<u32> {
        match self.kind {
            TCKind::String | TCKind::WString | TCKind::Sequence | TCKind::Array => {
                Ok(self.bound.unwrap_or(0))
            }
            _ => Err(bad_param("length", self.kind)),
        }
    }

    pub fn fixed_digits(&self) -> CorbaResult<u16> {
        self.digits.ok_or_else(|| bad_param("fixed_digits", self.kind))
    }

    pub fn fixed_scale(&self) -> CorbaResult<i16> {
        self.scale.ok_or_else(|| bad_param("fixed_scale", self.kind))
    }

    pub fn type_modifier(&self) -> CorbaResult<i16> {
        self.type_modifier
            .ok_or_else(|| bad_param("type_modifier", self.kind))
    }

    pub fn concrete_base_type(&self) -> CorbaResult<Option<&TypeCode>> {
        if self.kind != TCKind::Value {
            return Err(bad_param("concrete_base_type", self.kind));
        }
        Ok(self.concrete_base_type.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_equality_reduces_to_kind() {
        assert_eq!(TypeCode::primitive(TCKind::Long), TypeCode::primitive(TCKind::Long));
        assert_ne!(TypeCode::primitive(TCKind::Long), TypeCode::primitive(TCKind::Short));
    }

    #[test]
    fn struct_equality_is_structural() {
        let a = TypeCode::create_struct_tc(
            "IDL:A:1.0",
            "A",
            vec![("x".into(), TypeCode::primitive(TCKind::Long))],
        );
        let b = TypeCode::create_struct_tc(
            "IDL:A:1.0",
            "A",
            vec![("x".into(), TypeCode::primitive(TCKind::Long))],
        );
        let c = TypeCode::create_struct_tc(
            "IDL:A:1.0",
            "A",
            vec![("y".into(), TypeCode::primitive(TCKind::Long))],
        );
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn invalid_operation_fails_with_bad_param() {
        let tc = TypeCode::primitive(TCKind::Long);
        assert!(matches!(tc.member_count(), Err(CorbaError::BadParam(_))));
        assert!(matches!(tc.content_type(), Err(CorbaError::BadParam(_))));
    }

    #[test]
    fn member_index_is_bounds_checked() {
        let tc = TypeCode::create_struct_tc(
            "IDL:A:1.0",
            "A",
            vec![("x".into(), TypeCode::primitive(TCKind::Long))],
        );
        assert!(tc.member_name(0).is_ok());
        assert!(tc.member_name(1).is_err());
    }

    #[test]
    fn from_i32_rejects_unknown_kind() {
        assert!(TCKind::from_i32(999).is_err());
        assert_eq!(TCKind::from_i32(15).unwrap(), TCKind::Struct);
    }
}
