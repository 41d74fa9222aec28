use crate::cdr::{CdrInput, CdrOutput, Endian};
use crate::error::CorbaResult;
use crate::ior::TaggedComponent;

/// The `TAG_CODE_SETS` tagged component: native and conversion code sets for char
/// and wchar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeSetsComponent {
    pub native_char_codeset: u32,
    pub char_conversion_codesets: Vec<u32>,
    pub native_wchar_codeset: u32,
    pub wchar_conversion_codesets: Vec<u32>,
}

impl CodeSetsComponent {
    pub fn new(native_char_codeset: u32, native_wchar_codeset: u32) -> Self {
        Self {
            native_char_codeset,
            char_conversion_codesets: Vec::new(),
            native_wchar_codeset,
            wchar_conversion_codesets: Vec::new(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut enc = CdrOutput::new_encapsulation(Endian::Big);
        enc.write_ulong(self.native_char_codeset);
        enc.write_ulong(self.char_conversion_codesets.len() as u32);
        for cs in &self.char_conversion_codesets {
            enc.write_ulong(*cs);
        }
        enc.write_ulong(self.native_wchar_codeset);
        enc.write_ulong(self.wchar_conversion_codesets.len() as u32);
        for cs in &self.wchar_conversion_codesets {
            enc.write_ulong(*cs);
        }
        enc.into_bytes()
    }

    /// Decodes the standard form. Falls back to the simplified legacy form (two bare
    /// `ulong`s, no conversion-set counts) for interop with older ORBs: the standard
    /// form always has at least a `ulong` conversion-set count after
    /// the char native code set, so exactly 4 remaining bytes at that point can only
    /// be the legacy form's lone wchar native code set.
    pub fn decode(bytes: &[u8]) -> CorbaResult<Self> {
        let mut input = CdrInput::from_encapsulation(bytes)?;
        let native_char_codeset = input.read_ulong()?;
        if input.remaining() == 4 {
            return Ok(Self::new(native_char_codeset, input.read_ulong()?));
        }
        let char_conversion_codesets = read_codeset_list(&mut input)?;
        let native_wchar_codeset = input.read_ulong()?;
        let wchar_conversion_codesets = if input.is_empty() {
            Vec::new()
        } else {
            read_codeset_list(&mut input)?
        };
        Ok(Self {
            native_char_codeset,
            char_conversion_codesets,
            native_wchar_codeset,
            wchar_conversion_codesets,
        })
    }

    pub fn as_tagged_component(&self) -> TaggedComponent {
        TaggedComponent {
            component_id: crate::TAG_CODE_SETS,
            component_data: self.encode(),
        }
    }
}

fn read_codeset_list(input: &mut CdrInput) -> CorbaResult<Vec<u32>> {
    let count = input.read_ulong()?;
    let mut list = Vec::with_capacity(count as usize);
    for _ in 0..count {
        list.push(input.read_ulong()?);
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_with_conversion_sets() {
        let mut comp = CodeSetsComponent::new(crate::NATIVE_CHAR_CODESET, crate::DEFAULT_WCHAR_CODESET);
        comp.char_conversion_codesets.push(crate::DEFAULT_CHAR_CODESET);
        let bytes = comp.encode();
        let decoded = CodeSetsComponent::decode(&bytes).unwrap();
        assert_eq!(decoded, comp);
    }

    #[test]
    fn legacy_simplified_form_is_accepted() {
        let mut enc = CdrOutput::new_encapsulation(Endian::Big);
        enc.write_ulong(crate::NATIVE_CHAR_CODESET);
        enc.write_ulong(crate::DEFAULT_WCHAR_CODESET);
        let bytes = enc.into_bytes();
        let decoded = CodeSetsComponent::decode(&bytes).unwrap();
        assert_eq!(decoded.native_char_codeset, crate::NATIVE_CHAR_CODESET);
        assert_eq!(decoded.native_wchar_codeset, crate::DEFAULT_WCHAR_CODESET);
        assert!(decoded.char_conversion_codesets.is_empty());
        assert!(decoded.wchar_conversion_codesets.is_empty());
    }
}
