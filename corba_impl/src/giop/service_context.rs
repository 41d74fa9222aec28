use crate::cdr::{CdrInput, CdrOutput, CodeSets};
use crate::error::CorbaResult;
use crate::ior::CodeSetsComponent;

/// Service context id for the CodeSets negotiation context.
pub const SVC_CODE_SETS: u32 = 1;

/// One `{id, data}` entry in a GIOP service-context list. `data` is an opaque
/// encapsulation whose interpretation depends on `id`; only `SVC_CODE_SETS` is
/// given first-class treatment elsewhere (see `crate::ior::CodeSetsComponent`,
/// reused here since the on-wire shape of a CodeSets service context matches the
/// CodeSets tagged component).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceContext {
    pub context_id: u32,
    pub context_data: Vec<u8>,
}

impl ServiceContext {
    pub fn new(context_id: u32, context_data: Vec<u8>) -> Self {
        Self {
            context_id,
            context_data,
        }
    }

    pub fn write_list(out: &mut CdrOutput, contexts: &[ServiceContext]) -> CorbaResult<()> {
        out.write_ulong(contexts.len() as u32);
        for ctx in contexts {
            out.write_ulong(ctx.context_id);
            out.write_octet_sequence(&ctx.context_data);
        }
        Ok(())
    }

    pub fn read_list(input: &mut CdrInput) -> CorbaResult<Vec<ServiceContext>> {
        let count = input.read_ulong()?;
        let mut contexts = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let context_id = input.read_ulong()?;
            let context_data = input.read_octet_sequence()?.to_vec();
            contexts.push(ServiceContext::new(context_id, context_data));
        }
        Ok(contexts)
    }

    pub fn find(contexts: &[ServiceContext], id: u32) -> Option<&ServiceContext> {
        contexts.iter().find(|c| c.context_id == id)
    }

    /// Builds the CodeSets service context a client's first Request (or a server's
    /// reply threading the negotiated pair back) carries. Reuses
    /// [`CodeSetsComponent`]'s wire encoding since the on-wire shape is identical.
    pub fn from_codesets(codesets: CodeSets) -> ServiceContext {
        let component = CodeSetsComponent::new(codesets.char_codeset, codesets.wchar_codeset);
        ServiceContext::new(SVC_CODE_SETS, component.encode())
    }

    /// Extracts a negotiated `{char, wchar}` pair from a service-context list, if a
    /// `SVC_CODE_SETS` entry is present and well-formed.
    pub fn codesets_from_list(contexts: &[ServiceContext]) -> Option<CodeSets> {
        let ctx = Self::find(contexts, SVC_CODE_SETS)?;
        let component = CodeSetsComponent::decode(&ctx.context_data).ok()?;
        Some(CodeSets::new(
            component.native_char_codeset,
            component.native_wchar_codeset,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdr::Endian;

    #[test]
    fn service_context_list_round_trip() {
        let contexts = vec![
            ServiceContext::new(SVC_CODE_SETS, vec![1, 2, 3]),
            ServiceContext::new(42, vec![]),
        ];
        let mut out = CdrOutput::new(Endian::Big);
        ServiceContext::write_list(&mut out, &contexts).unwrap();
        let bytes = out.into_bytes();
        let mut input = CdrInput::new(&bytes, Endian::Big);
        let decoded = ServiceContext::read_list(&mut input).unwrap();
        assert_eq!(decoded, contexts);
        assert!(ServiceContext::find(&decoded, SVC_CODE_SETS).is_some());
        assert!(ServiceContext::find(&decoded, 999).is_none());
    }

    #[test]
    fn codesets_round_trip_through_service_context() {
        let codesets = CodeSets::new(crate::NATIVE_CHAR_CODESET, crate::DEFAULT_WCHAR_CODESET);
        let ctx = ServiceContext::from_codesets(codesets);
        assert_eq!(ctx.context_id, SVC_CODE_SETS);
        let decoded = ServiceContext::codesets_from_list(&[ctx]).unwrap();
        assert_eq!(decoded, codesets);
    }
}
