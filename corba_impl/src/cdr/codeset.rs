//! Negotiated code-set pair carried by a CDR stream.

use serde::{Deserialize, Serialize};

/// The char/wchar code sets a stream's string primitives encode and decode against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSets {
    pub char_codeset: u32,
    pub wchar_codeset: u32,
}

impl Default for CodeSets {
    fn default() -> Self {
        Self {
            char_codeset: crate::DEFAULT_CHAR_CODESET,
            wchar_codeset: crate::DEFAULT_WCHAR_CODESET,
        }
    }
}

impl CodeSets {
    pub fn new(char_codeset: u32, wchar_codeset: u32) -> Self {
        Self {
            char_codeset,
            wchar_codeset,
        }
    }
}
