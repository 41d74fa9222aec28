//! Shared implementation of the `corba` and `corba_async` facade crates.
//!
//! Not meant for direct consumption: depend on `corba` (blocking) or `corba_async`
//! (`tokio`-based) instead. This crate carries the CDR codec, the TypeCode model, the
//! TypeCode-driven value codec, IOR/addressing, and the GIOP message layer. The
//! connection/transport layer is feature-gated; everything below it is not, since it
//! performs no I/O of its own.

#![deny(missing_debug_implementations)]
#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

#[cfg(not(any(feature = "sync", feature = "async")))]
compile_error!("corba_impl requires at least one of the `sync` or `async` features");

pub mod cdr;
pub mod config;
pub mod error;
pub mod giop;
pub mod ior;
pub mod stats;
pub mod typecode;
pub mod value;

#[cfg(feature = "sync")]
pub mod sync;

#[cfg(feature = "async")]
pub mod a_sync;

pub use error::{CompletionStatus, CorbaError, CorbaResult, SystemException};

/// Default char code set advertised/assumed before negotiation: ISO-8859-1.
pub const DEFAULT_CHAR_CODESET: u32 = 0x0001_0001;
/// Default wchar code set advertised/assumed before negotiation: UTF-16.
pub const DEFAULT_WCHAR_CODESET: u32 = 0x0001_0109;
/// Char code set this runtime advertises in its own CodeSets component: UTF-8.
pub const NATIVE_CHAR_CODESET: u32 = 0x0501_0001;

/// Tagged profile id of an IIOP profile inside an IOR, per the CORBA spec.
pub const TAG_INTERNET_IOP: u32 = 0;
/// Tagged component id of the CodeSets component.
pub const TAG_CODE_SETS: u32 = 1;
/// Tagged component id of the ORBType component.
pub const TAG_ORB_TYPE: u32 = 0;
/// Tagged component id of the SSL/TLS security component (SSLIOP).
pub const TAG_SSL_SEC_TRANS: u32 = 20;

/// Non-standard profile id used by the `rir` corbaloc protocol handler to mark a
/// reference whose resolution is deferred to the caller's initial-references
/// table rather than carried in the profile itself.
pub const TAG_RIR_MARKER: u32 = 0xFFFF_FFFF;
