//! GIOP 1.0/1.1/1.2 message framing: header, per-type bodies, fragmentation. This
//! module has no I/O of its own — it turns a byte slice into a
//! [`GiopMessage`] and back; the connection/pool layers in [`crate::sync`] and
//! [`crate::a_sync`] own the sockets.

mod header;
mod locate;
mod message;
mod reply;
mod request;
mod service_context;

pub use header::{GiopHeader, GiopVersion, MessageType, GIOP_HEADER_LEN, GIOP_MAGIC};
pub use locate::LocateStatus;
pub use message::{decode_message, encode_message, GiopMessage};
pub use reply::ReplyStatus;
pub use request::{ResponseFlags, TargetAddress};
pub use service_context::{ServiceContext, SVC_CODE_SETS};
