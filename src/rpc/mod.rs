//! RPC framing and header codec (spec §4.2): call/reply headers, the
//! AUTH_UNIX credential, the per-connection XID generator, and the
//! `RemoteCall` trait every procedure implements.

pub mod call;
pub mod header;
pub mod xid;

pub use call::{build_request, build_request_with_xid, RemoteCall};
pub use header::{AcceptedStatus, AuthUnixCredential, ReplyHeader, ReplyStatus};
pub use xid::XidGenerator;
