//! The per-socket connection layer (spec §4.3): framing, the pending-reply
//! table, concurrency gating and the `Connection` type itself. Socket I/O
//! is only ever performed by the Connection Manager (`crate::manager`).

pub mod conn;
pub mod fragment;
pub mod key;
pub mod pending;
pub mod semaphore;
pub mod socket_io;

pub use conn::Connection;
pub use key::ConnectionKey;
