//! `fma-nfs`: a user-space client library for the NFS family of ONC-RPC
//! protocols (port mapper, MOUNT, NFSv3, NLM, NFSv4). See `SPEC_FULL.md`
//! for the full design; module doc comments below point at the
//! corresponding section.
//!
//! The crate is organized around the six core components: the byte
//! buffer/XDR codec (`buffer`, `packet`, `xdr`), the RPC framing and
//! header codec (`rpc`), the per-endpoint `connection` layer, the single
//! reactor thread in `manager`, the port-mapper-driven `group` registry,
//! and the NFSv4 compound engine (`nfs4`). `mount`, `nfs3`, `nlm` and
//! `portmap` are the external-collaborator procedure sets built on top of
//! that core.

pub mod attr;
pub mod buffer;
pub mod connection;
pub mod error;
pub mod group;
pub mod handle;
pub mod manager;
pub mod mount;
pub mod nfs3;
pub mod nfs4;
pub mod nlm;
pub mod packet;
pub mod portmap;
pub mod rpc;
pub mod transport;
pub mod xdr;

pub use attr::{NfsAttr, NfsFileType};
pub use error::{NfsError, NfsResult, RpcError, RpcResult};
pub use group::{ConnectionGroup, GroupKey, ServiceType};
pub use handle::NfsFileHandle;
pub use transport::Transport;
