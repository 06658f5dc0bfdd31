//! The three error taxonomies named in the design: RPC-layer failures,
//! protocol-layer (v3/v4/NLM/MOUNT) status codes, and internal failures.

use std::io;
use thiserror::Error;

/// RPC-layer status, returned as the primary result of `send_and_wait`.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("cannot encode call arguments")]
    CantEncodeArgs,
    #[error("cannot decode call results")]
    CantDecodeRes,
    #[error("cannot receive reply")]
    CantRecv,
    #[error("rpc call timed out")]
    TimedOut,
    #[error("rpc system error: {0}")]
    SystemError(#[from] io::Error),
    #[error("rpc call was rejected by the server")]
    Rejected,
    #[error("duplicate xid {0} already pending on this connection")]
    DuplicateXid(u32),
}

pub type RpcResult<T> = Result<T, RpcError>;

/// Protocol-layer / internal error, carried alongside a message.
#[derive(Debug, Error)]
pub enum NfsError {
    #[error("nfsv3 error: {0:?}")]
    V3(crate::nfs3::types::nfsstat3),
    #[error("nfsv4 error: {0:?}")]
    V4(crate::nfs4::attr::nfsstat4),
    #[error("internal error: {0}")]
    Internal(String),
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl NfsError {
    pub fn internal(msg: impl Into<String>) -> Self {
        NfsError::Internal(msg.into())
    }
}

pub type NfsResult<T> = Result<T, NfsError>;
