//! Per-client NFSv4 state (spec §3/§4.6): the initial and confirmed
//! verifiers, the server-assigned clientid, the file-op and file-lock
//! seqid counters and the mutex serializing seqid-bearing compounds, and
//! the `SETCLIENTID`/`SETCLIENTID_CONFIRM` handshake. One instance per
//! `ConnectionGroup` (one NFSv4 server).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::RngCore;
use tracing::{debug, info, warn};

use crate::connection::conn::Connection;
use crate::error::{NfsError, RpcError};
use crate::nfs4::attr::nfsstat4;
use crate::nfs4::compound::{CompoundBuilder, CompoundCall, CompoundReply};
use crate::nfs4::op::{self, CompoundOp, CompoundOpResult};

/// Default lease renewal interval (spec §4.6: "12 s in this
/// implementation").
pub const DEFAULT_LEASE_SECS: u64 = 12;

pub struct Nfs4ClientState {
    initial_verifier: [u8; 8],
    client_name: String,
    confirmed_verifier: Mutex<Option<[u8; 8]>>,
    clientid: Mutex<Option<u64>>,
    file_op_seqid: Mutex<u32>,
    file_lock_seqid: Mutex<u32>,
    /// The "file-op lock" (spec §4.6): held across the *entire* compound
    /// call for any seqid-bearing operation, not just the local
    /// increment — shrinking this critical section would let two
    /// concurrent compounds observe the same seqid (violates P5).
    file_op_lock: Mutex<()>,
}

impl Nfs4ClientState {
    pub fn new() -> Arc<Self> {
        let mut verifier = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut verifier);
        Arc::new(Self {
            initial_verifier: verifier,
            client_name: format!("fma_{}", std::process::id()),
            confirmed_verifier: Mutex::new(None),
            clientid: Mutex::new(None),
            file_op_seqid: Mutex::new(0),
            file_lock_seqid: Mutex::new(0),
            file_op_lock: Mutex::new(()),
        })
    }

    pub fn clientid(&self) -> Option<u64> {
        *self.clientid.lock()
    }

    pub fn is_confirmed(&self) -> bool {
        self.clientid.lock().is_some() && self.confirmed_verifier.lock().is_some()
    }

    /// The two-compound `SETCLIENTID` / `SETCLIENTID_CONFIRM` handshake
    /// (spec §4.6, scenario S6). Idempotent once confirmed.
    pub fn handshake(&self, conn: &Connection) -> Result<(), NfsError> {
        if self.is_confirmed() {
            return Ok(());
        }

        let set = CompoundBuilder::new()
            .push(CompoundOp::SetClientId {
                verifier: self.initial_verifier,
                client_name: self.client_name.clone().into_bytes(),
            })
            .build();
        let reply: CompoundReply = conn.send_and_wait(&set, 0)?;
        let (clientid, confirm_verifier) = match reply.op_result(op::OP_SETCLIENTID) {
            Some(CompoundOpResult::SetClientId { clientid, confirm_verifier }) => (*clientid, *confirm_verifier),
            Some(CompoundOpResult::SetClientIdInUse) => {
                return Err(NfsError::internal("SETCLIENTID: client id in use by another incarnation"))
            }
            _ => return Err(NfsError::V4(reply.failing_status())),
        };
        debug!(clientid, name = %self.client_name, "SETCLIENTID accepted, confirming");

        let confirm = CompoundBuilder::new()
            .push(CompoundOp::SetClientIdConfirm { clientid, confirm_verifier })
            .build();
        let confirm_reply: CompoundReply = conn.send_and_wait(&confirm, 0)?;
        if !confirm_reply.failing_status().is_ok() {
            return Err(NfsError::V4(confirm_reply.failing_status()));
        }

        *self.clientid.lock() = Some(clientid);
        *self.confirmed_verifier.lock() = Some(confirm_verifier);
        info!(clientid, "NFSv4 client confirmed");
        Ok(())
    }

    /// Runs `build(seqid)` inside the file-op critical section and
    /// advances `file_op_seqid` per the error-class exception list in
    /// spec §4.6, used by OPEN/OPEN_CONFIRM/CLOSE.
    pub fn perform_file_op<F>(&self, conn: &Connection, build: F) -> Result<CompoundReply, RpcError>
    where
        F: FnOnce(u32) -> CompoundCall,
    {
        let _guard = self.file_op_lock.lock();
        let seqid = *self.file_op_seqid.lock();
        let call = build(seqid);
        let reply = conn.send_and_wait(&call, 0)?;
        self.advance_if_needed(&mut self.file_op_seqid.lock(), reply.failing_status());
        Ok(reply)
    }

    /// Same discipline as [`Self::perform_file_op`], for LOCK/LOCKU's
    /// separate "file lock sequence id" counter.
    pub fn perform_lock_op<F>(&self, conn: &Connection, build: F) -> Result<CompoundReply, RpcError>
    where
        F: FnOnce(u32) -> CompoundCall,
    {
        let _guard = self.file_op_lock.lock();
        let seqid = *self.file_lock_seqid.lock();
        let call = build(seqid);
        let reply = conn.send_and_wait(&call, 0)?;
        self.advance_if_needed(&mut self.file_lock_seqid.lock(), reply.failing_status());
        Ok(reply)
    }

    fn advance_if_needed(&self, seqid: &mut u32, status: nfsstat4) {
        if status.is_ok() || !status.suppresses_seqid_advance() {
            *seqid = seqid.wrapping_add(1);
        }
    }

    /// Sends a single `RENEW(clientid)` compound (spec §4.6).
    pub fn renew(&self, conn: &Connection) -> Result<(), NfsError> {
        let Some(clientid) = self.clientid() else {
            return Err(NfsError::internal("RENEW before SETCLIENTID_CONFIRM"));
        };
        let call = CompoundBuilder::new().push(CompoundOp::Renew { clientid }).build();
        let reply: CompoundReply = conn.send_and_wait(&call, 0)?;
        if !reply.failing_status().is_ok() {
            return Err(NfsError::V4(reply.failing_status()));
        }
        Ok(())
    }
}

/// A background lease-renewal ticker (spec §4.6's keep-alive mode):
/// issues `RENEW` at `lease_secs` intervals until [`RenewTicker::stop`]
/// is called or the ticker is dropped.
pub struct RenewTicker {
    stop: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl RenewTicker {
    pub fn start(state: Arc<Nfs4ClientState>, conn: Arc<Connection>, lease_secs: u64) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let thread = std::thread::Builder::new()
            .name("nfs4-renew".into())
            .spawn(move || {
                let period = Duration::from_secs(lease_secs.max(1));
                while !stop_flag.load(Ordering::Relaxed) {
                    std::thread::sleep(period);
                    if stop_flag.load(Ordering::Relaxed) {
                        break;
                    }
                    if let Err(e) = state.renew(&conn) {
                        warn!("NFSv4 RENEW failed: {e}");
                    }
                }
            })
            .expect("failed to start nfs4 renew ticker thread");
        Self { stop, thread: Some(thread) }
    }

    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

impl Drop for RenewTicker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_if_needed_skips_suppressing_statuses() {
        let state = Nfs4ClientState::new();
        let mut seqid = 5u32;
        state.advance_if_needed(&mut seqid, nfsstat4::BadSeqid);
        assert_eq!(seqid, 5);
        state.advance_if_needed(&mut seqid, nfsstat4::Ok);
        assert_eq!(seqid, 6);
        // Non-suppressing errors still consume the slot (spec §4.6).
        state.advance_if_needed(&mut seqid, nfsstat4::Access);
        assert_eq!(seqid, 7);
    }

    #[test]
    fn fresh_client_state_is_unconfirmed() {
        let state = Nfs4ClientState::new();
        assert!(!state.is_confirmed());
        assert!(state.clientid().is_none());
    }
}
