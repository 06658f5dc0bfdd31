//! `ResponderSlot` — a single-shot rendezvous between a caller blocked in
//! `send_and_wait` and the Connection Manager thread that eventually
//! matches a reply to its XID (spec §3, invariant P4). `PendingTable` is
//! the per-connection map from XID to slot (spec §4.3).

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};

use crate::packet::Packet;
use crate::rpc::header::ReplyHeader;

/// A matched reply: the decoded RPC reply header (accepted/denied status)
/// plus the packet positioned just past it, ready for a `RemoteCall` to
/// decode its procedure-specific result.
#[derive(Debug)]
pub struct RpcReply {
    pub header: ReplyHeader,
    pub body: Packet,
}

#[derive(Debug)]
enum Slot {
    Waiting,
    Replied(RpcReply),
    /// Signalled with no reply: timeout, disconnect, or manager teardown.
    None,
}

#[derive(Debug)]
pub struct ResponderSlot {
    state: Mutex<Slot>,
    cv: Condvar,
}

#[derive(Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    Replied,
    SignalledNone,
    TimedOut,
}

impl ResponderSlot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(Slot::Waiting),
            cv: Condvar::new(),
        })
    }

    /// Signals the slot exactly once; subsequent calls are no-ops
    /// (invariant P4). Called only by the Manager thread.
    pub fn signal(&self, reply: Option<RpcReply>) {
        let mut state = self.state.lock();
        if !matches!(*state, Slot::Waiting) {
            return;
        }
        *state = match reply {
            Some(pkt) => Slot::Replied(pkt),
            None => Slot::None,
        };
        self.cv.notify_all();
    }

    /// Blocks the caller until signalled or `timeout` elapses. Returns the
    /// reply (taking it out of the slot) alongside the outcome.
    pub fn wait(&self, timeout: Duration) -> (WaitOutcome, Option<RpcReply>) {
        let mut state = self.state.lock();
        if matches!(*state, Slot::Waiting) {
            let result = self.cv.wait_for(&mut state, timeout);
            if result.timed_out() && matches!(*state, Slot::Waiting) {
                return (WaitOutcome::TimedOut, None);
            }
        }
        match std::mem::replace(&mut *state, Slot::None) {
            Slot::Replied(pkt) => (WaitOutcome::Replied, Some(pkt)),
            Slot::None => (WaitOutcome::SignalledNone, None),
            Slot::Waiting => (WaitOutcome::TimedOut, None),
        }
    }
}

/// Per-connection table mapping XID to the Responder awaiting its reply.
#[derive(Debug, Default)]
pub struct PendingTable {
    inner: DashMap<u32, Arc<ResponderSlot>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    /// Registers a new Responder under `xid`. Fails if `xid` is already
    /// pending on this connection (spec §4.3: duplicate XIDs fail).
    pub fn register(&self, xid: u32) -> Result<Arc<ResponderSlot>, ()> {
        use dashmap::mapref::entry::Entry;
        match self.inner.entry(xid) {
            Entry::Occupied(_) => Err(()),
            Entry::Vacant(v) => {
                let slot = ResponderSlot::new();
                v.insert(slot.clone());
                Ok(slot)
            }
        }
    }

    pub fn remove(&self, xid: u32) {
        self.inner.remove(&xid);
    }

    /// Matches a decoded reply's XID against the table and signals the
    /// corresponding Responder, if any. Unmatched replies are discarded
    /// by the caller with a warning (spec §4.3).
    pub fn deliver(&self, xid: u32, reply: RpcReply) -> bool {
        if let Some((_, slot)) = self.inner.remove(&xid) {
            slot.signal(Some(reply));
            true
        } else {
            false
        }
    }

    /// Signals every outstanding Responder with `none` (spec §4.3's
    /// "cleanup" step on `disconnect()` / teardown), draining the table.
    pub fn cleanup(&self) {
        self.inner.retain(|_, slot| {
            slot.signal(None);
            false
        });
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::header::{AcceptedStatus, ReplyStatus};
    use std::time::Duration;

    fn dummy_reply(xid: u32, body: Vec<u8>) -> RpcReply {
        RpcReply {
            header: ReplyHeader {
                xid,
                status: ReplyStatus::Accepted(AcceptedStatus::Success),
            },
            body: Packet::from_bytes(body),
        }
    }

    #[test]
    fn signal_is_idempotent() {
        let slot = ResponderSlot::new();
        slot.signal(Some(dummy_reply(1, vec![1, 2, 3])));
        slot.signal(Some(dummy_reply(1, vec![9, 9, 9])));
        let (outcome, reply) = slot.wait(Duration::from_millis(10));
        assert_eq!(outcome, WaitOutcome::Replied);
        assert_eq!(reply.unwrap().body.as_bytes(), &[1, 2, 3]);
    }

    #[test]
    fn wait_times_out_when_unsignalled() {
        let slot = ResponderSlot::new();
        let (outcome, reply) = slot.wait(Duration::from_millis(20));
        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert!(reply.is_none());
    }

    #[test]
    fn duplicate_xid_registration_fails() {
        let table = PendingTable::new();
        table.register(7).unwrap();
        assert!(table.register(7).is_err());
    }

    #[test]
    fn deliver_matches_by_xid_and_empties_table() {
        let table = PendingTable::new();
        let slot = table.register(99).unwrap();
        assert!(table.deliver(99, dummy_reply(99, vec![5])));
        let (outcome, _) = slot.wait(Duration::from_millis(10));
        assert_eq!(outcome, WaitOutcome::Replied);
        assert!(table.is_empty());
    }

    #[test]
    fn cleanup_signals_all_outstanding_with_none() {
        let table = PendingTable::new();
        let a = table.register(1).unwrap();
        let b = table.register(2).unwrap();
        table.cleanup();
        assert_eq!(a.wait(Duration::from_millis(10)).0, WaitOutcome::SignalledNone);
        assert_eq!(b.wait(Duration::from_millis(10)).0, WaitOutcome::SignalledNone);
        assert!(table.is_empty());
    }
}
