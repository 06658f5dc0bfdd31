//! `Connection` (spec §4.3): one socket, its send queue, its pending-reply
//! table and its XID generator. All socket I/O happens on the Connection
//! Manager's reactor thread (invariant P6); every other thread only ever
//! mutates the queue/table and wakes the Manager.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use socket2::Socket;
use tracing::warn;

use crate::connection::fragment::FragmentAssembler;
use crate::connection::key::ConnectionKey;
use crate::connection::pending::{PendingTable, RpcReply, WaitOutcome};
use crate::connection::semaphore::Semaphore;
use crate::connection::socket_io;
use crate::error::RpcError;
use crate::manager::{ConnectionManager, ManagerHandle};
use crate::packet::Packet;
use crate::rpc::call::{build_request, RemoteCall};
use crate::rpc::header::{AcceptedStatus, AuthUnixCredential, ReplyStatus};
use crate::rpc::xid::XidGenerator;
use crate::transport::Transport;

/// How many times a UDP call is retransmitted before giving up
/// (spec §4.3 / §5): one initial send plus five retries.
const UDP_RETRIES: u32 = 6;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnState {
    Connecting,
    Connected,
    Closed,
}

pub enum RecvOutcome {
    WouldBlock,
    Delivered(u32),
    Closed,
    Error,
}

pub enum SendOutcome {
    Busy,
    Drained,
    Error,
}

pub struct Connection {
    id: u64,
    key: ConnectionKey,
    credential: AuthUnixCredential,
    bind_reserved_port: bool,
    socket: Mutex<Option<Socket>>,
    state: Mutex<ConnState>,
    write_queue: Mutex<VecDeque<Packet>>,
    fragments: Mutex<FragmentAssembler>,
    pending: PendingTable,
    semaphore: Semaphore,
    xid_gen: XidGenerator,
    manager: ManagerHandle,
    self_weak: Mutex<Weak<Connection>>,
}

impl Connection {
    /// Builds a new, not-yet-connected `Connection` for `key`.
    /// `bind_reserved_port` is set for MOUNT's traditional privileged-port
    /// requirement (spec §4.5 / SPEC_FULL.md §B.4).
    pub fn new(key: ConnectionKey, credential: AuthUnixCredential, bind_reserved_port: bool) -> Arc<Self> {
        let limit = key.transport.concurrency_limit();
        let manager = ConnectionManager::global().handle();
        Arc::new_cyclic(|weak| Connection {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            key,
            credential,
            bind_reserved_port,
            socket: Mutex::new(None),
            state: Mutex::new(ConnState::Connecting),
            write_queue: Mutex::new(VecDeque::new()),
            fragments: Mutex::new(FragmentAssembler::new()),
            pending: PendingTable::new(),
            semaphore: Semaphore::new(limit),
            xid_gen: XidGenerator::new(),
            manager,
            self_weak: Mutex::new(weak.clone()),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn key(&self) -> &ConnectionKey {
        &self.key
    }

    fn strong(&self) -> Arc<Connection> {
        self.self_weak
            .lock()
            .upgrade()
            .expect("Connection outlived its own Arc")
    }

    /// Opens the non-blocking socket and registers with the Connection
    /// Manager (`ADD_SKT`, spec §4.4). The connection may still be in
    /// `CONNECTING` state when this returns; completion happens on the
    /// Manager thread via a `POLLOUT` readiness event.
    ///
    /// Idempotent (spec §4.3): if a socket already exists (CONNECTING or
    /// CONNECTED), this is a no-op success.
    pub fn connect(&self) -> io::Result<()> {
        if self.socket.lock().is_some() {
            return Ok(());
        }
        let (socket, outcome) = socket_io::connect_nonblocking(&self.key, self.bind_reserved_port)?;
        *self.socket.lock() = Some(socket);
        *self.state.lock() = match outcome {
            socket_io::ConnectOutcome::Connected => ConnState::Connected,
            socket_io::ConnectOutcome::InProgress => ConnState::Connecting,
        };
        self.manager.add(self.strong());
        Ok(())
    }

    /// Unregisters from the Manager (`DEL_SKT`); the Manager performs the
    /// actual teardown (socket close, pending-table drain) once it
    /// processes the message.
    pub fn disconnect(&self) {
        self.manager.remove(self.strong());
    }

    pub fn is_connected(&self) -> bool {
        *self.state.lock() == ConnState::Connected
    }

    pub fn is_connecting(&self) -> bool {
        *self.state.lock() == ConnState::Connecting
    }

    /// Called by the Manager after a `POLLOUT` event fires while
    /// `CONNECTING`; inspects `SO_ERROR` and flips to `CONNECTED` on
    /// success.
    pub fn complete_connect(&self) -> io::Result<()> {
        let socket_guard = self.socket.lock();
        let socket = socket_guard
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "socket already closed"))?;
        socket_io::take_connect_error(socket)?;
        *self.state.lock() = ConnState::Connected;
        Ok(())
    }

    /// Queues a packet for transmission and wakes the Manager
    /// (`WRITE_SKT`, spec §4.4). Safe to call from any thread. Ensures a
    /// socket exists first (spec §4.3: "if socket is absent, performs
    /// connect() first").
    pub fn write_packet(&self, pkt: Packet) -> io::Result<()> {
        if self.socket.lock().is_none() {
            self.connect()?;
        }
        self.write_queue.lock().push_back(pkt);
        self.manager.notify_write(self.strong());
        Ok(())
    }

    /// Builds the readiness request for this connection's socket, or
    /// `None` if the connection has been torn down. Manager-thread only.
    pub fn poll_request(&self, extra_writable_interest: bool) -> Option<libc::pollfd> {
        let socket_guard = self.socket.lock();
        let socket = socket_guard.as_ref()?;
        if *self.state.lock() == ConnState::Closed {
            return None;
        }
        let connecting = self.is_connecting();
        let queue_has_work = !self.write_queue.lock().is_empty();
        let mut events = libc::POLLIN;
        if connecting || extra_writable_interest || queue_has_work {
            events |= libc::POLLOUT;
        }
        Some(socket_io::pollfd(socket, events))
    }

    /// Attempts to drain the write queue. Manager-thread only.
    pub fn send_packet(&self) -> SendOutcome {
        let socket_guard = self.socket.lock();
        let Some(socket) = socket_guard.as_ref() else {
            return SendOutcome::Error;
        };
        let mut queue = self.write_queue.lock();
        loop {
            let Some(pkt) = queue.front_mut() else {
                return SendOutcome::Drained;
            };
            let data = pkt.send_remaining();
            if data.is_empty() {
                queue.pop_front();
                continue;
            }
            match (&*socket).write(data) {
                Ok(n) => {
                    pkt.advance_send(n);
                    if pkt.send_complete() {
                        queue.pop_front();
                        if queue.is_empty() {
                            return SendOutcome::Drained;
                        }
                        continue;
                    }
                    return SendOutcome::Busy;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return SendOutcome::Busy,
                Err(e) => {
                    warn!(conn = %self.key, "send failed: {e}");
                    return SendOutcome::Error;
                }
            }
        }
    }

    /// Performs exactly one `recv()` attempt and dispatches every complete
    /// message it yields (a single TCP read may complete several small
    /// messages, or none if it only filled in a partial fragment).
    /// Manager-thread only.
    pub fn recv_packet(&self) -> RecvOutcome {
        let socket_guard = self.socket.lock();
        let Some(socket) = socket_guard.as_ref() else {
            return RecvOutcome::WouldBlock;
        };
        let mut buf = vec![0u8; 65536];
        let n = match (&*socket).read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return RecvOutcome::WouldBlock,
            Err(e) => {
                warn!(conn = %self.key, "recv failed: {e}");
                return RecvOutcome::Error;
            }
        };
        drop(socket_guard);

        if n == 0 {
            return if self.key.transport == Transport::Tcp {
                RecvOutcome::Closed
            } else {
                RecvOutcome::WouldBlock
            };
        }
        buf.truncate(n);

        match self.key.transport {
            Transport::Udp => self.dispatch(buf),
            Transport::Tcp => {
                let messages = self.fragments.lock().feed(&buf);
                let mut outcome = RecvOutcome::WouldBlock;
                for msg in messages {
                    outcome = self.dispatch(msg);
                }
                outcome
            }
        }
    }

    fn dispatch(&self, bytes: Vec<u8>) -> RecvOutcome {
        let mut pkt = Packet::from_bytes(bytes);
        let header = match crate::rpc::header::decode_reply_header(&mut pkt) {
            Ok(h) => h,
            Err(e) => {
                warn!(conn = %self.key, "failed to decode rpc reply header: {e}");
                return RecvOutcome::Error;
            }
        };
        let xid = header.xid;
        if !self.pending.deliver(xid, RpcReply { header, body: pkt }) {
            warn!(conn = %self.key, xid, "discarding reply for unmatched xid");
        }
        RecvOutcome::Delivered(xid)
    }

    /// Signals every pending Responder with `none`, resets the fragment
    /// assembler and closes the socket. Manager-thread only; called on
    /// `DEL_SKT`, a peer close, a socket error, or `STOP_MGR`.
    pub fn teardown(&self) {
        *self.state.lock() = ConnState::Closed;
        self.fragments.lock().reset();
        self.write_queue.lock().clear();
        self.pending.cleanup();
        self.socket.lock().take();
    }

    pub fn get_xid(&self) -> u32 {
        self.xid_gen.next()
    }

    /// Sends `call` and blocks the caller until its reply arrives, the
    /// call times out, or the connection is torn down (spec §4.3). A
    /// `timeout_ms` of 0 uses the transport's own floor (spec §5); a
    /// caller-supplied value still never waits less than that floor.
    ///
    /// UDP calls are retransmitted up to [`UDP_RETRIES`] times against the
    /// wait duration; TCP calls wait out a single terminal timeout, since
    /// TCP's own retransmission covers packet loss.
    pub fn send_and_wait<C: RemoteCall>(&self, call: &C, timeout_ms: u64) -> Result<C::Result, RpcError> {
        self.connect()?;
        let _permit = self.semaphore.acquire();
        let xid = self.get_xid();
        let mut pkt = build_request(call, xid, &self.credential, self.key.transport)
            .map_err(|_| RpcError::CantEncodeArgs)?;

        let slot = self
            .pending
            .register(xid)
            .map_err(|_| RpcError::DuplicateXid(xid))?;

        let floor = Duration::from_millis(self.key.transport.timeout_floor_ms().max(timeout_ms));
        let attempts = match self.key.transport {
            Transport::Udp => UDP_RETRIES,
            Transport::Tcp => 1,
        };

        let mut outcome = WaitOutcome::TimedOut;
        let mut reply = None;
        let mut write_err = None;
        for attempt in 0..attempts {
            if attempt > 0 {
                pkt.reset_send_cursor();
            }
            if let Err(e) = self.write_packet(pkt.clone()) {
                write_err = Some(e);
                break;
            }
            let (o, r) = slot.wait(floor);
            outcome = o;
            reply = r;
            if outcome != WaitOutcome::TimedOut {
                break;
            }
        }
        self.pending.remove(xid);

        if let Some(e) = write_err {
            return Err(RpcError::SystemError(e));
        }

        match outcome {
            WaitOutcome::Replied => {
                let RpcReply { header, mut body } = reply.expect("Replied outcome always carries a reply");
                match header.status {
                    ReplyStatus::Accepted(AcceptedStatus::Success) => call
                        .decode_result(&mut body)
                        .map_err(|_| RpcError::CantDecodeRes),
                    ReplyStatus::Accepted(_) | ReplyStatus::Denied => Err(RpcError::Rejected),
                }
            }
            WaitOutcome::SignalledNone => Err(RpcError::CantRecv),
            WaitOutcome::TimedOut => Err(RpcError::TimedOut),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_starts_in_connecting_state() {
        let key = ConnectionKey::new("127.0.0.1", 0, Transport::Udp);
        let conn = Connection::new(key, AuthUnixCredential::anonymous(), false);
        assert!(!conn.is_connected());
    }
}
