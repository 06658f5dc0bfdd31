//! The Connection Manager (spec §4.4): a single reactor thread that owns
//! all socket I/O for the process. Callers never read or write a socket
//! directly (invariant P6); they mutate a Connection's send queue /
//! pending table and post a control message to wake the reactor.

use std::collections::HashMap;
use std::os::unix::io::AsRawFd;
use std::os::unix::net::UnixDatagram;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::connection::conn::{Connection, RecvOutcome, SendOutcome};
use crate::connection::socket_io;

/// Action tags posted on the control channel (spec §4.4).
pub enum ControlMsg {
    AddSkt(Arc<Connection>),
    DelSkt(Arc<Connection>),
    WriteSkt(Arc<Connection>),
    StopMgr,
}

/// The handle every `Connection` holds to wake and post to the reactor.
/// Cheap to clone; the actual queue and wake-socket are shared.
#[derive(Clone)]
pub struct ManagerHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    queue: Mutex<Vec<ControlMsg>>,
    wake: UnixDatagram,
}

impl ManagerHandle {
    fn post(&self, msg: ControlMsg) {
        self.inner.queue.lock().push(msg);
        // One byte wakes the reactor; loss of this write is tolerated
        // because the queue itself is polled once the loop wakes for any
        // reason (spec §4.4).
        let _ = self.inner.wake.send(&[0u8]);
    }

    pub fn add(&self, conn: Arc<Connection>) {
        self.post(ControlMsg::AddSkt(conn));
    }

    pub fn remove(&self, conn: Arc<Connection>) {
        self.post(ControlMsg::DelSkt(conn));
    }

    pub fn notify_write(&self, conn: Arc<Connection>) {
        self.post(ControlMsg::WriteSkt(conn));
    }
}

/// Singleton Connection Manager. Started lazily on first use
/// (spec §4.4's "Lifecycle"), stopped explicitly via `stop()`.
pub struct ConnectionManager {
    handle: ManagerHandle,
    thread: Mutex<Option<std::thread::JoinHandle<()>>>,
    stopped: AtomicBool,
}

static GLOBAL: OnceLock<Arc<ConnectionManager>> = OnceLock::new();

impl ConnectionManager {
    /// Returns the process-wide singleton, starting its reactor thread on
    /// first call.
    pub fn global() -> Arc<ConnectionManager> {
        GLOBAL.get_or_init(ConnectionManager::start).clone()
    }

    fn start() -> Arc<ConnectionManager> {
        let (ctrl_rx, ctrl_tx) = UnixDatagram::pair().expect("failed to create control socket pair");
        ctrl_rx
            .set_nonblocking(true)
            .expect("failed to set control socket non-blocking");
        let handle = ManagerHandle {
            inner: Arc::new(HandleInner {
                queue: Mutex::new(Vec::new()),
                wake: ctrl_tx,
            }),
        };
        let mgr = Arc::new(ConnectionManager {
            handle: handle.clone(),
            thread: Mutex::new(None),
            stopped: AtomicBool::new(false),
        });
        let thread_handle = std::thread::Builder::new()
            .name("nfs-connection-manager".into())
            .spawn(move || reactor_loop(ctrl_rx, handle))
            .expect("failed to start connection manager reactor thread");
        *mgr.thread.lock() = Some(thread_handle);
        mgr
    }

    pub fn handle(&self) -> ManagerHandle {
        self.handle.clone()
    }

    /// Sends `STOP_MGR` and joins the reactor thread. Destroying the
    /// manager with in-flight connections is allowed; every outstanding
    /// Responder is signalled `none` during cleanup (spec §4.4, P7).
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.handle.post(ControlMsg::StopMgr);
        if let Some(t) = self.thread.lock().take() {
            let _ = t.join();
        }
    }
}

struct Registered {
    conn: Arc<Connection>,
    writable_interest: bool,
}

fn reactor_loop(ctrl_rx: UnixDatagram, handle: ManagerHandle) {
    // Manager-exclusive map: lives only on this thread's stack, so no
    // external locking is needed to mutate it (spec §4.4).
    let mut sockets: HashMap<u64, Registered> = HashMap::new();
    let mut fds: Vec<libc::pollfd> = Vec::new();

    'reactor: loop {
        fds.clear();
        fds.push(libc::pollfd {
            fd: ctrl_rx.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        });
        let mut order: Vec<u64> = Vec::with_capacity(sockets.len());
        for (id, reg) in sockets.iter() {
            if let Some(pfd) = reg.conn.poll_request(reg.writable_interest) {
                order.push(*id);
                fds.push(pfd);
            }
        }

        if let Err(e) = socket_io::poll(&mut fds, Duration::from_millis(1000)) {
            if e.kind() == std::io::ErrorKind::Interrupted {
                continue;
            }
            error!("poll() failed in connection manager: {e}");
            continue;
        }

        // Control channel first.
        let ctrl_revents = fds[0].revents;
        if ctrl_revents & libc::POLLIN != 0 {
            let mut scratch = [0u8; 256];
            while ctrl_rx.recv(&mut scratch).is_ok() {}
            let messages: Vec<ControlMsg> = std::mem::take(&mut *handle.inner.queue.lock());
            for msg in messages {
                match msg {
                    ControlMsg::AddSkt(conn) => {
                        let writable_interest = !conn.is_connected();
                        let id = conn.id();
                        debug!(conn = %conn.key(), "ADD_SKT");
                        sockets.insert(id, Registered { conn, writable_interest });
                    }
                    ControlMsg::DelSkt(conn) => {
                        debug!(conn = %conn.key(), "DEL_SKT");
                        sockets.remove(&conn.id());
                        conn.teardown();
                    }
                    ControlMsg::WriteSkt(conn) => {
                        handle_write_ready(&mut sockets, &conn);
                    }
                    ControlMsg::StopMgr => {
                        debug!("STOP_MGR received, tearing down reactor");
                        for (_, reg) in sockets.drain() {
                            reg.conn.teardown();
                        }
                        break 'reactor;
                    }
                }
            }
        }

        // Protocol sockets.
        for (idx, id) in order.iter().enumerate() {
            let revents = fds[idx + 1].revents;
            if revents == 0 {
                continue;
            }
            let Some(reg) = sockets.get_mut(id) else { continue };
            if revents & (libc::POLLERR | libc::POLLHUP) != 0 {
                warn!(conn = %reg.conn.key(), "POLLERR/POLLHUP, tearing down connection");
                let _ = reg.conn.recv_packet();
                let conn = reg.conn.clone();
                sockets.remove(id);
                conn.teardown();
                continue;
            }
            if revents & libc::POLLOUT != 0 && reg.conn.is_connecting() {
                match reg.conn.complete_connect() {
                    Ok(()) => debug!(conn = %reg.conn.key(), "connection established"),
                    Err(e) => {
                        warn!(conn = %reg.conn.key(), "connect failed: {e}");
                        let conn = reg.conn.clone();
                        sockets.remove(id);
                        conn.teardown();
                        continue;
                    }
                }
            }
            if revents & libc::POLLOUT != 0 {
                handle_write_ready(&mut sockets, &reg.conn.clone());
            }
            if revents & libc::POLLIN != 0 {
                loop {
                    match reg_recv(&mut sockets, id) {
                        RecvOutcome::WouldBlock => break,
                        RecvOutcome::Delivered(_) => continue,
                        RecvOutcome::Closed | RecvOutcome::Error => {
                            if let Some(reg) = sockets.remove(id) {
                                reg.conn.teardown();
                            }
                            break;
                        }
                    }
                }
            }
        }
    }
}

fn reg_recv(sockets: &mut HashMap<u64, Registered>, id: &u64) -> RecvOutcome {
    match sockets.get(id) {
        Some(reg) => reg.conn.recv_packet(),
        None => RecvOutcome::WouldBlock,
    }
}

fn handle_write_ready(sockets: &mut HashMap<u64, Registered>, conn: &Arc<Connection>) {
    let Some(reg) = sockets.get_mut(&conn.id()) else { return };
    match conn.send_packet() {
        SendOutcome::Busy => reg.writable_interest = true,
        SendOutcome::Drained => reg.writable_interest = false,
        SendOutcome::Error => {
            sockets.remove(&conn.id());
            conn.teardown();
        }
    }
}
