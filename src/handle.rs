//! `NfsFileHandle` (spec §3): an opaque byte string (≤128 bytes) plus, for
//! v4, the open/lock stateid pair and their locked/open flags. Value type:
//! copy is a deep copy of the bytes, matching the source's `NfsFh`
//! (`DataTypes.h`) which owns its own heap buffer rather than sharing one.

use crate::nfs4::stateid::Stateid4;

/// NFSv3 and v4 file handles are opaque but bounded (`NFS4_FHSIZE` = 128
/// bytes; v3's `FHSIZE3` is 64). 128 covers both.
pub const MAX_FH_LEN: usize = 128;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NfsFileHandle {
    bytes: Vec<u8>,
    open_stateid: Option<Stateid4>,
    lock_stateid: Option<Stateid4>,
    is_open: bool,
    is_locked: bool,
}

impl NfsFileHandle {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            open_stateid: None,
            lock_stateid: None,
            is_open: false,
            is_locked: false,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn open_stateid(&self) -> Option<&Stateid4> {
        self.open_stateid.as_ref()
    }

    pub fn lock_stateid(&self) -> Option<&Stateid4> {
        self.lock_stateid.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn is_locked(&self) -> bool {
        self.is_locked
    }

    /// Stores the stateid returned by a successful `OPEN` (spec §4.6).
    pub fn set_open_state(&mut self, stateid: Stateid4) {
        self.open_stateid = Some(stateid);
        self.is_open = true;
    }

    pub fn clear_open_state(&mut self) {
        self.open_stateid = None;
        self.is_open = false;
    }

    /// Stores the stateid returned by a successful `LOCK`, or updated by
    /// `LOCKU` (spec §4.6).
    pub fn set_lock_state(&mut self, stateid: Stateid4) {
        self.lock_stateid = Some(stateid);
        self.is_locked = true;
    }

    pub fn clear_lock_state(&mut self) {
        self.lock_stateid = None;
        self.is_locked = false;
    }

    /// The stateid to use for a READ/WRITE/SETATTR(size)/CLOSE: the lock
    /// stateid if currently locked, otherwise the open stateid (spec
    /// §4.6). Falls back to the anonymous stateid if the handle carries
    /// neither (e.g. a PUTROOTFH-only traversal never opened).
    pub fn effective_stateid(&self) -> Stateid4 {
        if self.is_locked {
            self.lock_stateid.clone().unwrap_or_else(Stateid4::anonymous)
        } else {
            self.open_stateid.clone().unwrap_or_else(Stateid4::anonymous)
        }
    }
}

impl std::fmt::Display for NfsFileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fh[{}b]", self.bytes.len())
    }
}

impl From<Vec<u8>> for NfsFileHandle {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}
