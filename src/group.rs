//! The Connection Group (spec §4.5): one registry entry per `(server,
//! transport, nfs_version)`, owning the set of Connections needed to
//! talk to that server — port-mapper, MOUNT, NFS, and NLM — plus, for
//! NFSv4, the client state `Nfs4ClientState` drives. Grounded on
//! `NfsConnectionGroup.h`'s public surface, generalized from its
//! concrete method list to a data-driven `ServiceType` map.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::connection::conn::Connection;
use crate::connection::key::ConnectionKey;
use crate::error::NfsError;
use crate::mount;
use crate::nfs4::client::{Nfs4ClientState, RenewTicker, DEFAULT_LEASE_SECS};
use crate::nfs4::compound;
use crate::nlm;
use crate::nfs3::calls as nfs3;
use crate::portmap::{self, IpProtocol, PmapDump};
use crate::rpc::header::AuthUnixCredential;
use crate::transport::Transport;

/// One of the four RPC programs a `ConnectionGroup` may hold a
/// Connection for (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceType {
    Portmap,
    Mount,
    Nfs,
    Nlm,
}

impl ServiceType {
    fn program(self) -> u32 {
        match self {
            ServiceType::Portmap => portmap::PROGRAM,
            ServiceType::Mount => mount::PROGRAM,
            ServiceType::Nfs => nfs3::PROGRAM,
            ServiceType::Nlm => nlm::PROGRAM,
        }
    }

    fn version(self) -> u32 {
        match self {
            ServiceType::Portmap => portmap::VERSION,
            ServiceType::Mount => mount::VERSION,
            ServiceType::Nfs => nfs3::VERSION,
            ServiceType::Nlm => nlm::VERSION,
        }
    }

    /// MOUNT traditionally requires a reserved (privileged) source port
    /// (spec §4.5: "MOUNT connections are created with the reserved-port
    /// flag").
    fn needs_reserved_port(self) -> bool {
        matches!(self, ServiceType::Mount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub server: String,
    pub transport: Transport,
    pub nfs_version: u32,
}

pub struct ConnectionGroup {
    key: GroupKey,
    credential: AuthUnixCredential,
    connections: Mutex<HashMap<ServiceType, Arc<Connection>>>,
    /// NFSv4-only; left `None` for NFSv3 groups.
    client_state: OnceLock<Arc<Nfs4ClientState>>,
    renew_ticker: Mutex<Option<RenewTicker>>,
}

static REGISTRY: OnceLock<Mutex<HashMap<GroupKey, Arc<ConnectionGroup>>>> = OnceLock::new();

impl ConnectionGroup {
    /// Returns the group for `key`, creating it (with no I/O) if this is
    /// the first lookup (spec §4.5).
    pub fn get_or_create(key: GroupKey) -> Arc<ConnectionGroup> {
        let registry = REGISTRY.get_or_init(|| Mutex::new(HashMap::new()));
        let mut map = registry.lock();
        map.entry(key.clone())
            .or_insert_with(|| {
                Arc::new(ConnectionGroup {
                    key,
                    credential: AuthUnixCredential::anonymous(),
                    connections: Mutex::new(HashMap::new()),
                    client_state: OnceLock::new(),
                    renew_ticker: Mutex::new(None),
                })
            })
            .clone()
    }

    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    /// NFSv4 client state, valid only once [`Self::ensure_connection`] has
    /// run an NFSv4 group through its handshake.
    pub fn nfs4_client(&self) -> Option<Arc<Nfs4ClientState>> {
        self.client_state.get().cloned()
    }

    pub fn connection(&self, service: ServiceType) -> Option<Arc<Connection>> {
        self.connections.lock().get(&service).cloned()
    }

    fn insert_connection(&self, service: ServiceType, port: u16) -> Arc<Connection> {
        let conn_key = ConnectionKey::new(self.key.server.clone(), port, self.key.transport);
        let conn = Connection::new(conn_key, self.credential.clone(), service.needs_reserved_port());
        if conn.connect().is_err() {
            warn!(server = %self.key.server, ?service, "failed to open connection");
        }
        self.connections.lock().insert(service, conn.clone());
        conn
    }

    /// Drives connection discovery and creation (spec §4.5): NFSv4 opens
    /// one TCP connection on the well-known port; NFSv3 goes through the
    /// port-mapper's `DUMP` to discover MOUNT/NFS/NLM ports on this
    /// transport.
    pub fn ensure_connection(&self) -> Result<(), NfsError> {
        if self.key.nfs_version == 4 {
            return self.ensure_nfs4();
        }
        self.ensure_nfs3()
    }

    fn ensure_nfs4(&self) -> Result<(), NfsError> {
        if self.connections.lock().contains_key(&ServiceType::Nfs) {
            return Ok(());
        }
        let conn = self.insert_connection(ServiceType::Nfs, compound::WELL_KNOWN_PORT);
        let state = self.client_state.get_or_init(Nfs4ClientState::new).clone();
        state.handshake(&conn)?;
        let mut ticker = self.renew_ticker.lock();
        if ticker.is_none() {
            *ticker = Some(RenewTicker::start(state, conn, DEFAULT_LEASE_SECS));
        }
        Ok(())
    }

    /// Port-mapper discovery (spec §4.5). The port-mapper's own call
    /// path below never calls back into `ensure_connection` — it opens
    /// its connection directly on the well-known port 111.
    fn ensure_nfs3(&self) -> Result<(), NfsError> {
        let pmap_conn = {
            let mut conns = self.connections.lock();
            conns
                .entry(ServiceType::Portmap)
                .or_insert_with(|| {
                    let conn_key = ConnectionKey::new(self.key.server.clone(), portmap::WELL_KNOWN_PORT, self.key.transport);
                    let conn = Connection::new(conn_key, self.credential.clone(), false);
                    let _ = conn.connect();
                    conn
                })
                .clone()
        };

        let entries = pmap_conn.send_and_wait(&PmapDump, 0).map_err(NfsError::from)?;
        let wanted_proto = match self.key.transport {
            Transport::Tcp => IpProtocol::Tcp,
            Transport::Udp => IpProtocol::Udp,
        };

        for service in [ServiceType::Mount, ServiceType::Nfs, ServiceType::Nlm] {
            let mut port = entries
                .iter()
                .find(|e| e.program == service.program() && e.version == service.version() && e.protocol == wanted_proto)
                .map(|e| e.port)
                .unwrap_or(0);
            if port == 0 {
                // DUMP omitted this program; fall back to a direct GETPORT
                // (SPEC_FULL.md §B.5) before giving up on it.
                let getport = portmap::PmapGetPort {
                    program: service.program(),
                    version: service.version(),
                    protocol: wanted_proto,
                };
                port = pmap_conn.send_and_wait(&getport, 0).unwrap_or(0);
            }
            if port == 0 {
                warn!(server = %self.key.server, ?service, "port-mapper did not advertise a port, skipping");
                continue;
            }
            if self.connections.lock().contains_key(&service) {
                continue;
            }
            self.insert_connection(service, port);
        }
        info!(server = %self.key.server, "nfsv3 connection group ready");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_idempotent_for_the_same_key() {
        let key = GroupKey {
            server: "198.51.100.7".into(),
            transport: Transport::Tcp,
            nfs_version: 4,
        };
        let a = ConnectionGroup::get_or_create(key.clone());
        let b = ConnectionGroup::get_or_create(key);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn distinct_versions_get_distinct_groups() {
        let v3 = GroupKey {
            server: "198.51.100.8".into(),
            transport: Transport::Tcp,
            nfs_version: 3,
        };
        let v4 = GroupKey {
            server: "198.51.100.8".into(),
            transport: Transport::Tcp,
            nfs_version: 4,
        };
        let a = ConnectionGroup::get_or_create(v3);
        let b = ConnectionGroup::get_or_create(v4);
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
