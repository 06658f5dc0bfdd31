//! Port-mapper v2 client (spec §4.5 / §6): `NULL`, `DUMP`, and the
//! single-program `GETPORT` fallback (SPEC_FULL.md §B.5).

use std::io;

use crate::packet::Packet;
use crate::rpc::call::RemoteCall;

pub const PROGRAM: u32 = 100000;
pub const VERSION: u32 = 2;
pub const WELL_KNOWN_PORT: u16 = 111;

const PROC_NULL: u32 = 0;
const PROC_GETPORT: u32 = 3;
const PROC_DUMP: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpProtocol {
    Tcp,
    Udp,
}

impl IpProtocol {
    fn wire(self) -> u32 {
        match self {
            IpProtocol::Tcp => 6,
            IpProtocol::Udp => 17,
        }
    }

    fn from_wire(v: u32) -> Option<Self> {
        match v {
            6 => Some(IpProtocol::Tcp),
            17 => Some(IpProtocol::Udp),
            _ => None,
        }
    }
}

/// `(program, version, protocol, port)`, spec §3.
#[derive(Debug, Clone, Copy)]
pub struct PortMapEntry {
    pub program: u32,
    pub version: u32,
    pub protocol: IpProtocol,
    pub port: u16,
}

pub struct PmapNull;

impl RemoteCall for PmapNull {
    type Result = ();

    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_NULL
    }
    fn encode_args(&self, _pkt: &mut Packet) -> io::Result<()> {
        Ok(())
    }
    fn decode_result(&self, _pkt: &mut Packet) -> io::Result<()> {
        Ok(())
    }
}

pub struct PmapGetPort {
    pub program: u32,
    pub version: u32,
    pub protocol: IpProtocol,
}

impl RemoteCall for PmapGetPort {
    type Result = u16;

    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_GETPORT
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_u32(self.program)?;
        pkt.encode_u32(self.version)?;
        pkt.encode_u32(self.protocol.wire())?;
        pkt.encode_u32(0) // port, ignored on call
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<u16> {
        let port = pkt.decode_u32()?;
        Ok(port as u16)
    }
}

pub struct PmapDump;

impl RemoteCall for PmapDump {
    type Result = Vec<PortMapEntry>;

    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_DUMP
    }
    fn encode_args(&self, _pkt: &mut Packet) -> io::Result<()> {
        Ok(())
    }

    /// Decodes the `DUMP` linked list: a `bool more` discriminant followed
    /// by `(program, version, protocol, port)` repeated until `more` reads
    /// false (spec §6).
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<Vec<PortMapEntry>> {
        let mut entries = Vec::new();
        while pkt.decode_bool()? {
            let program = pkt.decode_u32()?;
            let version = pkt.decode_u32()?;
            let protocol_wire = pkt.decode_u32()?;
            let port = pkt.decode_u32()? as u16;
            if let Some(protocol) = IpProtocol::from_wire(protocol_wire) {
                entries.push(PortMapEntry {
                    program,
                    version,
                    protocol,
                    port,
                });
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scenario S1.
    #[test]
    fn dump_decodes_four_entries() {
        let mut pkt = Packet::new();
        for (program, version, proto, port) in [
            (100005u32, 3u32, 6u32, 32893u32),
            (100003, 3, 6, 2049),
            (100021, 4, 6, 48765),
            (100000, 2, 17, 111),
        ] {
            pkt.encode_bool(true).unwrap();
            pkt.encode_u32(program).unwrap();
            pkt.encode_u32(version).unwrap();
            pkt.encode_u32(proto).unwrap();
            pkt.encode_u32(port).unwrap();
        }
        pkt.encode_bool(false).unwrap();
        pkt.seek_read(0);

        let entries = PmapDump.decode_result(&mut pkt).unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].port, 32893);
        assert_eq!(entries[1].port, 2049);
        assert_eq!(entries[2].port, 48765);
        assert_eq!(entries[3].protocol, IpProtocol::Udp);
    }
}
