//! MOUNT protocol v3 client (RFC 1813 Appendix I, spec §6):
//! `NULL`/`MNT`/`DUMP`/`UMNT`/`UMNTALL`/`EXPORT`.

use std::io;

use crate::packet::Packet;
use crate::rpc::call::RemoteCall;

pub const PROGRAM: u32 = 100005;
pub const VERSION: u32 = 3;

const PROC_NULL: u32 = 0;
const PROC_MNT: u32 = 1;
const PROC_DUMP: u32 = 2;
const PROC_UMNT: u32 = 3;
const PROC_UMNTALL: u32 = 4;
const PROC_EXPORT: u32 = 5;

const MNT3_OK: u32 = 0;

pub struct MountNull;

impl RemoteCall for MountNull {
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

#[derive(Debug, Clone)]
pub struct MountResult {
    pub status: u32,
    pub file_handle: Vec<u8>,
    pub auth_flavors: Vec<u32>,
}

impl MountResult {
    pub fn ok(&self) -> bool {
        self.status == MNT3_OK
    }
}

pub struct Mnt {
    pub dir_path: String,
}

impl RemoteCall for Mnt {
    type Result = MountResult;

    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_MNT
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_string(&self.dir_path)
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<MountResult> {
        let status = pkt.decode_u32()?;
        if status != MNT3_OK {
            return Ok(MountResult {
                status,
                file_handle: Vec::new(),
                auth_flavors: Vec::new(),
            });
        }
        let file_handle = pkt.decode_var_opaque()?;
        let flavor_count = pkt.decode_u32()? as usize;
        let mut auth_flavors = Vec::with_capacity(flavor_count);
        for _ in 0..flavor_count {
            auth_flavors.push(pkt.decode_u32()?);
        }
        Ok(MountResult {
            status,
            file_handle,
            auth_flavors,
        })
    }
}

#[derive(Debug, Clone)]
pub struct MountListEntry {
    pub host_name: String,
    pub directory: String,
}

pub struct Dump;

impl RemoteCall for Dump {
    type Result = Vec<MountListEntry>;
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
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<Vec<MountListEntry>> {
        let mut entries = Vec::new();
        while pkt.decode_bool()? {
            let host_name = pkt.decode_string()?;
            let directory = pkt.decode_string()?;
            entries.push(MountListEntry { host_name, directory });
        }
        Ok(entries)
    }
}

pub struct Umnt {
    pub dir_path: String,
}

impl RemoteCall for Umnt {
    type Result = ();
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_UMNT
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_string(&self.dir_path)
    }
    fn decode_result(&self, _pkt: &mut Packet) -> io::Result<()> {
        Ok(())
    }
}

pub struct UmntAll;

impl RemoteCall for UmntAll {
    type Result = ();
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_UMNTALL
    }
    fn encode_args(&self, _pkt: &mut Packet) -> io::Result<()> {
        Ok(())
    }
    fn decode_result(&self, _pkt: &mut Packet) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ExportEntry {
    pub directory: String,
    pub groups: Vec<String>,
}

pub struct Export;

impl RemoteCall for Export {
    type Result = Vec<ExportEntry>;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_EXPORT
    }
    fn encode_args(&self, _pkt: &mut Packet) -> io::Result<()> {
        Ok(())
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<Vec<ExportEntry>> {
        let mut entries = Vec::new();
        while pkt.decode_bool()? {
            let directory = pkt.decode_string()?;
            let mut groups = Vec::new();
            while pkt.decode_bool()? {
                groups.push(pkt.decode_string()?);
            }
            entries.push(ExportEntry { directory, groups });
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scenario S2's MOUNT.MNT leg: a 32-byte file handle, one auth
    /// flavor.
    #[test]
    fn mnt_decodes_ok_result_with_file_handle() {
        let mut pkt = Packet::new();
        pkt.encode_u32(MNT3_OK).unwrap();
        pkt.encode_var_opaque(&[0u8; 32]).unwrap();
        pkt.encode_u32(1).unwrap();
        pkt.encode_u32(1).unwrap(); // AUTH_UNIX
        pkt.seek_read(0);

        let call = Mnt {
            dir_path: "/exp".to_string(),
        };
        let result = call.decode_result(&mut pkt).unwrap();
        assert!(result.ok());
        assert_eq!(result.file_handle.len(), 32);
        assert_eq!(result.auth_flavors, vec![1]);
    }

    #[test]
    fn mnt_failure_status_carries_no_handle() {
        let mut pkt = Packet::new();
        pkt.encode_u32(13).unwrap(); // MNT3ERR_ACCES
        pkt.seek_read(0);
        let call = Mnt {
            dir_path: "/exp".to_string(),
        };
        let result = call.decode_result(&mut pkt).unwrap();
        assert!(!result.ok());
        assert!(result.file_handle.is_empty());
    }
}
