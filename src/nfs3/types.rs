//! NFSv3 (RFC 1813) status codes and the wire shapes shared across
//! several procedures: `fattr3`, `sattr3`, `wcc_data`/`post_op_attr`,
//! and the directory-entry records `READDIR`/`READDIRPLUS` stream back.

use std::io;

use crate::attr::{NfsAttr, NfsFileType, NfsFsId, NfsTime};
use crate::packet::Packet;

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum nfsstat3 {
    Ok,
    Perm,
    NoEnt,
    Io,
    NxIo,
    Access,
    Exist,
    Xdev,
    NoDev,
    NotDir,
    IsDir,
    Inval,
    FBig,
    NoSpc,
    Rofs,
    MLink,
    NameTooLong,
    NotEmpty,
    DQuot,
    Stale,
    RemoteError,
    BadHandle,
    NotSync,
    BadCookie,
    NotSupp,
    TooSmall,
    ServerFault,
    BadType,
    JukeBox,
    Other(u32),
}

impl nfsstat3 {
    pub fn from_wire(v: u32) -> Self {
        match v {
            0 => nfsstat3::Ok,
            1 => nfsstat3::Perm,
            2 => nfsstat3::NoEnt,
            5 => nfsstat3::Io,
            6 => nfsstat3::NxIo,
            13 => nfsstat3::Access,
            17 => nfsstat3::Exist,
            18 => nfsstat3::Xdev,
            19 => nfsstat3::NoDev,
            20 => nfsstat3::NotDir,
            21 => nfsstat3::IsDir,
            22 => nfsstat3::Inval,
            27 => nfsstat3::FBig,
            28 => nfsstat3::NoSpc,
            30 => nfsstat3::Rofs,
            31 => nfsstat3::MLink,
            63 => nfsstat3::NameTooLong,
            66 => nfsstat3::NotEmpty,
            69 => nfsstat3::DQuot,
            70 => nfsstat3::Stale,
            71 => nfsstat3::RemoteError,
            10001 => nfsstat3::BadHandle,
            10002 => nfsstat3::NotSync,
            10003 => nfsstat3::BadCookie,
            10004 => nfsstat3::NotSupp,
            10005 => nfsstat3::TooSmall,
            10006 => nfsstat3::ServerFault,
            10007 => nfsstat3::BadType,
            10008 => nfsstat3::JukeBox,
            other => nfsstat3::Other(other),
        }
    }

    pub fn is_ok(self) -> bool {
        matches!(self, nfsstat3::Ok)
    }
}

/// `fattr3`: the fixed-shape v3 attribute struct (RFC 1813 §2.5), unlike
/// v4's bitmap-selected blob — every field is always present on the
/// wire, so decoding just fills in every `Option` on `NfsAttr`.
pub fn decode_fattr3(pkt: &mut Packet) -> io::Result<NfsAttr> {
    let file_type = NfsFileType::from_wire(pkt.decode_u32()?);
    let mode = pkt.decode_u32()?;
    let num_links = pkt.decode_u32()?;
    let uid = pkt.decode_u32()?;
    let gid = pkt.decode_u32()?;
    let size = pkt.decode_u64()?;
    let _used = pkt.decode_u64()?;
    let raw_device = (pkt.decode_u32()?, pkt.decode_u32()?);
    let fsid = NfsFsId {
        major: pkt.decode_u64()?,
        minor: 0,
    };
    let file_id = pkt.decode_u64()?;
    let time_access = decode_nfstime3(pkt)?;
    let time_modify = decode_nfstime3(pkt)?;
    let time_metadata = decode_nfstime3(pkt)?;

    let mut attr = NfsAttr::new();
    attr.mask = [0xFFFF_FFFF, 0xFFFF_FFFF];
    attr.file_type = Some(file_type);
    attr.mode = Some(mode);
    attr.num_links = Some(num_links);
    attr.owner = Some(uid.to_string());
    attr.owner_group = Some(gid.to_string());
    attr.size = Some(size);
    attr.raw_device = Some(raw_device);
    attr.fsid = Some(fsid);
    attr.file_id = Some(file_id);
    attr.time_access = Some(time_access);
    attr.time_modify = Some(time_modify);
    attr.time_metadata = Some(time_metadata);
    Ok(attr)
}

fn decode_nfstime3(pkt: &mut Packet) -> io::Result<NfsTime> {
    let seconds = pkt.decode_u32()? as u64;
    let nanoseconds = pkt.decode_u32()?;
    Ok(NfsTime { seconds, nanoseconds })
}

fn encode_nfstime3(pkt: &mut Packet, t: NfsTime) -> io::Result<()> {
    pkt.encode_u32(t.seconds as u32)?;
    pkt.encode_u32(t.nanoseconds)
}

/// `post_op_attr`: a boolean presence flag followed by `fattr3` if set.
pub fn decode_post_op_attr(pkt: &mut Packet) -> io::Result<Option<NfsAttr>> {
    if pkt.decode_bool()? {
        Ok(Some(decode_fattr3(pkt)?))
    } else {
        Ok(None)
    }
}

/// `pre_op_attr`: the cheap subset (size + mtime + ctime) servers send
/// back so a client can detect whether its cached attributes are still
/// valid, used in `wcc_data`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WccAttr {
    pub size: u64,
    pub mtime: NfsTime,
    pub ctime: NfsTime,
}

fn decode_pre_op_attr(pkt: &mut Packet) -> io::Result<Option<WccAttr>> {
    if pkt.decode_bool()? {
        let size = pkt.decode_u64()?;
        let mtime = decode_nfstime3(pkt)?;
        let ctime = decode_nfstime3(pkt)?;
        Ok(Some(WccAttr { size, mtime, ctime }))
    } else {
        Ok(None)
    }
}

/// `wcc_data`: weak cache consistency data returned by every
/// attribute-mutating v3 procedure (RFC 1813 §2.6).
#[derive(Debug, Clone, Default)]
pub struct WccData {
    pub before: Option<WccAttr>,
    pub after: Option<NfsAttr>,
}

pub fn decode_wcc_data(pkt: &mut Packet) -> io::Result<WccData> {
    let before = decode_pre_op_attr(pkt)?;
    let after = decode_post_op_attr(pkt)?;
    Ok(WccData { before, after })
}

/// `sattr3`: the v3 "set these attributes" union — each field is its own
/// optional `set_it` flag, independent of the v4 bitmap scheme.
#[derive(Debug, Clone, Default)]
pub struct Sattr3 {
    pub mode: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub size: Option<u64>,
    pub set_mtime_to_server_time: bool,
    pub mtime: Option<NfsTime>,
    pub set_atime_to_server_time: bool,
    pub atime: Option<NfsTime>,
}

pub fn encode_sattr3(pkt: &mut Packet, s: &Sattr3) -> io::Result<()> {
    encode_optional_u32(pkt, s.mode)?;
    encode_optional_u32(pkt, s.uid)?;
    encode_optional_u32(pkt, s.gid)?;
    match s.size {
        Some(size) => {
            pkt.encode_bool(true)?;
            pkt.encode_u64(size)?;
        }
        None => pkt.encode_bool(false)?,
    }
    encode_set_time(pkt, s.set_mtime_to_server_time, s.mtime)?;
    encode_set_time(pkt, s.set_atime_to_server_time, s.atime)
}

fn encode_optional_u32(pkt: &mut Packet, v: Option<u32>) -> io::Result<()> {
    match v {
        Some(v) => {
            pkt.encode_bool(true)?;
            pkt.encode_u32(v)
        }
        None => pkt.encode_bool(false),
    }
}

fn encode_set_time(pkt: &mut Packet, to_server_time: bool, explicit: Option<NfsTime>) -> io::Result<()> {
    if to_server_time {
        pkt.encode_u32(2) // SET_TO_SERVER_TIME
    } else if let Some(t) = explicit {
        pkt.encode_u32(1)?; // SET_TO_CLIENT_TIME
        encode_nfstime3(pkt, t)
    } else {
        pkt.encode_u32(0) // DONT_CHANGE
    }
}

#[derive(Debug, Clone)]
pub struct DirEntry {
    pub file_id: u64,
    pub name: String,
    pub cookie: u64,
}

#[derive(Debug, Clone)]
pub struct DirEntryPlus {
    pub file_id: u64,
    pub name: String,
    pub cookie: u64,
    pub attr: Option<NfsAttr>,
    pub handle: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fattr3_round_trips_owner_and_size() {
        let mut pkt = Packet::new();
        pkt.encode_u32(1).unwrap(); // NF3REG
        pkt.encode_u32(0o644).unwrap();
        pkt.encode_u32(1).unwrap();
        pkt.encode_u32(1000).unwrap();
        pkt.encode_u32(1000).unwrap();
        pkt.encode_u64(512).unwrap();
        pkt.encode_u64(512).unwrap();
        pkt.encode_u32(0).unwrap();
        pkt.encode_u32(0).unwrap();
        pkt.encode_u64(7).unwrap();
        pkt.encode_u64(42).unwrap();
        encode_nfstime3(&mut pkt, NfsTime { seconds: 1, nanoseconds: 0 }).unwrap();
        encode_nfstime3(&mut pkt, NfsTime { seconds: 2, nanoseconds: 0 }).unwrap();
        encode_nfstime3(&mut pkt, NfsTime { seconds: 3, nanoseconds: 0 }).unwrap();
        pkt.seek_read(0);

        let attr = decode_fattr3(&mut pkt).unwrap();
        assert_eq!(attr.size, Some(512));
        assert_eq!(attr.owner.as_deref(), Some("1000"));
        assert_eq!(attr.file_id, Some(42));
    }

    #[test]
    fn sattr3_encodes_dont_change_by_default() {
        let mut pkt = Packet::new();
        encode_sattr3(&mut pkt, &Sattr3::default()).unwrap();
        pkt.seek_read(0);
        assert!(!pkt.decode_bool().unwrap()); // mode not set
        assert!(!pkt.decode_bool().unwrap()); // uid not set
        assert!(!pkt.decode_bool().unwrap()); // gid not set
        assert!(!pkt.decode_bool().unwrap()); // size not set
        assert_eq!(pkt.decode_u32().unwrap(), 0); // mtime DONT_CHANGE
        assert_eq!(pkt.decode_u32().unwrap(), 0); // atime DONT_CHANGE
    }
}
