//! NFSv3 (RFC 1813) procedure set as `RemoteCall` implementations.
//! Program 100003, version 3 — the same program number as NFSv4, a
//! different version, so the two live in separate connections (spec
//! §4.5: one `ConnectionKey` per `(server, transport, version)`).

use std::io;

use crate::attr::NfsAttr;
use crate::nfs3::types::{
    self, decode_fattr3, decode_post_op_attr, decode_wcc_data, nfsstat3, DirEntry, DirEntryPlus, Sattr3, WccData,
};
use crate::packet::Packet;
use crate::rpc::call::RemoteCall;

pub const PROGRAM: u32 = 100003;
pub const VERSION: u32 = 3;

const PROC_NULL: u32 = 0;
const PROC_GETATTR: u32 = 1;
const PROC_SETATTR: u32 = 2;
const PROC_LOOKUP: u32 = 3;
const PROC_ACCESS: u32 = 4;
const PROC_READLINK: u32 = 5;
const PROC_READ: u32 = 6;
const PROC_WRITE: u32 = 7;
const PROC_CREATE: u32 = 8;
const PROC_MKDIR: u32 = 9;
const PROC_SYMLINK: u32 = 10;
const PROC_MKNOD: u32 = 11;
const PROC_REMOVE: u32 = 12;
const PROC_RMDIR: u32 = 13;
const PROC_RENAME: u32 = 14;
const PROC_LINK: u32 = 15;
const PROC_READDIR: u32 = 16;
const PROC_READDIRPLUS: u32 = 17;
const PROC_FSSTAT: u32 = 18;
const PROC_FSINFO: u32 = 19;
const PROC_PATHCONF: u32 = 20;
const PROC_COMMIT: u32 = 21;

/// `ACCESS3` bit values (RFC 1813 §3.3.4), the request/response mask.
pub mod access_bit {
    pub const READ: u32 = 0x0001;
    pub const LOOKUP: u32 = 0x0002;
    pub const MODIFY: u32 = 0x0004;
    pub const EXTEND: u32 = 0x0008;
    pub const DELETE: u32 = 0x0010;
    pub const EXECUTE: u32 = 0x0020;
}

/// `stable_how` (RFC 1813 §3.3.8): `WRITE`'s durability request.
pub mod stable_how {
    pub const UNSTABLE: u32 = 0;
    pub const DATA_SYNC: u32 = 1;
    pub const FILE_SYNC: u32 = 2;
}

pub struct Nfs3Null;

impl RemoteCall for Nfs3Null {
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
pub struct GetAttrResult {
    pub status: nfsstat3,
    pub attr: Option<NfsAttr>,
}

pub struct GetAttr {
    pub fh: Vec<u8>,
}

impl RemoteCall for GetAttr {
    type Result = GetAttrResult;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_GETATTR
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.fh)
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<GetAttrResult> {
        let status = nfsstat3::from_wire(pkt.decode_u32()?);
        let attr = if status.is_ok() { Some(decode_fattr3(pkt)?) } else { None };
        Ok(GetAttrResult { status, attr })
    }
}

#[derive(Debug, Clone)]
pub struct SetAttrResult {
    pub status: nfsstat3,
    pub wcc: WccData,
}

pub struct SetAttr {
    pub fh: Vec<u8>,
    pub attrs: Sattr3,
    pub guard_ctime: Option<crate::attr::NfsTime>,
}

impl RemoteCall for SetAttr {
    type Result = SetAttrResult;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_SETATTR
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.fh)?;
        types::encode_sattr3(pkt, &self.attrs)?;
        match self.guard_ctime {
            Some(t) => {
                pkt.encode_bool(true)?;
                pkt.encode_u32(t.seconds as u32)?;
                pkt.encode_u32(t.nanoseconds)
            }
            None => pkt.encode_bool(false),
        }
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<SetAttrResult> {
        let status = nfsstat3::from_wire(pkt.decode_u32()?);
        let wcc = decode_wcc_data(pkt)?;
        Ok(SetAttrResult { status, wcc })
    }
}

#[derive(Debug, Clone)]
pub struct LookupResult {
    pub status: nfsstat3,
    pub handle: Option<Vec<u8>>,
    pub obj_attr: Option<NfsAttr>,
    pub dir_attr: Option<NfsAttr>,
}

pub struct Lookup {
    pub dir_fh: Vec<u8>,
    pub name: String,
}

impl RemoteCall for Lookup {
    type Result = LookupResult;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_LOOKUP
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.dir_fh)?;
        pkt.encode_string(&self.name)
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<LookupResult> {
        let status = nfsstat3::from_wire(pkt.decode_u32()?);
        if status.is_ok() {
            let handle = pkt.decode_var_opaque()?;
            let obj_attr = decode_post_op_attr(pkt)?;
            let dir_attr = decode_post_op_attr(pkt)?;
            Ok(LookupResult {
                status,
                handle: Some(handle),
                obj_attr,
                dir_attr,
            })
        } else {
            let dir_attr = decode_post_op_attr(pkt)?;
            Ok(LookupResult {
                status,
                handle: None,
                obj_attr: None,
                dir_attr,
            })
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccessResult {
    pub status: nfsstat3,
    pub attr: Option<NfsAttr>,
    pub access: u32,
}

pub struct Access {
    pub fh: Vec<u8>,
    pub requested: u32,
}

impl RemoteCall for Access {
    type Result = AccessResult;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_ACCESS
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.fh)?;
        pkt.encode_u32(self.requested)
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<AccessResult> {
        let status = nfsstat3::from_wire(pkt.decode_u32()?);
        let attr = decode_post_op_attr(pkt)?;
        let access = if status.is_ok() { pkt.decode_u32()? } else { 0 };
        Ok(AccessResult { status, attr, access })
    }
}

#[derive(Debug, Clone)]
pub struct ReadLinkResult {
    pub status: nfsstat3,
    pub attr: Option<NfsAttr>,
    pub path: Option<String>,
}

pub struct ReadLink {
    pub fh: Vec<u8>,
}

impl RemoteCall for ReadLink {
    type Result = ReadLinkResult;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_READLINK
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.fh)
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<ReadLinkResult> {
        let status = nfsstat3::from_wire(pkt.decode_u32()?);
        let attr = decode_post_op_attr(pkt)?;
        let path = if status.is_ok() { Some(pkt.decode_string()?) } else { None };
        Ok(ReadLinkResult { status, attr, path })
    }
}

#[derive(Debug, Clone)]
pub struct ReadResult {
    pub status: nfsstat3,
    pub attr: Option<NfsAttr>,
    pub eof: bool,
    pub data: Vec<u8>,
}

pub struct Read {
    pub fh: Vec<u8>,
    pub offset: u64,
    pub count: u32,
}

impl RemoteCall for Read {
    type Result = ReadResult;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_READ
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.fh)?;
        pkt.encode_u64(self.offset)?;
        pkt.encode_u32(self.count)
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<ReadResult> {
        let status = nfsstat3::from_wire(pkt.decode_u32()?);
        let attr = decode_post_op_attr(pkt)?;
        if status.is_ok() {
            let _count = pkt.decode_u32()?;
            let eof = pkt.decode_bool()?;
            let data = pkt.decode_var_opaque()?;
            Ok(ReadResult { status, attr, eof, data })
        } else {
            Ok(ReadResult {
                status,
                attr,
                eof: false,
                data: Vec::new(),
            })
        }
    }
}

#[derive(Debug, Clone)]
pub struct WriteResult {
    pub status: nfsstat3,
    pub wcc: WccData,
    pub count: u32,
    pub committed: u32,
    pub verifier: [u8; 8],
}

pub struct Write {
    pub fh: Vec<u8>,
    pub offset: u64,
    pub stable: u32,
    pub data: Vec<u8>,
}

impl RemoteCall for Write {
    type Result = WriteResult;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_WRITE
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.fh)?;
        pkt.encode_u64(self.offset)?;
        pkt.encode_u32(self.data.len() as u32)?;
        pkt.encode_u32(self.stable)?;
        pkt.encode_var_opaque(&self.data)
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<WriteResult> {
        let status = nfsstat3::from_wire(pkt.decode_u32()?);
        let wcc = decode_wcc_data(pkt)?;
        if status.is_ok() {
            let count = pkt.decode_u32()?;
            let committed = pkt.decode_u32()?;
            let verifier = decode_verifier(pkt)?;
            Ok(WriteResult {
                status,
                wcc,
                count,
                committed,
                verifier,
            })
        } else {
            Ok(WriteResult {
                status,
                wcc,
                count: 0,
                committed: 0,
                verifier: [0; 8],
            })
        }
    }
}

fn decode_verifier(pkt: &mut Packet) -> io::Result<[u8; 8]> {
    let bytes = pkt.decode_fixed_opaque(8)?;
    let mut out = [0u8; 8];
    out.copy_from_slice(&bytes);
    Ok(out)
}

#[derive(Debug, Clone)]
pub struct CreateResult {
    pub status: nfsstat3,
    pub handle: Option<Vec<u8>>,
    pub obj_attr: Option<NfsAttr>,
    pub dir_wcc: WccData,
}

fn decode_post_op_fh3(pkt: &mut Packet) -> io::Result<Option<Vec<u8>>> {
    if pkt.decode_bool()? {
        Ok(Some(pkt.decode_var_opaque()?))
    } else {
        Ok(None)
    }
}

/// `createmode3` / `createhow3` (RFC 1813 §3.3.8): `UNCHECKED`/`GUARDED`
/// carry `sattr3`, `EXCLUSIVE` carries an opaque 8-byte verifier.
pub enum CreateHow {
    Unchecked(Sattr3),
    Guarded(Sattr3),
    Exclusive([u8; 8]),
}

pub struct Create {
    pub dir_fh: Vec<u8>,
    pub name: String,
    pub how: CreateHow,
}

impl RemoteCall for Create {
    type Result = CreateResult;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_CREATE
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.dir_fh)?;
        pkt.encode_string(&self.name)?;
        match &self.how {
            CreateHow::Unchecked(attrs) => {
                pkt.encode_u32(0)?;
                types::encode_sattr3(pkt, attrs)
            }
            CreateHow::Guarded(attrs) => {
                pkt.encode_u32(1)?;
                types::encode_sattr3(pkt, attrs)
            }
            CreateHow::Exclusive(verifier) => {
                pkt.encode_u32(2)?;
                pkt.encode_fixed_opaque(verifier, 8)
            }
        }
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<CreateResult> {
        let status = nfsstat3::from_wire(pkt.decode_u32()?);
        let handle = if status.is_ok() { decode_post_op_fh3(pkt)? } else { None };
        let obj_attr = if status.is_ok() { decode_post_op_attr(pkt)? } else { None };
        let dir_wcc = decode_wcc_data(pkt)?;
        Ok(CreateResult {
            status,
            handle,
            obj_attr,
            dir_wcc,
        })
    }
}

pub struct Mkdir {
    pub dir_fh: Vec<u8>,
    pub name: String,
    pub attrs: Sattr3,
}

impl RemoteCall for Mkdir {
    type Result = CreateResult;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_MKDIR
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.dir_fh)?;
        pkt.encode_string(&self.name)?;
        types::encode_sattr3(pkt, &self.attrs)
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<CreateResult> {
        let status = nfsstat3::from_wire(pkt.decode_u32()?);
        let handle = if status.is_ok() { decode_post_op_fh3(pkt)? } else { None };
        let obj_attr = if status.is_ok() { decode_post_op_attr(pkt)? } else { None };
        let dir_wcc = decode_wcc_data(pkt)?;
        Ok(CreateResult {
            status,
            handle,
            obj_attr,
            dir_wcc,
        })
    }
}

pub struct Symlink {
    pub dir_fh: Vec<u8>,
    pub name: String,
    pub attrs: Sattr3,
    pub target: String,
}

impl RemoteCall for Symlink {
    type Result = CreateResult;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_SYMLINK
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.dir_fh)?;
        pkt.encode_string(&self.name)?;
        types::encode_sattr3(pkt, &self.attrs)?;
        pkt.encode_string(&self.target)
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<CreateResult> {
        let status = nfsstat3::from_wire(pkt.decode_u32()?);
        let handle = if status.is_ok() { decode_post_op_fh3(pkt)? } else { None };
        let obj_attr = if status.is_ok() { decode_post_op_attr(pkt)? } else { None };
        let dir_wcc = decode_wcc_data(pkt)?;
        Ok(CreateResult {
            status,
            handle,
            obj_attr,
            dir_wcc,
        })
    }
}

/// `ftype3`/`specdata3` for `MKNOD` (RFC 1813 §3.3.11): only device
/// special files carry a `rdev`; fifos/sockets carry plain `sattr3`.
pub enum MknodType {
    Chr { attrs: Sattr3, rdev: (u32, u32) },
    Blk { attrs: Sattr3, rdev: (u32, u32) },
    Sock { attrs: Sattr3 },
    Fifo { attrs: Sattr3 },
}

pub struct Mknod {
    pub dir_fh: Vec<u8>,
    pub name: String,
    pub what: MknodType,
}

impl RemoteCall for Mknod {
    type Result = CreateResult;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_MKNOD
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.dir_fh)?;
        pkt.encode_string(&self.name)?;
        match &self.what {
            MknodType::Chr { attrs, rdev } => {
                pkt.encode_u32(4)?; // NF3CHR
                types::encode_sattr3(pkt, attrs)?;
                pkt.encode_u32(rdev.0)?;
                pkt.encode_u32(rdev.1)
            }
            MknodType::Blk { attrs, rdev } => {
                pkt.encode_u32(3)?; // NF3BLK
                types::encode_sattr3(pkt, attrs)?;
                pkt.encode_u32(rdev.0)?;
                pkt.encode_u32(rdev.1)
            }
            MknodType::Sock { attrs } => {
                pkt.encode_u32(6)?; // NF3SOCK
                types::encode_sattr3(pkt, attrs)
            }
            MknodType::Fifo { attrs } => {
                pkt.encode_u32(7)?; // NF3FIFO
                types::encode_sattr3(pkt, attrs)
            }
        }
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<CreateResult> {
        let status = nfsstat3::from_wire(pkt.decode_u32()?);
        let handle = if status.is_ok() { decode_post_op_fh3(pkt)? } else { None };
        let obj_attr = if status.is_ok() { decode_post_op_attr(pkt)? } else { None };
        let dir_wcc = decode_wcc_data(pkt)?;
        Ok(CreateResult {
            status,
            handle,
            obj_attr,
            dir_wcc,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RemoveResult {
    pub status: nfsstat3,
    pub dir_wcc: WccData,
}

pub struct Remove {
    pub dir_fh: Vec<u8>,
    pub name: String,
}

impl RemoteCall for Remove {
    type Result = RemoveResult;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_REMOVE
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.dir_fh)?;
        pkt.encode_string(&self.name)
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<RemoveResult> {
        let status = nfsstat3::from_wire(pkt.decode_u32()?);
        let dir_wcc = decode_wcc_data(pkt)?;
        Ok(RemoveResult { status, dir_wcc })
    }
}

pub struct Rmdir {
    pub dir_fh: Vec<u8>,
    pub name: String,
}

impl RemoteCall for Rmdir {
    type Result = RemoveResult;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_RMDIR
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.dir_fh)?;
        pkt.encode_string(&self.name)
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<RemoveResult> {
        let status = nfsstat3::from_wire(pkt.decode_u32()?);
        let dir_wcc = decode_wcc_data(pkt)?;
        Ok(RemoveResult { status, dir_wcc })
    }
}

#[derive(Debug, Clone)]
pub struct RenameResult {
    pub status: nfsstat3,
    pub from_wcc: WccData,
    pub to_wcc: WccData,
}

pub struct Rename {
    pub from_dir_fh: Vec<u8>,
    pub from_name: String,
    pub to_dir_fh: Vec<u8>,
    pub to_name: String,
}

impl RemoteCall for Rename {
    type Result = RenameResult;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_RENAME
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.from_dir_fh)?;
        pkt.encode_string(&self.from_name)?;
        pkt.encode_var_opaque(&self.to_dir_fh)?;
        pkt.encode_string(&self.to_name)
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<RenameResult> {
        let status = nfsstat3::from_wire(pkt.decode_u32()?);
        let from_wcc = decode_wcc_data(pkt)?;
        let to_wcc = decode_wcc_data(pkt)?;
        Ok(RenameResult {
            status,
            from_wcc,
            to_wcc,
        })
    }
}

#[derive(Debug, Clone)]
pub struct LinkResult {
    pub status: nfsstat3,
    pub file_attr: Option<NfsAttr>,
    pub linkdir_wcc: WccData,
}

pub struct Link {
    pub fh: Vec<u8>,
    pub link_dir_fh: Vec<u8>,
    pub link_name: String,
}

impl RemoteCall for Link {
    type Result = LinkResult;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_LINK
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.fh)?;
        pkt.encode_var_opaque(&self.link_dir_fh)?;
        pkt.encode_string(&self.link_name)
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<LinkResult> {
        let status = nfsstat3::from_wire(pkt.decode_u32()?);
        let file_attr = decode_post_op_attr(pkt)?;
        let linkdir_wcc = decode_wcc_data(pkt)?;
        Ok(LinkResult {
            status,
            file_attr,
            linkdir_wcc,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ReaddirResult {
    pub status: nfsstat3,
    pub dir_attr: Option<NfsAttr>,
    pub cookie_verf: [u8; 8],
    pub entries: Vec<DirEntry>,
    pub eof: bool,
}

pub struct Readdir {
    pub dir_fh: Vec<u8>,
    pub cookie: u64,
    pub cookie_verf: [u8; 8],
    pub count: u32,
}

impl RemoteCall for Readdir {
    type Result = ReaddirResult;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_READDIR
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.dir_fh)?;
        pkt.encode_u64(self.cookie)?;
        pkt.encode_fixed_opaque(&self.cookie_verf, 8)?;
        pkt.encode_u32(self.count)
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<ReaddirResult> {
        let status = nfsstat3::from_wire(pkt.decode_u32()?);
        let dir_attr = decode_post_op_attr(pkt)?;
        if !status.is_ok() {
            return Ok(ReaddirResult {
                status,
                dir_attr,
                cookie_verf: [0; 8],
                entries: Vec::new(),
                eof: false,
            });
        }
        let cookie_verf = decode_verifier(pkt)?;
        let mut entries = Vec::new();
        while pkt.decode_bool()? {
            let file_id = pkt.decode_u64()?;
            let name = pkt.decode_string()?;
            let cookie = pkt.decode_u64()?;
            entries.push(DirEntry { file_id, name, cookie });
        }
        let eof = pkt.decode_bool()?;
        Ok(ReaddirResult {
            status,
            dir_attr,
            cookie_verf,
            entries,
            eof,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ReaddirPlusResult {
    pub status: nfsstat3,
    pub dir_attr: Option<NfsAttr>,
    pub cookie_verf: [u8; 8],
    pub entries: Vec<DirEntryPlus>,
    pub eof: bool,
}

pub struct ReaddirPlus {
    pub dir_fh: Vec<u8>,
    pub cookie: u64,
    pub cookie_verf: [u8; 8],
    pub dir_count: u32,
    pub max_count: u32,
}

impl RemoteCall for ReaddirPlus {
    type Result = ReaddirPlusResult;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_READDIRPLUS
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.dir_fh)?;
        pkt.encode_u64(self.cookie)?;
        pkt.encode_fixed_opaque(&self.cookie_verf, 8)?;
        pkt.encode_u32(self.dir_count)?;
        pkt.encode_u32(self.max_count)
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<ReaddirPlusResult> {
        let status = nfsstat3::from_wire(pkt.decode_u32()?);
        let dir_attr = decode_post_op_attr(pkt)?;
        if !status.is_ok() {
            return Ok(ReaddirPlusResult {
                status,
                dir_attr,
                cookie_verf: [0; 8],
                entries: Vec::new(),
                eof: false,
            });
        }
        let cookie_verf = decode_verifier(pkt)?;
        let mut entries = Vec::new();
        while pkt.decode_bool()? {
            let file_id = pkt.decode_u64()?;
            let name = pkt.decode_string()?;
            let cookie = pkt.decode_u64()?;
            let attr = decode_post_op_attr(pkt)?;
            let handle = decode_post_op_fh3(pkt)?;
            entries.push(DirEntryPlus {
                file_id,
                name,
                cookie,
                attr,
                handle,
            });
        }
        let eof = pkt.decode_bool()?;
        Ok(ReaddirPlusResult {
            status,
            dir_attr,
            cookie_verf,
            entries,
            eof,
        })
    }
}

#[derive(Debug, Clone)]
pub struct FsstatResult {
    pub status: nfsstat3,
    pub attr: Option<NfsAttr>,
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub avail_bytes: u64,
    pub total_files: u64,
    pub free_files: u64,
    pub avail_files: u64,
    pub invar_sec: u32,
}

pub struct Fsstat {
    pub fh: Vec<u8>,
}

impl RemoteCall for Fsstat {
    type Result = FsstatResult;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_FSSTAT
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.fh)
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<FsstatResult> {
        let status = nfsstat3::from_wire(pkt.decode_u32()?);
        let attr = decode_post_op_attr(pkt)?;
        if !status.is_ok() {
            return Ok(FsstatResult {
                status,
                attr,
                total_bytes: 0,
                free_bytes: 0,
                avail_bytes: 0,
                total_files: 0,
                free_files: 0,
                avail_files: 0,
                invar_sec: 0,
            });
        }
        Ok(FsstatResult {
            status,
            attr,
            total_bytes: pkt.decode_u64()?,
            free_bytes: pkt.decode_u64()?,
            avail_bytes: pkt.decode_u64()?,
            total_files: pkt.decode_u64()?,
            free_files: pkt.decode_u64()?,
            avail_files: pkt.decode_u64()?,
            invar_sec: pkt.decode_u32()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct FsinfoResult {
    pub status: nfsstat3,
    pub attr: Option<NfsAttr>,
    pub rtmax: u32,
    pub rtpref: u32,
    pub rtmult: u32,
    pub wtmax: u32,
    pub wtpref: u32,
    pub wtmult: u32,
    pub dtpref: u32,
    pub max_file_size: u64,
    pub time_delta: crate::attr::NfsTime,
    pub properties: u32,
}

pub struct Fsinfo {
    pub fh: Vec<u8>,
}

impl RemoteCall for Fsinfo {
    type Result = FsinfoResult;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_FSINFO
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.fh)
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<FsinfoResult> {
        let status = nfsstat3::from_wire(pkt.decode_u32()?);
        let attr = decode_post_op_attr(pkt)?;
        if !status.is_ok() {
            return Ok(FsinfoResult {
                status,
                attr,
                rtmax: 0,
                rtpref: 0,
                rtmult: 0,
                wtmax: 0,
                wtpref: 0,
                wtmult: 0,
                dtpref: 0,
                max_file_size: 0,
                time_delta: crate::attr::NfsTime::default(),
                properties: 0,
            });
        }
        let rtmax = pkt.decode_u32()?;
        let rtpref = pkt.decode_u32()?;
        let rtmult = pkt.decode_u32()?;
        let wtmax = pkt.decode_u32()?;
        let wtpref = pkt.decode_u32()?;
        let wtmult = pkt.decode_u32()?;
        let dtpref = pkt.decode_u32()?;
        let max_file_size = pkt.decode_u64()?;
        let seconds = pkt.decode_u32()? as u64;
        let nanoseconds = pkt.decode_u32()?;
        let properties = pkt.decode_u32()?;
        Ok(FsinfoResult {
            status,
            attr,
            rtmax,
            rtpref,
            rtmult,
            wtmax,
            wtpref,
            wtmult,
            dtpref,
            max_file_size,
            time_delta: crate::attr::NfsTime { seconds, nanoseconds },
            properties,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PathconfResult {
    pub status: nfsstat3,
    pub attr: Option<NfsAttr>,
    pub link_max: u32,
    pub name_max: u32,
    pub no_trunc: bool,
    pub chown_restricted: bool,
    pub case_insensitive: bool,
    pub case_preserving: bool,
}

pub struct Pathconf {
    pub fh: Vec<u8>,
}

impl RemoteCall for Pathconf {
    type Result = PathconfResult;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_PATHCONF
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.fh)
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<PathconfResult> {
        let status = nfsstat3::from_wire(pkt.decode_u32()?);
        let attr = decode_post_op_attr(pkt)?;
        if !status.is_ok() {
            return Ok(PathconfResult {
                status,
                attr,
                link_max: 0,
                name_max: 0,
                no_trunc: false,
                chown_restricted: false,
                case_insensitive: false,
                case_preserving: false,
            });
        }
        Ok(PathconfResult {
            status,
            attr,
            link_max: pkt.decode_u32()?,
            name_max: pkt.decode_u32()?,
            no_trunc: pkt.decode_bool()?,
            chown_restricted: pkt.decode_bool()?,
            case_insensitive: pkt.decode_bool()?,
            case_preserving: pkt.decode_bool()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CommitResult {
    pub status: nfsstat3,
    pub wcc: WccData,
    pub verifier: [u8; 8],
}

pub struct Commit {
    pub fh: Vec<u8>,
    pub offset: u64,
    pub count: u32,
}

impl RemoteCall for Commit {
    type Result = CommitResult;
    fn program(&self) -> u32 {
        PROGRAM
    }
    fn version(&self) -> u32 {
        VERSION
    }
    fn procedure(&self) -> u32 {
        PROC_COMMIT
    }
    fn encode_args(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_var_opaque(&self.fh)?;
        pkt.encode_u64(self.offset)?;
        pkt.encode_u32(self.count)
    }
    fn decode_result(&self, pkt: &mut Packet) -> io::Result<CommitResult> {
        let status = nfsstat3::from_wire(pkt.decode_u32()?);
        let wcc = decode_wcc_data(pkt)?;
        let verifier = if status.is_ok() { decode_verifier(pkt)? } else { [0; 8] };
        Ok(CommitResult { status, wcc, verifier })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn getattr_decodes_ok_attr() {
        let mut pkt = Packet::new();
        pkt.encode_u32(0).unwrap();
        pkt.encode_u32(1).unwrap(); // NF3REG
        pkt.encode_u32(0o644).unwrap();
        pkt.encode_u32(1).unwrap();
        pkt.encode_u32(0).unwrap();
        pkt.encode_u32(0).unwrap();
        pkt.encode_u64(0).unwrap();
        pkt.encode_u64(0).unwrap();
        pkt.encode_u32(0).unwrap();
        pkt.encode_u32(0).unwrap();
        pkt.encode_u64(1).unwrap();
        pkt.encode_u64(2).unwrap();
        pkt.encode_u32(0).unwrap();
        pkt.encode_u32(0).unwrap();
        pkt.encode_u32(0).unwrap();
        pkt.encode_u32(0).unwrap();
        pkt.encode_u32(0).unwrap();
        pkt.encode_u32(0).unwrap();
        pkt.seek_read(0);

        let call = GetAttr { fh: vec![1, 2, 3] };
        let result = call.decode_result(&mut pkt).unwrap();
        assert!(result.status.is_ok());
        assert_eq!(result.attr.unwrap().file_id, Some(2));
    }

    #[test]
    fn lookup_failure_still_carries_dir_attr_flag() {
        let mut pkt = Packet::new();
        pkt.encode_u32(2).unwrap(); // NFS3ERR_NOENT
        pkt.encode_bool(false).unwrap(); // no dir_attributes
        pkt.seek_read(0);
        let call = Lookup {
            dir_fh: vec![1],
            name: "missing".into(),
        };
        let result = call.decode_result(&mut pkt).unwrap();
        assert!(!result.status.is_ok());
        assert!(result.handle.is_none());
    }

    #[test]
    fn readdir_stops_at_terminating_false_and_reads_eof() {
        let mut pkt = Packet::new();
        pkt.encode_u32(0).unwrap();
        pkt.encode_bool(false).unwrap(); // no dir_attributes
        pkt.encode_fixed_opaque(&[0u8; 8], 8).unwrap();
        pkt.encode_bool(true).unwrap();
        pkt.encode_u64(42).unwrap();
        pkt.encode_string("a").unwrap();
        pkt.encode_u64(1).unwrap();
        pkt.encode_bool(false).unwrap(); // no more entries
        pkt.encode_bool(true).unwrap(); // eof
        pkt.seek_read(0);

        let call = Readdir {
            dir_fh: vec![1],
            cookie: 0,
            cookie_verf: [0; 8],
            count: 4096,
        };
        let result = call.decode_result(&mut pkt).unwrap();
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].name, "a");
        assert!(result.eof);
    }
}
