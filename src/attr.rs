//! `NfsAttr` and its supporting value types (spec §3): the shared
//! decoded-attribute carrier used both as a v3/v4 request selector
//! ("please return these attributes") and as a response carrier. The wire
//! encodings live in `nfs3::types` (`fattr3`) and `nfs4::attr` (`fattr4`);
//! this is the protocol-neutral struct callers actually read.

/// `NfsFileType`, mirroring the v3/v4 `ftype3`/`nfs_ftype4` wire
/// enumerations (they share numeric values 1..=8 up to `NF3FIFO`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NfsFileType {
    None = 0,
    Reg = 1,
    Dir = 2,
    Blk = 3,
    Chr = 4,
    Lnk = 5,
    Sock = 6,
    Fifo = 7,
    AttrDir = 8,
    NamedAttr = 9,
}

impl NfsFileType {
    pub fn from_wire(v: u32) -> Self {
        match v {
            1 => NfsFileType::Reg,
            2 => NfsFileType::Dir,
            3 => NfsFileType::Blk,
            4 => NfsFileType::Chr,
            5 => NfsFileType::Lnk,
            6 => NfsFileType::Sock,
            7 => NfsFileType::Fifo,
            8 => NfsFileType::AttrDir,
            9 => NfsFileType::NamedAttr,
            _ => NfsFileType::None,
        }
    }

    pub fn to_wire(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NfsFsId {
    pub major: u64,
    pub minor: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NfsTime {
    pub seconds: u64,
    pub nanoseconds: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NfsAccess {
    pub supported: u32,
    pub access: u32,
}

/// Decoded attribute subset plus the two-word bitmap selector (spec §3).
/// `mask` records which fields below are meaningful: on a request it
/// selects which attributes to ask for, on a reply it records which ones
/// the server actually returned.
#[derive(Debug, Clone, Default)]
pub struct NfsAttr {
    pub mask: [u32; 2],
    pub file_type: Option<NfsFileType>,
    pub change_id: Option<u64>,
    pub size: Option<u64>,
    pub fsid: Option<NfsFsId>,
    pub file_id: Option<u64>,
    pub mode: Option<u32>,
    pub num_links: Option<u32>,
    pub owner: Option<String>,
    pub owner_group: Option<String>,
    pub raw_device: Option<(u32, u32)>,
    pub space_used: Option<u64>,
    pub time_access: Option<NfsTime>,
    pub time_metadata: Option<NfsTime>,
    pub time_modify: Option<NfsTime>,
}

impl NfsAttr {
    pub fn new() -> Self {
        Self::default()
    }
}
