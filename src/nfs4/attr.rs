//! NFSv4 status codes and the `fattr4` bitmap-selected attribute blob
//! (spec §4.6, design table in spec §9).
//!
//! `fattr4` is encoded as a length-prefixed two-word bitmap followed by a
//! length-prefixed opaque blob: the concatenation, in canonical attribute
//! order (word 0 LSB first, then word 1 LSB first), of every bit set.
//! Only the attribute subset spec §9 names as explicitly supported is
//! encoded/decoded; other bits are rejected on send and, if encountered on
//! receive, consumed opaquely by seeking to the end of the blob (spec §9:
//! "tolerated ... their bytes consumed opaquely").

use std::io;

use tracing::warn;

use crate::attr::{NfsAttr, NfsFileType, NfsFsId, NfsTime};
use crate::packet::Packet;

/// NFSv4 status (`nfsstat4`). The error-class list spec §4.6 names for
/// the seqid-advancement exception is called out explicitly; everything
/// else the server can legally return is carried in `Other`.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum nfsstat4 {
    Ok,
    Perm,
    NoEnt,
    Access,
    Exist,
    NotDir,
    IsDir,
    Inval,
    NoSpc,
    Stale,
    BadHandle,
    NotSupp,
    Delay,
    Denied,
    Expired,
    Locked,
    Grace,
    FhExpired,
    ShareDenied,
    ClidInUse,
    Resource,
    Moved,
    NoFileHandle,
    StaleClientid,
    StaleStateid,
    OldStateid,
    BadStateid,
    BadSeqid,
    BadXdr,
    OpIllegal,
    Other(u32),
}

impl nfsstat4 {
    pub fn from_wire(v: u32) -> Self {
        match v {
            0 => nfsstat4::Ok,
            1 => nfsstat4::Perm,
            2 => nfsstat4::NoEnt,
            13 => nfsstat4::Access,
            17 => nfsstat4::Exist,
            20 => nfsstat4::NotDir,
            21 => nfsstat4::IsDir,
            22 => nfsstat4::Inval,
            28 => nfsstat4::NoSpc,
            70 => nfsstat4::Stale,
            10001 => nfsstat4::BadHandle,
            10004 => nfsstat4::NotSupp,
            10008 => nfsstat4::Delay,
            10010 => nfsstat4::Denied,
            10011 => nfsstat4::Expired,
            10012 => nfsstat4::Locked,
            10013 => nfsstat4::Grace,
            10014 => nfsstat4::FhExpired,
            10015 => nfsstat4::ShareDenied,
            10017 => nfsstat4::ClidInUse,
            10018 => nfsstat4::Resource,
            10019 => nfsstat4::Moved,
            10020 => nfsstat4::NoFileHandle,
            10022 => nfsstat4::StaleClientid,
            10023 => nfsstat4::StaleStateid,
            10024 => nfsstat4::OldStateid,
            10025 => nfsstat4::BadStateid,
            10026 => nfsstat4::BadSeqid,
            10036 => nfsstat4::BadXdr,
            10044 => nfsstat4::OpIllegal,
            other => nfsstat4::Other(other),
        }
    }

    pub fn is_ok(self) -> bool {
        matches!(self, nfsstat4::Ok)
    }

    /// The error-class exception list from spec §4.6: a compound ending
    /// in one of these does *not* advance the seqid counter it carried.
    pub fn suppresses_seqid_advance(self) -> bool {
        matches!(
            self,
            nfsstat4::StaleClientid
                | nfsstat4::StaleStateid
                | nfsstat4::BadStateid
                | nfsstat4::BadSeqid
                | nfsstat4::BadXdr
                | nfsstat4::Resource
                | nfsstat4::NoFileHandle
                | nfsstat4::Moved
        )
    }
}

/// Bit positions within the two-word `bitmap4`, word-major (word 0 bits
/// 0..31, word 1 bits 32..63), for the attributes this crate knows how to
/// encode/decode (spec §9's explicitly-supported list).
mod bit {
    pub const TYPE: u32 = 1;
    pub const SIZE: u32 = 4;
    pub const FSID: u32 = 8;
    pub const FILEID: u32 = 20;
    pub const MODE: u32 = 33;
    pub const NUMLINKS: u32 = 35;
    pub const OWNER: u32 = 36;
    pub const OWNER_GROUP: u32 = 37;
    pub const SPACE_USED: u32 = 45;
    pub const TIME_ACCESS: u32 = 47;
    pub const TIME_METADATA: u32 = 52;
    pub const TIME_MODIFY: u32 = 53;

    /// Every bit this crate knows about, in strict ascending (= canonical
    /// wire) order.
    pub const ALL: [u32; 12] = [
        TYPE,
        SIZE,
        FSID,
        FILEID,
        MODE,
        NUMLINKS,
        OWNER,
        OWNER_GROUP,
        SPACE_USED,
        TIME_ACCESS,
        TIME_METADATA,
        TIME_MODIFY,
    ];
}

fn set_bit(words: &mut [u32; 2], bitnum: u32) {
    let word = (bitnum / 32) as usize;
    words[word] |= 1 << (bitnum % 32);
}

fn bit_set(words: [u32; 2], bitnum: u32) -> bool {
    let word = (bitnum / 32) as usize;
    words[word] & (1 << (bitnum % 32)) != 0
}

/// Builds the two-word request bitmap for the attributes `attr.mask`
/// selects, restricted to the supported set (spec §9: unsupported bits
/// are "rejected on send", i.e. simply never requested).
pub fn request_bitmap(attr: &NfsAttr) -> [u32; 2] {
    let mut out = [0u32; 2];
    for &b in &bit::ALL {
        if bit_set(attr.mask, b) {
            set_bit(&mut out, b);
        }
    }
    out
}

/// All twelve supported attributes, for GETATTR calls that want
/// everything this crate can decode.
pub fn full_bitmap() -> [u32; 2] {
    let mut out = [0u32; 2];
    for &b in &bit::ALL {
        set_bit(&mut out, b);
    }
    out
}

pub fn encode_bitmap(pkt: &mut Packet, words: [u32; 2]) -> io::Result<()> {
    pkt.encode_u32(2)?;
    pkt.encode_u32(words[0])?;
    pkt.encode_u32(words[1])
}

pub fn decode_bitmap(pkt: &mut Packet) -> io::Result<[u32; 2]> {
    let count = pkt.decode_u32()?;
    let mut words = [0u32; 2];
    for w in words.iter_mut().take(count as usize).take(2) {
        *w = pkt.decode_u32()?;
    }
    for _ in 2..count {
        pkt.decode_u32()?;
    }
    Ok(words)
}

/// Encodes `attr4`'s opaque value blob: a u32 length prefix around the
/// concatenation, in bitmap order, of every attribute `attr.mask` selects
/// (spec §4.6/§9).
pub fn encode_fattr4(pkt: &mut Packet, attr: &NfsAttr) -> io::Result<()> {
    let words = request_bitmap(attr);
    encode_bitmap(pkt, words)?;

    let mut body = Packet::new();
    if bit_set(words, bit::TYPE) {
        body.encode_u32(attr.file_type.unwrap_or(NfsFileType::Reg).to_wire())?;
    }
    if bit_set(words, bit::SIZE) {
        body.encode_u64(attr.size.unwrap_or(0))?;
    }
    if bit_set(words, bit::FSID) {
        let fsid = attr.fsid.unwrap_or_default();
        body.encode_u64(fsid.major)?;
        body.encode_u64(fsid.minor)?;
    }
    if bit_set(words, bit::FILEID) {
        body.encode_u64(attr.file_id.unwrap_or(0))?;
    }
    if bit_set(words, bit::MODE) {
        body.encode_u32(attr.mode.unwrap_or(0))?;
    }
    if bit_set(words, bit::NUMLINKS) {
        body.encode_u32(attr.num_links.unwrap_or(1))?;
    }
    if bit_set(words, bit::OWNER) {
        body.encode_string(attr.owner.as_deref().unwrap_or(""))?;
    }
    if bit_set(words, bit::OWNER_GROUP) {
        body.encode_string(attr.owner_group.as_deref().unwrap_or(""))?;
    }
    if bit_set(words, bit::SPACE_USED) {
        body.encode_u64(attr.space_used.unwrap_or(0))?;
    }
    if bit_set(words, bit::TIME_ACCESS) {
        let t = attr.time_access.unwrap_or_default();
        body.encode_u64(t.seconds)?;
        body.encode_u32(t.nanoseconds)?;
    }
    if bit_set(words, bit::TIME_METADATA) {
        let t = attr.time_metadata.unwrap_or_default();
        body.encode_u64(t.seconds)?;
        body.encode_u32(t.nanoseconds)?;
    }
    if bit_set(words, bit::TIME_MODIFY) {
        let t = attr.time_modify.unwrap_or_default();
        body.encode_u64(t.seconds)?;
        body.encode_u32(t.nanoseconds)?;
    }

    pkt.encode_var_opaque(body.as_bytes())
}

/// Decodes an `fattr4` blob into `NfsAttr`, recording which bits were
/// actually present in `attr.mask`. If a bit outside the supported set
/// appears before the supported ones are exhausted, decoding of the
/// remaining supported bits stops and the reader seeks to the end of the
/// blob (its bytes are "consumed opaquely", spec §9).
pub fn decode_fattr4(pkt: &mut Packet) -> io::Result<NfsAttr> {
    let words = decode_bitmap(pkt)?;
    let blob_len = pkt.decode_u32()? as usize;
    let blob_start = pkt.read_pos();
    let blob_end = blob_start + blob_len;

    let mut attr = NfsAttr::new();
    attr.mask = words;

    'bits: for bit_num in 0u32..64 {
        if !bit_set(words, bit_num) {
            continue;
        }
        if !bit::ALL.contains(&bit_num) {
            warn!(bit_num, "fattr4: unsupported attribute bit, consuming blob opaquely");
            break 'bits;
        }
        match bit_num {
            b if b == bit::TYPE => {
                attr.file_type = Some(NfsFileType::from_wire(pkt.decode_u32()?));
            }
            b if b == bit::SIZE => attr.size = Some(pkt.decode_u64()?),
            b if b == bit::FSID => {
                let major = pkt.decode_u64()?;
                let minor = pkt.decode_u64()?;
                attr.fsid = Some(NfsFsId { major, minor });
            }
            b if b == bit::FILEID => attr.file_id = Some(pkt.decode_u64()?),
            b if b == bit::MODE => attr.mode = Some(pkt.decode_u32()?),
            b if b == bit::NUMLINKS => attr.num_links = Some(pkt.decode_u32()?),
            b if b == bit::OWNER => attr.owner = Some(pkt.decode_string()?),
            b if b == bit::OWNER_GROUP => attr.owner_group = Some(pkt.decode_string()?),
            b if b == bit::SPACE_USED => attr.space_used = Some(pkt.decode_u64()?),
            b if b == bit::TIME_ACCESS => {
                let seconds = pkt.decode_u64()?;
                let nanoseconds = pkt.decode_u32()?;
                attr.time_access = Some(NfsTime { seconds, nanoseconds });
            }
            b if b == bit::TIME_METADATA => {
                let seconds = pkt.decode_u64()?;
                let nanoseconds = pkt.decode_u32()?;
                attr.time_metadata = Some(NfsTime { seconds, nanoseconds });
            }
            b if b == bit::TIME_MODIFY => {
                let seconds = pkt.decode_u64()?;
                let nanoseconds = pkt.decode_u32()?;
                attr.time_modify = Some(NfsTime { seconds, nanoseconds });
            }
            _ => unreachable!("bit not in bit::ALL filtered above"),
        }
    }

    // Whether we decoded every supported bit cleanly or bailed early on an
    // unsupported one, the blob's declared length is authoritative.
    pkt.seek_read(blob_end);
    Ok(attr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fattr4_round_trips_the_supported_subset() {
        let mut attr = NfsAttr::new();
        attr.mask = full_bitmap();
        attr.file_type = Some(NfsFileType::Dir);
        attr.size = Some(4096);
        attr.fsid = Some(NfsFsId { major: 1, minor: 2 });
        attr.file_id = Some(42);
        attr.mode = Some(0o755);
        attr.num_links = Some(3);
        attr.owner = Some("root".into());
        attr.owner_group = Some("root".into());
        attr.space_used = Some(4096);
        attr.time_access = Some(NfsTime { seconds: 1, nanoseconds: 2 });
        attr.time_metadata = Some(NfsTime { seconds: 3, nanoseconds: 4 });
        attr.time_modify = Some(NfsTime { seconds: 5, nanoseconds: 6 });

        let mut pkt = Packet::new();
        encode_fattr4(&mut pkt, &attr).unwrap();
        pkt.seek_read(0);
        let out = decode_fattr4(&mut pkt).unwrap();

        assert_eq!(out.file_type, Some(NfsFileType::Dir));
        assert_eq!(out.size, Some(4096));
        assert_eq!(out.file_id, Some(42));
        assert_eq!(out.mode, Some(0o755));
        assert_eq!(out.owner.as_deref(), Some("root"));
        assert_eq!(out.time_modify.unwrap().seconds, 5);
    }

    #[test]
    fn bitmap_round_trips_two_words() {
        let mut pkt = Packet::new();
        encode_bitmap(&mut pkt, [0x1234, 0x5678]).unwrap();
        pkt.seek_read(0);
        assert_eq!(decode_bitmap(&mut pkt).unwrap(), [0x1234, 0x5678]);
    }
}
