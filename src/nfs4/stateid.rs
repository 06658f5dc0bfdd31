//! `stateid4` (spec §3/§4.6): a 4-byte seqid plus a 12-byte opaque
//! server-chosen token, identifying an open or lock state.

use std::io;

use crate::packet::Packet;

pub const STATEID_OTHER_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stateid4 {
    pub seqid: u32,
    pub other: [u8; STATEID_OTHER_LEN],
}

impl Stateid4 {
    /// The all-zero anonymous stateid, used when no real OPEN/LOCK
    /// stateid is available (e.g. NFSv3-style byte-range I/O with no
    /// preceding OPEN, or a special stateid).
    pub fn anonymous() -> Self {
        Self {
            seqid: 0,
            other: [0u8; STATEID_OTHER_LEN],
        }
    }

    pub fn encode(&self, pkt: &mut Packet) -> io::Result<()> {
        pkt.encode_u32(self.seqid)?;
        pkt.encode_fixed_opaque(&self.other, STATEID_OTHER_LEN)
    }

    pub fn decode(pkt: &mut Packet) -> io::Result<Self> {
        let seqid = pkt.decode_u32()?;
        let bytes = pkt.decode_fixed_opaque(STATEID_OTHER_LEN)?;
        let mut other = [0u8; STATEID_OTHER_LEN];
        other.copy_from_slice(&bytes);
        Ok(Self { seqid, other })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stateid_round_trips() {
        let mut pkt = Packet::new();
        let sid = Stateid4 {
            seqid: 7,
            other: [9u8; STATEID_OTHER_LEN],
        };
        sid.encode(&mut pkt).unwrap();
        pkt.seek_read(0);
        let out = Stateid4::decode(&mut pkt).unwrap();
        assert_eq!(out, sid);
    }
}
