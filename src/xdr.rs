//! XDR primitive encode/decode (RFC 4506), all big-endian, 4-byte aligned.
//!
//! These are free functions over `std::io::{Read, Write}`, the same shape
//! graymamba's `XDR` trait methods use (`serialize<W: Write>` /
//! `deserialize<R: Read>`), except expressed as primitives rather than a
//! per-type trait so `Packet` (src/packet.rs) can compose them directly
//! against its own cursor-tracked buffer.

use std::io::{self, Read, Write};

pub const fn pad_len(len: usize) -> usize {
    (4 - (len % 4)) % 4
}

pub fn encode_u32<W: Write>(dst: &mut W, v: u32) -> io::Result<()> {
    dst.write_all(&v.to_be_bytes())
}

pub fn decode_u32<R: Read>(src: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    src.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

pub fn encode_i32<W: Write>(dst: &mut W, v: i32) -> io::Result<()> {
    encode_u32(dst, v as u32)
}

pub fn decode_i32<R: Read>(src: &mut R) -> io::Result<i32> {
    Ok(decode_u32(src)? as i32)
}

pub fn encode_u64<W: Write>(dst: &mut W, v: u64) -> io::Result<()> {
    dst.write_all(&v.to_be_bytes())
}

pub fn decode_u64<R: Read>(src: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    src.read_exact(&mut buf)?;
    Ok(u64::from_be_bytes(buf))
}

pub fn encode_bool<W: Write>(dst: &mut W, v: bool) -> io::Result<()> {
    encode_u32(dst, if v { 1 } else { 0 })
}

pub fn decode_bool<R: Read>(src: &mut R) -> io::Result<bool> {
    Ok(decode_u32(src)? != 0)
}

/// Writes `len` bytes of `bytes` followed by `(4 - len mod 4) mod 4` zero
/// pad bytes.
pub fn encode_fixed_opaque<W: Write>(dst: &mut W, bytes: &[u8], len: usize) -> io::Result<()> {
    dst.write_all(&bytes[..len])?;
    let pad = [0u8; 4];
    dst.write_all(&pad[..pad_len(len)])
}

/// Reads `len` bytes, discarding the trailing padding.
pub fn decode_fixed_opaque<R: Read>(src: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let mut out = vec![0u8; len];
    src.read_exact(&mut out)?;
    let mut pad = [0u8; 4];
    src.read_exact(&mut pad[..pad_len(len)])?;
    Ok(out)
}

/// u32 length prefix then fixed opaque.
pub fn encode_var_opaque<W: Write>(dst: &mut W, bytes: &[u8]) -> io::Result<()> {
    encode_u32(dst, bytes.len() as u32)?;
    encode_fixed_opaque(dst, bytes, bytes.len())
}

pub fn decode_var_opaque<R: Read>(src: &mut R) -> io::Result<Vec<u8>> {
    let len = decode_u32(src)? as usize;
    decode_fixed_opaque(src, len)
}

/// Same wire shape as `encode_var_opaque`.
pub fn encode_string<W: Write>(dst: &mut W, s: &str) -> io::Result<()> {
    encode_var_opaque(dst, s.as_bytes())
}

pub fn decode_string<R: Read>(src: &mut R) -> io::Result<String> {
    let bytes = decode_var_opaque(src)?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn u32_round_trip() {
        let mut buf = Vec::new();
        encode_u32(&mut buf, 0xdead_beef).unwrap();
        assert_eq!(buf, 0xdead_beefu32.to_be_bytes());
        assert_eq!(decode_u32(&mut Cursor::new(buf)).unwrap(), 0xdead_beef);
    }

    #[test]
    fn fixed_opaque_pads_to_four_bytes_and_zeroes_padding() {
        let mut buf = Vec::new();
        encode_fixed_opaque(&mut buf, b"abc", 3).unwrap();
        assert_eq!(buf, vec![b'a', b'b', b'c', 0]);
        let out = decode_fixed_opaque(&mut Cursor::new(buf), 3).unwrap();
        assert_eq!(out, b"abc");
    }

    #[test]
    fn var_opaque_round_trip_arbitrary_bytes() {
        for sample in [&b""[..], b"a", b"ab", b"abc", b"abcd", b"abcde"] {
            let mut buf = Vec::new();
            encode_var_opaque(&mut buf, sample).unwrap();
            assert_eq!(buf.len() % 4, 0);
            let out = decode_var_opaque(&mut Cursor::new(buf)).unwrap();
            assert_eq!(out, sample);
        }
    }

    #[test]
    fn string_round_trip() {
        let mut buf = Vec::new();
        encode_string(&mut buf, "fma_42").unwrap();
        let out = decode_string(&mut Cursor::new(buf)).unwrap();
        assert_eq!(out, "fma_42");
    }
}
