//! Growable byte buffer with explicit bounds checks (spec §4.1).
//!
//! This is the container `Packet` wraps with its read/write cursors. It
//! grows geometrically: a `reserve` that would overflow the current
//! capacity doubles the capacity, or doubles the requested size,
//! whichever is larger.

use std::io;

#[derive(Debug, Clone, Default)]
pub struct ByteBuffer {
    data: Vec<u8>,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            data: Vec::with_capacity(cap),
        }
    }

    /// Appends `bytes` to the end of the buffer, growing as needed.
    pub fn append(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len());
        self.data.extend_from_slice(bytes);
    }

    /// Ensures at least `extra` more bytes can be appended without a
    /// further allocation, growing geometrically.
    pub fn reserve(&mut self, extra: usize) {
        let need = self.data.len() + extra;
        if need <= self.data.capacity() {
            return;
        }
        let doubled = self.data.capacity().saturating_mul(2);
        let target = doubled.max(need.saturating_mul(2)).max(64);
        self.data.reserve(target - self.data.len());
    }

    /// Reads `len` bytes starting at `offset`. Fails if the read would run
    /// past the buffer's capacity.
    pub fn read_at(&self, offset: usize, len: usize) -> io::Result<&[u8]> {
        if offset.saturating_add(len) > self.data.capacity() || offset.saturating_add(len) > self.data.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "read_at({offset}, {len}) past buffer size {}",
                    self.data.len()
                ),
            ));
        }
        Ok(&self.data[offset..offset + len])
    }

    /// Overwrites `len` bytes of already-appended data starting at
    /// `offset`. Used to patch the TCP record-marking header once the
    /// final length is known. Fails if the write would extend past the
    /// currently appended data (writes inside already-appended data only).
    pub fn write_at(&mut self, offset: usize, bytes: &[u8], len: usize) -> io::Result<()> {
        if offset.saturating_add(len) >= self.data.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "write_at({offset}, {len}) past buffer size {}",
                    self.data.len()
                ),
            ));
        }
        self.data[offset..offset + len].copy_from_slice(&bytes[..len]);
        Ok(())
    }

    /// Extends the buffer with `len` zero bytes, used to preallocate
    /// space for a fragment payload as it streams in.
    pub fn extend_zeroed(&mut self, len: usize) {
        self.reserve(len);
        self.data.resize(self.data.len() + len, 0);
    }

    pub fn begin(&self) -> *const u8 {
        self.data.as_ptr()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_grows_and_reads_back() {
        let mut b = ByteBuffer::new();
        b.append(b"hello");
        b.append(b" world");
        assert_eq!(b.size(), 11);
        assert_eq!(b.read_at(0, 5).unwrap(), b"hello");
        assert_eq!(b.read_at(6, 5).unwrap(), b"world");
    }

    #[test]
    fn read_at_past_end_fails() {
        let mut b = ByteBuffer::new();
        b.append(b"abc");
        assert!(b.read_at(0, 10).is_err());
    }

    #[test]
    fn write_at_patches_header_in_place() {
        let mut b = ByteBuffer::new();
        b.append(&[0u8; 4]);
        b.append(b"payload");
        b.write_at(0, &0xdead_beefu32.to_be_bytes(), 4).unwrap();
        assert_eq!(b.read_at(0, 4).unwrap(), &0xdead_beefu32.to_be_bytes());
        assert_eq!(b.read_at(4, 7).unwrap(), b"payload");
    }

    #[test]
    fn write_at_past_appended_data_fails() {
        let mut b = ByteBuffer::new();
        b.append(b"abc");
        assert!(b.write_at(2, b"zz", 2).is_err());
    }
}
