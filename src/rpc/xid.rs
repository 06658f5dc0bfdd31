//! Per-connection XID generator (spec §4.2, invariant P1).
//!
//! Each connection's counter is seeded from `time_ms + (pid << 16)` plus a
//! process-global salt that advances by a constant on every construction,
//! so concurrent connections draw XIDs from disjoint ranges even if they
//! are created within the same millisecond.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Bumped by a constant stride each time a generator is constructed so
/// distinct connections never overlap ranges.
static PROCESS_SALT: AtomicU32 = AtomicU32::new(0);

const SALT_STRIDE: u32 = 0x0100_0000;

#[derive(Debug)]
pub struct XidGenerator {
    next: AtomicU32,
}

impl XidGenerator {
    pub fn new() -> Self {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u32)
            .unwrap_or(0);
        let pid = std::process::id();
        let salt = PROCESS_SALT.fetch_add(SALT_STRIDE, Ordering::Relaxed);
        let seed = now_ms
            .wrapping_add((pid as u32).wrapping_shl(16))
            .wrapping_add(salt);
        Self {
            next: AtomicU32::new(seed),
        }
    }

    /// Returns the next XID for this connection. Never returns 0 so the
    /// value can double as a "no pending call" sentinel where convenient.
    pub fn next(&self) -> u32 {
        loop {
            let v = self.next.fetch_add(1, Ordering::Relaxed);
            if v != 0 {
                return v;
            }
        }
    }
}

impl Default for XidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successive_connections_get_disjoint_starting_ranges() {
        let a = XidGenerator::new();
        let b = XidGenerator::new();
        // The salt always advances, regardless of how close in time the
        // two generators were constructed.
        assert_ne!(a.next(), b.next());
    }

    #[test]
    fn xids_are_monotone_within_a_connection() {
        let gen = XidGenerator::new();
        let a = gen.next();
        let b = gen.next();
        assert_eq!(b, a.wrapping_add(1));
    }
}
