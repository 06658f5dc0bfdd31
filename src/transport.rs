//! The transport enum shared by the RPC, connection and group layers.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Udp,
    Tcp,
}

impl Transport {
    /// Concurrency gate size for this transport (spec §3): UDP allows 8
    /// outstanding calls per connection, TCP allows 128.
    pub fn concurrency_limit(self) -> usize {
        match self {
            Transport::Udp => 8,
            Transport::Tcp => 128,
        }
    }

    /// Timeout floor in milliseconds (spec §4.3/§5): UDP 10s, TCP 180s.
    pub fn timeout_floor_ms(self) -> u64 {
        match self {
            Transport::Udp => 10_000,
            Transport::Tcp => 180_000,
        }
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Udp => write!(f, "udp"),
            Transport::Tcp => write!(f, "tcp"),
        }
    }
}
