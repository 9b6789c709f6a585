//! Cache statistics snapshot.

/// Point-in-time view of one cache tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Current entry count.
    pub count: u64,
    /// Configured maximum population (`0` = unbounded).
    pub max: u32,
    /// Configured time-to-live in seconds (`0` = no expiry).
    pub ttl: u64,
}
