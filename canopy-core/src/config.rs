use crate::radio::{DataRate, PowerLevel};

/// Tunables for a mesh node. The defaults match a small 2.4 GHz deployment
/// and are what [`MeshConfig::default`] hands out; most embedders only ever
/// change the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshConfig {
    /// Radio channel, 1-127.
    pub channel: u8,
    /// On-air data rate.
    pub data_rate: DataRate,
    /// Transmit power.
    pub power: PowerLevel,
    /// How long `begin` and `renew_address` keep retrying the join protocol
    /// before giving up, in milliseconds.
    pub renewal_timeout_ms: u32,
    /// Budget for id-to-address lookups performed on behalf of
    /// id-addressed writes, in milliseconds.
    pub lookup_timeout_ms: u32,
    /// How long a joiner collects poll replies, in milliseconds.
    pub poll_timeout_ms: u32,
    /// How many poll replies a joiner collects before it stops listening.
    pub max_polls: usize,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            channel: 97,
            data_rate: DataRate::Mbps1,
            power: PowerLevel::Max,
            renewal_timeout_ms: 60_000,
            lookup_timeout_ms: 3_000,
            poll_timeout_ms: 150,
            max_polls: 4,
        }
    }
}
