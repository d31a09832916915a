//! Working buffer sizing for packetization

use serde::{Deserialize, Serialize};

/// Upper bound on the bytes held in one read buffer.
///
/// Each chunk is a whole number of packets, so no packet straddles two reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPolicy {
    pub max_buffer_size: u64,
}

impl ChunkPolicy {
    pub const DEFAULT_MAX_BUFFER_SIZE: u64 = i32::MAX as u64;

    pub fn new(max_buffer_size: u64) -> Self {
        Self { max_buffer_size }
    }

    /// Length of the next chunk given the packet size and the bytes still to read.
    ///
    /// The cap is rounded up to a multiple of `packet_size` (at least one
    /// packet) and then clipped to `remaining`.
    pub fn chunk_len(&self, packet_size: u64, remaining: u64) -> u64 {
        if packet_size == 0 {
            return remaining;
        }

        let cap = self.max_buffer_size.max(packet_size);
        let whole = match cap % packet_size {
            0 => cap,
            rem => cap.saturating_add(packet_size - rem),
        };
        whole.min(remaining)
    }
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_BUFFER_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_remaining_is_read_whole() {
        let policy = ChunkPolicy::default();
        assert_eq!(policy.chunk_len(1024, 3000), 3000);
    }

    #[test]
    fn test_cap_rounds_up_to_whole_packets() {
        let policy = ChunkPolicy::new(1000);
        assert_eq!(policy.chunk_len(300, 10_000), 1200);
        assert_eq!(policy.chunk_len(250, 10_000), 1000);
    }

    #[test]
    fn test_cap_below_packet_size_still_reads_one_packet() {
        let policy = ChunkPolicy::new(10);
        assert_eq!(policy.chunk_len(64, 1000), 64);
        assert_eq!(policy.chunk_len(64, 20), 20);
    }

    #[test]
    fn test_default_cap_does_not_overflow() {
        let policy = ChunkPolicy::new(u64::MAX);
        assert_eq!(policy.chunk_len(7, u64::MAX), u64::MAX);
    }
}
