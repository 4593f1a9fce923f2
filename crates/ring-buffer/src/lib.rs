//! Bounded Ring Buffer
//!
//! Provides the fixed-capacity histories the presence engine keeps per
//! session: a count-bounded buffer for position samples and a time-windowed
//! buffer for raw observations.

mod buffer;

pub use buffer::RingBuffer;

/// Items that carry a capture timestamp, enabling time-window eviction
pub trait Timestamped {
    /// Capture time in milliseconds
    fn timestamp_ms(&self) -> u64;
}
