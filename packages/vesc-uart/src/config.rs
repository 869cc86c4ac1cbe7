//! Connection settings.

use std::time::Duration;

/// Baud rate the firmware's UART app uses out of the box.
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Upper bound on a reply payload accepted by the receiver.
///
/// Matches the firmware's own packet buffer size.
pub const DEFAULT_MAX_PAYLOAD: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VescConfig {
    pub baud_rate: u32,

    /// Deadline for an ordinary request/response round trip.
    pub reply_timeout: Duration,

    /// Deadline for a CAN scan. The controller pings every id before it
    /// answers, so this is much longer than `reply_timeout`.
    pub scan_timeout: Duration,

    /// Frames announcing a longer payload are discarded.
    pub max_payload: usize,

    /// Time slept between polls of an idle transport. Zero spins.
    pub poll_interval: Duration,
}

impl Default for VescConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            reply_timeout: Duration::from_millis(100),
            scan_timeout: Duration::from_secs(3),
            max_payload: DEFAULT_MAX_PAYLOAD,
            poll_interval: Duration::from_millis(1),
        }
    }
}

impl VescConfig {
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}
