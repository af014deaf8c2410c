//! Unified event stream for the device engine
//!
//! Everything the engine reports to the DSP/GUI side (signal changes,
//! stream and board telemetry, errors) is emitted through a single event
//! channel, preserving the order in which the engine produced it.

/// Unified event enum for all device activity
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// The effective sample rate or center frequency of one stream changed
    Signal {
        /// Effective stream rate in Hz (device rate over the software
        /// decimation/interpolation factor)
        sample_rate: u32,
        /// Effective stream center frequency in Hz, NCO shift included
        center_frequency: i64,
        /// RX stream if true, TX stream otherwise
        rx: bool,
        /// Stream index (0 or 1; both channels share the derived rate)
        stream_index: usize,
    },

    /// The clock generator plan changed (sample rate or reference clock);
    /// emitted once per reconciliation that touches either direction
    ClockGenChanged,

    /// Snapshot of streaming state and hardware FIFO levels
    StreamInfo {
        /// RX stream worker running
        rx_active: bool,
        /// TX stream worker running
        tx_active: bool,
        /// RX hardware FIFO fill level in samples
        rx_fifo_level: u64,
        /// TX hardware FIFO fill level in samples
        tx_fifo_level: u64,
        /// Hardware FIFO capacity in samples
        fifo_capacity: u32,
    },

    /// Board telemetry snapshot
    DeviceInfo {
        /// Board temperature in degrees Celsius (0.0 when unavailable)
        board_temperature_c: f64,
        /// GPS lock status
        gps_locked: bool,
    },

    /// An error occurred in the engine or a hardware call
    Error {
        /// Source of the error
        source: String,
        /// Error message
        message: String,
    },
}

impl DeviceEvent {
    /// Check if this is a per-stream signal change
    pub fn is_signal(&self) -> bool {
        matches!(self, DeviceEvent::Signal { .. })
    }

    /// Check if this is a telemetry report
    pub fn is_telemetry(&self) -> bool {
        matches!(
            self,
            DeviceEvent::StreamInfo { .. } | DeviceEvent::DeviceInfo { .. }
        )
    }

    /// Get the stream index if this event targets a specific stream
    pub fn stream_index(&self) -> Option<usize> {
        match self {
            DeviceEvent::Signal { stream_index, .. } => Some(*stream_index),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_classification() {
        let signal = DeviceEvent::Signal {
            sample_rate: 2_500_000,
            center_frequency: 435_000_000,
            rx: true,
            stream_index: 1,
        };
        assert!(signal.is_signal());
        assert!(!signal.is_telemetry());
        assert_eq!(signal.stream_index(), Some(1));

        let info = DeviceEvent::DeviceInfo {
            board_temperature_c: 41.5,
            gps_locked: false,
        };
        assert!(info.is_telemetry());
        assert_eq!(info.stream_index(), None);
    }
}
