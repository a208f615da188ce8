//! Read-only inputs polled by the regulation core once per pass.

use loadctl_types::{ActiveRanges, MeasurementSnapshot, Range, WriteCommand};

/// Publishes the latest unfiltered measurement.
pub trait MeasurementSource {
    fn snapshot(&self) -> MeasurementSnapshot;
}

/// Reports the ammeter and voltmeter ranges selected by range switching.
pub trait RangeDetector {
    fn current_range(&self) -> Range;

    fn voltage_range(&self) -> Range;

    fn active_ranges(&self) -> ActiveRanges {
        ActiveRanges {
            current: self.current_range(),
            voltage: self.voltage_range(),
        }
    }
}

/// Exposes the latest write command received by the transport.
pub trait CommandSource {
    /// `None` until the first command arrives.
    fn latest(&self) -> Option<WriteCommand>;
}
