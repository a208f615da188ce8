//! [`ErrorAggregator`] – merges the two actuator subsystems' faults into a
//! single [`ErrorRecord`].
//!
//! Each pass compares both subsystems' fault counters with the values seen on
//! the previous pass.  Any change counts as one new fault, whatever the delta,
//! and overwrites the stored code.  The current subsystem is checked before the
//! voltage subsystem, so when both fault in one pass the voltage code is the
//! one left visible.

use loadctl_hal::Actuator;
use loadctl_types::{Domain, ErrorRecord, FaultCode};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorAggregator {
    record: ErrorRecord,
    seen_current: u8,
    seen_voltage: u8,
}

impl ErrorAggregator {
    /// Start with an empty record, treating faults already counted by the
    /// actuators as seen.
    pub fn new(current: &impl Actuator, voltage: &impl Actuator) -> Self {
        Self {
            record: ErrorRecord::default(),
            seen_current: current.fault_counter(),
            seen_voltage: voltage.fault_counter(),
        }
    }

    /// Merge new faults.  Returns `true` if the record changed.
    pub fn poll(&mut self, current: &impl Actuator, voltage: &impl Actuator) -> bool {
        let mut changed = false;
        if let Some(code) = Self::observe(&mut self.seen_current, current) {
            self.merge(Domain::Current, code);
            changed = true;
        }
        if let Some(code) = Self::observe(&mut self.seen_voltage, voltage) {
            self.merge(Domain::Voltage, code);
            changed = true;
        }
        changed
    }

    pub fn record(&self) -> ErrorRecord {
        self.record
    }

    fn observe(seen: &mut u8, actuator: &impl Actuator) -> Option<FaultCode> {
        let counter = actuator.fault_counter();
        if counter == *seen {
            return None;
        }
        *seen = counter;
        Some(actuator.last_fault())
    }

    fn merge(&mut self, source: Domain, code: FaultCode) {
        self.record.counter = self.record.counter.wrapping_add(1);
        self.record.code = code;
        warn!(
            ?source,
            %code,
            count = self.record.counter,
            "actuator fault"
        );
    }
}
