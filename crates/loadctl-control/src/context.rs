use loadctl_types::{ActiveRanges, MeasurementSnapshot, Microamps};

use crate::config::ControlConfig;

/// Everything a regulator may read during one arm or tick call.
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    pub measurement: &'a MeasurementSnapshot,
    pub ranges: ActiveRanges,
    pub config: &'a ControlConfig,
    /// Ceiling of the current actuator on its high range.
    pub current_ceiling: Microamps,
}
