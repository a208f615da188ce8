//! Per-mode regulators and the dispatcher that selects between them.
//!
//! Each regulator exposes `arm` (build fresh state from the present
//! measurement and return the commands that establish the setpoint) and
//! `tick` (one control step).  Neither touches hardware: they return
//! [`Commands`] for the controller to execute in order.

pub mod direct;
pub mod mppt;
pub mod power;
pub mod resistance;
pub mod voltage_software;

use loadctl_types::{ActuatorCommand, Domain, RegulationMode};

use crate::context::TickContext;

pub use direct::DirectRegulator;
pub use mppt::{MpptPhase, MpptTracker};
pub use power::PowerRegulator;
pub use resistance::ResistanceRegulator;
pub use voltage_software::VoltageSoftwareRegulator;

/// Actuator commands produced by one arm or tick, in execution order.
pub type Commands = Vec<ActuatorCommand>;

/// The active mode together with its private search state.
///
/// Re-arming replaces the whole value, so no history from the previous
/// mode (or the previous setpoint in the same mode) survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regulator {
    ConstantCurrent(DirectRegulator),
    ConstantVoltage(DirectRegulator),
    ConstantPower(PowerRegulator),
    ConstantResistance(ResistanceRegulator),
    ConstantVoltageSoftware(VoltageSoftwareRegulator),
    MaximumPowerPoint(MpptTracker),
}

impl Regulator {
    /// Build the regulator for `mode` with the raw setpoint `value`.
    pub fn arm(mode: RegulationMode, value: u32, ctx: &TickContext<'_>) -> (Self, Commands) {
        match mode {
            RegulationMode::ConstantCurrent => {
                let (r, c) = DirectRegulator::arm(Domain::Current, value);
                (Self::ConstantCurrent(r), c)
            }
            RegulationMode::ConstantVoltage => {
                let (r, c) = DirectRegulator::arm(Domain::Voltage, value);
                (Self::ConstantVoltage(r), c)
            }
            RegulationMode::ConstantPower => {
                let (r, c) = PowerRegulator::arm(value, ctx);
                (Self::ConstantPower(r), c)
            }
            RegulationMode::ConstantResistance => {
                let (r, c) = ResistanceRegulator::arm(value, ctx);
                (Self::ConstantResistance(r), c)
            }
            RegulationMode::ConstantVoltageSoftware => {
                let (r, c) = VoltageSoftwareRegulator::arm(value, ctx);
                (Self::ConstantVoltageSoftware(r), c)
            }
            RegulationMode::MaximumPowerPoint => {
                let (r, c) = MpptTracker::arm(value, ctx);
                (Self::MaximumPowerPoint(r), c)
            }
        }
    }

    pub fn tick(&mut self, ctx: &TickContext<'_>) -> Commands {
        match self {
            Self::ConstantCurrent(r) | Self::ConstantVoltage(r) => r.tick(),
            Self::ConstantPower(r) => r.tick(ctx),
            Self::ConstantResistance(r) => r.tick(ctx),
            Self::ConstantVoltageSoftware(r) => r.tick(ctx),
            Self::MaximumPowerPoint(r) => r.tick(ctx),
        }
    }

    pub fn mode(&self) -> RegulationMode {
        match self {
            Self::ConstantCurrent(_) => RegulationMode::ConstantCurrent,
            Self::ConstantVoltage(_) => RegulationMode::ConstantVoltage,
            Self::ConstantPower(_) => RegulationMode::ConstantPower,
            Self::ConstantResistance(_) => RegulationMode::ConstantResistance,
            Self::ConstantVoltageSoftware(_) => RegulationMode::ConstantVoltageSoftware,
            Self::MaximumPowerPoint(_) => RegulationMode::MaximumPowerPoint,
        }
    }

    /// Raw setpoint in the mode's base unit.
    pub fn setpoint(&self) -> u32 {
        match self {
            Self::ConstantCurrent(r) | Self::ConstantVoltage(r) => r.setpoint(),
            Self::ConstantPower(r) => r.setpoint(),
            Self::ConstantResistance(r) => r.setpoint(),
            Self::ConstantVoltageSoftware(r) => r.setpoint(),
            Self::MaximumPowerPoint(r) => r.setpoint(),
        }
    }
}
