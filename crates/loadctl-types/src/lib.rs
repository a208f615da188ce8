//! Shared vocabulary of the electronic-load regulation core.
//!
//! All electrical quantities are unsigned integers in fixed sub-units:
//! microamps, microvolts, microwatts and milliohms.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current in microamps.
pub type Microamps = u32;
/// Voltage in microvolts.
pub type Microvolts = u32;
/// Power in microwatts.
pub type Microwatts = u32;
/// Resistance in milliohms.
pub type Milliohms = u32;

/// The regulation mode currently driving the load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegulationMode {
    ConstantCurrent,
    ConstantVoltage,
    ConstantPower,
    ConstantResistance,
    /// Constant voltage regulated through the current actuator.
    ConstantVoltageSoftware,
    /// Maximum power point tracking on the voltage actuator.
    MaximumPowerPoint,
}

impl RegulationMode {
    /// Native unit of the setpoint for this mode.
    pub fn unit(self) -> Unit {
        match self {
            RegulationMode::ConstantCurrent => Unit::Microamps,
            RegulationMode::ConstantVoltage
            | RegulationMode::ConstantVoltageSoftware
            | RegulationMode::MaximumPowerPoint => Unit::Microvolts,
            RegulationMode::ConstantPower => Unit::Microwatts,
            RegulationMode::ConstantResistance => Unit::Milliohms,
        }
    }
}

impl fmt::Display for RegulationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegulationMode::ConstantCurrent => "CC",
            RegulationMode::ConstantVoltage => "CV",
            RegulationMode::ConstantPower => "CP",
            RegulationMode::ConstantResistance => "CR",
            RegulationMode::ConstantVoltageSoftware => "CV-SW",
            RegulationMode::MaximumPowerPoint => "MPPT",
        };
        f.write_str(name)
    }
}

/// Sub-unit a raw setpoint is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Microamps,
    Microvolts,
    Microwatts,
    Milliohms,
}

impl Unit {
    /// Number of sub-units in one base SI unit (A, V, W or Ω).
    pub fn per_base_unit(self) -> f64 {
        match self {
            Unit::Microamps | Unit::Microvolts | Unit::Microwatts => 1e6,
            Unit::Milliohms => 1e3,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Microamps => "A",
            Unit::Microvolts => "V",
            Unit::Microwatts => "W",
            Unit::Milliohms => "Ω",
        }
    }
}

/// The electrical domain an actuator or step size acts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    Current,
    Voltage,
}

/// Hardware gain range of the ammeter or voltmeter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Range {
    #[default]
    Low,
    High,
}

/// Ranges active at the moment a tick runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActiveRanges {
    pub current: Range,
    pub voltage: Range,
}

impl ActiveRanges {
    pub fn for_domain(&self, domain: Domain) -> Range {
        match domain {
            Domain::Current => self.current,
            Domain::Voltage => self.voltage,
        }
    }
}

/// Search direction of a hill-climbing regulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Direction::Increase => Direction::Decrease,
            Direction::Decrease => Direction::Increase,
        }
    }
}

/// One latest measurement as published by the measurement pipeline.
///
/// Values are unfiltered. `counter` increments (wrapping) on every new
/// sample; `timestamp_ms` is a wrapping millisecond clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MeasurementSnapshot {
    pub voltage_uv: Microvolts,
    pub current_ua: Microamps,
    pub power_uw: Microwatts,
    pub resistance_mohm: Milliohms,
    pub counter: u8,
    pub timestamp_ms: u32,
}

impl MeasurementSnapshot {
    /// Measured quantity in the given actuator domain.
    pub fn in_domain(&self, domain: Domain) -> u32 {
        match domain {
            Domain::Current => self.current_ua,
            Domain::Voltage => self.voltage_uv,
        }
    }
}

/// Operation sent to one of the two actuators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActuatorOp {
    SetAbsolute(u32),
    Increment(u32),
    Decrement(u32),
    /// Re-assert the last commanded value.
    Apply,
}

/// An [`ActuatorOp`] addressed to the current or voltage actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorCommand {
    pub domain: Domain,
    pub op: ActuatorOp,
}

impl ActuatorCommand {
    pub fn current(op: ActuatorOp) -> Self {
        Self {
            domain: Domain::Current,
            op,
        }
    }

    pub fn voltage(op: ActuatorOp) -> Self {
        Self {
            domain: Domain::Voltage,
            op,
        }
    }

    /// Move the actuator in `domain` by `step` in `direction`.
    pub fn nudge(domain: Domain, direction: Direction, step: u32) -> Self {
        let op = match direction {
            Direction::Increase => ActuatorOp::Increment(step),
            Direction::Decrease => ActuatorOp::Decrement(step),
        };
        Self { domain, op }
    }
}

/// Opaque fault code reported by an actuator subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FaultCode(pub u8);

impl FaultCode {
    pub const NONE: FaultCode = FaultCode(0);
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// Most recent fault plus a wrapping count of every fault seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub code: FaultCode,
    pub counter: u8,
}

/// Electrical character of the load, signalled to range-switching logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CccvState {
    #[default]
    Cc,
    Cv,
}

/// Write commands understood by the regulation core, keyed by their wire
/// code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    ConstantCurrent = 1,
    ConstantVoltage = 2,
    ConstantPowerCc = 3,
    ConstantPowerCv = 4,
    ConstantResistanceCc = 5,
    ConstantResistanceCv = 6,
    ConstantVoltageSoftware = 7,
    Mppt = 8,
}

impl CommandKind {
    /// Mask selecting the command number from the command byte.
    pub const CODE_MASK: u8 = 0x1F;

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn mode(self) -> RegulationMode {
        match self {
            CommandKind::ConstantCurrent => RegulationMode::ConstantCurrent,
            CommandKind::ConstantVoltage => RegulationMode::ConstantVoltage,
            CommandKind::ConstantPowerCc | CommandKind::ConstantPowerCv => {
                RegulationMode::ConstantPower
            }
            CommandKind::ConstantResistanceCc | CommandKind::ConstantResistanceCv => {
                RegulationMode::ConstantResistance
            }
            CommandKind::ConstantVoltageSoftware => RegulationMode::ConstantVoltageSoftware,
            CommandKind::Mppt => RegulationMode::MaximumPowerPoint,
        }
    }

    /// Electrical character the host usually selects alongside this command.
    pub fn cccv_hint(self) -> CccvState {
        match self {
            CommandKind::ConstantCurrent
            | CommandKind::ConstantPowerCc
            | CommandKind::ConstantResistanceCc
            | CommandKind::ConstantVoltageSoftware => CccvState::Cc,
            CommandKind::ConstantVoltage
            | CommandKind::ConstantPowerCv
            | CommandKind::ConstantResistanceCv
            | CommandKind::Mppt => CccvState::Cv,
        }
    }
}

impl TryFrom<u8> for CommandKind {
    type Error = LoadError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte & Self::CODE_MASK {
            1 => Ok(CommandKind::ConstantCurrent),
            2 => Ok(CommandKind::ConstantVoltage),
            3 => Ok(CommandKind::ConstantPowerCc),
            4 => Ok(CommandKind::ConstantPowerCv),
            5 => Ok(CommandKind::ConstantResistanceCc),
            6 => Ok(CommandKind::ConstantResistanceCv),
            7 => Ok(CommandKind::ConstantVoltageSoftware),
            8 => Ok(CommandKind::Mppt),
            other => Err(LoadError::UnknownCommand(other)),
        }
    }
}

/// The latest write command received by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WriteCommand {
    /// Wrapping sequence number; a change means a new command arrived.
    pub counter: u8,
    /// Raw command byte.
    pub command: u8,
    /// Payload, least significant byte first.
    pub data: [u8; 4],
}

impl WriteCommand {
    pub fn new(counter: u8, kind: CommandKind, value: u32) -> Self {
        Self {
            counter,
            command: kind.code(),
            data: value.to_le_bytes(),
        }
    }

    pub fn kind(&self) -> Result<CommandKind, LoadError> {
        CommandKind::try_from(self.command)
    }

    pub fn raw_value(&self) -> u32 {
        u32::from_le_bytes(self.data)
    }
}

/// Errors surfaced by the crates around the regulation core.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LoadError {
    #[error("Unknown write command code: {0}")]
    UnknownCommand(u8),

    #[error("Setpoint {value} out of range for {mode}")]
    SetpointOutOfRange { mode: RegulationMode, value: f64 },
}
