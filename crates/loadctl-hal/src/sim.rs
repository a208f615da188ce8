//! In-process simulation bench for CI testing without a physical load.
//!
//! [`SimBench`] models a DC source connected to the load and implements every
//! read-only collaborator of the regulation core.  [`SimActuator`] records
//! the commands it receives; after each controller pass the bench is
//! [`advance`][SimBench::advance]d with both actuators to produce the next
//! measurement sample.
//!
//! # Example
//!
//! ```rust
//! use loadctl_hal::sim::{SimBench, SourceModel};
//! use loadctl_hal::{Actuator, MeasurementSource};
//!
//! let mut bench = SimBench::new(SourceModel::Thevenin {
//!     open_circuit_uv: 12_000_000,
//!     internal_mohm: 1_000,
//! });
//! let (mut current, voltage) = bench.actuators(10_000_000, 30_000_000);
//!
//! current.set_absolute(1_000_000);
//! current.apply();
//! bench.advance(&current, &voltage);
//!
//! assert_eq!(bench.snapshot().voltage_uv, 11_000_000);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use loadctl_types::{
    CccvState, CommandKind, Domain, FaultCode, MeasurementSnapshot, Range, WriteCommand,
};
use tracing::trace;

use crate::actuator::Actuator;
use crate::output::OutputStateSink;
use crate::sensors::{CommandSource, MeasurementSource, RangeDetector};

// ────────────────────────────────────────────────────────────────────────────
// Simulated actuator
// ────────────────────────────────────────────────────────────────────────────

/// A simulated hardware loop.
///
/// The value reaching the "hardware" only changes on [`Actuator::apply`].
/// Both actuators of a bench share a command clock so the bench can tell
/// which loop was commanded last, mimicking the CC/CV multiplexer.
pub struct SimActuator {
    domain: Domain,
    commanded: u32,
    applied: u32,
    maximum: u32,
    fault_counter: u8,
    last_fault: FaultCode,
    clock: Arc<AtomicU64>,
    commanded_at: u64,
}

impl SimActuator {
    fn new(domain: Domain, maximum: u32, clock: Arc<AtomicU64>) -> Self {
        Self {
            domain,
            commanded: 0,
            applied: 0,
            maximum,
            fault_counter: 0,
            last_fault: FaultCode::NONE,
            clock,
            commanded_at: 0,
        }
    }

    /// Value currently output to the hardware.
    pub fn applied(&self) -> u32 {
        self.applied
    }

    /// Raise a fault as the real loop would on overrange or DAC failure.
    pub fn inject_fault(&mut self, code: FaultCode) {
        self.fault_counter = self.fault_counter.wrapping_add(1);
        self.last_fault = code;
    }

    fn touch(&mut self) {
        self.commanded_at = self.clock.fetch_add(1, Ordering::Relaxed) + 1;
    }
}

impl Actuator for SimActuator {
    fn domain(&self) -> Domain {
        self.domain
    }

    fn set_absolute(&mut self, value: u32) {
        self.commanded = value.min(self.maximum);
        self.touch();
    }

    fn increment(&mut self, step: u32) {
        self.commanded = self.commanded.saturating_add(step).min(self.maximum);
        self.touch();
    }

    fn decrement(&mut self, step: u32) {
        self.commanded = self.commanded.saturating_sub(step);
        self.touch();
    }

    fn apply(&mut self) {
        self.applied = self.commanded;
    }

    fn commanded(&self) -> u32 {
        self.commanded
    }

    fn maximum(&self) -> u32 {
        self.maximum
    }

    fn fault_counter(&self) -> u8 {
        self.fault_counter
    }

    fn last_fault(&self) -> FaultCode {
        self.last_fault
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated output pin
// ────────────────────────────────────────────────────────────────────────────

/// Records the CC/CV level written by the controller.
#[derive(Debug, Default)]
pub struct SimOutputPin {
    state: CccvState,
    writes: usize,
}

impl SimOutputPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CccvState {
        self.state
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl OutputStateSink for SimOutputPin {
    fn write(&mut self, state: CccvState) {
        self.state = state;
        self.writes += 1;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Source models
// ────────────────────────────────────────────────────────────────────────────

/// DC source connected to the load terminals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceModel {
    /// Ideal voltage source behind a series resistance.
    Thevenin {
        open_circuit_uv: u32,
        internal_mohm: u32,
    },
    /// Exponential I-V curve of a photovoltaic panel.  `knee_uv` sets how
    /// sharply the current collapses near the open-circuit voltage.
    Solar {
        open_circuit_uv: u32,
        short_circuit_ua: u32,
        knee_uv: u32,
    },
}

impl SourceModel {
    pub fn open_circuit_uv(&self) -> u32 {
        match *self {
            SourceModel::Thevenin {
                open_circuit_uv, ..
            }
            | SourceModel::Solar {
                open_circuit_uv, ..
            } => open_circuit_uv,
        }
    }

    /// Terminal voltage while sinking `current_ua`.
    pub fn voltage_at(&self, current_ua: u32) -> u32 {
        match *self {
            SourceModel::Thevenin {
                open_circuit_uv,
                internal_mohm,
            } => {
                let drop = u64::from(current_ua) * u64::from(internal_mohm) / 1_000;
                u64::from(open_circuit_uv).saturating_sub(drop) as u32
            }
            SourceModel::Solar {
                open_circuit_uv,
                short_circuit_ua,
                knee_uv,
            } => {
                if current_ua >= short_circuit_ua {
                    return 0;
                }
                let fraction = 1.0 - f64::from(current_ua) / f64::from(short_circuit_ua);
                let v = f64::from(open_circuit_uv) + f64::from(knee_uv) * fraction.ln();
                v.max(0.0) as u32
            }
        }
    }

    /// Current delivered while the terminals are held at `voltage_uv`.
    pub fn current_at(&self, voltage_uv: u32) -> u32 {
        let voltage_uv = voltage_uv.min(self.open_circuit_uv());
        match *self {
            SourceModel::Thevenin {
                open_circuit_uv,
                internal_mohm,
            } => {
                let headroom = u64::from(open_circuit_uv - voltage_uv) * 1_000;
                (headroom / u64::from(internal_mohm.max(1))).min(u64::from(u32::MAX)) as u32
            }
            SourceModel::Solar {
                open_circuit_uv,
                short_circuit_ua,
                knee_uv,
            } => {
                let exponent =
                    (f64::from(voltage_uv) - f64::from(open_circuit_uv)) / f64::from(knee_uv.max(1));
                (f64::from(short_circuit_ua) * (1.0 - exponent.exp())).max(0.0) as u32
            }
        }
    }

    /// Largest current the source can deliver (terminals shorted).
    pub fn short_circuit_ua(&self) -> u32 {
        self.current_at(0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Bench
// ────────────────────────────────────────────────────────────────────────────

/// Upper limits of the low ranges; anything above selects the high range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeThresholds {
    pub current_low_max_ua: u32,
    pub voltage_low_max_uv: u32,
}

impl Default for RangeThresholds {
    fn default() -> Self {
        Self {
            current_low_max_ua: 2_000_000,
            voltage_low_max_uv: 6_000_000,
        }
    }
}

/// A simulated load bench: source model, measurement pipeline, range
/// detection and command transport.
pub struct SimBench {
    source: SourceModel,
    snapshot: MeasurementSnapshot,
    sample_period_ms: u32,
    thresholds: RangeThresholds,
    command: Option<WriteCommand>,
    command_counter: u8,
    clock: Arc<AtomicU64>,
}

impl SimBench {
    /// Create a bench with the load disconnected (open circuit).
    pub fn new(source: SourceModel) -> Self {
        let mut bench = Self {
            source,
            snapshot: MeasurementSnapshot::default(),
            sample_period_ms: 10,
            thresholds: RangeThresholds::default(),
            command: None,
            command_counter: 0,
            clock: Arc::new(AtomicU64::new(0)),
        };
        bench.snapshot = bench.measure(source.open_circuit_uv(), 0);
        bench
    }

    /// Milliseconds between consecutive samples.
    pub fn with_sample_period_ms(mut self, period: u32) -> Self {
        self.sample_period_ms = period;
        self
    }

    pub fn with_range_thresholds(mut self, thresholds: RangeThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn source(&self) -> SourceModel {
        self.source
    }

    /// Build the current and voltage actuators wired to this bench.
    pub fn actuators(&self, maximum_current_ua: u32, maximum_voltage_uv: u32) -> (SimActuator, SimActuator) {
        (
            SimActuator::new(Domain::Current, maximum_current_ua, self.clock.clone()),
            SimActuator::new(Domain::Voltage, maximum_voltage_uv, self.clock.clone()),
        )
    }

    /// Queue a write command as the host transport would.
    pub fn send(&mut self, kind: CommandKind, value: u32) {
        self.send_raw(kind.code(), value);
    }

    /// Queue a write command with an arbitrary command byte.
    pub fn send_raw(&mut self, command: u8, value: u32) {
        self.command_counter = self.command_counter.wrapping_add(1);
        self.command = Some(WriteCommand {
            counter: self.command_counter,
            command,
            data: value.to_le_bytes(),
        });
    }

    /// Take the next sample.  Whichever actuator was commanded last holds
    /// the operating point.
    pub fn advance(&mut self, current: &SimActuator, voltage: &SimActuator) {
        let (voltage_uv, current_ua) = if voltage.commanded_at > current.commanded_at {
            let v = voltage.applied().min(self.source.open_circuit_uv());
            (v, self.source.current_at(v))
        } else {
            let i = current.applied().min(self.source.short_circuit_ua());
            (self.source.voltage_at(i), i)
        };
        let counter = self.snapshot.counter.wrapping_add(1);
        let timestamp_ms = self.snapshot.timestamp_ms.wrapping_add(self.sample_period_ms);
        self.snapshot = MeasurementSnapshot {
            counter,
            timestamp_ms,
            ..self.measure(voltage_uv, current_ua)
        };
        trace!(
            voltage_uv,
            current_ua,
            power_uw = self.snapshot.power_uw,
            counter,
            "sim sample"
        );
    }

    fn measure(&self, voltage_uv: u32, current_ua: u32) -> MeasurementSnapshot {
        let power_uw = u64::from(voltage_uv) * u64::from(current_ua) / 1_000_000;
        let resistance_mohm = if current_ua == 0 {
            u32::MAX
        } else {
            (u64::from(voltage_uv) * 1_000 / u64::from(current_ua)).min(u64::from(u32::MAX)) as u32
        };
        MeasurementSnapshot {
            voltage_uv,
            current_ua,
            power_uw: power_uw.min(u64::from(u32::MAX)) as u32,
            resistance_mohm,
            counter: self.snapshot.counter,
            timestamp_ms: self.snapshot.timestamp_ms,
        }
    }
}

impl MeasurementSource for SimBench {
    fn snapshot(&self) -> MeasurementSnapshot {
        self.snapshot
    }
}

impl RangeDetector for SimBench {
    fn current_range(&self) -> Range {
        if self.snapshot.current_ua > self.thresholds.current_low_max_ua {
            Range::High
        } else {
            Range::Low
        }
    }

    fn voltage_range(&self) -> Range {
        if self.snapshot.voltage_uv > self.thresholds.voltage_low_max_uv {
            Range::High
        } else {
            Range::Low
        }
    }
}

impl CommandSource for SimBench {
    fn latest(&self) -> Option<WriteCommand> {
        self.command
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
