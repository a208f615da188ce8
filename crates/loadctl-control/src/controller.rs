//! [`Controller`] – the mode dispatcher and scheduler pass.
//!
//! The controller owns both actuators, the CC/CV output line, the active
//! [`Regulator`] and the [`ErrorAggregator`].  A scheduler calls
//! [`Controller::run_pass`] at a fixed cadence; each pass:
//!
//! 1. reads the latest write command and arms a new regulator if its counter
//!    changed,
//! 2. runs one tick of the active regulator,
//! 3. merges any new actuator faults into the error record.
//!
//! Nothing in a pass blocks or fails.  Unknown commands are dropped and
//! anything a regulator cannot compute is skipped.
//!
//! # Example
//!
//! ```
//! use loadctl_control::{ControlConfig, Controller};
//! use loadctl_hal::MeasurementSource;
//! use loadctl_hal::sim::{SimBench, SimOutputPin, SourceModel};
//! use loadctl_types::{CommandKind, RegulationMode};
//!
//! let mut bench = SimBench::new(SourceModel::Thevenin {
//!     open_circuit_uv: 12_000_000,
//!     internal_mohm: 1_000,
//! });
//! let (current, voltage) = bench.actuators(10_000_000, 30_000_000);
//! let mut controller =
//!     Controller::new(ControlConfig::default(), current, voltage, SimOutputPin::new());
//!
//! bench.send(CommandKind::ConstantCurrent, 2_000_000);
//! controller.run_pass(&bench, &bench, &bench);
//! bench.advance(controller.current(), controller.voltage());
//!
//! assert_eq!(controller.mode(), RegulationMode::ConstantCurrent);
//! assert_eq!(bench.snapshot().voltage_uv, 10_000_000);
//! ```

use loadctl_hal::{Actuator, CommandSource, MeasurementSource, OutputStateSink, RangeDetector};
use loadctl_types::{
    ActiveRanges, CccvState, Domain, ErrorRecord, MeasurementSnapshot, RegulationMode,
};
use tracing::debug;

use crate::config::ControlConfig;
use crate::context::TickContext;
use crate::error_aggregator::ErrorAggregator;
use crate::regulators::{Commands, DirectRegulator, Regulator};

pub struct Controller<I, V, O>
where
    I: Actuator,
    V: Actuator,
    O: OutputStateSink,
{
    config: ControlConfig,
    current: I,
    voltage: V,
    output: O,
    regulator: Regulator,
    /// Counter of the last write command processed, `None` before the first.
    last_command: Option<u8>,
    errors: ErrorAggregator,
    cccv: CccvState,
}

impl<I, V, O> Controller<I, V, O>
where
    I: Actuator,
    V: Actuator,
    O: OutputStateSink,
{
    /// Take ownership of the collaborators and start in constant current at
    /// zero with the output line in CC.
    pub fn new(config: ControlConfig, current: I, voltage: V, output: O) -> Self {
        let errors = ErrorAggregator::new(&current, &voltage);
        let (regulator, commands) = DirectRegulator::arm(Domain::Current, 0);
        let mut controller = Self {
            config,
            current,
            voltage,
            output,
            regulator: Regulator::ConstantCurrent(regulator),
            last_command: None,
            errors,
            cccv: CccvState::Cc,
        };
        controller.output.write(CccvState::Cc);
        controller.dispatch(commands);
        controller
    }

    /// One scheduler pass.
    pub fn run_pass(
        &mut self,
        commands: &impl CommandSource,
        meter: &impl MeasurementSource,
        ranges: &impl RangeDetector,
    ) {
        let measurement = meter.snapshot();
        let ranges = ranges.active_ranges();
        self.poll_command(commands, &measurement, ranges);
        self.tick(&measurement, ranges);
        self.errors.poll(&self.current, &self.voltage);
    }

    /// Arm the mode carried by a new write command, if any.
    ///
    /// Returns `true` if a regulator was armed.
    pub fn poll_command(
        &mut self,
        source: &impl CommandSource,
        measurement: &MeasurementSnapshot,
        ranges: ActiveRanges,
    ) -> bool {
        let Some(command) = source.latest() else {
            return false;
        };
        if self.last_command == Some(command.counter) {
            return false;
        }
        self.last_command = Some(command.counter);

        match command.kind() {
            Ok(kind) => {
                self.submit(kind.mode(), command.raw_value(), measurement, ranges);
                true
            }
            Err(err) => {
                debug!(%err, counter = command.counter, "write command dropped");
                false
            }
        }
    }

    /// Replace the active regulator with a freshly armed one.
    pub fn submit(
        &mut self,
        mode: RegulationMode,
        value: u32,
        measurement: &MeasurementSnapshot,
        ranges: ActiveRanges,
    ) {
        let ctx = TickContext {
            measurement,
            ranges,
            config: &self.config,
            current_ceiling: self.current.maximum(),
        };
        let (regulator, commands) = Regulator::arm(mode, value, &ctx);
        debug!(
            %mode,
            setpoint = value,
            unit = mode.unit().symbol(),
            "regulator armed"
        );
        self.regulator = regulator;
        self.dispatch(commands);
    }

    /// Run the active regulator once.
    pub fn tick(&mut self, measurement: &MeasurementSnapshot, ranges: ActiveRanges) {
        let ctx = TickContext {
            measurement,
            ranges,
            config: &self.config,
            current_ceiling: self.current.maximum(),
        };
        let commands = self.regulator.tick(&ctx);
        self.dispatch(commands);
    }

    /// Fall back to constant current at zero, whatever the active mode.
    pub fn stop(&mut self) {
        let (regulator, commands) = DirectRegulator::arm(Domain::Current, 0);
        debug!(from = %self.regulator.mode(), "stopped");
        self.regulator = Regulator::ConstantCurrent(regulator);
        self.dispatch(commands);
    }

    /// Drive the CC/CV output line.
    pub fn set_cccv(&mut self, state: CccvState) {
        self.cccv = state;
        self.output.write(state);
    }

    pub fn cccv(&self) -> CccvState {
        self.cccv
    }

    /// Aggregated actuator faults.
    pub fn error(&self) -> ErrorRecord {
        self.errors.record()
    }

    pub fn mode(&self) -> RegulationMode {
        self.regulator.mode()
    }

    /// Raw setpoint of the active mode, in the mode's base unit.
    pub fn setpoint(&self) -> u32 {
        self.regulator.setpoint()
    }

    pub fn regulator(&self) -> &Regulator {
        &self.regulator
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn current(&self) -> &I {
        &self.current
    }

    pub fn voltage(&self) -> &V {
        &self.voltage
    }

    pub fn current_mut(&mut self) -> &mut I {
        &mut self.current
    }

    pub fn voltage_mut(&mut self) -> &mut V {
        &mut self.voltage
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    fn dispatch(&mut self, commands: Commands) {
        for command in commands {
            match command.domain {
                Domain::Current => self.current.execute(command.op),
                Domain::Voltage => self.voltage.execute(command.op),
            }
        }
    }
}
