//! Maximum power point tracking by perturb-and-observe on the voltage
//! actuator.
//!
//! # Phases
//!
//! - **Initializing** (armed with a zero target): the current actuator holds
//!   the source open-circuit while [`SETTLING_SAMPLES`] new samples arrive.
//!   The tracker then jumps to 90 % of the settled open-circuit voltage,
//!   a good first guess for most photovoltaic sources.
//! - **Tracking**: on every new sample the voltage is nudged up or down.
//!   The decision uses two cycles of power and direction history so that a
//!   single noisy reading cannot flip the search on its own.
//!
//! Once tracking starts only the voltage actuator is commanded.

use loadctl_types::{
    ActuatorCommand, ActuatorOp, Direction, Domain, MeasurementSnapshot, Microvolts, Microwatts,
};
use tracing::{debug, trace};

use super::Commands;
use crate::context::TickContext;
use crate::counter::SampleGate;
use crate::step_size::StepSize;

/// New samples to wait for before reading the open-circuit voltage.
pub const SETTLING_SAMPLES: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpptPhase {
    Initializing,
    Tracking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MpptTracker {
    setpoint: Microvolts,
    phase: MpptPhase,
    gate: SampleGate,
    step: StepSize,
    last_power: Microwatts,
    last_last_power: Microwatts,
    /// Direction applied on the previous tick.
    last_action: Direction,
    /// Direction applied the tick before that.
    last_last_action: Direction,
}

impl MpptTracker {
    /// Start from `setpoint`, or discover a starting point when it is zero.
    pub fn arm(setpoint: Microvolts, ctx: &TickContext<'_>) -> (Self, Commands) {
        let m = ctx.measurement;
        let phase = if setpoint == 0 {
            MpptPhase::Initializing
        } else {
            MpptPhase::Tracking
        };
        let tracker = Self {
            setpoint,
            phase,
            gate: SampleGate::new(m.counter),
            step: StepSize::minimum(Domain::Voltage, ctx),
            last_power: m.power_uw,
            last_last_power: m.power_uw,
            last_action: Direction::Decrease,
            last_last_action: Direction::Decrease,
        };
        let commands = match phase {
            MpptPhase::Initializing => vec![
                ActuatorCommand::current(ActuatorOp::SetAbsolute(0)),
                ActuatorCommand::current(ActuatorOp::Apply),
            ],
            MpptPhase::Tracking => vec![
                ActuatorCommand::voltage(ActuatorOp::SetAbsolute(setpoint)),
                ActuatorCommand::voltage(ActuatorOp::Apply),
            ],
        };
        (tracker, commands)
    }

    pub fn tick(&mut self, ctx: &TickContext<'_>) -> Commands {
        match self.phase {
            MpptPhase::Initializing => self.settle(ctx.measurement),
            MpptPhase::Tracking => self.track(ctx),
        }
    }

    fn settle(&mut self, m: &MeasurementSnapshot) -> Commands {
        if self.gate.elapsed(m.counter) < SETTLING_SAMPLES {
            return vec![ActuatorCommand::current(ActuatorOp::Apply)];
        }
        let target = (u64::from(m.voltage_uv) * 9 / 10) as u32;
        debug!(open_circuit_uv = m.voltage_uv, target_uv = target, "MPPT start point found");
        self.gate = SampleGate::new(m.counter);
        self.phase = MpptPhase::Tracking;
        vec![
            ActuatorCommand::voltage(ActuatorOp::SetAbsolute(target)),
            ActuatorCommand::voltage(ActuatorOp::Apply),
        ]
    }

    fn track(&mut self, ctx: &TickContext<'_>) -> Commands {
        let m = ctx.measurement;
        if !self.gate.poll(m.counter) {
            return vec![ActuatorCommand::voltage(ActuatorOp::Apply)];
        }

        let pending = self.last_action;
        let (action, forced) = self.choose(m);
        if forced {
            self.step.reset(ctx);
        } else if action == pending {
            self.step.grow(ctx);
        } else {
            self.step.shrink(ctx);
        }
        trace!(
            power_uw = m.power_uw,
            last_power_uw = self.last_power,
            ?action,
            step_uv = self.step.value(),
            "MPPT perturb"
        );

        self.last_last_action = pending;
        self.last_action = action;
        self.last_last_power = self.last_power;
        self.last_power = m.power_uw;

        vec![
            ActuatorCommand::nudge(Domain::Voltage, action, self.step.value()),
            ActuatorCommand::voltage(ActuatorOp::Apply),
        ]
    }

    /// Next direction, and whether it was forced by a collapsed reading.
    fn choose(&self, m: &MeasurementSnapshot) -> (Direction, bool) {
        if m.voltage_uv == 0 {
            return (Direction::Increase, true);
        }
        if m.current_ua == 0 {
            return (Direction::Decrease, true);
        }
        let pending = self.last_action;
        if pending != self.last_last_action {
            // Last tick reversed.  The present sample and the one two ticks
            // back sit at about the same voltage; keep the reversal only if
            // that point beats the one in between.
            let average = m.power_uw / 2 + self.last_last_power / 2;
            if average < self.last_power {
                return (self.last_last_action, false);
            }
            (pending, false)
        } else if self.last_power > m.power_uw {
            (pending.reversed(), false)
        } else {
            (pending, false)
        }
    }

    pub fn setpoint(&self) -> Microvolts {
        self.setpoint
    }

    pub fn phase(&self) -> MpptPhase {
        self.phase
    }

    pub fn step(&self) -> StepSize {
        self.step
    }

    pub fn last_action(&self) -> Direction {
        self.last_action
    }
}
