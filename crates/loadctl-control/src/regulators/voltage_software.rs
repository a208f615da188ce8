//! Constant voltage regulated by searching on the current actuator.
//!
//! Used where the hardware voltage loop is unavailable or unstable with the
//! connected source.  A zero setpoint is treated as "pull the terminals to
//! zero", i.e. maximum current.

use loadctl_types::{ActuatorCommand, ActuatorOp, Domain, Microvolts};

use super::Commands;
use crate::context::TickContext;
use crate::counter::SampleGate;
use crate::hill_climb::HillClimb;
use crate::step_size::StepSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoltageSoftwareRegulator {
    setpoint: Microvolts,
    step: StepSize,
    climb: HillClimb,
    gate: SampleGate,
}

impl VoltageSoftwareRegulator {
    pub fn arm(setpoint: Microvolts, ctx: &TickContext<'_>) -> (Self, Commands) {
        let m = ctx.measurement;
        let regulator = Self {
            setpoint,
            step: StepSize::minimum(Domain::Current, ctx),
            climb: HillClimb::new(m.voltage_uv),
            gate: SampleGate::new(m.counter),
        };
        (regulator, Commands::new())
    }

    pub fn tick(&mut self, ctx: &TickContext<'_>) -> Commands {
        let m = ctx.measurement;
        let mut commands = Commands::with_capacity(2);
        if self.gate.poll(m.counter) {
            let command = if self.setpoint > 0 {
                self.climb
                    .step(self.setpoint, m.voltage_uv, &mut self.step, ctx)
            } else {
                ActuatorCommand::current(ActuatorOp::SetAbsolute(ctx.current_ceiling))
            };
            commands.push(command);
        }
        commands.push(ActuatorCommand::current(ActuatorOp::Apply));
        commands
    }

    pub fn setpoint(&self) -> Microvolts {
        self.setpoint
    }

    pub fn history(&self) -> HillClimb {
        self.climb
    }
}
