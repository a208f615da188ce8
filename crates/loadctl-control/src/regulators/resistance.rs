//! Constant resistance through the current actuator.

use loadctl_types::{ActuatorCommand, ActuatorOp, Domain, Milliohms};
use tracing::trace;

use super::Commands;
use crate::context::TickContext;
use crate::counter::SampleGate;
use crate::hill_climb::HillClimb;
use crate::step_size::StepSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResistanceRegulator {
    setpoint: Milliohms,
    step: StepSize,
    climb: HillClimb,
    gate: SampleGate,
}

impl ResistanceRegulator {
    /// Reset the search and seed the current with `I = V / R`.
    pub fn arm(setpoint: Milliohms, ctx: &TickContext<'_>) -> (Self, Commands) {
        let m = ctx.measurement;
        let regulator = Self {
            setpoint,
            step: StepSize::minimum(Domain::Current, ctx),
            climb: HillClimb::new(m.resistance_mohm),
            gate: SampleGate::new(m.counter),
        };

        let mut commands = Commands::new();
        let reachable = setpoint > 0 && setpoint < ctx.config.voltmeter_input_impedance_mohm;
        if reachable && m.voltage_uv > 0 {
            let estimate = u64::from(m.voltage_uv) * 1_000 / u64::from(setpoint);
            if estimate <= u64::from(ctx.current_ceiling) {
                commands.push(ActuatorCommand::current(ActuatorOp::SetAbsolute(
                    estimate as u32,
                )));
            } else {
                trace!(estimate, "resistance seed beyond current ceiling, skipped");
            }
        }
        (regulator, commands)
    }

    pub fn tick(&mut self, ctx: &TickContext<'_>) -> Commands {
        let m = ctx.measurement;
        let mut commands = Commands::with_capacity(2);
        if self.gate.poll(m.counter) {
            let command = if self.setpoint >= ctx.config.voltmeter_input_impedance_mohm {
                // Open circuit: the source alone already reads higher.
                ActuatorCommand::current(ActuatorOp::SetAbsolute(0))
            } else if self.setpoint > 0 {
                self.climb
                    .step(self.setpoint, m.resistance_mohm, &mut self.step, ctx)
            } else {
                // Short circuit.
                ActuatorCommand::current(ActuatorOp::SetAbsolute(ctx.current_ceiling))
            };
            commands.push(command);
        }
        commands.push(ActuatorCommand::current(ActuatorOp::Apply));
        commands
    }

    pub fn setpoint(&self) -> Milliohms {
        self.setpoint
    }

    pub fn history(&self) -> HillClimb {
        self.climb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControlConfig;
    use loadctl_types::{ActiveRanges, Direction, MeasurementSnapshot};

    fn ctx<'a>(m: &'a MeasurementSnapshot, cfg: &'a ControlConfig) -> TickContext<'a> {
        TickContext {
            measurement: m,
            ranges: ActiveRanges::default(),
            config: cfg,
            current_ceiling: 20_000_000,
        }
    }

    fn sample(counter: u8, voltage_uv: u32, resistance_mohm: u32) -> MeasurementSnapshot {
        MeasurementSnapshot {
            voltage_uv,
            current_ua: 1_000_000,
            resistance_mohm,
            counter,
            ..Default::default()
        }
    }

    #[test]
    fn arm_seeds_voltage_over_resistance() {
        let cfg = ControlConfig::default();
        let m = sample(0, 12_000_000, u32::MAX);
        let (_, commands) = ResistanceRegulator::arm(6_000, &ctx(&m, &cfg));
        assert_eq!(
            commands,
            vec![ActuatorCommand::current(ActuatorOp::SetAbsolute(2_000_000))]
        );
    }

    #[test]
    fn arm_never_divides_by_zero() {
        let cfg = ControlConfig::default();
        let m = sample(0, 12_000_000, u32::MAX);
        assert!(ResistanceRegulator::arm(0, &ctx(&m, &cfg)).1.is_empty());
    }

    #[test]
    fn zero_resistance_shorts_the_source() {
        let cfg = ControlConfig::default();
        let m0 = sample(0, 12_000_000, u32::MAX);
        let (mut cr, _) = ResistanceRegulator::arm(0, &ctx(&m0, &cfg));
        let m1 = sample(1, 12_000_000, u32::MAX);
        assert_eq!(
            cr.tick(&ctx(&m1, &cfg)),
            vec![
                ActuatorCommand::current(ActuatorOp::SetAbsolute(20_000_000)),
                ActuatorCommand::current(ActuatorOp::Apply),
            ]
        );
    }

    #[test]
    fn unreachable_resistance_opens_the_load() {
        let cfg = ControlConfig::default();
        let m0 = sample(0, 12_000_000, 1_000);
        let setpoint = cfg.voltmeter_input_impedance_mohm;
        let (mut cr, armed) = ResistanceRegulator::arm(setpoint, &ctx(&m0, &cfg));
        assert!(armed.is_empty());
        let m1 = sample(1, 12_000_000, 1_000);
        assert_eq!(
            cr.tick(&ctx(&m1, &cfg))[0],
            ActuatorCommand::current(ActuatorOp::SetAbsolute(0))
        );
    }

    #[test]
    fn tick_waits_for_a_new_sample() {
        let cfg = ControlConfig::default();
        let m0 = sample(42, 12_000_000, 10_000);
        let (mut cr, _) = ResistanceRegulator::arm(6_000, &ctx(&m0, &cfg));
        assert_eq!(
            cr.tick(&ctx(&m0, &cfg)),
            vec![ActuatorCommand::current(ActuatorOp::Apply)]
        );
        let m1 = sample(43, 11_000_000, 8_000);
        let commands = cr.tick(&ctx(&m1, &cfg));
        assert_eq!(commands.len(), 2);
        assert_eq!(cr.history().last_action(), Direction::Increase);
        assert_eq!(cr.history().previous(), 8_000);
    }
}
