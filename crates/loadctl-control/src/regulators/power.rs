//! Constant power through the current actuator.
//!
//! Updates are time-gated rather than sample-gated so the search rate stays
//! bounded however fast samples arrive.

use loadctl_types::{ActuatorCommand, ActuatorOp, Domain, Microwatts};
use tracing::trace;

use super::Commands;
use crate::context::TickContext;
use crate::counter::IntervalGate;
use crate::hill_climb::HillClimb;
use crate::step_size::StepSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerRegulator {
    setpoint: Microwatts,
    step: StepSize,
    climb: HillClimb,
    gate: IntervalGate,
}

impl PowerRegulator {
    /// Reset the search and seed the current with `I = P / V`.
    pub fn arm(setpoint: Microwatts, ctx: &TickContext<'_>) -> (Self, Commands) {
        let m = ctx.measurement;
        let regulator = Self {
            setpoint,
            step: StepSize::minimum(Domain::Current, ctx),
            climb: HillClimb::new(m.power_uw),
            gate: IntervalGate::new(m.timestamp_ms, ctx.config.power_update_interval_ms),
        };

        let mut commands = Commands::new();
        if setpoint > 0 && m.voltage_uv > 0 {
            let estimate = u64::from(setpoint) * 1_000_000 / u64::from(m.voltage_uv);
            if estimate <= u64::from(ctx.current_ceiling) {
                commands.push(ActuatorCommand::current(ActuatorOp::SetAbsolute(
                    estimate as u32,
                )));
            } else {
                trace!(estimate, "power seed beyond current ceiling, skipped");
            }
        }
        (regulator, commands)
    }

    pub fn tick(&mut self, ctx: &TickContext<'_>) -> Commands {
        let m = ctx.measurement;
        let mut commands = Commands::with_capacity(2);
        if self.gate.poll(m.timestamp_ms) {
            if self.setpoint > 0 && m.voltage_uv > 0 {
                commands.push(self.climb.step(self.setpoint, m.power_uw, &mut self.step, ctx));
            } else {
                commands.push(ActuatorCommand::current(ActuatorOp::SetAbsolute(0)));
                self.step.reset(ctx);
            }
        }
        commands.push(ActuatorCommand::current(ActuatorOp::Apply));
        commands
    }

    pub fn setpoint(&self) -> Microwatts {
        self.setpoint
    }

    pub fn step(&self) -> StepSize {
        self.step
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

    fn at(voltage_uv: u32, current_ua: u32, timestamp_ms: u32) -> MeasurementSnapshot {
        MeasurementSnapshot {
            voltage_uv,
            current_ua,
            power_uw: (u64::from(voltage_uv) * u64::from(current_ua) / 1_000_000) as u32,
            resistance_mohm: 0,
            counter: 0,
            timestamp_ms,
        }
    }

    #[test]
    fn arm_seeds_power_over_voltage() {
        let cfg = ControlConfig::default();
        let m = at(12_000_000, 0, 0);
        let (_, commands) = PowerRegulator::arm(24_000_000, &ctx(&m, &cfg));
        assert_eq!(
            commands,
            vec![ActuatorCommand::current(ActuatorOp::SetAbsolute(2_000_000))]
        );
    }

    #[test]
    fn arm_with_zero_power_or_voltage_commands_nothing() {
        let cfg = ControlConfig::default();
        let m = at(12_000_000, 0, 0);
        assert!(PowerRegulator::arm(0, &ctx(&m, &cfg)).1.is_empty());
        let dead = at(0, 0, 0);
        assert!(PowerRegulator::arm(24_000_000, &ctx(&dead, &cfg)).1.is_empty());
    }

    #[test]
    fn arm_skips_seed_beyond_ceiling() {
        let cfg = ControlConfig::default();
        // 100 W at 1 V would need 100 A.
        let m = at(1_000_000, 0, 0);
        assert!(PowerRegulator::arm(100_000_000, &ctx(&m, &cfg)).1.is_empty());
    }

    #[test]
    fn tick_is_time_gated() {
        let cfg = ControlConfig::default();
        let m0 = at(12_000_000, 500_000, 0);
        let (mut cp, _) = PowerRegulator::arm(24_000_000, &ctx(&m0, &cfg));

        let early = at(11_000_000, 1_000_000, cfg.power_update_interval_ms);
        assert_eq!(
            cp.tick(&ctx(&early, &cfg)),
            vec![ActuatorCommand::current(ActuatorOp::Apply)]
        );

        let late = at(11_000_000, 1_000_000, cfg.power_update_interval_ms + 1);
        let commands = cp.tick(&ctx(&late, &cfg));
        assert_eq!(commands.len(), 2);
        assert!(matches!(commands[0].op, ActuatorOp::Increment(_)));
        assert_eq!(commands[1], ActuatorCommand::current(ActuatorOp::Apply));
    }

    #[test]
    fn tick_searches_toward_setpoint() {
        let cfg = ControlConfig::default();
        let m0 = at(12_000_000, 500_000, 0);
        let (mut cp, _) = PowerRegulator::arm(24_000_000, &ctx(&m0, &cfg));
        // 6 W -> 11 W: closer to 24 W, keep increasing.
        let m1 = at(11_000_000, 1_000_000, 100);
        cp.tick(&ctx(&m1, &cfg));
        assert_eq!(cp.history().last_action(), Direction::Increase);
        // 11 W -> 5 W: farther away, reverse.
        let m2 = at(10_000_000, 500_000, 200);
        let commands = cp.tick(&ctx(&m2, &cfg));
        assert!(matches!(commands[0].op, ActuatorOp::Decrement(_)));
        assert_eq!(cp.history().previous(), 5_000_000);
    }

    #[test]
    fn collapsed_voltage_drops_current_and_resets_step() {
        let cfg = ControlConfig::default();
        let m0 = at(12_000_000, 500_000, 0);
        let (mut cp, _) = PowerRegulator::arm(24_000_000, &ctx(&m0, &cfg));
        let m1 = at(0, 3_000_000, 100);
        let commands = cp.tick(&ctx(&m1, &cfg));
        assert_eq!(commands[0], ActuatorCommand::current(ActuatorOp::SetAbsolute(0)));
        // 0.1 % of 3 A dominates the low-range minimum.
        assert_eq!(cp.step().value(), 3_000);
    }
}
