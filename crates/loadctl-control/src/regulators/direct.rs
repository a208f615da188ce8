//! Constant current and constant voltage.
//!
//! The hardware loops regulate these quantities themselves, so arming simply
//! writes the setpoint and every tick re-asserts it.

use loadctl_types::{ActuatorCommand, ActuatorOp, Domain};

use super::Commands;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectRegulator {
    domain: Domain,
    setpoint: u32,
}

impl DirectRegulator {
    pub fn arm(domain: Domain, setpoint: u32) -> (Self, Commands) {
        let command = ActuatorCommand {
            domain,
            op: ActuatorOp::SetAbsolute(setpoint),
        };
        (Self { domain, setpoint }, vec![command])
    }

    pub fn tick(&mut self) -> Commands {
        vec![ActuatorCommand {
            domain: self.domain,
            op: ActuatorOp::Apply,
        }]
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn setpoint(&self) -> u32 {
        self.setpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_sets_and_tick_applies() {
        let (mut cv, armed) = DirectRegulator::arm(Domain::Voltage, 5_000_000);
        assert_eq!(
            armed,
            vec![ActuatorCommand::voltage(ActuatorOp::SetAbsolute(5_000_000))]
        );
        assert_eq!(cv.tick(), vec![ActuatorCommand::voltage(ActuatorOp::Apply)]);
        assert_eq!(cv.tick(), vec![ActuatorCommand::voltage(ActuatorOp::Apply)]);
    }
}
