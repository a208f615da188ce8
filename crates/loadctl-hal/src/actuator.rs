//! Generic `Actuator` trait for the current-output and voltage-output
//! hardware loops.
//!
//! Each loop owns its own DAC and analog feedback; the regulation core only
//! moves its setpoint.  Faults inside the loop are not returned from the
//! command calls.  They are reported through a wrapping fault counter and the
//! latest fault code, which the core polls once per pass.

use loadctl_types::{ActuatorOp, Domain, FaultCode};

/// A setpoint-driven hardware loop (current sink or voltage clamp).
pub trait Actuator: Send + Sync {
    /// Which quantity this actuator drives.
    fn domain(&self) -> Domain;

    /// Replace the commanded value.
    fn set_absolute(&mut self, value: u32);

    /// Raise the commanded value by `step`, saturating at [`maximum`][Self::maximum].
    fn increment(&mut self, step: u32);

    /// Lower the commanded value by `step`, saturating at zero.
    fn decrement(&mut self, step: u32);

    /// Re-assert the last commanded value on the hardware.
    ///
    /// Idempotent: repeated calls without an intervening command reproduce
    /// the same output.
    fn apply(&mut self);

    /// The most recently commanded value.
    fn commanded(&self) -> u32;

    /// Ceiling of the commanded value on the highest range.
    fn maximum(&self) -> u32;

    /// Wrapping count of faults raised by this subsystem.
    fn fault_counter(&self) -> u8;

    /// Code of the most recent fault.
    fn last_fault(&self) -> FaultCode;

    /// Execute a single [`ActuatorOp`].
    fn execute(&mut self, op: ActuatorOp) {
        match op {
            ActuatorOp::SetAbsolute(value) => self.set_absolute(value),
            ActuatorOp::Increment(step) => self.increment(step),
            ActuatorOp::Decrement(step) => self.decrement(step),
            ActuatorOp::Apply => self.apply(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal in-process actuator used only for tests.
    struct MockActuator {
        commanded: u32,
        applied: Vec<u32>,
    }

    impl Actuator for MockActuator {
        fn domain(&self) -> Domain {
            Domain::Current
        }

        fn set_absolute(&mut self, value: u32) {
            self.commanded = value.min(self.maximum());
        }

        fn increment(&mut self, step: u32) {
            self.set_absolute(self.commanded.saturating_add(step));
        }

        fn decrement(&mut self, step: u32) {
            self.commanded = self.commanded.saturating_sub(step);
        }

        fn apply(&mut self) {
            self.applied.push(self.commanded);
        }

        fn commanded(&self) -> u32 {
            self.commanded
        }

        fn maximum(&self) -> u32 {
            1_000
        }

        fn fault_counter(&self) -> u8 {
            0
        }

        fn last_fault(&self) -> FaultCode {
            FaultCode::NONE
        }
    }

    #[test]
    fn execute_routes_each_op() {
        let mut act = MockActuator {
            commanded: 0,
            applied: Vec::new(),
        };
        act.execute(ActuatorOp::SetAbsolute(500));
        act.execute(ActuatorOp::Increment(700));
        assert_eq!(act.commanded(), 1_000);
        act.execute(ActuatorOp::Decrement(1_200));
        assert_eq!(act.commanded(), 0);
        act.execute(ActuatorOp::Increment(42));
        act.execute(ActuatorOp::Apply);
        act.execute(ActuatorOp::Apply);
        assert_eq!(act.applied, vec![42, 42]);
    }
}
