//! Two-point hill-climbing search on the current actuator.
//!
//! The search never computes an error derivative.  It only asks whether the
//! last move brought the measured quantity closer to the target: if so it
//! keeps going and grows the step, otherwise it turns around and shrinks the
//! step.  This tolerates offset and noisy measurements at the cost of a
//! limit-cycle around the target whose amplitude is bounded by the minimum
//! step.
//!
//! # Example
//!
//! ```rust
//! use loadctl_control::hill_climb::HillClimb;
//! use loadctl_types::Direction;
//!
//! let mut climb = HillClimb::new(90);
//! // 95 is closer to 100 than 90 was: keep increasing.
//! assert_eq!(climb.decide(100, 95), (Direction::Increase, true));
//! ```

use loadctl_types::{ActuatorCommand, Direction, Domain};
use tracing::trace;

use crate::context::TickContext;
use crate::step_size::StepSize;

/// Memory of the previous search step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HillClimb {
    previous: u32,
    last_action: Direction,
}

impl HillClimb {
    /// Start a fresh search from `seed`, the measured value at arm time.
    pub fn new(seed: u32) -> Self {
        Self {
            previous: seed,
            last_action: Direction::Increase,
        }
    }

    pub fn previous(&self) -> u32 {
        self.previous
    }

    pub fn last_action(&self) -> Direction {
        self.last_action
    }

    /// Choose the next direction and record `present` as the new reference.
    ///
    /// Returns the direction and whether the previous move was favourable
    /// (the caller grows the step when it was, shrinks it otherwise).
    pub fn decide(&mut self, target: u32, present: u32) -> (Direction, bool) {
        let last_diff = target.abs_diff(self.previous);
        let present_diff = target.abs_diff(present);
        let favourable = present_diff <= last_diff;
        let action = if favourable {
            self.last_action
        } else {
            self.last_action.reversed()
        };
        trace!(target, previous = self.previous, present, ?action, favourable, "hill climb");
        self.last_action = action;
        self.previous = present;
        (action, favourable)
    }

    /// One search step on the current actuator.
    pub fn step(
        &mut self,
        target: u32,
        present: u32,
        step: &mut StepSize,
        ctx: &TickContext<'_>,
    ) -> ActuatorCommand {
        let (action, favourable) = self.decide(target, present);
        if favourable {
            step.grow(ctx);
        } else {
            step.shrink(ctx);
        }
        ActuatorCommand::nudge(Domain::Current, action, step.value())
    }
}
