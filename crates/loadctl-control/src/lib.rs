//! `loadctl-control` – the regulation core
//!
//! Turns a commanded target (current, voltage, power or resistance) and the
//! live measurement stream into actuator commands.  Modes without a hardware
//! loop of their own are regulated by an adaptive hill-climbing search on the
//! current actuator; maximum power point tracking perturbs the voltage
//! actuator instead.
//!
//! # Modules
//!
//! - [`controller`] – [`Controller`][controller::Controller]: owns the
//!   actuators and the active regulator, decodes write commands and runs one
//!   scheduler pass at a time.
//! - [`regulators`] – [`Regulator`][regulators::Regulator]: one arm/tick pair
//!   per regulation mode.
//! - [`hill_climb`] – [`HillClimb`][hill_climb::HillClimb]: the two-point
//!   search shared by constant power, constant resistance and software
//!   constant voltage.
//! - [`step_size`] – [`StepSize`][step_size::StepSize]: step adaptation
//!   bounded by the present measurement and the active range.
//! - [`error_aggregator`] – [`ErrorAggregator`][error_aggregator::ErrorAggregator]:
//!   merges actuator faults into a single status record.
//! - [`config`] – [`ControlConfig`][config::ControlConfig]: per-range step
//!   limits and timing constants.
//! - [`counter`] – wraparound-safe sample and clock gates.

pub mod config;
pub mod context;
pub mod controller;
pub mod counter;
pub mod error_aggregator;
pub mod hill_climb;
pub mod regulators;
pub mod step_size;

pub use config::{ConfigError, ControlConfig, RangeSteps, StepBounds};
pub use context::TickContext;
pub use controller::Controller;
pub use error_aggregator::ErrorAggregator;
pub use hill_climb::HillClimb;
pub use regulators::{MpptPhase, Regulator};
pub use step_size::StepSize;
