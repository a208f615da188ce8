//! `loadctl-hal` – collaborator contracts of the regulation core
//!
//! The regulation core never touches hardware directly.  It talks to the
//! load through the traits in this crate, which are implemented by the real
//! DAC/ADC drivers on the device and by the [`sim`] bench on a host.
//!
//! # Modules
//!
//! - [`actuator`] – [`Actuator`][actuator::Actuator]: the current-output and
//!   voltage-output hardware loops.
//! - [`sensors`] – [`MeasurementSource`][sensors::MeasurementSource],
//!   [`RangeDetector`][sensors::RangeDetector] and
//!   [`CommandSource`][sensors::CommandSource]: read-only inputs polled once
//!   per scheduler pass.
//! - [`output`] – [`OutputStateSink`][output::OutputStateSink]: the CC/CV
//!   signal consumed by range switching.
//! - [`sim`] – an in-process bench with simulated actuators and a DC source
//!   model, for tests and the `loadctl` CLI.

pub mod actuator;
pub mod output;
pub mod sensors;
pub mod sim;

pub use actuator::Actuator;
pub use output::OutputStateSink;
pub use sensors::{CommandSource, MeasurementSource, RangeDetector};
