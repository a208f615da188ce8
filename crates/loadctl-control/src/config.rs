//! Tunable constants of the regulation core.
//!
//! Every field has a default matching the stock hardware, so a config file
//! only needs to name the values it overrides.

use loadctl_types::{Domain, Range};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Absolute limits of a step size on one range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepBounds {
    pub min: u32,
    pub max: u32,
}

/// Step limits for the low and high range of one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSteps {
    pub low: StepBounds,
    pub high: StepBounds,
}

impl RangeSteps {
    pub fn bounds(&self, range: Range) -> StepBounds {
        match range {
            Range::Low => self.low,
            Range::High => self.high,
        }
    }
}

/// Configuration of the regulation core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Step limits of the current actuator, in microamps.
    pub current_steps: RangeSteps,

    /// Step limits of the voltage actuator, in microvolts.
    pub voltage_steps: RangeSteps,

    /// Input impedance of the voltmeter, in milliohms.  A resistance setpoint
    /// at or above it cannot be reached by loading the source.
    pub voltmeter_input_impedance_mohm: u32,

    /// Minimum milliseconds between two constant-power search steps.
    pub power_update_interval_ms: u32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            current_steps: RangeSteps {
                low: StepBounds {
                    min: 100,
                    max: 100_000,
                },
                high: StepBounds {
                    min: 1_000,
                    max: 1_000_000,
                },
            },
            voltage_steps: RangeSteps {
                low: StepBounds {
                    min: 500,
                    max: 200_000,
                },
                high: StepBounds {
                    min: 2_500,
                    max: 1_000_000,
                },
            },
            voltmeter_input_impedance_mohm: 330_000_000,
            power_update_interval_ms: 20,
        }
    }
}

impl ControlConfig {
    pub fn steps(&self, domain: Domain) -> &RangeSteps {
        match domain {
            Domain::Current => &self.current_steps,
            Domain::Voltage => &self.voltage_steps,
        }
    }

    /// Check that every step window is non-empty and escapes zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for domain in [Domain::Current, Domain::Voltage] {
            for range in [Range::Low, Range::High] {
                let bounds = self.steps(domain).bounds(range);
                if bounds.min == 0 {
                    return Err(ConfigError::ZeroMinimumStep { domain, range });
                }
                if bounds.min > bounds.max {
                    return Err(ConfigError::InvertedStepBounds {
                        domain,
                        range,
                        min: bounds.min,
                        max: bounds.max,
                    });
                }
            }
        }
        if self.voltmeter_input_impedance_mohm == 0 {
            return Err(ConfigError::ZeroInputImpedance);
        }
        Ok(())
    }
}

/// Rejected [`ControlConfig`] values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{domain:?} step minimum on {range:?} range must be non-zero")]
    ZeroMinimumStep { domain: Domain, range: Range },

    #[error("{domain:?} step bounds on {range:?} range are inverted: min {min} > max {max}")]
    InvertedStepBounds {
        domain: Domain,
        range: Range,
        min: u32,
        max: u32,
    },

    #[error("voltmeter input impedance must be non-zero")]
    ZeroInputImpedance,
}
