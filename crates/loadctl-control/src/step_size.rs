//! Adaptive step size of the software search loops.
//!
//! A [`StepSize`] lives in either the current or the voltage domain.  After
//! every mutation it is clamped first to `[0.1 %, 40 %]` of the present
//! measurement in its domain and then to the absolute window of the active
//! range, so the absolute window always wins when the two disagree.

use loadctl_types::Domain;

use crate::config::StepBounds;
use crate::context::TickContext;

/// Bound `raw` by the relative window of `measured`, then by `bounds`.
pub fn clamp_step(raw: u32, measured: u32, bounds: StepBounds) -> u32 {
    let measured = u64::from(measured);
    let relative_max = measured * 2 / 5;
    let relative_min = measured / 1_000;

    let step = u64::from(raw).min(relative_max).max(relative_min);
    let step = step.min(u64::from(bounds.max)).max(u64::from(bounds.min));
    // Both ends are u32 now.
    step as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSize {
    domain: Domain,
    value: u32,
}

impl StepSize {
    /// Smallest step allowed under the present measurement and range.
    pub fn minimum(domain: Domain, ctx: &TickContext<'_>) -> Self {
        let mut step = Self { domain, value: 0 };
        step.reset(ctx);
        step
    }

    #[cfg(test)]
    pub(crate) fn from_raw(domain: Domain, value: u32) -> Self {
        Self { domain, value }
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn reset(&mut self, ctx: &TickContext<'_>) {
        self.value = self.clamp(0, ctx);
    }

    /// `step + step/4 + 1`; the `+1` lets a zero step escape zero.
    pub fn grow(&mut self, ctx: &TickContext<'_>) {
        let raw = self
            .value
            .saturating_add(self.value / 4)
            .saturating_add(1);
        self.value = self.clamp(raw, ctx);
    }

    /// Halve a current step; walk a voltage step down by one range minimum.
    pub fn shrink(&mut self, ctx: &TickContext<'_>) {
        let raw = match self.domain {
            Domain::Current => self.value / 2,
            Domain::Voltage => self.value.saturating_sub(self.bounds(ctx).min),
        };
        self.value = self.clamp(raw, ctx);
    }

    pub fn clamp(&self, raw: u32, ctx: &TickContext<'_>) -> u32 {
        clamp_step(raw, ctx.measurement.in_domain(self.domain), self.bounds(ctx))
    }

    fn bounds(&self, ctx: &TickContext<'_>) -> StepBounds {
        ctx.config
            .steps(self.domain)
            .bounds(ctx.ranges.for_domain(self.domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControlConfig;
    use loadctl_types::{ActiveRanges, MeasurementSnapshot, Range};

    const BOUNDS: StepBounds = StepBounds {
        min: 100,
        max: 10_000,
    };

    fn ctx<'a>(m: &'a MeasurementSnapshot, cfg: &'a ControlConfig, range: Range) -> TickContext<'a> {
        TickContext {
            measurement: m,
            ranges: ActiveRanges {
                current: range,
                voltage: range,
            },
            config: cfg,
            current_ceiling: 20_000_000,
        }
    }

    #[test]
    fn clamp_respects_absolute_bounds_everywhere() {
        for measured in [0, 1, 99, 1_000, 250_000, 1_000_000, 30_000_000, u32::MAX] {
            for raw in [0, 1, 100, 5_000, 10_000, 10_001, u32::MAX] {
                let step = clamp_step(raw, measured, BOUNDS);
                assert!(
                    (BOUNDS.min..=BOUNDS.max).contains(&step),
                    "raw {raw} measured {measured} gave {step}"
                );
                let rel_min = u64::from(measured) / 1_000;
                let rel_max = u64::from(measured) * 2 / 5;
                let satisfiable = rel_min <= u64::from(BOUNDS.max) && rel_max >= u64::from(BOUNDS.min);
                if satisfiable {
                    assert!(
                        (rel_min..=rel_max).contains(&u64::from(step)),
                        "raw {raw} measured {measured} gave {step} outside relative window"
                    );
                }
            }
        }
    }

    #[test]
    fn relative_ceiling_applies_before_absolute_floor() {
        // 40 % of 1000 = 400, inside [100, 10000].
        assert_eq!(clamp_step(5_000, 1_000, BOUNDS), 400);
        // 40 % of 100 = 40, then the absolute floor wins.
        assert_eq!(clamp_step(5_000, 100, BOUNDS), 100);
        // 0.1 % of 20 M = 20 000, then the absolute ceiling wins.
        assert_eq!(clamp_step(0, 20_000_000, BOUNDS), 10_000);
    }

    #[test]
    fn minimum_tracks_range() {
        let cfg = ControlConfig::default();
        let m = MeasurementSnapshot::default();
        let low = StepSize::minimum(Domain::Current, &ctx(&m, &cfg, Range::Low));
        let high = StepSize::minimum(Domain::Current, &ctx(&m, &cfg, Range::High));
        assert_eq!(low.value(), cfg.current_steps.low.min);
        assert_eq!(high.value(), cfg.current_steps.high.min);
    }

    #[test]
    fn grow_is_bounded_multiplicative() {
        let cfg = ControlConfig::default();
        let m = MeasurementSnapshot {
            current_ua: 1_000_000,
            ..Default::default()
        };
        let c = ctx(&m, &cfg, Range::Low);
        let mut step = StepSize::from_raw(Domain::Current, 1_000);
        step.grow(&c);
        assert_eq!(step.value(), 1_251);
        for _ in 0..100 {
            step.grow(&c);
        }
        assert_eq!(step.value(), cfg.current_steps.low.max);
    }

    #[test]
    fn current_shrink_halves() {
        let cfg = ControlConfig::default();
        let m = MeasurementSnapshot {
            current_ua: 1_000_000,
            ..Default::default()
        };
        let c = ctx(&m, &cfg, Range::Low);
        let mut step = StepSize::from_raw(Domain::Current, 8_000);
        step.shrink(&c);
        assert_eq!(step.value(), 4_000);
        step.shrink(&c);
        step.shrink(&c);
        step.shrink(&c);
        // 500 halves to 250, floored by 0.1 % of 1 A = 1000.
        assert_eq!(step.value(), 1_000);
    }

    #[test]
    fn voltage_shrink_subtracts_range_minimum() {
        let cfg = ControlConfig::default();
        let m = MeasurementSnapshot {
            voltage_uv: 5_000_000,
            ..Default::default()
        };
        let c = ctx(&m, &cfg, Range::Low);
        let mut step = StepSize::from_raw(Domain::Voltage, 10_000);
        step.shrink(&c);
        assert_eq!(step.value(), 10_000 - cfg.voltage_steps.low.min);
    }

    #[test]
    fn voltage_shrink_at_minimum_does_not_underflow() {
        let cfg = ControlConfig::default();
        let m = MeasurementSnapshot::default();
        let c = ctx(&m, &cfg, Range::High);
        let mut step = StepSize::minimum(Domain::Voltage, &c);
        assert_eq!(step.value(), cfg.voltage_steps.high.min);
        step.shrink(&c);
        assert_eq!(step.value(), cfg.voltage_steps.high.min);

        // Below the minimum (left over from a range change) also saturates.
        let mut stale = StepSize::from_raw(Domain::Voltage, 10);
        stale.shrink(&c);
        assert_eq!(stale.value(), cfg.voltage_steps.high.min);
    }
}
