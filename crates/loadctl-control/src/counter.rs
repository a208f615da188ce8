//! Wraparound-safe rate limiting on the measurement counter and clock.
//!
//! The measurement pipeline publishes an 8-bit sample counter and a 32-bit
//! millisecond clock, both of which wrap.  All comparisons here use modular
//! differences, never plain `<`/`>`.

/// Number of samples published since `base`, modulo 256.
pub fn samples_since(base: u8, now: u8) -> u8 {
    now.wrapping_sub(base)
}

/// Fires once per new measurement sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleGate {
    last: u8,
}

impl SampleGate {
    /// Start gated on the sample that is current right now.
    pub fn new(counter: u8) -> Self {
        Self { last: counter }
    }

    /// Return `true` and latch `counter` if it differs from the last one.
    pub fn poll(&mut self, counter: u8) -> bool {
        if counter == self.last {
            return false;
        }
        self.last = counter;
        true
    }

    /// Samples published since the gate last fired.
    pub fn elapsed(&self, counter: u8) -> u8 {
        samples_since(self.last, counter)
    }
}

/// Fires when more than `interval_ms` passed since it last fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalGate {
    last_ms: u32,
    interval_ms: u32,
}

impl IntervalGate {
    pub fn new(now_ms: u32, interval_ms: u32) -> Self {
        Self {
            last_ms: now_ms,
            interval_ms,
        }
    }

    pub fn poll(&mut self, now_ms: u32) -> bool {
        if now_ms.wrapping_sub(self.last_ms) <= self.interval_ms {
            return false;
        }
        self.last_ms = now_ms;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_since_wraps() {
        assert_eq!(samples_since(10, 15), 5);
        assert_eq!(samples_since(253, 2), 5);
        assert_eq!(samples_since(7, 7), 0);
    }

    #[test]
    fn sample_gate_fires_once_per_sample() {
        let mut gate = SampleGate::new(255);
        assert!(!gate.poll(255));
        assert!(gate.poll(0));
        assert!(!gate.poll(0));
        assert_eq!(gate.elapsed(4), 4);
    }

    #[test]
    fn interval_gate_requires_strictly_more_than_interval() {
        let mut gate = IntervalGate::new(100, 20);
        assert!(!gate.poll(110));
        assert!(!gate.poll(120));
        assert!(gate.poll(121));
        assert!(!gate.poll(130));
    }

    #[test]
    fn interval_gate_survives_clock_wrap() {
        let mut gate = IntervalGate::new(u32::MAX - 5, 20);
        assert!(!gate.poll(10));
        assert!(gate.poll(15));
    }
}
