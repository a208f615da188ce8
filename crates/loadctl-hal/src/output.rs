//! `OutputStateSink` trait for the CC/CV signal line.

use loadctl_types::CccvState;

/// Discrete output telling range-switching logic whether the load currently
/// behaves as a CC-type or a CV-type sink.
pub trait OutputStateSink: Send + Sync {
    /// Drive the line to `state`.
    fn write(&mut self, state: CccvState);
}
