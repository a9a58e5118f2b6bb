//! Handles and progress reported by the sequencer.

use std::fmt;

/// Identifies one started sequence.
///
/// Handles are issued in increasing order by a single [`crate::Sequencer`] and
/// are never reused, so a stale handle can never cancel a newer sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceHandle(u64);

impl SequenceHandle {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value (useful for logs and events).
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SequenceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq#{}", self.0)
    }
}

/// The result of driving a sequencer for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Progress {
    /// No sequence is active.
    Idle,

    /// The sequence is still waiting on one of its steps.
    Running(SequenceHandle),

    /// The sequence ran its last step during this tick.
    ///
    /// Reported exactly once per sequence; the sequencer is idle afterwards.
    Completed(SequenceHandle),
}

impl Progress {
    /// Returns `true` if a sequence is still running.
    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, Progress::Running(_))
    }

    /// Returns the handle of the sequence that finished this tick, if any.
    #[inline]
    pub fn completed(self) -> Option<SequenceHandle> {
        match self {
            Progress::Completed(handle) => Some(handle),
            _ => None,
        }
    }
}
