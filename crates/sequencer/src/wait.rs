//! Wait conditions that gate the advance from one step to the next.

/// Tolerance applied to elapsed-time comparisons.
///
/// Accumulating a fixed tick (e.g. 0.02 s) rarely sums to the exact duration,
/// so a duration counts as elapsed once it is within this margin.
pub const TIME_EPSILON: f32 = 1e-4;

/// Predicate evaluated against the caller's context.
pub type Predicate<C> = Box<dyn Fn(&C) -> bool + Send + Sync>;

/// Condition a step waits on before it advances.
///
/// A wait is checked once when its step is entered (with zero elapsed time)
/// and again on every tick after the tick's delta has been added.
pub enum Wait<C> {
    /// Advance once this many seconds have elapsed in the step.
    Seconds(f32),

    /// Advance once the predicate holds. Never times out.
    Until(Predicate<C>),

    /// Advance when the predicate holds or the timeout elapses, whichever
    /// happens first. The timeout bounds a predicate that never becomes true.
    Race { timeout: f32, until: Predicate<C> },
}

/// Which side of a wait resolved it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitOutcome {
    /// A plain duration elapsed.
    Elapsed,
    /// The predicate became true.
    Predicate,
    /// A race timed out before its predicate held.
    TimedOut,
}

impl<C> Wait<C> {
    /// Wait a fixed number of seconds.
    pub fn seconds(seconds: f32) -> Self {
        Wait::Seconds(seconds.max(0.0))
    }

    /// Wait until `predicate` holds.
    pub fn until(predicate: impl Fn(&C) -> bool + Send + Sync + 'static) -> Self {
        Wait::Until(Box::new(predicate))
    }

    /// Wait until `predicate` holds, or `timeout` seconds, whichever is first.
    pub fn race(timeout: f32, predicate: impl Fn(&C) -> bool + Send + Sync + 'static) -> Self {
        Wait::Race {
            timeout: timeout.max(0.0),
            until: Box::new(predicate),
        }
    }

    /// Resolves the wait, returning what satisfied it or `None` to keep waiting.
    ///
    /// In a race the predicate wins ties with the timeout.
    pub fn resolve(&self, elapsed: f32, ctx: &C) -> Option<WaitOutcome> {
        match self {
            Wait::Seconds(duration) => {
                (elapsed + TIME_EPSILON >= *duration).then_some(WaitOutcome::Elapsed)
            }
            Wait::Until(predicate) => predicate(ctx).then_some(WaitOutcome::Predicate),
            Wait::Race { timeout, until } => {
                if until(ctx) {
                    Some(WaitOutcome::Predicate)
                } else if elapsed + TIME_EPSILON >= *timeout {
                    Some(WaitOutcome::TimedOut)
                } else {
                    None
                }
            }
        }
    }

    /// Returns `true` if the wait is satisfied.
    #[inline]
    pub fn is_satisfied(&self, elapsed: f32, ctx: &C) -> bool {
        self.resolve(elapsed, ctx).is_some()
    }
}

impl<C> std::fmt::Debug for Wait<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Wait::Seconds(s) => write!(f, "Seconds({s})"),
            Wait::Until(_) => write!(f, "Until(..)"),
            Wait::Race { timeout, .. } => write!(f, "Race {{ timeout: {timeout}, .. }}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ctx {
        near: bool,
    }

    #[test]
    fn seconds_tolerates_accumulated_float_error() {
        let wait: Wait<Ctx> = Wait::seconds(1.0);
        let elapsed = (0..50).fold(0.0_f32, |acc, _| acc + 0.02);
        assert!(wait.is_satisfied(elapsed, &Ctx { near: false }));
        assert!(!wait.is_satisfied(0.9, &Ctx { near: false }));
    }

    #[test]
    fn race_predicate_wins_before_timeout() {
        let wait: Wait<Ctx> = Wait::race(0.9, |ctx: &Ctx| ctx.near);
        assert_eq!(wait.resolve(0.1, &Ctx { near: true }), Some(WaitOutcome::Predicate));
        assert_eq!(wait.resolve(0.1, &Ctx { near: false }), None);
    }

    #[test]
    fn race_times_out_when_predicate_never_holds() {
        let wait: Wait<Ctx> = Wait::race(0.9, |ctx: &Ctx| ctx.near);
        assert_eq!(wait.resolve(0.9, &Ctx { near: false }), Some(WaitOutcome::TimedOut));
    }

    #[test]
    fn until_never_times_out() {
        let wait: Wait<Ctx> = Wait::until(|ctx: &Ctx| ctx.near);
        assert!(!wait.is_satisfied(1_000.0, &Ctx { near: false }));
    }
}
