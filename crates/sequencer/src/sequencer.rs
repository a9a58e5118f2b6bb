//! The per-agent sequence driver.

use std::sync::Arc;

use crate::{ActionSequence, Progress, SequenceHandle};

struct ActiveSequence<C> {
    handle: SequenceHandle,
    program: Arc<ActionSequence<C>>,
    cursor: usize,
    elapsed: f32,
}

/// Drives at most one [`ActionSequence`] at a time.
///
/// # Semantics
///
/// - [`start`](Self::start) cancels whatever was running, enters the first
///   step and keeps advancing in the same call until a wait is unsatisfied
///   (mirrors a coroutine running synchronously up to its first yield)
/// - [`tick`](Self::tick) adds the tick's delta to the current step and
///   advances through every step whose wait is satisfied
/// - [`cancel`](Self::cancel) drops the active sequence immediately; none of
///   its remaining effects ever run. Cancelling a stale handle is a no-op.
pub struct Sequencer<C> {
    active: Option<ActiveSequence<C>>,
    next_id: u64,
    advance_budget: usize,
}

impl<C> Sequencer<C> {
    /// Maximum step advances per drive unless configured otherwise.
    pub const DEFAULT_ADVANCE_BUDGET: usize = 64;

    pub fn new() -> Self {
        Self {
            active: None,
            next_id: 0,
            advance_budget: Self::DEFAULT_ADVANCE_BUDGET,
        }
    }

    /// Bounds how many steps may advance within one drive.
    ///
    /// A looping sequence whose steps all resolve instantly would otherwise
    /// never yield back to the caller.
    pub fn with_advance_budget(mut self, budget: usize) -> Self {
        self.advance_budget = budget.max(1);
        self
    }

    /// Starts `program`, replacing any active sequence.
    ///
    /// Returns the new handle. If every step resolved immediately the
    /// sequence has already completed when this returns; check with
    /// [`is_active`](Self::is_active).
    pub fn start(&mut self, program: Arc<ActionSequence<C>>, ctx: &mut C) -> SequenceHandle {
        self.cancel_active();

        self.next_id += 1;
        let handle = SequenceHandle::new(self.next_id);

        program.steps()[0].enter(ctx);
        self.active = Some(ActiveSequence {
            handle,
            program,
            cursor: 0,
            elapsed: 0.0,
        });
        self.drive(ctx);

        handle
    }

    /// Cancels the sequence identified by `handle`.
    ///
    /// Returns `false` when the handle is not the active sequence (it already
    /// completed, or was replaced); that race is not an error.
    pub fn cancel(&mut self, handle: SequenceHandle) -> bool {
        match &self.active {
            Some(active) if active.handle == handle => {
                self.active = None;
                true
            }
            _ => false,
        }
    }

    /// Cancels whatever sequence is active, returning its handle.
    pub fn cancel_active(&mut self) -> Option<SequenceHandle> {
        self.active.take().map(|active| active.handle)
    }

    /// Advances the active sequence by `dt` seconds.
    pub fn tick(&mut self, ctx: &mut C, dt: f32) -> Progress {
        match self.active.as_mut() {
            None => Progress::Idle,
            Some(active) => {
                active.elapsed += dt.max(0.0);
                self.drive(ctx)
            }
        }
    }

    /// Returns `true` if `handle` is the running sequence.
    pub fn is_active(&self, handle: SequenceHandle) -> bool {
        self.active_handle() == Some(handle)
    }

    pub fn active_handle(&self) -> Option<SequenceHandle> {
        self.active.as_ref().map(|active| active.handle)
    }

    /// Name of the running sequence.
    pub fn active_name(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.program.name())
    }

    /// Label of the step the running sequence is waiting on.
    pub fn current_step(&self) -> Option<&str> {
        self.active
            .as_ref()
            .map(|active| active.program.steps()[active.cursor].label())
    }

    fn drive(&mut self, ctx: &mut C) -> Progress {
        let mut budget = self.advance_budget;

        loop {
            let Some(active) = self.active.as_mut() else {
                return Progress::Idle;
            };
            let handle = active.handle;
            let program = Arc::clone(&active.program);
            let step = &program.steps()[active.cursor];

            if budget == 0 || !step.wait().is_satisfied(active.elapsed, ctx) {
                return Progress::Running(handle);
            }
            budget -= 1;

            step.exit(ctx);

            match program.next_cursor(active.cursor) {
                Some(cursor) => {
                    active.cursor = cursor;
                    active.elapsed = 0.0;
                    program.steps()[cursor].enter(ctx);
                }
                None => {
                    self.active = None;
                    return Progress::Completed(handle);
                }
            }
        }
    }
}

impl<C> Default for Sequencer<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for Sequencer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("active", &self.active_name())
            .field("step", &self.current_step())
            .finish()
    }
}
