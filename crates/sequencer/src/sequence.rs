//! Immutable action sequence programs.

use crate::Step;

/// An ordered list of steps, optionally looping back to an earlier step.
///
/// Sequences are immutable once built and are shared behind an `Arc`, so the
/// same program can be started by many agents; the per-run cursor lives in the
/// [`crate::Sequencer`].
#[derive(Debug)]
pub struct ActionSequence<C> {
    name: String,
    steps: Vec<Step<C>>,
    loop_from: Option<usize>,
}

impl<C> ActionSequence<C> {
    /// Creates a one-shot sequence.
    ///
    /// # Panics
    ///
    /// Panics if `steps` is empty. A sequence with no steps has nothing to
    /// drive and indicates a programming error.
    pub fn new(name: impl Into<String>, steps: Vec<Step<C>>) -> Self {
        assert!(!steps.is_empty(), "ActionSequence must have at least one step");
        Self {
            name: name.into(),
            steps,
            loop_from: None,
        }
    }

    /// Makes the sequence jump back to `index` after its last step instead of
    /// completing. Such a sequence only ends by cancellation.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn looping_from(mut self, index: usize) -> Self {
        assert!(
            index < self.steps.len(),
            "loop start {index} out of bounds for {} steps",
            self.steps.len()
        );
        self.loop_from = Some(index);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Step<C>] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn loop_from(&self) -> Option<usize> {
        self.loop_from
    }

    /// Returns the cursor that follows `cursor`, or `None` when the sequence ends.
    pub(crate) fn next_cursor(&self, cursor: usize) -> Option<usize> {
        let next = cursor + 1;
        if next < self.steps.len() {
            Some(next)
        } else {
            self.loop_from
        }
    }
}
