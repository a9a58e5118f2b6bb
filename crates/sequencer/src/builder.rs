//! Builder utilities for ergonomic sequence construction.
//!
//! Instead of assembling `Vec<Step<C>>` by hand, chain steps on a
//! [`SequenceBuilder`] and use [`delay`] / [`instant`] for the two most common
//! step shapes.

use std::sync::Arc;

use crate::{ActionSequence, Step, Wait};

/// Creates a step that only waits.
///
/// Shorthand for `Step::new(label, Wait::seconds(seconds))`.
#[inline]
pub fn delay<C>(label: impl Into<String>, seconds: f32) -> Step<C> {
    Step::new(label, Wait::seconds(seconds))
}

/// Creates a step that runs `effect` and advances in the same tick.
///
/// Shorthand for a zero-second step with an enter effect.
#[inline]
pub fn instant<C>(
    label: impl Into<String>,
    effect: impl Fn(&mut C) + Send + Sync + 'static,
) -> Step<C> {
    Step::new(label, Wait::seconds(0.0)).on_enter(effect)
}

/// Fluent builder for [`ActionSequence`].
pub struct SequenceBuilder<C> {
    name: String,
    steps: Vec<Step<C>>,
    loop_from: Option<usize>,
}

impl<C> SequenceBuilder<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            loop_from: None,
        }
    }

    /// Appends a step.
    pub fn step(mut self, step: Step<C>) -> Self {
        self.steps.push(step);
        self
    }

    /// Appends several steps.
    pub fn steps(mut self, steps: impl IntoIterator<Item = Step<C>>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Appends a plain delay.
    pub fn wait(self, label: impl Into<String>, seconds: f32) -> Self {
        self.step(delay(label, seconds))
    }

    /// Appends the steps produced by `body` `times` times.
    ///
    /// Effects are not clonable, so `body` is invoked once per repetition to
    /// build fresh steps.
    pub fn repeat(mut self, times: usize, body: impl Fn(Self) -> Self) -> Self {
        for _ in 0..times {
            self = body(self);
        }
        self
    }

    /// Marks the next appended step as the loop start.
    ///
    /// After the last step the sequence jumps back here instead of completing.
    pub fn loop_from_here(mut self) -> Self {
        self.loop_from = Some(self.steps.len());
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Builds the sequence.
    ///
    /// # Panics
    ///
    /// Panics if no steps were added, or if a loop start was marked after the
    /// last step.
    pub fn build(self) -> ActionSequence<C> {
        let sequence = ActionSequence::new(self.name, self.steps);
        match self.loop_from {
            Some(index) => sequence.looping_from(index),
            None => sequence,
        }
    }

    /// Builds the sequence behind an `Arc` for sharing across agents.
    pub fn into_shared(self) -> Arc<ActionSequence<C>> {
        Arc::new(self.build())
    }
}
