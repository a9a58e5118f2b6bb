//! A single step of an action sequence.

use crate::Wait;

/// Side effect run against the caller's context.
pub type Effect<C> = Box<dyn Fn(&mut C) + Send + Sync>;

/// One timed step: enter effect, wait, exit effect.
///
/// The enter effect runs when the cursor reaches the step. The exit effect
/// runs when the wait resolves, immediately before the next step is entered.
/// A cancelled step never runs its exit effect.
pub struct Step<C> {
    label: String,
    wait: Wait<C>,
    on_enter: Option<Effect<C>>,
    on_exit: Option<Effect<C>>,
}

impl<C> Step<C> {
    /// Creates a step with the given label and wait condition and no effects.
    pub fn new(label: impl Into<String>, wait: Wait<C>) -> Self {
        Self {
            label: label.into(),
            wait,
            on_enter: None,
            on_exit: None,
        }
    }

    /// Sets the effect run when the step is entered.
    pub fn on_enter(mut self, effect: impl Fn(&mut C) + Send + Sync + 'static) -> Self {
        self.on_enter = Some(Box::new(effect));
        self
    }

    /// Sets the effect run when the step's wait resolves.
    pub fn on_exit(mut self, effect: impl Fn(&mut C) + Send + Sync + 'static) -> Self {
        self.on_exit = Some(Box::new(effect));
        self
    }

    /// Attaches an already boxed enter effect.
    pub fn with_enter_effect(mut self, effect: Option<Effect<C>>) -> Self {
        self.on_enter = effect;
        self
    }

    /// Attaches an already boxed exit effect.
    pub fn with_exit_effect(mut self, effect: Option<Effect<C>>) -> Self {
        self.on_exit = effect;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn wait(&self) -> &Wait<C> {
        &self.wait
    }

    #[inline]
    pub(crate) fn enter(&self, ctx: &mut C) {
        if let Some(effect) = &self.on_enter {
            effect(ctx);
        }
    }

    #[inline]
    pub(crate) fn exit(&self, ctx: &mut C) {
        if let Some(effect) = &self.on_exit {
            effect(ctx);
        }
    }
}

impl<C> std::fmt::Debug for Step<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("label", &self.label)
            .field("wait", &self.wait)
            .field("on_enter", &self.on_enter.is_some())
            .field("on_exit", &self.on_exit.is_some())
            .finish()
    }
}
