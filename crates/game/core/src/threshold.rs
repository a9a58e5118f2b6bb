//! One-shot, monotonic health-threshold events.
//!
//! Each threshold fires at most once, the first time a reported health value
//! is at or below it. A single report that crosses several thresholds fires
//! all of them, highest value first, before returning.

/// A threshold value with its subscribers.
#[derive(Clone, Debug, PartialEq)]
pub struct Threshold<L> {
    value: i32,
    fired: bool,
    listeners: Vec<L>,
}

impl<L> Threshold<L> {
    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    pub fn listeners(&self) -> &[L] {
        &self.listeners
    }
}

/// Health-crossing event source with explicit, symmetric subscriptions.
///
/// Listeners are plain values (`L`), handed back to the caller's `on_fire`
/// closure when their threshold fires. The closure also receives the
/// dispatcher, so a listener may subscribe or unsubscribe others while a
/// report is in progress; such changes are visible to the lower thresholds of
/// the same report.
#[derive(Clone, Debug)]
pub struct ThresholdDispatcher<L> {
    /// Sorted by descending value.
    thresholds: Vec<Threshold<L>>,
}

impl<L: Clone + PartialEq> ThresholdDispatcher<L> {
    pub fn new() -> Self {
        Self {
            thresholds: Vec::new(),
        }
    }

    /// Registers a threshold with no listeners. Returns `false` if it exists.
    pub fn register(&mut self, value: i32) -> bool {
        match self.position(value) {
            Ok(_) => false,
            Err(index) => {
                self.thresholds.insert(
                    index,
                    Threshold {
                        value,
                        fired: false,
                        listeners: Vec::new(),
                    },
                );
                true
            }
        }
    }

    /// Registers `value` if needed and subscribes `listener` to it.
    pub fn register_with(&mut self, value: i32, listener: L) {
        self.register(value);
        self.subscribe(value, listener);
    }

    /// Subscribes `listener` to an existing threshold.
    ///
    /// Returns `false` if no threshold has that value. Subscribing to a fired
    /// threshold is allowed but the listener will never be called.
    pub fn subscribe(&mut self, value: i32, listener: L) -> bool {
        match self.position(value) {
            Ok(index) => {
                self.thresholds[index].listeners.push(listener);
                true
            }
            Err(_) => false,
        }
    }

    /// Removes every subscription of `listener` to `value`; returns how many.
    pub fn unsubscribe(&mut self, value: i32, listener: &L) -> usize {
        let Ok(index) = self.position(value) else {
            return 0;
        };
        let listeners = &mut self.thresholds[index].listeners;
        let before = listeners.len();
        listeners.retain(|existing| existing != listener);
        before - listeners.len()
    }

    /// Fires every unfired threshold at or above `health`, highest first.
    ///
    /// `on_fire` is called once per crossed threshold with the listeners
    /// subscribed at that moment. Returns the fired values in firing order.
    pub fn report<F>(&mut self, health: i32, mut on_fire: F) -> Vec<i32>
    where
        F: FnMut(&mut Self, i32, Vec<L>),
    {
        let mut fired = Vec::new();
        while let Some(index) = self
            .thresholds
            .iter()
            .position(|threshold| !threshold.fired && health <= threshold.value)
        {
            let threshold = &mut self.thresholds[index];
            threshold.fired = true;
            let value = threshold.value;
            let listeners = threshold.listeners.clone();

            fired.push(value);
            on_fire(self, value, listeners);
        }
        fired
    }

    /// `Some(fired)` for a registered value, `None` otherwise.
    pub fn is_fired(&self, value: i32) -> Option<bool> {
        self.position(value)
            .ok()
            .map(|index| self.thresholds[index].fired)
    }

    /// Unfired values, highest first.
    pub fn pending(&self) -> impl Iterator<Item = i32> + '_ {
        self.thresholds
            .iter()
            .filter(|threshold| !threshold.fired)
            .map(|threshold| threshold.value)
    }

    pub fn thresholds(&self) -> &[Threshold<L>] {
        &self.thresholds
    }

    fn position(&self, value: i32) -> Result<usize, usize> {
        self.thresholds
            .binary_search_by(|threshold| value.cmp(&threshold.value))
    }
}

impl<L: Clone + PartialEq> Default for ThresholdDispatcher<L> {
    fn default() -> Self {
        Self::new()
    }
}
