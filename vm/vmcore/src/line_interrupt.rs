// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Infrastructure to support output interrupt lines.

use parking_lot::Mutex;
use std::borrow::Cow;
use std::fmt::Debug;
use std::fmt::Display;
use std::sync::Arc;

/// The receiving end of a line, typically a platform interrupt controller.
///
/// **NOTE: Individual devices should not use this trait directly!**
///
/// Devices are handed a [`LineInterrupt`], which hides the vector assignment
/// from the device. Handing a device an interface that can assert arbitrary
/// vectors lets it trample on other devices' lines.
pub trait LineSetTarget: Send + Sync {
    /// Set an interrupt line state.
    fn set_irq(&self, vector: u32, high: bool);
}

struct Target {
    inner: Arc<dyn LineSetTarget>,
    vector: u32,
}

/// A line interrupt, representing a (virtually) physical wire between a device
/// and an interrupt controller.
//
// DEVNOTE: no `Clone`. Two owners of the same wire would silently fight over
// its level.
pub struct LineInterrupt {
    debug_label: Cow<'static, str>,
    target: Option<Target>,
    is_high: Mutex<bool>,
}

impl Debug for LineInterrupt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineInterrupt")
            .field("debug_label", &self.debug_label)
            .field("vector", &self.target.as_ref().map(|t| t.vector))
            .field("is_high", &*self.is_high.lock())
            .finish()
    }
}

impl Display for LineInterrupt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.target {
            Some(target) => write!(f, "{}({})", self.debug_label, target.vector),
            None => write!(f, "{}(detached)", self.debug_label),
        }
    }
}

impl LineInterrupt {
    /// Creates a line that is not attached to any target.
    ///
    /// This is useful for testing purposes.
    pub fn detached() -> Self {
        Self {
            debug_label: "detached".into(),
            target: None,
            is_high: Mutex::new(false),
        }
    }

    /// Creates a new line interrupt wired to `vector` on `target`.
    pub fn new_with_target(
        debug_label: impl Into<Cow<'static, str>>,
        target: Arc<dyn LineSetTarget>,
        vector: u32,
    ) -> LineInterrupt {
        Self {
            debug_label: debug_label.into(),
            target: Some(Target {
                inner: target,
                vector,
            }),
            is_high: Mutex::new(false),
        }
    }

    /// Sets the line level high or low.
    ///
    /// The target is only notified when the level actually changes.
    pub fn set_level(&self, high: bool) {
        let mut is_high = self.is_high.lock();
        if *is_high == high {
            return;
        }
        *is_high = high;

        match &self.target {
            Some(target) => target.inner.set_irq(target.vector, high),
            None => {
                if high {
                    tracing::warn!(line = %self, "LineInterrupt not hooked up to any target!");
                }
            }
        }
    }

    /// Returns the level last driven onto the line.
    pub fn is_high(&self) -> bool {
        *self.is_high.lock()
    }
}

impl Drop for LineInterrupt {
    fn drop(&mut self) {
        // Don't leave the target with a stuck-high line.
        self.set_level(false);
    }
}

#[expect(missing_docs)] // self explanatory struct/functions
pub mod test_helpers {
    use crate::line_interrupt::LineSetTarget;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    pub struct TestLineInterruptTarget {
        state: Mutex<BTreeMap<u32, LineState>>,
    }

    #[derive(Default)]
    struct LineState {
        is_high: bool,
        edges: usize,
    }

    impl TestLineInterruptTarget {
        pub fn new_arc() -> Arc<TestLineInterruptTarget> {
            Arc::new(TestLineInterruptTarget {
                state: Default::default(),
            })
        }

        pub fn is_high(&self, vector: u32) -> bool {
            self.state.lock().get(&vector).is_some_and(|s| s.is_high)
        }

        /// Number of low-to-high transitions seen on `vector`.
        pub fn rising_edges(&self, vector: u32) -> usize {
            self.state.lock().get(&vector).map_or(0, |s| s.edges)
        }
    }

    impl LineSetTarget for TestLineInterruptTarget {
        fn set_irq(&self, vector: u32, high: bool) {
            let mut state = self.state.lock();
            let state = state.entry(vector).or_default();
            if high && !state.is_high {
                state.edges += 1;
            }
            state.is_high = high;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_interrupt::test_helpers::TestLineInterruptTarget;

    #[test]
    fn basic() {
        let intcon = TestLineInterruptTarget::new_arc();
        let line = LineInterrupt::new_with_target("dmac", intcon.clone(), 4);

        assert!(!intcon.is_high(4));
        line.set_level(true);
        assert!(intcon.is_high(4));
        assert!(line.is_high());
        line.set_level(true);
        assert_eq!(intcon.rising_edges(4), 1);
        line.set_level(false);
        assert!(!intcon.is_high(4));
    }

    #[test]
    fn drop_deasserts() {
        let intcon = TestLineInterruptTarget::new_arc();
        let line = LineInterrupt::new_with_target("dmac", intcon.clone(), 2);
        line.set_level(true);
        drop(line);
        assert!(!intcon.is_high(2));
    }

    #[test]
    fn detached_tracks_level() {
        let line = LineInterrupt::detached();
        line.set_level(true);
        assert!(line.is_high());
        assert_eq!(line.to_string(), "detached(detached)");
    }
}
