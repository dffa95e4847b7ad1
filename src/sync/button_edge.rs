/*
 * Interrupt-to-task handoff for the push button.
 *
 * The token is a single atomic flag. Raising it is one store and consuming it
 * is one swap, so the interrupt side never blocks, never allocates and never
 * takes a critical section. Raising an already raised token is a no-op: a
 * burst of edges before the task polls collapses into one token.
 */

use core::sync::atomic::{AtomicBool, Ordering};

pub struct ButtonEdge {
    raised: AtomicBool,
}

impl ButtonEdge {
    pub const fn new() -> Self {
        ButtonEdge {
            raised: AtomicBool::new(false),
        }
    }

    /// Raise the token. Safe to call from an interrupt handler.
    pub fn signal_from_interrupt(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Take the token if it is raised. Returns `true` at most once per raise.
    pub fn try_consume(&self) -> bool {
        self.raised.swap(false, Ordering::AcqRel)
    }
}

impl Default for ButtonEdge {
    fn default() -> Self {
        Self::new()
    }
}
