/*
 * Broadcast flag for the measuring mode.
 *
 * This is a level-triggered event flag, not a `Signal`: waiting does not
 * consume anything, so any number of tasks can observe "set" at the same time
 * and keep observing it until someone clears the flag. Waits are always
 * bounded, so a waiter gets control back periodically even while the mode
 * stays inactive.
 *
 * The layout follows `embassy_sync::signal::Signal`: state behind a blocking
 * mutex, with the wakers of parked waiters kept next to the flag.
 */

use core::cell::RefCell;
use core::future::poll_fn;
use core::task::{Context, Poll};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::waitqueue::MultiWakerRegistration;
use embassy_time::{Duration, with_timeout};

struct State<const N: usize> {
    active: bool,
    waiters: MultiWakerRegistration<N>,
}

/// Measuring-mode flag with room for `N` concurrently parked waiters.
pub struct ModeSignal<M: RawMutex, const N: usize> {
    state: Mutex<M, RefCell<State<N>>>,
}

impl<M: RawMutex, const N: usize> ModeSignal<M, N> {
    /// Create the flag in the inactive state.
    pub const fn new() -> Self {
        ModeSignal {
            state: Mutex::new(RefCell::new(State {
                active: false,
                waiters: MultiWakerRegistration::new(),
            })),
        }
    }

    /// Mark the mode active and wake every parked waiter.
    pub fn set(&self) {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            state.active = true;
            state.waiters.wake();
        })
    }

    pub fn clear(&self) {
        self.state.lock(|state| state.borrow_mut().active = false)
    }

    pub fn is_set(&self) -> bool {
        self.state.lock(|state| state.borrow().active)
    }

    /// Wait until the flag is set, for at most `timeout`.
    ///
    /// Returns immediately with `true` if the flag is already set, and `false`
    /// if the timeout expired first. The flag is left as it is.
    pub async fn wait_until_set(&self, timeout: Duration) -> bool {
        with_timeout(timeout, poll_fn(|cx| self.poll_set(cx)))
            .await
            .is_ok()
    }

    fn poll_set(&self, cx: &mut Context<'_>) -> Poll<()> {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            if state.active {
                Poll::Ready(())
            } else {
                state.waiters.register(cx.waker());
                Poll::Pending
            }
        })
    }
}

impl<M: RawMutex, const N: usize> Default for ModeSignal<M, N> {
    fn default() -> Self {
        Self::new()
    }
}
