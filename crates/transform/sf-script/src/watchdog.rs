//! Watchdog - wall-clock timeouts for script invocations.
//!
//! One timer thread per processor holds a deadline-ordered set of armed
//! interrupts. When a deadline passes, the matching [`Interrupt`] is
//! triggered; the session's engine polls it from its progress callback and
//! terminates the script. Disarming is done by dropping the [`TimerGuard`],
//! which also clears the flag so it can never reach a later invocation.

use parking_lot::{Condvar, Mutex};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Interrupt flag shared between a session's engine and the watchdog.
#[derive(Debug, Default)]
pub struct Interrupt {
    flag: AtomicBool,
}

impl Interrupt {
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub fn clear(&self) {
        self.flag.store(false, Ordering::Release);
    }
}

type TimerKey = (Instant, u64);

#[derive(Default)]
struct State {
    timers: BTreeMap<TimerKey, Arc<Interrupt>>,
    next_id: u64,
    shutdown: bool,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    wakeup: Condvar,
}

/// Timer thread that fires interrupts at their deadlines.
pub struct Watchdog {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Starts the timer thread.
    pub fn spawn(name: &str) -> std::io::Result<Self> {
        let shared = Arc::new(Shared::default());
        let worker = shared.clone();
        let thread = thread::Builder::new()
            .name(format!("watchdog-{name}"))
            .spawn(move || run(&worker))?;

        debug!(processor = name, "Started script watchdog");
        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    /// Arms a timer that triggers `interrupt` after `timeout`.
    ///
    /// Returns `None` when the deadline is too far away to be represented;
    /// such a timer could never fire.
    pub fn arm(&self, timeout: Duration, interrupt: Arc<Interrupt>) -> Option<TimerGuard<'_>> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            trace!(?timeout, "Timeout out of range, not arming");
            return None;
        };
        let mut state = self.shared.state.lock();
        let key = (deadline, state.next_id);
        state.next_id = state.next_id.wrapping_add(1);

        let is_earliest = state.timers.keys().next().map_or(true, |first| key < *first);
        state.timers.insert(key, interrupt.clone());
        drop(state);

        if is_earliest {
            self.shared.wakeup.notify_one();
        }

        Some(TimerGuard {
            shared: &self.shared,
            key,
            interrupt,
        })
    }

    /// Returns the number of armed timers.
    pub fn armed(&self) -> usize {
        self.shared.state.lock().timers.len()
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.wakeup.notify_all();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Disarms its timer and clears the interrupt when dropped.
pub struct TimerGuard<'a> {
    shared: &'a Shared,
    key: TimerKey,
    interrupt: Arc<Interrupt>,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.shared.state.lock().timers.remove(&self.key);
        self.interrupt.clear();
    }
}

fn run(shared: &Shared) {
    let mut state = shared.state.lock();
    loop {
        if state.shutdown {
            break;
        }

        let now = Instant::now();
        while let Some(entry) = state.timers.first_entry() {
            if entry.key().0 > now {
                break;
            }
            entry.remove().trigger();
            trace!("Script timeout fired");
        }

        match state.timers.keys().next().map(|(deadline, _)| *deadline) {
            Some(deadline) => {
                shared.wakeup.wait_until(&mut state, deadline);
            }
            None => shared.wakeup.wait(&mut state),
        }
    }
}
