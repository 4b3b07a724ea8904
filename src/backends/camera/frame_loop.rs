// SPDX-License-Identifier: GPL-3.0-only
//! Cancellable repeating task for per-frame analysis
//!
//! The analysis pipeline runs one tick per display refresh. [`FrameLoop`]
//! models that as a dedicated thread that calls a closure at a fixed cadence
//! until either the closure asks to stop or the owner calls [`FrameLoop::stop`].
//!
//! Guarantees:
//! - ticks are strictly sequential; the next tick is only scheduled after the
//!   previous one returned
//! - once `stop()` returns no further tick runs
//! - the stop signal is checked at the top of every tick, and a sleeping loop
//!   is woken immediately when a stop is requested

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Action returned by the tick callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Liveness token for work started from inside a loop
///
/// Async work (encoding, decoding) captures a token when it starts and checks
/// it before applying its result; a stopped loop turns every token dead.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    /// A token that is alive until [`Liveness::kill`] is called
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Whether the owning loop is still running
    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Mark the owner as gone
    pub fn kill(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Controller for a repeating tick loop running in a separate thread
///
/// # Example
///
/// ```ignore
/// let frame_loop = FrameLoop::start("analysis", Duration::from_millis(33), move || {
///     session.tick(source.ready_frame().as_ref(), Instant::now());
///     LoopAction::Continue
/// });
///
/// // Later, stop the loop; no tick runs after this returns
/// frame_loop.stop();
/// ```
pub struct FrameLoop {
    /// Thread handle for joining and waking
    thread_handle: Option<JoinHandle<()>>,
    /// Signal to stop the loop
    stop_signal: Arc<AtomicBool>,
    /// Liveness shared with work started by ticks
    liveness: Liveness,
    /// Name for logging
    name: String,
}

impl FrameLoop {
    /// Start a new tick loop in a separate thread
    ///
    /// # Arguments
    ///
    /// * `name` - A descriptive name for the loop (used in logging)
    /// * `interval` - Target time between the starts of consecutive ticks
    /// * `tick_fn` - A closure that performs one tick
    pub fn start<F>(name: &str, interval: Duration, mut tick_fn: F) -> Self
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        Self::start_with_init(name, interval, |_| Ok(()), move |_: &mut ()| tick_fn())
    }

    /// Start a tick loop with initialization
    ///
    /// The `init_fn` is called once at the start of the thread to set up
    /// resources and receives the loop's [`Liveness`] token. If initialization
    /// fails, the thread exits immediately and no tick runs.
    pub fn start_with_init<S, I, F>(
        name: &str,
        interval: Duration,
        init_fn: I,
        mut tick_fn: F,
    ) -> Self
    where
        S: Send + 'static,
        I: FnOnce(Liveness) -> Result<S, String> + Send + 'static,
        F: FnMut(&mut S) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_signal_clone = Arc::clone(&stop_signal);
        let liveness = Liveness::new();
        let liveness_clone = liveness.clone();
        let name_clone = name.to_string();

        info!(name = %name, interval_ms = interval.as_millis(), "Starting frame loop");

        let thread_handle = thread::spawn(move || {
            let mut state = match init_fn(liveness_clone.clone()) {
                Ok(s) => s,
                Err(e) => {
                    warn!(name = %name_clone, error = %e, "Frame loop initialization failed");
                    liveness_clone.kill();
                    return;
                }
            };

            loop {
                if stop_signal_clone.load(Ordering::SeqCst) {
                    debug!(name = %name_clone, "Stop signal received");
                    break;
                }

                let tick_start = Instant::now();
                if tick_fn(&mut state) == LoopAction::Stop {
                    debug!(name = %name_clone, "Loop requested stop");
                    break;
                }

                // Sleep out the rest of the interval; request_stop unparks us
                let deadline = tick_start + interval;
                while !stop_signal_clone.load(Ordering::SeqCst) {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    thread::park_timeout(deadline - now);
                }
            }

            liveness_clone.kill();
            info!(name = %name_clone, "Frame loop exiting");
        });

        Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            liveness,
            name: name.to_string(),
        }
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Liveness token tied to this loop
    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    /// Signal the loop to stop (non-blocking)
    ///
    /// The current tick, if any, finishes; no new tick starts.
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting frame loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
        self.liveness.kill();
        if let Some(handle) = &self.thread_handle {
            handle.thread().unpark();
        }
    }

    /// Stop the loop and wait for the thread to finish
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the thread to finish without sending stop signal
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Frame loop thread panicked: {:?}", e);
            } else {
                debug!(name = %self.name, "Frame loop thread finished");
            }
        }
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "FrameLoop dropped, stopping loop");
            self.stop();
        }
    }
}
