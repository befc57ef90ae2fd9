//! Per-call serialization primitive.
//!
//! A [`CallCombiner`] guarantees that at most one task touching a call's
//! state runs at a time. Whoever holds the combiner must eventually release
//! it with [`CallCombiner::stop`], which either hands it over to the next
//! queued task or marks it idle.
//!
//! ## Semantics
//!
//! - [`CallCombiner::start`] runs the task immediately when the combiner is idle,
//!   otherwise queues it behind the current holder.
//! - [`CallCombiner::stop`] releases the combiner. Queued tasks run in FIFO order.
//! - A task that finishes without calling `stop` keeps holding the combiner.
//!   This is how a task passes ownership down a continuation chain.
//!
//! Tasks are never run while the internal lock is held, so a task may freely
//! call `start` or `stop` on the same combiner. Handed-over tasks run one after
//! another in a loop on the thread that released the combiner: a `stop` issued
//! from inside that loop only marks the handoff, so long queues do not grow the
//! stack.

use std::{
    collections::VecDeque,
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
    thread::{self, ThreadId}
};

/// A unit of work scheduled on a [`CallCombiner`]
pub type Task = Box<
    dyn FnOnce()
    + Send
    + 'static
>;

struct Queued {
    task: Task,
    reason: &'static str,
}

#[derive(Default)]
struct State {
    busy: bool,
    queue: VecDeque<Queued>,
    /// Thread running the task loop, if any
    draining: Option<ThreadId>,
    /// The task run by the loop released the combiner
    released: bool,
}

/// Serializes the continuations of a single call.
#[derive(Default)]
pub struct CallCombiner {
    state: Mutex<State>,
}

impl fmt::Debug for CallCombiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("CallCombiner")
            .field("busy", &state.busy)
            .field("queued", &state.queue.len())
            .field("next", &state.queue.front().map(|q| q.reason))
            .finish()
    }
}

impl CallCombiner {
    /// Creates an idle call combiner
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `task` now if the combiner is idle, otherwise queues it
    /// until the current holder calls [`CallCombiner::stop`].
    ///
    /// `reason` is only used for diagnostics.
    pub fn start<F>(&self, task: F, reason: &'static str)
    where
        F: FnOnce() + Send + 'static
    {
        let me = thread::current().id();
        {
            let mut state = self.lock();
            if state.busy {
                #[cfg(feature = "tracing")]
                tracing::trace!(reason, queued = state.queue.len() + 1, "call combiner busy, queueing");
                state.queue.push_back(Queued { task: Box::new(task), reason });
                return;
            }
            state.busy = true;
            state.draining = Some(me);
            state.released = false;
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(reason, "call combiner acquired");
        self.drain(me, Box::new(task));
    }

    /// Releases the combiner.
    ///
    /// If tasks are queued, the oldest one takes over the combiner and runs
    /// on the current thread.
    pub fn stop(&self, reason: &'static str) {
        let me = thread::current().id();
        let next = {
            let mut state = self.lock();
            if state.draining == Some(me) {
                // the loop below picks the next task once the current one returns
                state.released = true;
                #[cfg(feature = "tracing")]
                tracing::trace!(reason, "call combiner released inside task loop");
                return;
            }
            match state.queue.pop_front() {
                Some(next) => {
                    state.draining = Some(me);
                    state.released = false;
                    next
                },
                None => {
                    state.busy = false;
                    #[cfg(feature = "tracing")]
                    tracing::trace!(reason, "call combiner released");
                    return;
                }
            }
        };

        #[cfg(feature = "tracing")]
        tracing::trace!(reason, next = next.reason, "call combiner handed over");
        #[cfg(not(feature = "tracing"))]
        let _ = reason;

        self.drain(me, next.task);
    }

    /// Runs `task`, then every task it hands the combiner over to
    fn drain(&self, me: ThreadId, mut task: Task) {
        loop {
            task();

            let mut state = self.lock();
            if state.draining != Some(me) {
                // another thread released the combiner on behalf of the task and took over
                return;
            }
            if !std::mem::take(&mut state.released) {
                // still held, a later stop continues from wherever it is issued
                state.draining = None;
                return;
            }
            match state.queue.pop_front() {
                Some(next) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(next = next.reason, "call combiner handed over");
                    task = next.task;
                },
                None => {
                    state.busy = false;
                    state.draining = None;
                    return;
                }
            }
        }
    }

    /// Returns `true` if some task currently holds the combiner
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.lock().busy
    }

    /// Returns the number of tasks waiting for the combiner
    #[inline]
    pub fn queued(&self) -> usize {
        self.lock().queue.len()
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
