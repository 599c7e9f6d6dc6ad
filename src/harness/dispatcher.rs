//! Cooperative message loop and signal rendezvous.
//!
//! All steps and callbacks run on the thread that owns the [`Dispatcher`].
//! A step suspends only inside [`Dispatcher::wait`], which keeps servicing
//! due timers and queued callbacks until the awaited key is signalled or the
//! timeout elapses. Other threads reach the loop through a cloneable
//! [`DispatcherHandle`] backed by a crossbeam channel.
//!
//! Signal semantics:
//! - a signal posted before any wait is stored for immediate pickup;
//! - repeated signals before a wait overwrite each other (no queueing);
//! - a stored value is consumed by exactly one wait.
//!
//! Signals sent directly and through handles share one queue, so "last"
//! means last sent. Each check applies only the messages queued when it
//! starts; a callback that keeps re-posting itself cannot hold `wait` past
//! its timeout.
//!
//! `wait` borrows the dispatcher mutably, so there is never more than one
//! waiter per key.

#![allow(missing_docs)]

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};

use crate::core::errors::{HarnessError, Result};
use crate::harness::outcome::TestResult;

/// A callback executed on the dispatcher thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    RunAt(Instant, Job),
    Signal(String, TestResult),
}

// ──────────────────── handle ────────────────────

/// Thread-safe, cheaply-cloneable handle for posting work to a dispatcher.
///
/// Sends never block. Posting to a dispatcher that has been dropped is a
/// silent no-op: callbacks that outlive their scenario are discarded.
#[derive(Clone)]
pub struct DispatcherHandle {
    tx: Sender<Message>,
}

impl DispatcherHandle {
    /// Queue `job` to run on the next pump.
    pub fn post(&self, job: impl FnOnce() + Send + 'static) {
        let _ = self.tx.send(Message::Run(Box::new(job)));
    }

    /// Queue `job` to run once `delay` has elapsed.
    ///
    /// A delay past the end of the clock never fires and is dropped.
    pub fn post_after(&self, delay: Duration, job: impl FnOnce() + Send + 'static) {
        if let Some(deadline) = Instant::now().checked_add(delay) {
            let _ = self.tx.send(Message::RunAt(deadline, Box::new(job)));
        }
    }

    /// Resolve `key` with `value`.
    pub fn signal(&self, key: impl Into<String>, value: TestResult) {
        let _ = self.tx.send(Message::Signal(key.into(), value));
    }
}

// ──────────────────── timers ────────────────────

struct Timer {
    deadline: Instant,
    seq: u64,
    job: Job,
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for Timer {}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timer {
    // Reversed so the max-heap pops the earliest deadline, then the earliest post.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

// ──────────────────── dispatcher ────────────────────

/// Single-threaded message loop owning the signal board.
pub struct Dispatcher {
    tx: Sender<Message>,
    rx: Receiver<Message>,
    timers: BinaryHeap<Timer>,
    next_seq: u64,
    signals: HashMap<String, TestResult>,
    pump_slice: Duration,
    jobs_run: u64,
}

impl Dispatcher {
    /// Create a dispatcher that blocks at most `pump_slice` per queue poll.
    #[must_use]
    pub fn new(pump_slice: Duration) -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            timers: BinaryHeap::new(),
            next_seq: 0,
            signals: HashMap::new(),
            pump_slice: pump_slice.max(Duration::from_millis(1)),
            jobs_run: 0,
        }
    }

    #[must_use]
    pub fn handle(&self) -> DispatcherHandle {
        DispatcherHandle {
            tx: self.tx.clone(),
        }
    }

    /// Resolve `key` with `value`, in order with signals sent through handles.
    pub fn signal(&self, key: impl Into<String>, value: TestResult) {
        let _ = self.tx.send(Message::Signal(key.into(), value));
    }

    /// Number of timers not yet fired.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Number of callbacks executed so far.
    #[must_use]
    pub fn jobs_run(&self) -> u64 {
        self.jobs_run
    }

    /// Block cooperatively until `key` is signalled or `timeout` elapses.
    ///
    /// Due timers and queued callbacks run while waiting. Every message
    /// queued before a check is applied first, so the most recent value for
    /// `key` is the one returned and consumed.
    pub fn wait(&mut self, key: &str, timeout: Duration) -> Result<TestResult> {
        let started = Instant::now();
        // `None` when the timeout is past the end of the clock.
        let deadline = started.checked_add(timeout);

        loop {
            self.apply_queued();
            if let Some(value) = self.signals.remove(key) {
                return Ok(value);
            }

            let now = Instant::now();
            if deadline.is_some_and(|d| now >= d) {
                return Err(HarnessError::SignalTimeout {
                    key: key.to_string(),
                    waited_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                });
            }
            if self.run_due_timer(now) {
                continue;
            }

            let mut wake = now.checked_add(self.pump_slice).unwrap_or(now);
            if let Some(d) = deadline {
                wake = wake.min(d);
            }
            if let Some(timer) = self.timers.peek() {
                wake = wake.min(timer.deadline);
            }
            match self.rx.recv_timeout(wake.saturating_duration_since(now)) {
                Ok(message) => self.dispatch(message),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(HarnessError::ChannelClosed {
                        component: "dispatcher",
                    });
                }
            }
        }
    }

    /// Run the callbacks and timers that are ready now, without blocking.
    ///
    /// Work posted or scheduled by those callbacks waits for the next pump.
    /// Returns the number of callbacks executed.
    pub fn pump_pending(&mut self) -> usize {
        let before = self.jobs_run;
        self.apply_queued();
        let now = Instant::now();
        let due = self.timers.iter().filter(|t| t.deadline <= now).count();
        for _ in 0..due {
            if !self.run_due_timer(now) {
                break;
            }
        }
        usize::try_from(self.jobs_run - before).unwrap_or(usize::MAX)
    }

    /// Apply the messages queued at the time of the call, in send order.
    fn apply_queued(&mut self) {
        for _ in 0..self.rx.len() {
            match self.rx.try_recv() {
                Ok(message) => self.dispatch(message),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
    }

    fn run_due_timer(&mut self, now: Instant) -> bool {
        if self.timers.peek().is_some_and(|t| t.deadline <= now)
            && let Some(timer) = self.timers.pop()
        {
            self.run(timer.job);
            return true;
        }
        false
    }

    fn dispatch(&mut self, message: Message) {
        match message {
            Message::Run(job) => self.run(job),
            Message::RunAt(deadline, job) => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.timers.push(Timer { deadline, seq, job });
            }
            Message::Signal(key, value) => {
                self.signals.insert(key, value);
            }
        }
    }

    fn run(&mut self, job: Job) {
        self.jobs_run += 1;
        job();
    }
}
