//! Single-threaded cooperative event loop.
//!
//! The loop owns three kinds of pending work:
//!
//! - a FIFO **task queue** of run-to-completion callbacks (continuation
//!   notifications, `queue_task` callbacks, wakeups of async computations),
//! - a **timer queue** ordered by virtual due time, then scheduling order,
//! - the set of **spawned async computations** waiting to be polled.
//!
//! [`EventLoop::run_until_idle`] drains the task queue, then advances the
//! virtual clock to the earliest timer, fires it, and drains again until no
//! work remains. Nothing runs concurrently: a task never preempts another.

use futures::task::ArcWake;
use serde::{Deserialize, Serialize};
use settle_core::{DeferredId, Error, LoopConfig, Result, TaskId, TimerId, UnhandledRejection};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use crate::rejections::RejectionTracker;

type Callback = Box<dyn FnOnce()>;
type LocalFuture = Pin<Box<dyn Future<Output = ()>>>;

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// RunStats
// ============================================================================

/// Counters describing one call to [`EventLoop::run_until_idle`] or
/// [`EventLoop::run_tasks`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Tasks executed (continuations, queued callbacks, async polls)
    pub tasks_run: usize,

    /// Timers that came due and were fired
    pub timers_fired: usize,

    /// Virtual time that passed during the run
    pub elapsed: Duration,
}

// ============================================================================
// Internals
// ============================================================================

enum Job {
    Callback(Callback),
    Poll,
}

struct Queued {
    id: TaskId,
    job: Job,
}

/// Counters for every identifier the loop hands out.
///
/// Shared with deferred values through [`LoopRef`] so they can name their
/// children without holding the loop alive.
#[derive(Default)]
pub(crate) struct IdAllocator {
    deferreds: Cell<u64>,
    tasks: Cell<u64>,
    timers: Cell<u64>,
}

impl IdAllocator {
    fn bump(counter: &Cell<u64>) -> u64 {
        let next = counter.get() + 1;
        counter.set(next);
        next
    }

    pub(crate) fn deferred(&self) -> DeferredId {
        DeferredId::from_raw(Self::bump(&self.deferreds))
    }

    fn task(&self) -> TaskId {
        TaskId::from_raw(Self::bump(&self.tasks))
    }

    fn timer(&self) -> TimerId {
        TimerId::from_raw(Self::bump(&self.timers))
    }
}

#[derive(Default)]
struct WakeQueue {
    woken: Mutex<VecDeque<TaskId>>,
}

struct TaskWaker {
    task: TaskId,
    queue: Arc<WakeQueue>,
}

impl ArcWake for TaskWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self
            .queue
            .woken
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(arc_self.task);
    }
}

struct LoopInner {
    config: LoopConfig,
    ids: Rc<IdAllocator>,
    tasks: RefCell<VecDeque<Queued>>,
    timers: RefCell<BTreeMap<(Duration, TimerId), Callback>>,
    spawned: RefCell<HashMap<TaskId, LocalFuture>>,
    wakeups: Arc<WakeQueue>,
    rejections: RefCell<RejectionTracker>,
    now: Cell<Duration>,
    running: Cell<bool>,
}

struct RunningGuard<'a>(&'a Cell<bool>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

// ============================================================================
// EventLoop
// ============================================================================

/// Handle to a single-threaded event loop.
///
/// Cheap to clone (`Rc` internals); every clone drives the same queues.
/// The loop is `!Send`: deferred values and their continuations live on the
/// thread that created them.
#[derive(Clone)]
pub struct EventLoop {
    inner: Rc<LoopInner>,
}

impl EventLoop {
    /// Creates a loop with the default configuration.
    pub fn new() -> Self {
        Self::with_config(LoopConfig::default())
    }

    /// Creates a loop with the given configuration.
    pub fn with_config(config: LoopConfig) -> Self {
        Self {
            inner: Rc::new(LoopInner {
                config,
                ids: Rc::new(IdAllocator::default()),
                tasks: RefCell::new(VecDeque::new()),
                timers: RefCell::new(BTreeMap::new()),
                spawned: RefCell::new(HashMap::new()),
                wakeups: Arc::new(WakeQueue::default()),
                rejections: RefCell::new(RejectionTracker::default()),
                now: Cell::new(Duration::ZERO),
                running: Cell::new(false),
            }),
        }
    }

    /// The configuration this loop was created with.
    pub fn config(&self) -> &LoopConfig {
        &self.inner.config
    }

    /// Virtual time elapsed since the loop was created.
    ///
    /// Only timers move the clock.
    pub fn now(&self) -> Duration {
        self.inner.now.get()
    }

    /// Enqueues a callback at the back of the task queue.
    pub fn queue_task(&self, task: impl FnOnce() + 'static) -> TaskId {
        let id = self.inner.ids.task();
        self.inner.tasks.borrow_mut().push_back(Queued {
            id,
            job: Job::Callback(Box::new(task)),
        });
        id
    }

    /// Schedules `callback` to be queued once `delay` of virtual time passes.
    pub fn set_timeout(&self, delay: Duration, callback: impl FnOnce() + 'static) -> TimerId {
        let id = self.inner.ids.timer();
        let due = self.now().saturating_add(delay);
        self.inner
            .timers
            .borrow_mut()
            .insert((due, id), Box::new(callback));
        tracing::trace!(timer = %id, due_ms = millis(due), "Scheduled timer");
        id
    }

    /// Cancels a timer that has not fired yet.
    ///
    /// Returns `false` if the timer already fired or was never scheduled.
    pub fn clear_timeout(&self, timer: TimerId) -> bool {
        let mut timers = self.inner.timers.borrow_mut();
        let before = timers.len();
        timers.retain(|(_, id), _| *id != timer);
        before != timers.len()
    }

    /// Number of tasks waiting in the queue.
    pub fn pending_tasks(&self) -> usize {
        self.inner.tasks.borrow().len()
    }

    /// Number of timers that have not fired.
    pub fn pending_timers(&self) -> usize {
        self.inner.timers.borrow().len()
    }

    /// Number of spawned async computations that have not finished.
    pub fn pending_computations(&self) -> usize {
        self.inner.spawned.borrow().len()
    }

    /// Returns `true` if there are no queued tasks and no timers.
    ///
    /// Suspended async computations do not count: without a task or timer to
    /// wake them they can never make progress.
    pub fn is_idle(&self) -> bool {
        self.pending_tasks() == 0 && self.pending_timers() == 0 && self.pending_wakeups() == 0
    }

    /// Spawns a future as an async computation on this loop.
    ///
    /// The future is polled once immediately, so its body runs synchronously
    /// up to its first suspension point. Later polls happen on the task queue
    /// whenever its waker fires.
    pub fn spawn_local<F>(&self, future: F) -> TaskId
    where
        F: Future<Output = ()> + 'static,
    {
        let id = self.inner.ids.task();
        self.inner.spawned.borrow_mut().insert(id, Box::pin(future));
        tracing::trace!(task = %id, "Spawned async computation");
        self.poll_spawned(id);
        id
    }

    /// Runs tasks and fires timers until no work remains.
    pub fn run_until_idle(&self) -> Result<RunStats> {
        self.run(true)
    }

    /// Runs queued tasks without advancing the virtual clock.
    pub fn run_tasks(&self) -> Result<RunStats> {
        self.run(false)
    }

    /// Unhandled rejections recorded so far.
    pub fn unhandled_rejections(&self) -> Vec<UnhandledRejection> {
        self.inner.rejections.borrow().reported().to_vec()
    }

    /// Takes the recorded unhandled rejections, leaving the list empty.
    pub fn drain_unhandled_rejections(&self) -> Vec<UnhandledRejection> {
        self.inner.rejections.borrow_mut().drain()
    }

    pub(crate) fn handle(&self) -> LoopRef {
        LoopRef {
            inner: Rc::downgrade(&self.inner),
            ids: Rc::clone(&self.inner.ids),
        }
    }

    fn run(&self, advance_timers: bool) -> Result<RunStats> {
        if self.inner.running.replace(true) {
            return Err(Error::Reentrant);
        }
        let _guard = RunningGuard(&self.inner.running);

        let started = self.now();
        let mut stats = RunStats::default();
        loop {
            self.drain_tasks(&mut stats)?;
            if !advance_timers || !self.fire_next_timer() {
                break;
            }
            stats.timers_fired += 1;
        }
        stats.elapsed = self.now().saturating_sub(started);

        tracing::debug!(
            tasks = stats.tasks_run,
            timers = stats.timers_fired,
            elapsed_ms = millis(stats.elapsed),
            "Event loop idle"
        );
        Ok(stats)
    }

    fn drain_tasks(&self, stats: &mut RunStats) -> Result<()> {
        let limit = self.inner.config.max_tasks_per_run;
        loop {
            self.collect_wakeups();
            let next = self.inner.tasks.borrow_mut().pop_front();
            let Some(queued) = next else { break };
            if stats.tasks_run >= limit {
                self.inner.tasks.borrow_mut().push_front(queued);
                tracing::warn!(limit, "Task budget exhausted; remaining work stays queued");
                return Err(Error::TaskBudgetExceeded { limit });
            }
            self.execute(queued);
            stats.tasks_run += 1;
        }
        self.flush_rejections();
        Ok(())
    }

    fn execute(&self, queued: Queued) {
        let Queued { id, job } = queued;
        let span = if self.inner.config.trace_tasks {
            tracing::debug_span!("task", task = %id)
        } else {
            tracing::Span::none()
        };
        let _entered = span.enter();
        tracing::trace!(task = %id, "Running task");
        match job {
            Job::Callback(callback) => callback(),
            Job::Poll => self.poll_spawned(id),
        }
    }

    fn fire_next_timer(&self) -> bool {
        let next = self.inner.timers.borrow_mut().pop_first();
        let Some(((due, id), callback)) = next else {
            return false;
        };
        if due > self.now() {
            self.inner.now.set(due);
        }
        tracing::trace!(timer = %id, now_ms = millis(self.now()), "Timer fired");
        self.queue_task(callback);
        true
    }

    fn pending_wakeups(&self) -> usize {
        self.inner
            .wakeups
            .woken
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn collect_wakeups(&self) {
        let woken: Vec<TaskId> = self
            .inner
            .wakeups
            .woken
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        if woken.is_empty() {
            return;
        }
        let mut tasks = self.inner.tasks.borrow_mut();
        for id in woken {
            tasks.push_back(Queued { id, job: Job::Poll });
        }
    }

    fn poll_spawned(&self, id: TaskId) {
        let removed = self.inner.spawned.borrow_mut().remove(&id);
        let Some(mut future) = removed else {
            tracing::trace!(task = %id, "Wakeup for finished computation ignored");
            return;
        };
        let waker = futures::task::waker(Arc::new(TaskWaker {
            task: id,
            queue: Arc::clone(&self.inner.wakeups),
        }));
        let mut cx = Context::from_waker(&waker);
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(()) => tracing::trace!(task = %id, "Async computation finished"),
            Poll::Pending => {
                self.inner.spawned.borrow_mut().insert(id, future);
            }
        }
    }

    fn flush_rejections(&self) {
        let policy = self.inner.config.unhandled_rejections;
        self.inner.rejections.borrow_mut().flush(policy);
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("now", &self.now())
            .field("pending_tasks", &self.pending_tasks())
            .field("pending_timers", &self.pending_timers())
            .field("pending_computations", &self.pending_computations())
            .finish()
    }
}

// ============================================================================
// LoopRef
// ============================================================================

/// Non-owning handle held by deferred values.
///
/// A deferred value outliving its loop keeps working as a state cell; its
/// continuations are simply never run.
#[derive(Clone)]
pub(crate) struct LoopRef {
    inner: Weak<LoopInner>,
    ids: Rc<IdAllocator>,
}

impl LoopRef {
    pub(crate) fn next_deferred_id(&self) -> DeferredId {
        self.ids.deferred()
    }

    pub(crate) fn upgrade(&self) -> Option<EventLoop> {
        self.inner.upgrade().map(|inner| EventLoop { inner })
    }

    pub(crate) fn enqueue(&self, task: impl FnOnce() + 'static) {
        match self.upgrade() {
            Some(event_loop) => {
                event_loop.queue_task(task);
            }
            None => tracing::trace!("Event loop dropped; discarding continuation"),
        }
    }

    pub(crate) fn track_rejection(&self, deferred: DeferredId, reason: &dyn fmt::Debug) {
        let Some(event_loop) = self.upgrade() else {
            return;
        };
        if !event_loop.inner.config.unhandled_rejections.records() {
            return;
        }
        let report = UnhandledRejection::new(deferred, format!("{reason:?}"), event_loop.now());
        event_loop.inner.rejections.borrow_mut().track(report);
    }

    pub(crate) fn rejection_handled(&self, deferred: DeferredId) {
        if let Some(event_loop) = self.upgrade() {
            event_loop.inner.rejections.borrow_mut().handled(deferred);
        }
    }
}
