//! Cancellable scheduled tasks.
//!
//! The monitor never touches timers directly; it asks a [`Scheduler`] for a
//! repeating or one-shot task and keeps the returned [`TimerHandle`]. The
//! tokio implementation drives real sessions, [`ManualScheduler`] lets a
//! caller move time forward explicitly.

use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

pub type TaskFuture = BoxFuture<'static, ()>;

/// Produces one future per tick.
pub type RepeatingTask = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

pub trait TimerHandle: Send + Sync {
    /// Stops future firings. Work already started keeps running.
    fn cancel(&self);
    fn is_active(&self) -> bool;
}

pub trait Scheduler: Send + Sync {
    /// Runs `task` every `period`, first firing one period from now.
    fn repeat(&self, period: Duration, task: RepeatingTask) -> Box<dyn TimerHandle>;
    fn delay(&self, delay: Duration, task: TaskFuture) -> Box<dyn TimerHandle>;
}

// Tokio

#[derive(Debug, Default, Clone)]
pub struct TokioScheduler;

impl TokioScheduler {
    pub fn new() -> Self {
        Self
    }
}

struct TokioTimer {
    abort: AbortHandle,
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle for TokioTimer {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.abort.abort();
    }

    fn is_active(&self) -> bool {
        !self.cancelled.load(Ordering::SeqCst) && !self.abort.is_finished()
    }
}

impl Scheduler for TokioScheduler {
    fn repeat(&self, period: Duration, task: RepeatingTask) -> Box<dyn TimerHandle> {
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                // Fire and forget: ticks never wait on the previous task.
                tokio::spawn(task());
            }
        });

        Box::new(TokioTimer {
            abort: handle.abort_handle(),
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    fn delay(&self, delay: Duration, task: TaskFuture) -> Box<dyn TimerHandle> {
        let handle = tokio::spawn(async move {
            time::sleep(delay).await;
            task.await;
        });

        Box::new(TokioTimer {
            abort: handle.abort_handle(),
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }
}

// Manual

enum EntryKind {
    Repeat { period: Duration, task: RepeatingTask },
    Once(Option<TaskFuture>),
}

struct Entry {
    due: Duration,
    seq: u64,
    kind: EntryKind,
    flags: Arc<TimerFlags>,
}

#[derive(Default)]
struct TimerFlags {
    cancelled: AtomicBool,
    fired: AtomicBool,
}

struct ManualTimer {
    flags: Arc<TimerFlags>,
}

impl TimerHandle for ManualTimer {
    fn cancel(&self) {
        self.flags.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        !self.flags.cancelled.load(Ordering::SeqCst) && !self.flags.fired.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_seq: u64,
    entries: Vec<Entry>,
}

enum Next {
    Repeat(RepeatingTask),
    Once(TaskFuture),
    Done,
}

/// Scheduler driven by [`ManualScheduler::advance`] instead of a clock.
///
/// Due tasks run in deadline order (registration order on ties) and are
/// awaited inline, so everything a tick triggers has finished when
/// `advance` returns.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    inner: Arc<Mutex<ManualState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ManualState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn now(&self) -> Duration {
        self.state().now
    }

    /// Timers that can still fire.
    pub fn active_timers(&self) -> usize {
        self.state()
            .entries
            .iter()
            .filter(|entry| !entry.flags.cancelled.load(Ordering::SeqCst))
            .count()
    }

    pub async fn advance(&self, by: Duration) {
        let target = self.now() + by;

        loop {
            match self.next_due(target) {
                Next::Repeat(task) => task().await,
                Next::Once(task) => task.await,
                Next::Done => break,
            }
        }
    }

    fn next_due(&self, target: Duration) -> Next {
        let mut state = self.state();
        state
            .entries
            .retain(|entry| !entry.flags.cancelled.load(Ordering::SeqCst));

        let index = state
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.due <= target)
            .min_by_key(|(_, entry)| (entry.due, entry.seq))
            .map(|(index, _)| index);

        let Some(index) = index else {
            state.now = target;
            return Next::Done;
        };

        let due = state.entries[index].due;
        state.now = due;

        let period = match &state.entries[index].kind {
            EntryKind::Repeat { period, .. } => Some(*period),
            EntryKind::Once(_) => None,
        };

        match period {
            Some(period) => {
                let seq = state.next_seq;
                state.next_seq += 1;
                let entry = &mut state.entries[index];
                entry.due = due + period;
                entry.seq = seq;
                match &entry.kind {
                    EntryKind::Repeat { task, .. } => Next::Repeat(task.clone()),
                    EntryKind::Once(_) => Next::Done,
                }
            }
            None => {
                let mut entry = state.entries.remove(index);
                entry.flags.fired.store(true, Ordering::SeqCst);
                match &mut entry.kind {
                    EntryKind::Once(task) => task.take().map(Next::Once).unwrap_or(Next::Done),
                    EntryKind::Repeat { .. } => Next::Done,
                }
            }
        }
    }

    fn push(&self, delay: Duration, kind: EntryKind) -> Box<dyn TimerHandle> {
        let flags = Arc::new(TimerFlags::default());
        let mut state = self.state();
        let seq = state.next_seq;
        state.next_seq += 1;
        let due = state.now + delay;
        state.entries.push(Entry {
            due,
            seq,
            kind,
            flags: flags.clone(),
        });
        Box::new(ManualTimer { flags })
    }
}

impl Scheduler for ManualScheduler {
    fn repeat(&self, period: Duration, task: RepeatingTask) -> Box<dyn TimerHandle> {
        self.push(period, EntryKind::Repeat { period, task })
    }

    fn delay(&self, delay: Duration, task: TaskFuture) -> Box<dyn TimerHandle> {
        self.push(delay, EntryKind::Once(Some(task)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::AtomicUsize;

    fn counting_task(counter: &Arc<AtomicUsize>) -> RepeatingTask {
        let counter = counter.clone();
        Arc::new(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn test_repeat_fires_once_per_period() {
        let scheduler = ManualScheduler::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        let timer = scheduler.repeat(Duration::from_secs(2), counting_task(&ticks));

        scheduler.advance(Duration::from_millis(1999)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        scheduler.advance(Duration::from_millis(1)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        scheduler.advance(Duration::from_secs(6)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 4);
        assert!(timer.is_active());
        assert_eq!(scheduler.now(), Duration::from_secs(8));
    }

    #[tokio::test]
    async fn test_cancelled_repeat_stops_firing() {
        let scheduler = ManualScheduler::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        let timer = scheduler.repeat(Duration::from_secs(1), counting_task(&ticks));

        scheduler.advance(Duration::from_secs(2)).await;
        timer.cancel();
        scheduler.advance(Duration::from_secs(5)).await;

        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert!(!timer.is_active());
        assert_eq!(scheduler.active_timers(), 0);
    }

    #[tokio::test]
    async fn test_delay_fires_exactly_once() {
        let scheduler = ManualScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let timer = scheduler.delay(
            Duration::from_secs(3),
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed(),
        );

        assert!(timer.is_active());
        scheduler.advance(Duration::from_secs(10)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_active());
    }

    #[tokio::test]
    async fn test_tokio_timer_cancel() {
        let scheduler = TokioScheduler::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        let timer = scheduler.repeat(Duration::from_secs(60), counting_task(&ticks));

        assert!(timer.is_active());
        timer.cancel();
        assert!(!timer.is_active());
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }
}
