use std::future::Future;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(5000);

/// Polling period shared by every scheduler a view starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingOptions {
    pub interval: Duration,
}

impl Default for PollingOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
        }
    }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type Producer<T, E> = Arc<dyn Fn() -> BoxFuture<Result<T, E>> + Send + Sync>;
type Consumer<T, E> = Box<dyn FnMut(Result<T, E>) -> ControlFlow<()> + Send>;

struct Inner<T, E> {
    consumer: Consumer<T, E>,
    /// Bumped by every start and stop; a loop may only deliver while it still
    /// owns the current generation.
    generation: u64,
    task: Option<JoinHandle<()>>,
}

/// Runs a producer immediately and then once per interval, handing every
/// result to a consumer, until stopped.
///
/// The loop awaits each producer call before waiting for the next tick, so two
/// calls never overlap. Ticks missed while a slow call is outstanding are not
/// replayed: the next call starts once the slow one has been delivered and the
/// period restarts from there.
///
/// Delivery happens under the same lock [`PollingScheduler::stop`] takes to
/// retire the current generation, so once `stop` returns the consumer is never
/// called again, not even with a result that was already in flight.
///
/// The consumer may return [`ControlFlow::Break`] to end the loop on its own.
/// It must not call `stop` on the scheduler that invokes it.
///
/// Dropping the scheduler stops it.
pub struct PollingScheduler<T, E> {
    producer: Producer<T, E>,
    inner: Arc<Mutex<Inner<T, E>>>,
}

impl<T, E> PollingScheduler<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new<P, Fut, C>(producer: P, consumer: C) -> Self
    where
        P: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        C: FnMut(Result<T, E>) -> ControlFlow<()> + Send + 'static,
    {
        let producer: Producer<T, E> =
            Arc::new(move || -> BoxFuture<Result<T, E>> { Box::pin(producer()) });
        Self {
            producer,
            inner: Arc::new(Mutex::new(Inner {
                consumer: Box::new(consumer),
                generation: 0,
                task: None,
            })),
        }
    }

    /// Start polling every `interval`. Returns `false` if already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, interval: Duration) -> bool {
        let mut inner = lock(&self.inner);
        if inner.task.is_some() {
            return false;
        }

        inner.generation = inner.generation.wrapping_add(1);
        let generation = inner.generation;
        debug!(generation, interval_ms = interval.as_millis() as u64, "Polling started");
        inner.task = Some(tokio::spawn(run_loop(
            Arc::clone(&self.producer),
            Arc::clone(&self.inner),
            generation,
            interval,
        )));
        true
    }

    /// Stop polling and discard any result still in flight.
    pub fn stop(&self) {
        retire(&self.inner);
    }

    pub fn is_running(&self) -> bool {
        lock(&self.inner).task.is_some()
    }
}

impl<T, E> Drop for PollingScheduler<T, E> {
    fn drop(&mut self) {
        retire(&self.inner);
    }
}

fn retire<T, E>(inner: &Mutex<Inner<T, E>>) {
    let mut inner = lock(inner);
    inner.generation = inner.generation.wrapping_add(1);
    if let Some(task) = inner.task.take() {
        task.abort();
        debug!(generation = inner.generation, "Polling stopped");
    }
}

async fn run_loop<T, E>(
    producer: Producer<T, E>,
    inner: Arc<Mutex<Inner<T, E>>>,
    generation: u64,
    interval: Duration,
) where
    T: Send + 'static,
    E: Send + 'static,
{
    // `interval` panics on a zero period.
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // The first tick completes immediately.
        ticker.tick().await;
        let result = producer().await;
        match deliver(&inner, generation, result) {
            Delivery::Continue => {}
            Delivery::Finished | Delivery::Stale => return,
        }
    }
}

enum Delivery {
    Continue,
    Finished,
    Stale,
}

fn deliver<T, E>(inner: &Mutex<Inner<T, E>>, generation: u64, result: Result<T, E>) -> Delivery {
    let mut inner = lock(inner);
    if inner.generation != generation {
        trace!(generation, current = inner.generation, "Discarding stale poll result");
        return Delivery::Stale;
    }

    match (inner.consumer)(result) {
        ControlFlow::Continue(()) => Delivery::Continue,
        ControlFlow::Break(()) => {
            debug!(generation, "Polling finished by consumer");
            inner.task = None;
            Delivery::Finished
        }
    }
}

fn lock<T, E>(inner: &Mutex<Inner<T, E>>) -> MutexGuard<'_, Inner<T, E>> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}
