//! In-memory gateway used by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::queue_client::{Endpoint, Gateway};
use crate::types::{NetworkError, NetworkErrorKind};

#[derive(Clone)]
struct Scripted {
    outcome: Result<Value, NetworkError>,
    delay: Duration,
}

/// Answers requests from per-path queues. The last queued answer for a path
/// is repeated once the queue runs down to it; unknown paths get a 404.
#[derive(Default)]
pub(crate) struct ScriptedGateway {
    routes: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<(String, Option<Value>)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(&self, path: &str, value: Value) {
        self.push(path, Ok(value), Duration::ZERO);
    }

    pub(crate) fn respond_after(&self, path: &str, value: Value, delay: Duration) {
        self.push(path, Ok(value), delay);
    }

    pub(crate) fn fail(&self, path: &str, error: NetworkError) {
        self.push(path, Err(error), Duration::ZERO);
    }

    pub(crate) fn calls(&self) -> Vec<(String, Option<Value>)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called, _)| called == path)
            .count()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn push(&self, path: &str, outcome: Result<Value, NetworkError>, delay: Duration) {
        self.routes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(Scripted { outcome, delay });
    }

    fn next(&self, path: &str) -> Scripted {
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(path) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Scripted {
                outcome: Err(NetworkError::new(
                    NetworkErrorKind::Status(404),
                    format!("{path} is not scripted"),
                )),
                delay: Duration::ZERO,
            },
        }
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn request(&self, endpoint: &Endpoint, body: Option<Value>) -> Result<Value, NetworkError> {
        let path = endpoint.path();
        self.calls.lock().unwrap().push((path.clone(), body));
        let scripted = self.next(&path);

        let _in_flight = InFlight::enter(&self.in_flight, &self.max_in_flight);
        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }

        scripted.outcome
    }
}

/// Decrements the in-flight count even when the request future is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, max: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
