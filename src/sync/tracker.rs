use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::queue_client::{QueueClient, TokenId, TokenStatusSnapshot};
use crate::types::NetworkError;

use super::scheduler::{PollingOptions, PollingScheduler};

/// What the token status view renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerState {
    pub token: Option<TokenId>,
    /// Last good snapshot; survives failed polls.
    pub snapshot: Option<TokenStatusSnapshot>,
    /// Error from the most recent poll, cleared by the next success.
    pub last_error: Option<NetworkError>,
    /// The token reached a terminal status and is no longer polled.
    pub finished: bool,
}

struct Binding {
    token: TokenId,
    scheduler: PollingScheduler<TokenStatusSnapshot, NetworkError>,
}

/// Polls `/token-status/{id}` for at most one token at a time.
///
/// Binding a different token stops the previous poller before the new one
/// starts, so a late answer for the old token can never overwrite state for
/// the new one. Dropping the tracker stops polling.
pub struct TokenStatusTracker {
    client: QueueClient,
    options: PollingOptions,
    terminal_statuses: Arc<[String]>,
    state: Arc<watch::Sender<TrackerState>>,
    binding: Option<Binding>,
}

impl TokenStatusTracker {
    pub fn new(client: QueueClient, options: PollingOptions) -> Self {
        let (state, _) = watch::channel(TrackerState::default());
        Self {
            client,
            options,
            terminal_statuses: Arc::from(vec!["completed".to_string()]),
            state: Arc::new(state),
            binding: None,
        }
    }

    pub fn with_terminal_statuses(mut self, statuses: Vec<String>) -> Self {
        self.terminal_statuses = Arc::from(statuses);
        self
    }

    /// Start tracking `token`. Binding the token that is already bound keeps
    /// the running poller untouched.
    pub fn bind(&mut self, token: impl Into<TokenId>) {
        let token = token.into();
        if self.token() == Some(&token) {
            trace!(token = %token, "Token already bound");
            return;
        }

        self.release();
        self.state.send_replace(TrackerState {
            token: Some(token.clone()),
            ..Default::default()
        });

        let client = self.client.clone();
        let producer_token = token.clone();
        let scheduler = PollingScheduler::new(
            move || {
                let client = client.clone();
                let token = producer_token.clone();
                async move { client.token_status(&token).await }
            },
            status_consumer(
                token.clone(),
                Arc::clone(&self.state),
                Arc::clone(&self.terminal_statuses),
            ),
        );
        scheduler.start(self.options.interval);
        info!(token = %token, "Tracking token");

        self.binding = Some(Binding { token, scheduler });
    }

    /// Stop polling and forget the current token and snapshot.
    pub fn unbind(&mut self) {
        self.release();
        self.state.send_replace(TrackerState::default());
    }

    /// `Some` binds, `None` unbinds.
    pub fn set_token(&mut self, token: Option<TokenId>) {
        match token {
            Some(token) => self.bind(token),
            None => self.unbind(),
        }
    }

    pub fn token(&self) -> Option<&TokenId> {
        self.binding.as_ref().map(|binding| &binding.token)
    }

    pub fn is_polling(&self) -> bool {
        self.binding
            .as_ref()
            .map(|binding| binding.scheduler.is_running())
            .unwrap_or(false)
    }

    pub fn state(&self) -> TrackerState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackerState> {
        self.state.subscribe()
    }

    fn release(&mut self) {
        if let Some(binding) = self.binding.take() {
            binding.scheduler.stop();
            debug!(token = %binding.token, "Token binding released");
        }
    }
}

fn status_consumer(
    token: TokenId,
    state: Arc<watch::Sender<TrackerState>>,
    terminal_statuses: Arc<[String]>,
) -> impl FnMut(Result<TokenStatusSnapshot, NetworkError>) -> ControlFlow<()> + Send + 'static {
    move |result| match result {
        Ok(snapshot) => {
            let finished = snapshot.is_terminal(&terminal_statuses);
            debug!(token = %token, status = %snapshot.status, "Token status updated");
            state.send_modify(|current| {
                current.snapshot = Some(snapshot);
                current.last_error = None;
                current.finished = finished;
            });
            if finished {
                info!(token = %token, "Token reached a terminal status, polling finished");
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        }
        Err(err) => {
            warn!(token = %token, error = %err, "Token status poll failed, keeping last snapshot");
            state.send_modify(|current| current.last_error = Some(err));
            ControlFlow::Continue(())
        }
    }
}
