use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::queue_client::{QueueClient, RegistrationForm, RegistrationReceipt, RegistrationRequest};
use crate::types::ClientError;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RegistrationState {
    #[default]
    Idle,
    Submitting,
    Succeeded(RegistrationReceipt),
    Failed(ClientError),
}

impl RegistrationState {
    pub fn is_submitting(&self) -> bool {
        matches!(self, Self::Submitting)
    }

    pub fn receipt(&self) -> Option<&RegistrationReceipt> {
        match self {
            Self::Succeeded(receipt) => Some(receipt),
            _ => None,
        }
    }
}

/// Submits one patient registration at a time.
///
/// A second submit while the first is outstanding is rejected without touching
/// the network. After a success the flow stays on the receipt until
/// [`RegistrationFlow::reset`] is called.
pub struct RegistrationFlow {
    client: QueueClient,
    state: Arc<watch::Sender<RegistrationState>>,
}

impl RegistrationFlow {
    pub fn new(client: QueueClient) -> Self {
        let (state, _) = watch::channel(RegistrationState::default());
        Self {
            client,
            state: Arc::new(state),
        }
    }

    pub async fn submit(
        &self,
        request: RegistrationRequest,
    ) -> Result<RegistrationReceipt, ClientError> {
        self.begin()?;
        let mut attempt = Attempt {
            state: &self.state,
            settled: false,
        };

        if let Err(err) = request.validate() {
            let err = ClientError::from(err);
            warn!(error = %err, "Registration rejected before submission");
            attempt.settle(RegistrationState::Failed(err.clone()));
            return Err(err);
        }

        match self.client.register_patient(&request).await {
            Ok(receipt) => {
                info!(token = %receipt.token, "Registration accepted");
                attempt.settle(RegistrationState::Succeeded(receipt.clone()));
                Ok(receipt)
            }
            Err(err) => {
                let err = ClientError::from(err);
                warn!(error = %err, "Registration failed");
                attempt.settle(RegistrationState::Failed(err.clone()));
                Err(err)
            }
        }
    }

    /// Parse raw form input and submit it. Parse failures land in the same
    /// `Failed` state a validation failure would.
    pub async fn submit_form(&self, form: RegistrationForm) -> Result<RegistrationReceipt, ClientError> {
        match form.into_request() {
            Ok(request) => self.submit(request).await,
            Err(err) => {
                self.begin()?;
                let err = ClientError::from(err);
                warn!(error = %err, "Registration form rejected");
                self.state.send_replace(RegistrationState::Failed(err.clone()));
                Err(err)
            }
        }
    }

    /// Back to an empty form. Ignored while a submission is outstanding.
    pub fn reset(&self) {
        self.state.send_if_modified(|state| {
            if state.is_submitting() || *state == RegistrationState::Idle {
                return false;
            }
            *state = RegistrationState::Idle;
            true
        });
    }

    pub fn state(&self) -> RegistrationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RegistrationState> {
        self.state.subscribe()
    }

    /// Atomically move to `Submitting`, or say why that is not allowed.
    fn begin(&self) -> Result<(), ClientError> {
        let mut rejection = None;
        self.state.send_if_modified(|state| match state {
            RegistrationState::Submitting => {
                rejection = Some(ClientError::SubmissionInProgress);
                false
            }
            RegistrationState::Succeeded(_) => {
                rejection = Some(ClientError::AlreadyRegistered);
                false
            }
            RegistrationState::Idle | RegistrationState::Failed(_) => {
                *state = RegistrationState::Submitting;
                true
            }
        });
        match rejection {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Puts the flow back to `Idle` if a submission is dropped before it settles.
struct Attempt<'a> {
    state: &'a watch::Sender<RegistrationState>,
    settled: bool,
}

impl Attempt<'_> {
    fn settle(&mut self, outcome: RegistrationState) {
        self.state.send_replace(outcome);
        self.settled = true;
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.state.send_replace(RegistrationState::Idle);
        }
    }
}
