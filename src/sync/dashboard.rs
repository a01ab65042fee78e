use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::queue_client::{DashboardSnapshot, DataAggregator, QueueClient};
use crate::types::AggregationError;

use super::scheduler::{PollingOptions, PollingScheduler};

/// What the admin view renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    /// Most recent complete snapshot; never partially updated.
    pub snapshot: Option<Arc<DashboardSnapshot>>,
    /// Set when the latest cycle was discarded, cleared by the next good one.
    pub last_error: Option<AggregationError>,
    /// Number of snapshots published so far.
    pub published: u64,
}

/// Keeps the admin dashboard fresh by re-running the joined fetch on a timer.
pub struct DashboardAggregator {
    scheduler: PollingScheduler<DashboardSnapshot, AggregationError>,
    options: PollingOptions,
    state: Arc<watch::Sender<DashboardState>>,
}

impl DashboardAggregator {
    pub fn new(client: QueueClient, options: PollingOptions) -> Self {
        let (state, _) = watch::channel(DashboardState::default());
        let state = Arc::new(state);

        let scheduler = PollingScheduler::new(
            move || {
                let client = client.clone();
                async move { DataAggregator::new(&client).compose_dashboard().await }
            },
            snapshot_consumer(Arc::clone(&state)),
        );

        Self {
            scheduler,
            options,
            state,
        }
    }

    pub fn start(&self) -> bool {
        let started = self.scheduler.start(self.options.interval);
        if started {
            info!(
                interval_ms = self.options.interval.as_millis() as u64,
                "Dashboard polling started"
            );
        }
        started
    }

    pub fn stop(&self) {
        self.scheduler.stop();
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn state(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state.subscribe()
    }
}

fn snapshot_consumer(
    state: Arc<watch::Sender<DashboardState>>,
) -> impl FnMut(Result<DashboardSnapshot, AggregationError>) -> ControlFlow<()> + Send + 'static {
    move |result| {
        match result {
            Ok(snapshot) => {
                state.send_modify(|current| {
                    current.snapshot = Some(Arc::new(snapshot));
                    current.last_error = None;
                    current.published += 1;
                });
                debug!("Dashboard snapshot published");
            }
            Err(err) => {
                warn!(error = %err, "Dashboard cycle discarded, keeping previous snapshot");
                state.send_modify(|current| current.last_error = Some(err));
            }
        }
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::time::sleep;

    use super::*;
    use crate::test_support::ScriptedGateway;
    use crate::types::{DashboardSource, NetworkError, NetworkErrorKind};

    const INTERVAL: Duration = Duration::from_secs(5);

    fn aggregator(gateway: &Arc<ScriptedGateway>) -> DashboardAggregator {
        DashboardAggregator::new(
            QueueClient::new(gateway.clone()),
            PollingOptions { interval: INTERVAL },
        )
    }

    fn current_patients(state: &DashboardState) -> Option<u64> {
        state
            .snapshot
            .as_ref()
            .and_then(|snapshot| snapshot.opd_load.current_patients)
    }

    #[tokio::test(start_paused = true)]
    async fn partial_cycle_keeps_previous_snapshot() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.respond("/opd-load", json!({"current_patients": 1}));
        gateway.respond("/opd-load", json!({"current_patients": 2}));
        gateway.respond("/opd-load", json!({"current_patients": 3}));
        gateway.respond("/doctor-availability", json!({"doctors": {}}));
        gateway.respond("/alerts", json!(["first"]));
        gateway.fail(
            "/alerts",
            NetworkError::new(NetworkErrorKind::Status(502), "bad gateway"),
        );
        gateway.respond("/alerts", json!(["third"]));
        gateway.respond("/insights", json!({"insights": []}));
        let dashboard = aggregator(&gateway);

        assert!(dashboard.start());
        sleep(Duration::from_secs(1)).await;
        let state = dashboard.state();
        assert_eq!(current_patients(&state), Some(1));
        assert_eq!(state.published, 1);
        assert!(state.last_error.is_none());

        sleep(INTERVAL).await;
        let state = dashboard.state();
        assert_eq!(current_patients(&state), Some(1));
        assert_eq!(
            state.snapshot.as_ref().unwrap().alerts.alerts[0].message,
            "first"
        );
        assert_eq!(
            state.last_error.as_ref().unwrap().failed_sources(),
            vec![DashboardSource::Alerts]
        );
        assert_eq!(state.published, 1);

        sleep(INTERVAL).await;
        let state = dashboard.state();
        assert_eq!(current_patients(&state), Some(3));
        assert_eq!(
            state.snapshot.as_ref().unwrap().alerts.alerts[0].message,
            "third"
        );
        assert!(state.last_error.is_none());
        assert_eq!(state.published, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_refreshes() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.respond("/opd-load", json!({}));
        gateway.respond("/doctor-availability", json!({}));
        gateway.respond("/alerts", json!([]));
        gateway.respond_after("/insights", json!({}), Duration::from_secs(2));
        let dashboard = aggregator(&gateway);

        dashboard.start();
        assert!(!dashboard.start());
        sleep(Duration::from_secs(1)).await;
        dashboard.stop();
        sleep(INTERVAL * 3).await;

        assert!(!dashboard.is_running());
        assert_eq!(dashboard.state().published, 0);
        assert_eq!(gateway.call_count("/opd-load"), 1);
    }
}
