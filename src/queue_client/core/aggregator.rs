use chrono::Utc;
use tracing::{debug, warn};

use crate::types::{AggregationError, DashboardSource, SourceFailure};

use super::super::client::QueueClient;
use super::super::models::DashboardSnapshot;

/// Joins the four dashboard endpoints into one snapshot.
pub struct DataAggregator<'a> {
    client: &'a QueueClient,
}

impl<'a> DataAggregator<'a> {
    pub fn new(client: &'a QueueClient) -> Self {
        Self { client }
    }

    /// Issues every dashboard request concurrently and waits for all of them
    /// to settle. Either every document is present in the returned snapshot or
    /// the whole cycle fails with the list of sources that broke.
    pub async fn compose_dashboard(&self) -> Result<DashboardSnapshot, AggregationError> {
        let (opd_load, doctors, alerts, insights) = tokio::join!(
            self.client.opd_load(),
            self.client.doctor_availability(),
            self.client.alerts(),
            self.client.insights(),
        );

        match (opd_load, doctors, alerts, insights) {
            (Ok(opd_load), Ok(doctors), Ok(alerts), Ok(insights)) => {
                debug!(
                    alerts = alerts.alerts.len(),
                    doctors = doctors.doctors.len(),
                    "Dashboard composed"
                );
                Ok(DashboardSnapshot {
                    opd_load,
                    doctors,
                    alerts,
                    insights,
                    fetched_at: Utc::now(),
                })
            }
            (opd_load, doctors, alerts, insights) => {
                let failures: Vec<SourceFailure> = [
                    (DashboardSource::OpdLoad, opd_load.err()),
                    (DashboardSource::DoctorAvailability, doctors.err()),
                    (DashboardSource::Alerts, alerts.err()),
                    (DashboardSource::Insights, insights.err()),
                ]
                .into_iter()
                .filter_map(|(source, error)| error.map(|error| SourceFailure { source, error }))
                .collect();

                for failure in &failures {
                    warn!(
                        source = %failure.source,
                        error = %failure.error,
                        "Dashboard source failed, discarding cycle"
                    );
                }
                Err(AggregationError { failures })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::test_support::ScriptedGateway;
    use crate::types::{NetworkError, NetworkErrorKind};

    fn scripted_backend(delay: Duration) -> Arc<ScriptedGateway> {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.respond_after(
            "/opd-load",
            json!({"current_patients": 4, "capacity": 100}),
            delay,
        );
        gateway.respond_after(
            "/doctor-availability",
            json!({"doctors": {"Dr. Smith": {"available": true, "patients": 1}}}),
            delay,
        );
        gateway.respond_after("/alerts", json!(["Queue above 90%"]), delay);
        gateway.respond_after("/insights", json!({"insights": [], "summary": "quiet"}), delay);
        gateway
    }

    #[tokio::test(start_paused = true)]
    async fn fetches_all_sources_concurrently() {
        let gateway = scripted_backend(Duration::from_secs(1));
        let client = QueueClient::new(gateway.clone());

        let started = tokio::time::Instant::now();
        let snapshot = DataAggregator::new(&client).compose_dashboard().await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(gateway.max_in_flight(), 4);
        assert_eq!(snapshot.opd_load.current_patients, Some(4));
        assert_eq!(snapshot.doctors.available_count, 1);
        assert_eq!(snapshot.alerts.alerts[0].message, "Queue above 90%");
        assert_eq!(snapshot.insights.summary.as_deref(), Some("quiet"));
    }

    #[tokio::test]
    async fn one_failed_source_fails_the_cycle() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.respond("/opd-load", json!({"current_patients": 4}));
        gateway.fail(
            "/doctor-availability",
            NetworkError::new(NetworkErrorKind::Timeout, "timed out"),
        );
        gateway.respond("/alerts", json!([]));
        gateway.respond("/insights", json!({}));
        let client = QueueClient::new(gateway.clone());

        let err = DataAggregator::new(&client)
            .compose_dashboard()
            .await
            .unwrap_err();

        assert_eq!(err.failed_sources(), vec![DashboardSource::DoctorAvailability]);
        assert_eq!(gateway.call_count("/alerts"), 1);
        assert_eq!(gateway.call_count("/insights"), 1);
    }

    #[tokio::test]
    async fn every_failure_is_reported() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.respond("/opd-load", json!({}));
        gateway.respond("/doctor-availability", json!({}));
        gateway.respond("/alerts", json!("not a list"));
        let client = QueueClient::new(gateway);

        let err = DataAggregator::new(&client)
            .compose_dashboard()
            .await
            .unwrap_err();

        assert_eq!(
            err.failed_sources(),
            vec![DashboardSource::Alerts, DashboardSource::Insights]
        );
        assert!(err.failures[0].error.is_decode());
        assert_eq!(err.failures[1].error.status(), Some(404));
    }
}
