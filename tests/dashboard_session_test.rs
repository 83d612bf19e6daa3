use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use packops_api::{
    client::{
        spawn_session, AlertPhase, ClientError, ControllerSettings, DashboardApi,
        DashboardController, DashboardView, Event,
    },
    dashboard::{
        snapshot::{AppliedFilters, DashboardStatistics},
        DashboardQuery, DashboardSnapshot,
    },
    models::{AcknowledgeAlertRequest, Alert, AlertKind, AlertSeverity},
};
use tokio::{sync::watch, time};
use uuid::Uuid;

/// In-memory server: records every call and answers with canned alerts.
#[derive(Default)]
struct FakeApi {
    fetches: Mutex<Vec<DashboardQuery>>,
    acknowledgements: Mutex<Vec<AcknowledgeAlertRequest>>,
    alerts: Mutex<Vec<Alert>>,
    delays: Mutex<VecDeque<Duration>>,
    failing: Mutex<bool>,
}

impl FakeApi {
    fn with_alerts(alerts: Vec<Alert>) -> Arc<Self> {
        let api = Self::default();
        *api.alerts.lock().unwrap() = alerts;
        Arc::new(api)
    }

    fn fetches(&self) -> Vec<DashboardQuery> {
        self.fetches.lock().unwrap().clone()
    }

    fn acknowledgements(&self) -> Vec<AcknowledgeAlertRequest> {
        self.acknowledgements.lock().unwrap().clone()
    }

    fn delay_next(&self, delay: Duration) {
        self.delays.lock().unwrap().push_back(delay);
    }
}

#[async_trait]
impl DashboardApi for FakeApi {
    async fn fetch(&self, query: &DashboardQuery) -> Result<DashboardSnapshot, ClientError> {
        self.fetches.lock().unwrap().push(query.clone());
        let delay = self.delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            time::sleep(delay).await;
        }
        if *self.failing.lock().unwrap() {
            return Err(ClientError::Status {
                status: 500,
                message: "Database error".into(),
            });
        }

        let parsed = query.parse().expect("session sends valid queries");
        let filters = parsed.filters;
        Ok(DashboardSnapshot {
            filters: AppliedFilters {
                date_filter: filters.period.filter(),
                range: None,
                customer_uuid: filters.customer_uuid,
                statuses: filters.statuses.iter().copied().collect(),
            },
            statistics: Some(DashboardStatistics::default()),
            metrics: None,
            comparison: None,
            trends: None,
            alerts: Some(self.alerts.lock().unwrap().clone()),
            top_customers: None,
            top_employees: None,
            recent_orders: None,
            generated_at: Utc::now(),
        })
    }

    async fn acknowledge(&self, request: &AcknowledgeAlertRequest) -> Result<(), ClientError> {
        self.acknowledgements.lock().unwrap().push(request.clone());
        Ok(())
    }
}

fn alert(kind: AlertKind, severity: AlertSeverity, signature: Option<&str>) -> Alert {
    Alert {
        kind,
        severity,
        count: 2,
        orders: vec!["PO-001".into(), "PO-002".into()],
        signature: signature.map(str::to_string),
        scope_hash: signature.map(|_| "scope".to_string()),
    }
}

fn settings() -> ControllerSettings {
    ControllerSettings {
        poll_interval: Duration::from_secs(60),
        alert_exit_delay: Duration::from_millis(300),
        auto_refresh: true,
    }
}

/// Lets every ready task run, then nudges the paused clock by a millisecond.
async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    time::sleep(Duration::from_millis(1)).await;
}

fn current(views: &watch::Receiver<DashboardView>) -> DashboardView {
    views.borrow().clone()
}

#[tokio::test(start_paused = true)]
async fn opening_loads_everything_and_polls_the_light_sections() {
    let api = FakeApi::with_alerts(vec![]);
    let session = spawn_session(api.clone(), DashboardController::new(settings()));
    let views = session.view();

    session.send(Event::Opened).await.unwrap();
    settle().await;
    assert!(current(&views).snapshot.is_some());
    assert_eq!(api.fetches().len(), 1);
    assert_eq!(api.fetches()[0].only, None);
    assert_eq!(api.fetches()[0].date_filter.as_deref(), Some("all"));

    time::sleep(Duration::from_secs(60)).await;
    settle().await;
    let fetches = api.fetches();
    assert_eq!(fetches.len(), 2);
    assert_eq!(
        fetches[1].only.as_deref(),
        Some("statistics,metrics,alerts,recent_orders")
    );

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn hidden_view_pauses_polling() {
    let api = FakeApi::with_alerts(vec![]);
    let session = spawn_session(api.clone(), DashboardController::new(settings()));

    session.send(Event::Opened).await.unwrap();
    settle().await;
    session
        .send(Event::VisibilityChanged { visible: false })
        .await
        .unwrap();
    settle().await;

    time::sleep(Duration::from_secs(600)).await;
    settle().await;
    assert_eq!(api.fetches().len(), 1);

    session
        .send(Event::VisibilityChanged { visible: true })
        .await
        .unwrap();
    settle().await;
    // Becoming visible re-arms the timer without fetching immediately.
    assert_eq!(api.fetches().len(), 1);

    time::sleep(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(api.fetches().len(), 2);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn auto_refresh_toggle_stops_the_timer() {
    let api = FakeApi::with_alerts(vec![]);
    let session = spawn_session(api.clone(), DashboardController::new(settings()));
    let views = session.view();

    session.send(Event::Opened).await.unwrap();
    session.send(Event::AutoRefreshToggled).await.unwrap();
    settle().await;
    assert!(!current(&views).auto_refresh);

    time::sleep(Duration::from_secs(300)).await;
    settle().await;
    assert_eq!(api.fetches().len(), 1);

    // Manual refresh still works.
    session.send(Event::Refresh).await.unwrap();
    settle().await;
    assert_eq!(api.fetches().len(), 2);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn dismissed_alert_is_acknowledged_after_the_exit_delay() {
    let api = FakeApi::with_alerts(vec![
        alert(AlertKind::Autocontrollo, AlertSeverity::Low, Some("sig-a")),
        alert(AlertKind::Overdue, AlertSeverity::High, Some("sig-o")),
    ]);
    let session = spawn_session(api.clone(), DashboardController::new(settings()));
    let views = session.view();

    session.send(Event::Opened).await.unwrap();
    settle().await;
    let kinds: Vec<AlertKind> = current(&views).alerts.iter().map(|e| e.alert.kind).collect();
    assert_eq!(kinds, vec![AlertKind::Overdue, AlertKind::Autocontrollo]);

    session
        .send(Event::AlertDismissRequested(AlertKind::Overdue))
        .await
        .unwrap();
    settle().await;
    assert_eq!(current(&views).alerts[0].phase, AlertPhase::Exiting);
    assert!(api.acknowledgements().is_empty());

    time::sleep(Duration::from_millis(300)).await;
    settle().await;
    let acknowledged = api.acknowledgements();
    assert_eq!(acknowledged.len(), 1);
    assert_eq!(acknowledged[0].alert_key, AlertKind::Overdue);
    assert_eq!(acknowledged[0].signature, "sig-o");
    assert_eq!(acknowledged[0].scope_hash, "scope");

    // The same alert coming back on refresh stays hidden.
    session.send(Event::Refresh).await.unwrap();
    settle().await;
    let kinds: Vec<AlertKind> = current(&views).alerts.iter().map(|e| e.alert.kind).collect();
    assert_eq!(kinds, vec![AlertKind::Autocontrollo]);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn alerts_without_signature_are_hidden_for_the_session_only() {
    let api = FakeApi::with_alerts(vec![alert(AlertKind::Suspended, AlertSeverity::Medium, None)]);
    let session = spawn_session(api.clone(), DashboardController::new(settings()));
    let views = session.view();

    session.send(Event::Opened).await.unwrap();
    settle().await;
    session
        .send(Event::AlertDismissRequested(AlertKind::Suspended))
        .await
        .unwrap();
    time::sleep(Duration::from_millis(400)).await;
    settle().await;

    assert!(current(&views).alerts.is_empty());
    assert!(api.acknowledgements().is_empty());

    session.send(Event::Refresh).await.unwrap();
    settle().await;
    assert!(current(&views).alerts.is_empty());

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn stale_responses_are_discarded() {
    let api = FakeApi::with_alerts(vec![]);
    let session = spawn_session(api.clone(), DashboardController::new(settings()));
    let views = session.view();
    let customer = Uuid::new_v4();

    api.delay_next(Duration::from_secs(10));
    session.send(Event::Opened).await.unwrap();
    session
        .send(Event::CustomerSelected(Some(customer)))
        .await
        .unwrap();
    settle().await;
    assert_eq!(
        current(&views).snapshot.map(|s| s.filters.customer_uuid),
        Some(Some(customer))
    );
    assert!(!current(&views).processing);

    // The slow first response lands later and must not overwrite the newer one.
    time::sleep(Duration::from_secs(11)).await;
    settle().await;
    assert_eq!(
        current(&views).snapshot.map(|s| s.filters.customer_uuid),
        Some(Some(customer))
    );

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_keeps_previous_data() {
    let api = FakeApi::with_alerts(vec![]);
    let session = spawn_session(api.clone(), DashboardController::new(settings()));
    let views = session.view();

    session.send(Event::Opened).await.unwrap();
    settle().await;
    let loaded = current(&views).snapshot;
    assert!(loaded.is_some());

    *api.failing.lock().unwrap() = true;
    session.send(Event::Refresh).await.unwrap();
    settle().await;
    let view = current(&views);
    assert_eq!(view.snapshot, loaded);
    assert!(view.last_error.unwrap().contains("500"));

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn export_delivers_a_named_csv() {
    let api = FakeApi::with_alerts(vec![alert(AlertKind::Overdue, AlertSeverity::High, Some("sig"))]);
    let mut session = spawn_session(api.clone(), DashboardController::new(settings()));

    session.send(Event::Opened).await.unwrap();
    settle().await;
    session
        .send(Event::ExportRequested {
            today: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
        })
        .await
        .unwrap();

    let export = session.next_download().await.expect("export file");
    assert_eq!(export.file_name, "dashboard_all_2024-06-10.csv");
    assert!(export.contents.starts_with('"'));

    session.shutdown().await;
}
