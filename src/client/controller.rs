//! Dashboard filter/poll/alert coordination as a pure state machine.
//!
//! [`DashboardController::handle`] takes one [`Event`] and returns the [`Effect`]s to run.
//! It performs no I/O; `client::session` executes the effects and feeds results back in.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use super::alerts::{AlertBoard, AlertEntry, Dismissal};
use super::api::ClientError;
use super::polling::{Polling, TimerCommand};
use crate::dashboard::{
    export_csv, CsvExport, DashboardFilters, DashboardQuery, DashboardSnapshot, DateFilter,
    DatePeriod, DateRange, Section,
};
use crate::models::{AcknowledgeAlertRequest, AlertKind, OrderStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    pub poll_interval: Duration,
    pub alert_exit_delay: Duration,
    pub auto_refresh: bool,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            alert_exit_delay: Duration::from_millis(300),
            auto_refresh: true,
        }
    }
}

#[derive(Debug)]
pub enum Event {
    /// The view was opened: load everything and arm the poll timer.
    Opened,
    DateFilterSelected(DateFilter),
    CustomStartChanged(Option<NaiveDate>),
    CustomEndChanged(Option<NaiveDate>),
    CustomRangeApplied,
    CustomRangeCancelled,
    CustomerSelected(Option<Uuid>),
    StatusToggled(OrderStatus),
    StatusesSelected(BTreeSet<OrderStatus>),
    StatusesCleared,
    AutoRefreshToggled,
    VisibilityChanged { visible: bool },
    Tick,
    Refresh,
    FetchCompleted {
        seq: u64,
        result: Result<DashboardSnapshot, ClientError>,
    },
    AlertTapped(AlertKind),
    AlertDismissRequested(AlertKind),
    AlertExitElapsed(AlertKind),
    AcknowledgeCompleted {
        request: AcknowledgeAlertRequest,
        result: Result<(), ClientError>,
    },
    ExportRequested { today: NaiveDate },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Fetch { seq: u64, query: DashboardQuery },
    StartTimer(Duration),
    StopTimer,
    ScheduleAlertExit { kind: AlertKind, after: Duration },
    Acknowledge(AcknowledgeAlertRequest),
    Download(CsvExport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchScope {
    Full,
    Polled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    seq: u64,
    scope: FetchScope,
}

/// Dates being edited in the custom range picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CustomRangeDraft {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl CustomRangeDraft {
    fn complete(&self) -> Option<DateRange> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => DateRange::new(start, end).ok(),
            _ => None,
        }
    }
}

/// Read-only projection published to front ends after every event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardView {
    pub filters: DashboardFilters,
    pub picker: Option<CustomRangeDraft>,
    pub processing: bool,
    pub auto_refresh: bool,
    pub visible: bool,
    pub snapshot: Option<DashboardSnapshot>,
    pub alerts: Vec<AlertEntry>,
    pub last_error: Option<String>,
}

#[derive(Debug)]
pub struct DashboardController {
    settings: ControllerSettings,
    filters: DashboardFilters,
    picker: Option<CustomRangeDraft>,
    snapshot: Option<DashboardSnapshot>,
    alerts: AlertBoard,
    polling: Polling,
    next_seq: u64,
    in_flight: Option<InFlight>,
    last_error: Option<String>,
}

impl DashboardController {
    pub fn new(settings: ControllerSettings) -> Self {
        Self::with_filters(settings, DashboardFilters::default())
    }

    pub fn with_filters(settings: ControllerSettings, filters: DashboardFilters) -> Self {
        Self {
            polling: Polling::new(settings.poll_interval, settings.auto_refresh),
            settings,
            filters,
            picker: None,
            snapshot: None,
            alerts: AlertBoard::default(),
            next_seq: 0,
            in_flight: None,
            last_error: None,
        }
    }

    pub fn filters(&self) -> &DashboardFilters {
        &self.filters
    }

    pub fn snapshot(&self) -> Option<&DashboardSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn alerts(&self) -> &[AlertEntry] {
        self.alerts.entries()
    }

    pub fn is_processing(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            filters: self.filters.clone(),
            picker: self.picker,
            processing: self.is_processing(),
            auto_refresh: self.polling.auto_refresh(),
            visible: self.polling.visible(),
            snapshot: self.snapshot.clone(),
            alerts: self.alerts.entries().to_vec(),
            last_error: self.last_error.clone(),
        }
    }

    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        let mut effects = Vec::new();
        match event {
            Event::Opened => {
                effects.push(self.fetch(FetchScope::Full));
                effects.extend(self.polling.reconcile().map(timer_effect));
            }
            Event::DateFilterSelected(filter) => {
                let period = match filter {
                    DateFilter::All => DatePeriod::All,
                    DateFilter::Today => DatePeriod::Today,
                    DateFilter::Week => DatePeriod::Week,
                    DateFilter::Month => DatePeriod::Month,
                    DateFilter::Custom => {
                        let draft = match self.filters.period {
                            DatePeriod::Custom(range) => CustomRangeDraft {
                                start: Some(range.start),
                                end: Some(range.end),
                            },
                            _ => CustomRangeDraft::default(),
                        };
                        self.picker = Some(draft);
                        return effects;
                    }
                };
                self.picker = None;
                self.filters.period = period;
                effects.push(self.fetch(FetchScope::Full));
            }
            Event::CustomStartChanged(start) => {
                if let Some(draft) = self.picker.as_mut() {
                    draft.start = start;
                }
            }
            Event::CustomEndChanged(end) => {
                if let Some(draft) = self.picker.as_mut() {
                    draft.end = end;
                }
            }
            Event::CustomRangeApplied => {
                let Some(range) = self.picker.and_then(|draft| draft.complete()) else {
                    debug!("custom range not applied: dates missing or reversed");
                    return effects;
                };
                self.picker = None;
                self.filters.period = DatePeriod::Custom(range);
                effects.push(self.fetch(FetchScope::Full));
            }
            Event::CustomRangeCancelled => {
                self.picker = None;
            }
            Event::CustomerSelected(customer_uuid) => {
                self.filters.customer_uuid = customer_uuid;
                effects.push(self.fetch(FetchScope::Full));
            }
            Event::StatusToggled(status) => {
                if !self.filters.statuses.remove(&status) {
                    self.filters.statuses.insert(status);
                }
                effects.push(self.fetch(FetchScope::Full));
            }
            Event::StatusesSelected(statuses) => {
                self.filters.statuses = statuses;
                effects.push(self.fetch(FetchScope::Full));
            }
            Event::StatusesCleared => {
                self.filters.statuses.clear();
                effects.push(self.fetch(FetchScope::Full));
            }
            Event::AutoRefreshToggled => {
                effects.extend(self.polling.toggle_auto_refresh().map(timer_effect));
            }
            Event::VisibilityChanged { visible } => {
                effects.extend(self.polling.set_visible(visible).map(timer_effect));
            }
            Event::Tick => {
                if !self.polling.may_poll() {
                    debug!("poll tick ignored: auto-refresh paused");
                } else if self.in_flight.is_some() {
                    debug!("poll tick skipped: fetch already in flight");
                } else {
                    effects.push(self.fetch(FetchScope::Polled));
                }
            }
            Event::Refresh => {
                effects.push(self.fetch(FetchScope::Full));
            }
            Event::FetchCompleted { seq, result } => self.complete_fetch(seq, result),
            Event::AlertTapped(kind) => {
                self.alerts.toggle(kind);
            }
            Event::AlertDismissRequested(kind) => {
                if self.alerts.begin_exit(kind) {
                    effects.push(Effect::ScheduleAlertExit {
                        kind,
                        after: self.settings.alert_exit_delay,
                    });
                }
            }
            Event::AlertExitElapsed(kind) => match self.alerts.finish_exit(kind) {
                Some(Dismissal::Acknowledge(request)) => effects.push(Effect::Acknowledge(request)),
                Some(Dismissal::SessionOnly(kind)) => {
                    debug!(alert = %kind, "alert dismissed for this session");
                }
                None => {}
            },
            Event::AcknowledgeCompleted { request, result } => {
                if let Err(error) = result {
                    warn!(alert = %request.alert_key, %error, "alert acknowledgement failed; keeping it hidden");
                }
            }
            Event::ExportRequested { today } => match &self.snapshot {
                Some(snapshot) => {
                    effects.push(Effect::Download(export_csv(
                        snapshot,
                        self.filters.period.filter(),
                        today,
                    )));
                }
                None => debug!("export requested before any data was loaded"),
            },
        }
        effects
    }

    fn fetch(&mut self, scope: FetchScope) -> Effect {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.in_flight = Some(InFlight { seq, scope });
        let polled = Section::POLLED;
        let sections = match scope {
            FetchScope::Full => None,
            FetchScope::Polled => Some(&polled[..]),
        };
        Effect::Fetch {
            seq,
            query: self.filters.to_query(sections),
        }
    }

    fn complete_fetch(&mut self, seq: u64, result: Result<DashboardSnapshot, ClientError>) {
        let Some(in_flight) = self.in_flight.filter(|pending| pending.seq == seq) else {
            debug!(seq, latest = self.next_seq, "discarding stale dashboard response");
            return;
        };
        self.in_flight = None;

        match result {
            Ok(snapshot) => {
                self.last_error = None;
                let alerts = snapshot.alerts.clone();
                match (in_flight.scope, self.snapshot.as_mut()) {
                    (FetchScope::Polled, Some(current)) => current.merge(snapshot),
                    _ => self.snapshot = Some(snapshot),
                }
                if let Some(alerts) = alerts {
                    self.alerts.replace(alerts);
                }
            }
            Err(error) => {
                warn!(seq, %error, "dashboard fetch failed; keeping previous data");
                self.last_error = Some(error.to_string());
            }
        }
    }
}

fn timer_effect(command: TimerCommand) -> Effect {
    match command {
        TimerCommand::Start(interval) => Effect::StartTimer(interval),
        TimerCommand::Stop => Effect::StopTimer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::snapshot::{AppliedFilters, DashboardStatistics, OrderCounts};
    use crate::models::{Alert, AlertSeverity};
    use assert_matches::assert_matches;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn snapshot(total: u64, alerts: Vec<Alert>) -> DashboardSnapshot {
        DashboardSnapshot {
            filters: AppliedFilters {
                date_filter: DateFilter::All,
                range: None,
                customer_uuid: None,
                statuses: vec![],
            },
            statistics: Some(DashboardStatistics {
                orders: OrderCounts {
                    total,
                    ..Default::default()
                },
                ..Default::default()
            }),
            metrics: None,
            comparison: None,
            trends: Some(vec![]),
            alerts: Some(alerts),
            top_customers: None,
            top_employees: None,
            recent_orders: None,
            generated_at: Utc::now(),
        }
    }

    fn alert(kind: AlertKind, severity: AlertSeverity, signed: bool) -> Alert {
        Alert {
            kind,
            severity,
            count: 2,
            orders: vec!["PO-1".into()],
            signature: signed.then(|| "sig".to_string()),
            scope_hash: signed.then(|| "scope".to_string()),
        }
    }

    fn fetch_seq(effects: &[Effect]) -> u64 {
        effects
            .iter()
            .find_map(|effect| match effect {
                Effect::Fetch { seq, .. } => Some(*seq),
                _ => None,
            })
            .expect("expected a fetch")
    }

    fn fetches(effects: &[Effect]) -> Vec<&DashboardQuery> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Fetch { query, .. } => Some(query),
                _ => None,
            })
            .collect()
    }

    fn loaded(alerts: Vec<Alert>) -> DashboardController {
        let mut controller = DashboardController::new(ControllerSettings::default());
        let seq = fetch_seq(&controller.handle(Event::Opened));
        controller.handle(Event::FetchCompleted {
            seq,
            result: Ok(snapshot(10, alerts)),
        });
        controller
    }

    #[test]
    fn opening_fetches_everything_and_starts_timer() {
        let mut controller = DashboardController::new(ControllerSettings::default());
        let effects = controller.handle(Event::Opened);
        assert_eq!(fetches(&effects)[0].only, None);
        assert!(effects.contains(&Effect::StartTimer(Duration::from_secs(60))));
        assert!(controller.is_processing());
    }

    #[test]
    fn non_custom_date_filter_fetches_immediately() {
        let mut controller = loaded(vec![]);
        let effects = controller.handle(Event::DateFilterSelected(DateFilter::Week));
        assert_eq!(fetches(&effects)[0].date_filter.as_deref(), Some("week"));
    }

    #[test]
    fn custom_filter_waits_for_both_dates_and_apply() {
        let mut controller = loaded(vec![]);
        assert!(controller.handle(Event::DateFilterSelected(DateFilter::Custom)).is_empty());
        assert!(controller.view().picker.is_some());
        assert!(controller
            .handle(Event::CustomStartChanged(Some(date(2024, 3, 1))))
            .is_empty());
        assert!(controller.handle(Event::CustomRangeApplied).is_empty());
        assert!(controller
            .handle(Event::CustomEndChanged(Some(date(2024, 3, 31))))
            .is_empty());
        assert_eq!(controller.filters().period, DatePeriod::All);

        let effects = controller.handle(Event::CustomRangeApplied);
        let query = fetches(&effects)[0];
        assert_eq!(query.date_filter.as_deref(), Some("custom"));
        assert_eq!(query.start_date.as_deref(), Some("2024-03-01"));
        assert_eq!(query.end_date.as_deref(), Some("2024-03-31"));
        assert!(controller.view().picker.is_none());
    }

    #[test]
    fn reversed_custom_range_is_not_applied() {
        let mut controller = loaded(vec![]);
        controller.handle(Event::DateFilterSelected(DateFilter::Custom));
        controller.handle(Event::CustomStartChanged(Some(date(2024, 3, 31))));
        controller.handle(Event::CustomEndChanged(Some(date(2024, 3, 1))));
        assert!(controller.handle(Event::CustomRangeApplied).is_empty());
        assert!(controller.view().picker.is_some());
    }

    #[test]
    fn cancelling_picker_keeps_active_filter() {
        let mut controller = loaded(vec![]);
        controller.handle(Event::DateFilterSelected(DateFilter::Month));
        controller.handle(Event::DateFilterSelected(DateFilter::Custom));
        controller.handle(Event::CustomRangeCancelled);
        assert_eq!(controller.filters().period, DatePeriod::Month);
        assert!(controller.view().picker.is_none());
    }

    #[test]
    fn each_filter_keeps_the_others() {
        let mut controller = loaded(vec![]);
        let customer = Uuid::new_v4();
        controller.handle(Event::DateFilterSelected(DateFilter::Today));
        controller.handle(Event::CustomerSelected(Some(customer)));
        controller.handle(Event::StatusToggled(OrderStatus::Suspended));
        let effects = controller.handle(Event::StatusToggled(OrderStatus::Pending));
        let query = fetches(&effects)[0];
        assert_eq!(query.date_filter.as_deref(), Some("today"));
        assert_eq!(query.customer_uuid, Some(customer.to_string()));
        assert_eq!(query.statuses.as_deref(), Some("0,3"));

        let effects = controller.handle(Event::StatusesCleared);
        let query = fetches(&effects)[0];
        assert_eq!(query.statuses, None);
        assert_eq!(query.customer_uuid, Some(customer.to_string()));

        let effects = controller.handle(Event::CustomerSelected(None));
        assert_eq!(fetches(&effects)[0].customer_uuid, None);
        assert_eq!(fetches(&effects)[0].date_filter.as_deref(), Some("today"));
    }

    #[test]
    fn stale_responses_are_discarded() {
        let mut controller = loaded(vec![]);
        let first = fetch_seq(&controller.handle(Event::DateFilterSelected(DateFilter::Week)));
        let second = fetch_seq(&controller.handle(Event::DateFilterSelected(DateFilter::Month)));
        assert!(second > first);

        controller.handle(Event::FetchCompleted {
            seq: second,
            result: Ok(snapshot(7, vec![])),
        });
        controller.handle(Event::FetchCompleted {
            seq: first,
            result: Ok(snapshot(99, vec![])),
        });

        let total = controller.snapshot().unwrap().statistics.as_ref().unwrap().orders.total;
        assert_eq!(total, 7);
        assert!(!controller.is_processing());
    }

    #[test]
    fn failed_fetch_keeps_previous_data_and_clears_processing() {
        let mut controller = loaded(vec![]);
        let seq = fetch_seq(&controller.handle(Event::Refresh));
        controller.handle(Event::FetchCompleted {
            seq,
            result: Err(ClientError::Status {
                status: 500,
                message: "boom".into(),
            }),
        });
        let view = controller.view();
        assert!(!view.processing);
        assert!(view.last_error.is_some());
        assert_eq!(
            view.snapshot.unwrap().statistics.unwrap().orders.total,
            10
        );
    }

    #[test]
    fn tick_fetches_polled_sections_with_current_filters() {
        let mut controller = loaded(vec![]);
        let seq = fetch_seq(&controller.handle(Event::CustomerSelected(Some(Uuid::nil()))));
        controller.handle(Event::FetchCompleted {
            seq,
            result: Ok(snapshot(3, vec![])),
        });

        let effects = controller.handle(Event::Tick);
        let query = fetches(&effects)[0];
        assert_eq!(query.only.as_deref(), Some("statistics,metrics,alerts,recent_orders"));
        assert_eq!(query.customer_uuid, Some(Uuid::nil().to_string()));
    }

    #[test]
    fn tick_is_skipped_while_fetch_in_flight_or_hidden() {
        let mut controller = DashboardController::new(ControllerSettings::default());
        controller.handle(Event::Opened);
        assert!(controller.handle(Event::Tick).is_empty());

        let mut controller = loaded(vec![]);
        assert_eq!(
            controller.handle(Event::VisibilityChanged { visible: false }),
            vec![Effect::StopTimer]
        );
        assert!(controller.handle(Event::Tick).is_empty());
        assert_eq!(
            controller.handle(Event::VisibilityChanged { visible: true }),
            vec![Effect::StartTimer(Duration::from_secs(60))]
        );
        assert_eq!(fetches(&controller.handle(Event::Tick)).len(), 1);
    }

    #[test]
    fn polled_response_merges_into_loaded_snapshot() {
        let mut controller = loaded(vec![]);
        let seq = fetch_seq(&controller.handle(Event::Tick));
        let mut partial = snapshot(12, vec![]);
        partial.trends = None;
        controller.handle(Event::FetchCompleted {
            seq,
            result: Ok(partial),
        });
        let snapshot = controller.snapshot().unwrap();
        assert!(snapshot.trends.is_some());
        assert_eq!(snapshot.statistics.as_ref().unwrap().orders.total, 12);
    }

    #[test]
    fn auto_refresh_toggle_stops_timer() {
        let mut controller = loaded(vec![]);
        assert_eq!(controller.handle(Event::AutoRefreshToggled), vec![Effect::StopTimer]);
        assert!(controller.handle(Event::Tick).is_empty());
        assert_eq!(
            controller.handle(Event::AutoRefreshToggled),
            vec![Effect::StartTimer(Duration::from_secs(60))]
        );
    }

    #[test]
    fn alerts_render_by_severity() {
        let controller = loaded(vec![
            alert(AlertKind::Autocontrollo, AlertSeverity::Low, false),
            alert(AlertKind::Overdue, AlertSeverity::Critical, false),
            alert(AlertKind::Suspended, AlertSeverity::Medium, false),
        ]);
        let severities: Vec<_> = controller
            .alerts()
            .iter()
            .map(|entry| entry.alert.severity)
            .collect();
        assert_eq!(
            severities,
            vec![AlertSeverity::Critical, AlertSeverity::Medium, AlertSeverity::Low]
        );
    }

    #[test]
    fn dismissing_signed_alert_acknowledges_once() {
        let mut controller = loaded(vec![alert(AlertKind::Overdue, AlertSeverity::High, true)]);
        let effects = controller.handle(Event::AlertDismissRequested(AlertKind::Overdue));
        assert_eq!(
            effects,
            vec![Effect::ScheduleAlertExit {
                kind: AlertKind::Overdue,
                after: Duration::from_millis(300)
            }]
        );
        assert!(controller
            .handle(Event::AlertDismissRequested(AlertKind::Overdue))
            .is_empty());

        let effects = controller.handle(Event::AlertExitElapsed(AlertKind::Overdue));
        assert_matches!(
            effects.as_slice(),
            [Effect::Acknowledge(request)]
                if request.alert_key == AlertKind::Overdue
                    && request.signature == "sig"
                    && request.scope_hash == "scope"
        );
        assert!(controller.alerts().is_empty());
        assert!(controller
            .handle(Event::AlertExitElapsed(AlertKind::Overdue))
            .is_empty());
    }

    #[test]
    fn failed_acknowledgement_keeps_alert_hidden() {
        let signed = alert(AlertKind::Overdue, AlertSeverity::High, true);
        let mut controller = loaded(vec![signed.clone()]);
        controller.handle(Event::AlertDismissRequested(AlertKind::Overdue));
        let request = match controller
            .handle(Event::AlertExitElapsed(AlertKind::Overdue))
            .pop()
        {
            Some(Effect::Acknowledge(request)) => request,
            other => panic!("unexpected effect {other:?}"),
        };
        controller.handle(Event::AcknowledgeCompleted {
            request,
            result: Err(ClientError::SessionClosed),
        });

        let seq = fetch_seq(&controller.handle(Event::Refresh));
        controller.handle(Event::FetchCompleted {
            seq,
            result: Ok(snapshot(10, vec![signed])),
        });
        assert!(controller.alerts().is_empty());
    }

    #[test]
    fn dismissing_unsigned_alert_sends_nothing() {
        let mut controller = loaded(vec![alert(AlertKind::Suspended, AlertSeverity::Medium, false)]);
        controller.handle(Event::AlertDismissRequested(AlertKind::Suspended));
        assert!(controller
            .handle(Event::AlertExitElapsed(AlertKind::Suspended))
            .is_empty());
        assert!(controller.alerts().is_empty());
    }

    #[test]
    fn export_uses_active_filter_and_requires_data() {
        let today = date(2024, 6, 3);
        let mut controller = DashboardController::new(ControllerSettings::default());
        assert!(controller.handle(Event::ExportRequested { today }).is_empty());

        let mut controller = loaded(vec![]);
        controller.handle(Event::DateFilterSelected(DateFilter::Month));
        let effects = controller.handle(Event::ExportRequested { today });
        assert_matches!(
            effects.as_slice(),
            [Effect::Download(export)]
                if export.file_name == "dashboard_month_2024-06-03.csv"
                    && export.contents.contains("\"Total\",\"10\"")
        );
    }
}
