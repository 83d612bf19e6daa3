use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use metrics::{counter, histogram};
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::alerts::AlertService;
use crate::config::DashboardConfig;
use crate::dashboard::snapshot::{
    AppliedFilters, DashboardStatistics, Delta, OrderCounts, OrderSummary, PeriodComparison,
    ProductionMetrics, QuantityTotals, StatusCount, TopCustomer, TopEmployee, TrendPoint,
};
use crate::dashboard::{DashboardFilters, DashboardSnapshot, DateRange, ParsedQuery, Section};
use crate::entities::{customer, employee, production_order, production_order_processing};
use crate::errors::ServiceError;
use crate::models::{Alert, AlertKind, AlertSeverity, OrderStatus};

/// Affected production numbers listed on an alert.
const ALERT_ORDER_LIMIT: usize = 20;

/// Severity of an alert of `kind` affecting `count` orders.
pub fn classify(kind: AlertKind, count: u64) -> AlertSeverity {
    match kind {
        AlertKind::Overdue if count >= 10 => AlertSeverity::Critical,
        AlertKind::Overdue if count >= 3 => AlertSeverity::High,
        AlertKind::Overdue => AlertSeverity::Medium,
        AlertKind::Suspended if count >= 5 => AlertSeverity::High,
        AlertKind::Suspended => AlertSeverity::Medium,
        AlertKind::Autocontrollo if count >= 5 => AlertSeverity::Medium,
        AlertKind::Autocontrollo => AlertSeverity::Low,
    }
}

/// SHA-256 over the sorted ids of the orders an alert covers.
pub fn alert_signature(order_ids: &[Uuid]) -> String {
    let mut ids: Vec<String> = order_ids.iter().map(Uuid::to_string).collect();
    ids.sort();
    hex::encode(Sha256::digest(ids.join(",").as_bytes()))
}

/// Sorts by severity rank, critical first. Equal severities keep their order.
pub fn sort_alerts(alerts: &mut [Alert]) {
    alerts.sort_by_key(|alert| alert.severity.rank());
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Half-open timestamp bounds covering the inclusive date range.
fn bounds(range: &DateRange) -> (DateTime<Utc>, DateTime<Utc>) {
    let end = range
        .end
        .succ_opt()
        .map(day_start)
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    (day_start(range.start), end)
}

fn ratio(numerator: i64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[derive(Clone)]
pub struct DashboardService {
    db: Arc<DatabaseConnection>,
    alerts: AlertService,
    config: DashboardConfig,
}

impl DashboardService {
    pub fn new(db: Arc<DatabaseConnection>, config: DashboardConfig) -> Self {
        let alerts = AlertService::new(db.clone());
        Self { db, alerts, config }
    }

    /// Computes the requested sections for the filter scope as seen on `today`.
    #[instrument(skip(self, query), fields(date_filter = %query.filters.period.filter()))]
    pub async fn snapshot(
        &self,
        query: &ParsedQuery,
        today: NaiveDate,
    ) -> Result<DashboardSnapshot, ServiceError> {
        let started = Instant::now();
        let filters = &query.filters;
        let range = filters.period.resolve(today);

        let needs_orders = [
            Section::Statistics,
            Section::Comparison,
            Section::Alerts,
            Section::TopCustomers,
            Section::RecentOrders,
        ]
        .into_iter()
        .any(|section| query.wants(section));
        let needs_processings = [
            Section::Metrics,
            Section::Comparison,
            Section::Trends,
            Section::TopEmployees,
        ]
        .into_iter()
        .any(|section| query.wants(section));

        let orders = if needs_orders {
            self.orders_in(filters, range.as_ref()).await?
        } else {
            Vec::new()
        };
        let processings = if needs_processings {
            self.processings_in(filters, range.as_ref()).await?
        } else {
            Vec::new()
        };

        let mut snapshot = DashboardSnapshot {
            filters: AppliedFilters {
                date_filter: filters.period.filter(),
                range,
                customer_uuid: filters.customer_uuid,
                statuses: filters.statuses.iter().copied().collect(),
            },
            statistics: None,
            metrics: None,
            comparison: None,
            trends: None,
            alerts: None,
            top_customers: None,
            top_employees: None,
            recent_orders: None,
            generated_at: Utc::now(),
        };

        if query.wants(Section::Statistics) {
            snapshot.statistics = Some(statistics(&orders, today));
        }
        if query.wants(Section::Metrics) {
            snapshot.metrics = Some(production_metrics(&processings));
        }
        if query.wants(Section::Comparison) {
            if let Some(range) = range {
                snapshot.comparison = self.comparison(filters, &range, &orders, &processings).await?;
            }
        }
        if query.wants(Section::Trends) {
            snapshot.trends = Some(trends(&processings, range.as_ref()));
        }
        if query.wants(Section::Alerts) {
            snapshot.alerts = Some(self.alerts(filters, &orders, today).await?);
        }
        if query.wants(Section::TopCustomers) {
            snapshot.top_customers = Some(self.top_customers(&orders).await?);
        }
        if query.wants(Section::TopEmployees) {
            snapshot.top_employees = Some(self.top_employees(&processings).await?);
        }
        if query.wants(Section::RecentOrders) {
            snapshot.recent_orders = Some(self.recent_orders(&orders, today).await?);
        }

        let kind = if query.sections.is_some() { "partial" } else { "full" };
        counter!("packops_dashboard_snapshots_total", 1, "kind" => kind);
        histogram!(
            "packops_dashboard_snapshot_seconds",
            started.elapsed().as_secs_f64()
        );
        debug!(
            orders = orders.len(),
            processings = processings.len(),
            "dashboard snapshot computed"
        );
        Ok(snapshot)
    }

    fn scope_condition(filters: &DashboardFilters) -> Condition {
        let mut condition = Condition::all();
        if let Some(customer_uuid) = filters.customer_uuid {
            condition = condition.add(production_order::Column::CustomerUuid.eq(customer_uuid));
        }
        if !filters.statuses.is_empty() {
            let statuses: Vec<OrderStatus> = filters.statuses.iter().copied().collect();
            condition = condition.add(production_order::Column::Status.is_in(statuses));
        }
        condition
    }

    /// Orders in scope created within `range`.
    async fn orders_in(
        &self,
        filters: &DashboardFilters,
        range: Option<&DateRange>,
    ) -> Result<Vec<production_order::Model>, ServiceError> {
        let mut select = production_order::Entity::find().filter(Self::scope_condition(filters));
        if let Some(range) = range {
            let (start, end) = bounds(range);
            select = select
                .filter(production_order::Column::CreatedAt.gte(start))
                .filter(production_order::Column::CreatedAt.lt(end));
        }
        Ok(select.all(&*self.db).await?)
    }

    /// Processings within `range` recorded on orders in scope.
    async fn processings_in(
        &self,
        filters: &DashboardFilters,
        range: Option<&DateRange>,
    ) -> Result<Vec<production_order_processing::Model>, ServiceError> {
        let mut select = production_order_processing::Entity::find();
        if filters.customer_uuid.is_some() || !filters.statuses.is_empty() {
            select = select
                .inner_join(production_order::Entity)
                .filter(Self::scope_condition(filters));
        }
        if let Some(range) = range {
            let (start, end) = bounds(range);
            select = select
                .filter(production_order_processing::Column::ProcessedAt.gte(start))
                .filter(production_order_processing::Column::ProcessedAt.lt(end));
        }
        Ok(select.all(&*self.db).await?)
    }

    async fn comparison(
        &self,
        filters: &DashboardFilters,
        range: &DateRange,
        orders: &[production_order::Model],
        processings: &[production_order_processing::Model],
    ) -> Result<Option<PeriodComparison>, ServiceError> {
        let Some(previous) = range.previous() else {
            return Ok(None);
        };
        let previous_orders = self.orders_in(filters, Some(&previous)).await?;
        let previous_processings = self.processings_in(filters, Some(&previous)).await?;

        Ok(Some(PeriodComparison {
            previous,
            orders: Delta::new(orders.len() as i64, previous_orders.len() as i64),
            worked_quantity: Delta::new(
                worked_total(processings),
                worked_total(&previous_processings),
            ),
        }))
    }

    async fn alerts(
        &self,
        filters: &DashboardFilters,
        orders: &[production_order::Model],
        today: NaiveDate,
    ) -> Result<Vec<Alert>, ServiceError> {
        let scope_hash = filters.scope_hash(today);
        let acknowledged = self.alerts.acknowledged_in_scope(&scope_hash).await?;

        let mut alerts: Vec<Alert> = [
            AlertKind::Overdue,
            AlertKind::Suspended,
            AlertKind::Autocontrollo,
        ]
        .into_iter()
        .filter_map(|kind| {
            let affected: Vec<&production_order::Model> = orders
                .iter()
                .filter(|order| match kind {
                    AlertKind::Overdue => order.is_overdue(today),
                    AlertKind::Suspended => order.status == OrderStatus::Suspended,
                    AlertKind::Autocontrollo => order.lacks_self_check(),
                })
                .collect();
            build_alert(kind, &affected, &scope_hash)
        })
        .filter(|alert| {
            let signature = alert.signature.clone().unwrap_or_default();
            !acknowledged.contains(&(alert.kind.as_str().to_string(), signature))
        })
        .collect();

        sort_alerts(&mut alerts);
        Ok(alerts)
    }

    async fn top_customers(
        &self,
        orders: &[production_order::Model],
    ) -> Result<Vec<TopCustomer>, ServiceError> {
        let mut totals: HashMap<Uuid, (u64, i64)> = HashMap::new();
        for order in orders {
            let entry = totals.entry(order.customer_uuid).or_default();
            entry.0 += 1;
            entry.1 = entry.1.saturating_add(order.total_quantity);
        }
        let names = self.customer_names(totals.keys().copied().collect()).await?;

        let mut ranked: Vec<TopCustomer> = totals
            .into_iter()
            .map(|(customer_uuid, (orders, quantity))| TopCustomer {
                name: names.get(&customer_uuid).cloned().unwrap_or_default(),
                customer_uuid,
                orders,
                quantity,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.orders
                .cmp(&a.orders)
                .then(b.quantity.cmp(&a.quantity))
                .then_with(|| a.name.cmp(&b.name))
        });
        ranked.truncate(self.config.top_n as usize);
        Ok(ranked)
    }

    async fn top_employees(
        &self,
        processings: &[production_order_processing::Model],
    ) -> Result<Vec<TopEmployee>, ServiceError> {
        let mut totals: HashMap<Uuid, (i64, u64)> = HashMap::new();
        for processing in processings {
            let entry = totals.entry(processing.employee_uuid).or_default();
            entry.0 = entry.0.saturating_add(processing.quantity);
            entry.1 += 1;
        }
        let ids: Vec<Uuid> = totals.keys().copied().collect();
        let names: HashMap<Uuid, String> = if ids.is_empty() {
            HashMap::new()
        } else {
            employee::Entity::find()
                .filter(employee::Column::Uuid.is_in(ids))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|employee| (employee.uuid, employee.full_name()))
                .collect()
        };

        let mut ranked: Vec<TopEmployee> = totals
            .into_iter()
            .map(|(employee_uuid, (worked_quantity, processings))| TopEmployee {
                name: names.get(&employee_uuid).cloned().unwrap_or_default(),
                employee_uuid,
                worked_quantity,
                processings,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.worked_quantity
                .cmp(&a.worked_quantity)
                .then(b.processings.cmp(&a.processings))
                .then_with(|| a.name.cmp(&b.name))
        });
        ranked.truncate(self.config.top_n as usize);
        Ok(ranked)
    }

    async fn recent_orders(
        &self,
        orders: &[production_order::Model],
        today: NaiveDate,
    ) -> Result<Vec<OrderSummary>, ServiceError> {
        let mut recent: Vec<&production_order::Model> = orders.iter().collect();
        recent.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.production_number.cmp(&a.production_number))
        });
        recent.truncate(self.config.recent_orders as usize);

        let names = self
            .customer_names(recent.iter().map(|order| order.customer_uuid).collect())
            .await?;
        Ok(recent
            .into_iter()
            .map(|order| OrderSummary {
                uuid: order.uuid,
                production_number: order.production_number.clone(),
                customer_name: names.get(&order.customer_uuid).cloned(),
                status: order.status,
                total_quantity: order.total_quantity,
                worked_quantity: order.worked_quantity,
                delivery_date: order.delivery_date,
                overdue: order.is_overdue(today),
            })
            .collect())
    }

    async fn customer_names(&self, ids: HashSet<Uuid>) -> Result<HashMap<Uuid, String>, ServiceError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let customers = customer::Entity::find()
            .filter(customer::Column::Uuid.is_in(ids))
            .all(&*self.db)
            .await?;
        Ok(customers
            .into_iter()
            .map(|customer| (customer.uuid, customer.company_name))
            .collect())
    }
}

fn build_alert(
    kind: AlertKind,
    affected: &[&production_order::Model],
    scope_hash: &str,
) -> Option<Alert> {
    if affected.is_empty() {
        return None;
    }
    let count = affected.len() as u64;
    let ids: Vec<Uuid> = affected.iter().map(|order| order.uuid).collect();
    let mut numbers: Vec<String> = affected
        .iter()
        .map(|order| order.production_number.clone())
        .collect();
    numbers.sort();
    numbers.truncate(ALERT_ORDER_LIMIT);

    Some(Alert {
        kind,
        severity: classify(kind, count),
        count,
        orders: numbers,
        signature: Some(alert_signature(&ids)),
        scope_hash: Some(scope_hash.to_string()),
    })
}

fn statistics(orders: &[production_order::Model], today: NaiveDate) -> DashboardStatistics {
    let mut counts = OrderCounts {
        total: orders.len() as u64,
        ..Default::default()
    };
    let mut by_status: BTreeMap<OrderStatus, u64> =
        OrderStatus::ALL.into_iter().map(|status| (status, 0)).collect();
    let mut ordered = 0i64;
    let mut worked = 0i64;

    for order in orders {
        match order.status {
            OrderStatus::InProduction => counts.in_progress += 1,
            OrderStatus::Completed | OrderStatus::Shipped => counts.completed += 1,
            OrderStatus::Suspended => counts.suspended += 1,
            _ => {}
        }
        if order.is_overdue(today) {
            counts.overdue += 1;
        }
        *by_status.entry(order.status).or_default() += 1;
        ordered = ordered.saturating_add(order.total_quantity.max(0));
        worked = worked.saturating_add(order.worked_quantity.max(0));
    }

    let completion_rate = if ordered > 0 {
        (worked as f64 * 100.0 / ordered as f64).min(100.0)
    } else {
        0.0
    };

    DashboardStatistics {
        orders: counts,
        quantities: QuantityTotals {
            ordered,
            worked,
            completion_rate,
        },
        by_status: by_status
            .into_iter()
            .map(|(status, count)| StatusCount {
                status,
                label: status.label().to_string(),
                count,
            })
            .collect(),
    }
}

fn production_metrics(processings: &[production_order_processing::Model]) -> ProductionMetrics {
    let worked_quantity = worked_total(processings);
    let employees: HashSet<Uuid> = processings.iter().map(|p| p.employee_uuid).collect();
    let count = processings.len() as u64;
    ProductionMetrics {
        processings: count,
        worked_quantity,
        active_employees: employees.len() as u64,
        average_quantity_per_processing: ratio(worked_quantity, count),
    }
}

/// Total processed quantity, saturating at `i64::MAX`.
fn worked_total(processings: &[production_order_processing::Model]) -> i64 {
    processings
        .iter()
        .fold(0i64, |total, p| total.saturating_add(p.quantity))
}

/// Daily worked quantity. Bounded ranges are zero-filled; `all` lists only active days.
fn trends(
    processings: &[production_order_processing::Model],
    range: Option<&DateRange>,
) -> Vec<TrendPoint> {
    let mut days: BTreeMap<NaiveDate, (i64, u64)> = BTreeMap::new();
    if let Some(range) = range {
        for day in range.iter_days() {
            days.insert(day, (0, 0));
        }
    }
    for processing in processings {
        let entry = days.entry(processing.processed_at.date_naive()).or_default();
        entry.0 = entry.0.saturating_add(processing.quantity);
        entry.1 += 1;
    }
    days.into_iter()
        .map(|(date, (worked_quantity, processings))| TrendPoint {
            date,
            worked_quantity,
            processings,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn order(status: OrderStatus, delivery: Option<NaiveDate>, total: i64, worked: i64) -> production_order::Model {
        production_order::Model {
            uuid: Uuid::new_v4(),
            production_number: format!("PO-{}", Uuid::new_v4().simple()),
            customer_uuid: Uuid::new_v4(),
            status,
            total_quantity: total,
            worked_quantity: worked,
            delivery_date: delivery,
            self_check_done: false,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn processing(day: NaiveDate, quantity: i64, employee_uuid: Uuid) -> production_order_processing::Model {
        production_order_processing::Model {
            uuid: Uuid::new_v4(),
            production_order_uuid: Uuid::new_v4(),
            employee_uuid,
            quantity,
            processed_at: day_start(day) + chrono::Duration::hours(10),
            created_at: Utc::now(),
        }
    }

    #[rstest]
    #[case(AlertKind::Overdue, 1, AlertSeverity::Medium)]
    #[case(AlertKind::Overdue, 3, AlertSeverity::High)]
    #[case(AlertKind::Overdue, 10, AlertSeverity::Critical)]
    #[case(AlertKind::Suspended, 4, AlertSeverity::Medium)]
    #[case(AlertKind::Suspended, 5, AlertSeverity::High)]
    #[case(AlertKind::Autocontrollo, 1, AlertSeverity::Low)]
    #[case(AlertKind::Autocontrollo, 5, AlertSeverity::Medium)]
    fn severity_thresholds(#[case] kind: AlertKind, #[case] count: u64, #[case] expected: AlertSeverity) {
        assert_eq!(classify(kind, count), expected);
    }

    #[test]
    fn signature_ignores_order_of_ids() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(alert_signature(&[a, b]), alert_signature(&[b, a]));
        assert_ne!(alert_signature(&[a]), alert_signature(&[a, b]));
        assert_eq!(alert_signature(&[a]).len(), 64);
    }

    #[test]
    fn statistics_count_overdue_only_for_open_orders() {
        let today = date(2024, 6, 10);
        let late = Some(date(2024, 6, 1));
        let orders = vec![
            order(OrderStatus::InProduction, late, 100, 40),
            order(OrderStatus::Shipped, late, 100, 100),
            order(OrderStatus::Suspended, Some(date(2024, 7, 1)), 200, 0),
        ];
        let stats = statistics(&orders, today);
        assert_eq!(stats.orders.total, 3);
        assert_eq!(stats.orders.overdue, 1);
        assert_eq!(stats.orders.completed, 1);
        assert_eq!(stats.orders.suspended, 1);
        assert_eq!(stats.quantities.ordered, 400);
        assert_eq!(stats.quantities.worked, 140);
        assert!((stats.quantities.completion_rate - 35.0).abs() < f64::EPSILON);
        assert_eq!(stats.by_status.len(), 7);
    }

    #[test]
    fn trends_zero_fill_bounded_ranges() {
        let employee = Uuid::new_v4();
        let range = DateRange::new(date(2024, 6, 1), date(2024, 6, 3)).unwrap();
        let points = trends(&[processing(date(2024, 6, 2), 15, employee)], Some(&range));
        let quantities: Vec<i64> = points.iter().map(|p| p.worked_quantity).collect();
        assert_eq!(quantities, vec![0, 15, 0]);

        let unbounded = trends(&[processing(date(2024, 6, 2), 15, employee)], None);
        assert_eq!(unbounded.len(), 1);
    }

    #[test]
    fn metrics_count_distinct_employees() {
        let first = Uuid::new_v4();
        let day = date(2024, 6, 2);
        let metrics = production_metrics(&[
            processing(day, 10, first),
            processing(day, 20, first),
            processing(day, 30, Uuid::new_v4()),
        ]);
        assert_eq!(metrics.processings, 3);
        assert_eq!(metrics.worked_quantity, 60);
        assert_eq!(metrics.active_employees, 2);
        assert!((metrics.average_quantity_per_processing - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn no_alert_without_affected_orders() {
        assert!(build_alert(AlertKind::Suspended, &[], "scope").is_none());
    }

    #[test]
    fn bounds_cover_whole_last_day() {
        let range = DateRange::new(date(2024, 6, 1), date(2024, 6, 1)).unwrap();
        let (start, end) = bounds(&range);
        assert_eq!(end - start, chrono::Duration::days(1));
    }
}
