use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use utoipa::ToSchema;
use uuid::Uuid;

use super::filters::{DateFilter, DateRange, Section};
use crate::models::{Alert, OrderStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderCounts {
    pub total: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub overdue: u64,
    pub suspended: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuantityTotals {
    pub ordered: i64,
    pub worked: i64,
    /// Worked over ordered, in percent.
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StatusCount {
    #[schema(value_type = u8)]
    pub status: OrderStatus,
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardStatistics {
    pub orders: OrderCounts,
    pub quantities: QuantityTotals,
    pub by_status: Vec<StatusCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductionMetrics {
    pub processings: u64,
    pub worked_quantity: i64,
    pub active_employees: u64,
    pub average_quantity_per_processing: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Delta {
    pub current: i64,
    pub previous: i64,
    /// `None` when the previous period is zero.
    pub change_percent: Option<f64>,
}

impl Delta {
    pub fn new(current: i64, previous: i64) -> Self {
        let change_percent = if previous == 0 {
            None
        } else {
            Some((current as f64 - previous as f64) * 100.0 / previous as f64)
        };
        Self {
            current,
            previous,
            change_percent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PeriodComparison {
    pub previous: DateRange,
    pub orders: Delta,
    pub worked_quantity: Delta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub worked_quantity: i64,
    pub processings: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TopCustomer {
    pub customer_uuid: Uuid,
    pub name: String,
    pub orders: u64,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TopEmployee {
    pub employee_uuid: Uuid,
    pub name: String,
    pub worked_quantity: i64,
    pub processings: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderSummary {
    pub uuid: Uuid,
    pub production_number: String,
    pub customer_name: Option<String>,
    #[schema(value_type = u8)]
    pub status: OrderStatus,
    pub total_quantity: i64,
    pub worked_quantity: i64,
    pub delivery_date: Option<NaiveDate>,
    pub overdue: bool,
}

/// Filters the server actually applied, echoed back with every snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AppliedFilters {
    pub date_filter: DateFilter,
    pub range: Option<DateRange>,
    pub customer_uuid: Option<Uuid>,
    #[schema(value_type = Vec<u8>)]
    pub statuses: Vec<OrderStatus>,
}

/// Dashboard payload. Sections left out of a partial fetch are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardSnapshot {
    pub filters: AppliedFilters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<DashboardStatistics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ProductionMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<PeriodComparison>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trends: Option<Vec<TrendPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alerts: Option<Vec<Alert>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_customers: Option<Vec<TopCustomer>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_employees: Option<Vec<TopEmployee>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_orders: Option<Vec<OrderSummary>>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("alert type '{0}' appears more than once")]
    DuplicateAlert(String),
    #[error("negative quantity in {0}")]
    NegativeQuantity(&'static str),
}

impl DashboardSnapshot {
    /// Checks the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if let Some(alerts) = &self.alerts {
            let mut seen = HashSet::new();
            for alert in alerts {
                if !seen.insert(alert.kind) {
                    return Err(SnapshotError::DuplicateAlert(alert.kind.to_string()));
                }
            }
        }
        if let Some(statistics) = &self.statistics {
            if statistics.quantities.ordered < 0 || statistics.quantities.worked < 0 {
                return Err(SnapshotError::NegativeQuantity("statistics"));
            }
        }
        if let Some(metrics) = &self.metrics {
            if metrics.worked_quantity < 0 {
                return Err(SnapshotError::NegativeQuantity("metrics"));
            }
        }
        Ok(())
    }

    pub fn has(&self, section: Section) -> bool {
        match section {
            Section::Statistics => self.statistics.is_some(),
            Section::Metrics => self.metrics.is_some(),
            Section::Comparison => self.comparison.is_some(),
            Section::Trends => self.trends.is_some(),
            Section::Alerts => self.alerts.is_some(),
            Section::TopCustomers => self.top_customers.is_some(),
            Section::TopEmployees => self.top_employees.is_some(),
            Section::RecentOrders => self.recent_orders.is_some(),
        }
    }

    /// Overlays the sections present in `partial`; everything else is kept.
    pub fn merge(&mut self, partial: DashboardSnapshot) {
        self.filters = partial.filters;
        self.generated_at = partial.generated_at;
        if partial.statistics.is_some() {
            self.statistics = partial.statistics;
        }
        if partial.metrics.is_some() {
            self.metrics = partial.metrics;
        }
        if partial.comparison.is_some() {
            self.comparison = partial.comparison;
        }
        if partial.trends.is_some() {
            self.trends = partial.trends;
        }
        if partial.alerts.is_some() {
            self.alerts = partial.alerts;
        }
        if partial.top_customers.is_some() {
            self.top_customers = partial.top_customers;
        }
        if partial.top_employees.is_some() {
            self.top_employees = partial.top_employees;
        }
        if partial.recent_orders.is_some() {
            self.recent_orders = partial.recent_orders;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertKind, AlertSeverity};

    fn empty() -> DashboardSnapshot {
        DashboardSnapshot {
            filters: AppliedFilters {
                date_filter: DateFilter::All,
                range: None,
                customer_uuid: None,
                statuses: vec![],
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
        }
    }

    fn alert(kind: AlertKind) -> Alert {
        Alert {
            kind,
            severity: AlertSeverity::Low,
            count: 1,
            orders: vec![],
            signature: None,
            scope_hash: None,
        }
    }

    #[test]
    fn duplicate_alert_kinds_are_rejected() {
        let mut snapshot = empty();
        snapshot.alerts = Some(vec![alert(AlertKind::Overdue), alert(AlertKind::Overdue)]);
        assert_eq!(
            snapshot.validate(),
            Err(SnapshotError::DuplicateAlert("overdue".into()))
        );
    }

    #[test]
    fn merge_keeps_sections_missing_from_partial() {
        let mut full = empty();
        full.trends = Some(vec![]);
        full.metrics = Some(ProductionMetrics {
            processings: 1,
            ..Default::default()
        });

        let mut partial = empty();
        partial.metrics = Some(ProductionMetrics {
            processings: 5,
            ..Default::default()
        });
        full.merge(partial);

        assert_eq!(full.metrics.as_ref().unwrap().processings, 5);
        assert!(full.has(Section::Trends));
        assert!(!full.has(Section::Alerts));
    }

    #[test]
    fn delta_change_is_relative_to_previous() {
        assert_eq!(Delta::new(15, 10).change_percent, Some(50.0));
        assert_eq!(Delta::new(5, 0).change_percent, None);
    }
}
