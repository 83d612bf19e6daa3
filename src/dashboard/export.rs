use chrono::NaiveDate;

use super::filters::DateFilter;
use super::snapshot::DashboardSnapshot;

/// A generated CSV document ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub file_name: String,
    pub contents: String,
}

/// Quotes every cell and doubles embedded quotes.
pub fn quote_cell(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

struct CsvWriter {
    lines: Vec<String>,
}

impl CsvWriter {
    fn new() -> Self {
        Self { lines: Vec::new() }
    }

    fn row(&mut self, cells: &[&str]) {
        let line = cells
            .iter()
            .map(|cell| quote_cell(cell))
            .collect::<Vec<_>>()
            .join(",");
        self.lines.push(line);
    }

    fn section(&mut self, title: &str) {
        if !self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.row(&[title]);
    }

    fn finish(self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

fn decimal(value: f64) -> String {
    format!("{value:.2}")
}

/// `dashboard_<filter>_<YYYY-MM-DD>.csv`
pub fn export_file_name(filter: DateFilter, today: NaiveDate) -> String {
    format!("dashboard_{}_{}.csv", filter, today.format("%Y-%m-%d"))
}

/// Serializes the loaded dashboard figures. Sections that were never loaded are skipped.
pub fn export_csv(snapshot: &DashboardSnapshot, filter: DateFilter, today: NaiveDate) -> CsvExport {
    let mut csv = CsvWriter::new();

    if let Some(statistics) = &snapshot.statistics {
        csv.section("Statistics");
        csv.row(&["Total", &statistics.orders.total.to_string()]);
        csv.row(&["In progress", &statistics.orders.in_progress.to_string()]);
        csv.row(&["Completed", &statistics.orders.completed.to_string()]);
        csv.row(&["Overdue", &statistics.orders.overdue.to_string()]);
        csv.row(&["Suspended", &statistics.orders.suspended.to_string()]);
        csv.row(&["Ordered quantity", &statistics.quantities.ordered.to_string()]);
        csv.row(&["Worked quantity", &statistics.quantities.worked.to_string()]);
        csv.row(&[
            "Completion rate (%)",
            &decimal(statistics.quantities.completion_rate),
        ]);
        for entry in &statistics.by_status {
            csv.row(&[&format!("Status: {}", entry.label), &entry.count.to_string()]);
        }
    }

    if let Some(metrics) = &snapshot.metrics {
        csv.section("Metrics");
        csv.row(&["Processings", &metrics.processings.to_string()]);
        csv.row(&["Worked quantity", &metrics.worked_quantity.to_string()]);
        csv.row(&["Active employees", &metrics.active_employees.to_string()]);
        csv.row(&[
            "Average quantity per processing",
            &decimal(metrics.average_quantity_per_processing),
        ]);
    }

    if let Some(comparison) = &snapshot.comparison {
        csv.section("Comparison");
        csv.row(&["Indicator", "Current", "Previous", "Change (%)"]);
        for (label, delta) in [
            ("Orders", &comparison.orders),
            ("Worked quantity", &comparison.worked_quantity),
        ] {
            csv.row(&[
                label,
                &delta.current.to_string(),
                &delta.previous.to_string(),
                &delta.change_percent.map(decimal).unwrap_or_default(),
            ]);
        }
    }

    if let Some(alerts) = &snapshot.alerts {
        csv.section("Alerts");
        csv.row(&["Type", "Severity", "Count"]);
        for alert in alerts {
            csv.row(&[
                alert.kind.title(),
                alert.severity.as_str(),
                &alert.count.to_string(),
            ]);
        }
    }

    if let Some(customers) = &snapshot.top_customers {
        csv.section("Top customers");
        csv.row(&["Customer", "Orders", "Quantity"]);
        for customer in customers {
            csv.row(&[
                &customer.name,
                &customer.orders.to_string(),
                &customer.quantity.to_string(),
            ]);
        }
    }

    if let Some(employees) = &snapshot.top_employees {
        csv.section("Top employees");
        csv.row(&["Employee", "Worked quantity", "Processings"]);
        for employee in employees {
            csv.row(&[
                &employee.name,
                &employee.worked_quantity.to_string(),
                &employee.processings.to_string(),
            ]);
        }
    }

    CsvExport {
        file_name: export_file_name(filter, today),
        contents: csv.finish(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::filters::DateFilter;
    use crate::dashboard::snapshot::*;
    use crate::models::{Alert, AlertKind, AlertSeverity};
    use chrono::Utc;
    use uuid::Uuid;

    fn snapshot() -> DashboardSnapshot {
        DashboardSnapshot {
            filters: AppliedFilters {
                date_filter: DateFilter::Month,
                range: None,
                customer_uuid: None,
                statuses: vec![],
            },
            statistics: Some(DashboardStatistics {
                orders: OrderCounts {
                    total: 10,
                    in_progress: 4,
                    completed: 3,
                    overdue: 2,
                    suspended: 1,
                },
                quantities: QuantityTotals {
                    ordered: 1000,
                    worked: 250,
                    completion_rate: 25.0,
                },
                by_status: vec![],
            }),
            metrics: None,
            comparison: None,
            trends: None,
            alerts: Some(vec![Alert {
                kind: AlertKind::Overdue,
                severity: AlertSeverity::High,
                count: 2,
                orders: vec![],
                signature: None,
                scope_hash: None,
            }]),
            top_customers: Some(vec![TopCustomer {
                customer_uuid: Uuid::new_v4(),
                name: "Cartiera \"Nord\", S.p.A.".into(),
                orders: 3,
                quantity: 300,
            }]),
            top_employees: None,
            recent_orders: None,
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn totals_row_is_quoted() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let export = export_csv(&snapshot(), DateFilter::Month, today);
        assert!(export.contents.contains("\"Total\",\"10\"\n"));
        assert!(export.contents.starts_with("\"Statistics\"\n"));
        assert!(export.contents.contains("\"Completion rate (%)\",\"25.00\""));
    }

    #[test]
    fn file_name_embeds_filter_and_date() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let export = export_csv(&snapshot(), DateFilter::Week, today);
        assert_eq!(export.file_name, "dashboard_week_2024-06-03.csv");
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let export = export_csv(&snapshot(), DateFilter::All, today);
        assert!(export
            .contents
            .contains("\"Cartiera \"\"Nord\"\", S.p.A.\",\"3\",\"300\""));
    }

    #[test]
    fn sections_are_separated_by_blank_lines() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let export = export_csv(&snapshot(), DateFilter::All, today);
        assert!(export.contents.contains("\n\n\"Alerts\"\n\"Type\",\"Severity\",\"Count\"\n"));
        assert!(export.contents.contains("\"Overdue orders\",\"high\",\"2\""));
        assert!(!export.contents.contains("\"Metrics\""));
    }
}
