use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::str::FromStr;
use thiserror::Error;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::OrderStatus;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Longest custom range accepted when no limit is configured (about ten years).
pub const DEFAULT_MAX_RANGE_DAYS: i64 = 3_660;
const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9_999;

/// Date-range keyword selected on the dashboard.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DateFilter {
    #[default]
    All,
    Today,
    Week,
    Month,
    Custom,
}

/// Inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, FilterError> {
        if start > end {
            return Err(FilterError::ReversedRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// The range of equal length that ends the day before this one starts.
    /// `None` when that range would fall before the earliest representable date.
    pub fn previous(&self) -> Option<DateRange> {
        let end = self.start.checked_sub_signed(Duration::days(1))?;
        let start = self.start.checked_sub_signed(Duration::days(self.days()))?;
        Some(DateRange { start, end })
    }

    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take(self.days() as usize)
    }
}

/// A resolved date filter. `Custom` always carries its range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DatePeriod {
    #[default]
    All,
    Today,
    Week,
    Month,
    Custom(DateRange),
}

impl DatePeriod {
    pub fn filter(&self) -> DateFilter {
        match self {
            DatePeriod::All => DateFilter::All,
            DatePeriod::Today => DateFilter::Today,
            DatePeriod::Week => DateFilter::Week,
            DatePeriod::Month => DateFilter::Month,
            DatePeriod::Custom(_) => DateFilter::Custom,
        }
    }

    /// Calendar range covered relative to `today`; `None` means unbounded.
    pub fn resolve(&self, today: NaiveDate) -> Option<DateRange> {
        match self {
            DatePeriod::All => None,
            DatePeriod::Today => Some(DateRange {
                start: today,
                end: today,
            }),
            DatePeriod::Week => {
                let offset = today.weekday().num_days_from_monday() as i64;
                Some(DateRange {
                    start: today - Duration::days(offset),
                    end: today,
                })
            }
            DatePeriod::Month => Some(DateRange {
                start: today - Duration::days(today.day0() as i64),
                end: today,
            }),
            DatePeriod::Custom(range) => Some(*range),
        }
    }
}

/// Dashboard data sections. A fetch either asks for all of them or for a named subset.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Section {
    Statistics,
    Metrics,
    Comparison,
    Trends,
    Alerts,
    TopCustomers,
    TopEmployees,
    RecentOrders,
}

impl Section {
    pub const ALL: [Section; 8] = [
        Section::Statistics,
        Section::Metrics,
        Section::Comparison,
        Section::Trends,
        Section::Alerts,
        Section::TopCustomers,
        Section::TopEmployees,
        Section::RecentOrders,
    ];

    /// Sections refreshed by the auto-refresh timer.
    pub const POLLED: [Section; 4] = [
        Section::Statistics,
        Section::Metrics,
        Section::Alerts,
        Section::RecentOrders,
    ];
}

/// Current filter selection of a dashboard view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardFilters {
    pub period: DatePeriod,
    pub customer_uuid: Option<Uuid>,
    pub statuses: BTreeSet<OrderStatus>,
}

impl DashboardFilters {
    /// Canonical query parameters. `sections = None` requests every section.
    pub fn to_query(&self, sections: Option<&[Section]>) -> DashboardQuery {
        let (start_date, end_date) = match self.period {
            DatePeriod::Custom(range) => (
                Some(range.start.format(DATE_FORMAT).to_string()),
                Some(range.end.format(DATE_FORMAT).to_string()),
            ),
            _ => (None, None),
        };

        let statuses = if self.statuses.is_empty() {
            None
        } else {
            Some(
                self.statuses
                    .iter()
                    .map(|status| status.code().to_string())
                    .collect::<Vec<_>>()
                    .join(","),
            )
        };

        let only = sections.filter(|s| !s.is_empty()).map(|sections| {
            let ordered: BTreeSet<Section> = sections.iter().copied().collect();
            ordered
                .iter()
                .map(|section| section.to_string())
                .collect::<Vec<_>>()
                .join(",")
        });

        DashboardQuery {
            date_filter: Some(self.period.filter().to_string()),
            start_date,
            end_date,
            customer_uuid: self.customer_uuid.map(|id| id.to_string()),
            statuses,
            only,
        }
    }

    /// Stable identifier of the data scope these filters select on `today`.
    ///
    /// Relative periods resolve to concrete dates, so an acknowledgement given for
    /// "this week" does not carry over into the next one.
    pub fn scope_hash(&self, today: NaiveDate) -> String {
        let range = match self.period.resolve(today) {
            Some(range) => format!(
                "{}..{}",
                range.start.format(DATE_FORMAT),
                range.end.format(DATE_FORMAT)
            ),
            None => "all".to_string(),
        };
        let customer = self
            .customer_uuid
            .map(|id| id.to_string())
            .unwrap_or_else(|| "*".to_string());
        let statuses = self
            .statuses
            .iter()
            .map(|status| status.code().to_string())
            .collect::<Vec<_>>()
            .join(",");

        let canonical = format!("range={range};customer={customer};statuses={statuses}");
        hex::encode(Sha256::digest(canonical.as_bytes()))
    }
}

/// Query string accepted by the dashboard endpoint. Values stay textual until [`DashboardQuery::parse`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DashboardQuery {
    /// One of `all`, `today`, `week`, `month`, `custom`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_filter: Option<String>,
    /// ISO date, required with `custom`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// ISO date, required with `custom`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_uuid: Option<String>,
    /// Comma-joined status codes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statuses: Option<String>,
    /// Comma-joined section names for a partial refresh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub filters: DashboardFilters,
    /// `None` when every section was requested.
    pub sections: Option<BTreeSet<Section>>,
}

impl ParsedQuery {
    pub fn wants(&self, section: Section) -> bool {
        self.sections
            .as_ref()
            .map_or(true, |sections| sections.contains(&section))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("unknown date filter '{0}'")]
    UnknownDateFilter(String),
    #[error("custom date filter requires both start_date and end_date")]
    MissingCustomDates,
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("start date {start} is after end date {end}")]
    ReversedRange { start: NaiveDate, end: NaiveDate },
    #[error("invalid customer uuid '{0}'")]
    InvalidCustomer(String),
    #[error("invalid status code '{0}'")]
    InvalidStatus(String),
    #[error("unknown dashboard section '{0}'")]
    UnknownSection(String),
    #[error("custom range spans {days} days, at most {max} allowed")]
    RangeTooLong { days: i64, max: i64 },
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
}

fn parse_date(raw: &str) -> Result<NaiveDate, FilterError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .filter(|date| (MIN_YEAR..=MAX_YEAR).contains(&date.year()))
        .ok_or_else(|| FilterError::InvalidDate(raw.to_string()))
}

impl DashboardQuery {
    pub fn parse(&self) -> Result<ParsedQuery, FilterError> {
        self.parse_within(DEFAULT_MAX_RANGE_DAYS)
    }

    /// Like [`DashboardQuery::parse`], rejecting custom ranges longer than `max_range_days`.
    pub fn parse_within(&self, max_range_days: i64) -> Result<ParsedQuery, FilterError> {
        let filter = match non_empty(&self.date_filter) {
            None => DateFilter::All,
            Some(raw) => DateFilter::from_str(raw)
                .map_err(|_| FilterError::UnknownDateFilter(raw.to_string()))?,
        };

        let period = match filter {
            DateFilter::All => DatePeriod::All,
            DateFilter::Today => DatePeriod::Today,
            DateFilter::Week => DatePeriod::Week,
            DateFilter::Month => DatePeriod::Month,
            DateFilter::Custom => {
                let (start, end) = match (non_empty(&self.start_date), non_empty(&self.end_date)) {
                    (Some(start), Some(end)) => (parse_date(start)?, parse_date(end)?),
                    _ => return Err(FilterError::MissingCustomDates),
                };
                let range = DateRange::new(start, end)?;
                if range.days() > max_range_days {
                    return Err(FilterError::RangeTooLong {
                        days: range.days(),
                        max: max_range_days,
                    });
                }
                DatePeriod::Custom(range)
            }
        };

        let customer_uuid = non_empty(&self.customer_uuid)
            .map(|raw| Uuid::parse_str(raw).map_err(|_| FilterError::InvalidCustomer(raw.to_string())))
            .transpose()?;

        let statuses = match non_empty(&self.statuses) {
            None => BTreeSet::new(),
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(|code| {
                    OrderStatus::parse_code(code).map_err(|_| FilterError::InvalidStatus(code.to_string()))
                })
                .collect::<Result<BTreeSet<_>, _>>()?,
        };

        let sections = non_empty(&self.only)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(|name| {
                        Section::from_str(name).map_err(|_| FilterError::UnknownSection(name.to_string()))
                    })
                    .collect::<Result<BTreeSet<_>, _>>()
            })
            .transpose()?
            .filter(|sections| !sections.is_empty());

        Ok(ParsedQuery {
            filters: DashboardFilters {
                period,
                customer_uuid,
                statuses,
            },
            sections,
        })
    }
}
