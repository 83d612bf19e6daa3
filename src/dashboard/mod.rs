//! Dashboard filter state, payload shapes and CSV export shared by the server and the client.

pub mod export;
pub mod filters;
pub mod snapshot;

pub use export::{export_csv, export_file_name, CsvExport};
pub use filters::{
    DashboardFilters, DashboardQuery, DateFilter, DatePeriod, DateRange, FilterError, ParsedQuery,
    Section,
};
pub use snapshot::{DashboardSnapshot, SnapshotError};
