pub mod alert;
pub mod order_status;
pub mod pay_level;

pub use alert::{AcknowledgeAlertRequest, Alert, AlertKind, AlertSeverity};
pub use order_status::OrderStatus;
pub use pay_level::PayLevel;
