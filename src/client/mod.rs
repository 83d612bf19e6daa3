//! Dashboard client core: the filter, polling and alert state machine and the runtime driving it.

pub mod alerts;
pub mod api;
pub mod controller;
pub mod polling;
pub mod session;

pub use alerts::{AlertBoard, AlertEntry, AlertPhase, Dismissal};
pub use api::{ClientError, DashboardApi, HttpDashboardApi};
pub use controller::{ControllerSettings, DashboardController, DashboardView, Effect, Event};
pub use polling::{Polling, TimerCommand};
pub use session::{spawn_session, SessionHandle};
