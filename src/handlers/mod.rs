pub mod common;
pub mod contracts;
pub mod customers;
pub mod dashboard;
pub mod employees;
pub mod processings;
pub mod shipping_addresses;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::services::{
    alerts::AlertService, contracts::ContractService, customers::CustomerService,
    dashboard::DashboardService, employees::EmployeeService, processings::ProcessingService,
    shipping_addresses::ShippingAddressService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer used by the HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub dashboard: Arc<DashboardService>,
    pub alerts: Arc<AlertService>,
    pub customers: Arc<CustomerService>,
    pub employees: Arc<EmployeeService>,
    pub contracts: Arc<ContractService>,
    pub shipping_addresses: Arc<ShippingAddressService>,
    pub processings: Arc<ProcessingService>,
}

impl AppServices {
    pub fn new(db: Arc<DatabaseConnection>, config: &AppConfig) -> Self {
        Self {
            dashboard: Arc::new(DashboardService::new(db.clone(), config.dashboard.clone())),
            alerts: Arc::new(AlertService::new(db.clone())),
            customers: Arc::new(CustomerService::new(db.clone())),
            employees: Arc::new(EmployeeService::new(db.clone())),
            contracts: Arc::new(ContractService::new(db.clone())),
            shipping_addresses: Arc::new(ShippingAddressService::new(db.clone())),
            processings: Arc::new(ProcessingService::new(db)),
        }
    }
}
