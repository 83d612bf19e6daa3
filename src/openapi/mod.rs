use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{dashboard, errors, handlers, models, services};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PackOps API",
        version = "0.3.0",
        description = r#"
# PackOps Production Back Office

Dashboard and master data for a packaging production plant.

- **Dashboard**: order statistics, production metrics, period comparison, daily trends,
  rankings and operational alerts, narrowed by date period, customer and status.
- **Alerts**: acknowledged alerts stay hidden until the set of affected orders changes.
- **Master data**: customers with divisions, employees, contracts, shipping addresses
  and production-order processings.

Every successful response is wrapped in `{ success, data, message, errors, meta }`.
Field-level validation failures answer `422` with a `field -> message` map.
"#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        handlers::dashboard::get_dashboard,
        handlers::dashboard::acknowledge_alert,
        handlers::customers::list_customers,
        handlers::customers::create_customer_form,
        handlers::customers::create_customer,
        handlers::customers::edit_customer_form,
        handlers::customers::update_customer,
        handlers::customers::get_customer,
        handlers::customers::delete_customer,
        handlers::employees::list_employees,
        handlers::employees::create_employee_form,
        handlers::employees::create_employee,
        handlers::employees::edit_employee_form,
        handlers::employees::update_employee,
        handlers::employees::get_employee,
        handlers::employees::delete_employee,
        handlers::contracts::list_contracts,
        handlers::contracts::create_contract_form,
        handlers::contracts::create_contract,
        handlers::contracts::edit_contract_form,
        handlers::contracts::update_contract,
        handlers::contracts::get_contract,
        handlers::contracts::delete_contract,
        handlers::shipping_addresses::list_shipping_addresses,
        handlers::shipping_addresses::create_shipping_address_form,
        handlers::shipping_addresses::create_shipping_address,
        handlers::shipping_addresses::edit_shipping_address_form,
        handlers::shipping_addresses::update_shipping_address,
        handlers::shipping_addresses::get_shipping_address,
        handlers::shipping_addresses::delete_shipping_address,
        handlers::shipping_addresses::load_divisions,
        handlers::processings::list_processings,
        handlers::processings::create_processing_form,
        handlers::processings::create_processing,
        handlers::processings::edit_processing_form,
        handlers::processings::update_processing,
        handlers::processings::get_processing,
        handlers::processings::delete_processing,
    ),
    components(
        schemas(
            dashboard::DashboardSnapshot,
            dashboard::snapshot::OrderCounts,
            dashboard::snapshot::QuantityTotals,
            dashboard::snapshot::StatusCount,
            dashboard::snapshot::DashboardStatistics,
            dashboard::snapshot::ProductionMetrics,
            dashboard::snapshot::Delta,
            dashboard::snapshot::PeriodComparison,
            dashboard::snapshot::TrendPoint,
            dashboard::snapshot::TopCustomer,
            dashboard::snapshot::TopEmployee,
            dashboard::snapshot::OrderSummary,
            dashboard::snapshot::AppliedFilters,
            dashboard::filters::DateFilter,
            dashboard::filters::DateRange,
            dashboard::filters::Section,
            models::Alert,
            models::AlertKind,
            models::AlertSeverity,
            models::AcknowledgeAlertRequest,
            services::alerts::AcknowledgementView,
            services::FormOption,
            services::customers::CustomerInput,
            services::customers::CustomerView,
            services::customers::DivisionView,
            services::customers::CustomerForm,
            services::employees::EmployeeInput,
            services::employees::EmployeeView,
            services::employees::EmployeeForm,
            services::contracts::ContractInput,
            services::contracts::ContractView,
            services::contracts::ContractForm,
            services::shipping_addresses::ShippingAddressInput,
            services::shipping_addresses::ShippingAddressView,
            services::shipping_addresses::ShippingAddressForm,
            services::processings::ProcessingInput,
            services::processings::ProcessingView,
            services::processings::ProcessingForm,
            errors::FieldErrors,
            errors::ErrorResponse
        )
    ),
    tags(
        (name = "Dashboard", description = "Production dashboard and alert acknowledgement"),
        (name = "Customers", description = "Customers and their divisions"),
        (name = "Employees", description = "Plant employees"),
        (name = "Contracts", description = "Employee contracts and pay levels"),
        (name = "Shipping addresses", description = "Delivery addresses per customer division"),
        (name = "Production order processings", description = "Work recorded against production orders")
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
