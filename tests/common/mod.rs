#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use packops_api::{
    build_router,
    config::AppConfig,
    db,
    entities::{customer, customer_division, employee, production_order, production_order_processing},
    models::OrderStatus,
    AppState,
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

/// Application router backed by a private in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // One connection, otherwise every pooled connection sees its own empty database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.db_idle_timeout_secs = 3_600;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to open test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = build_router(state.clone());
        Self { router, state }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request should build");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, None).await
    }

    pub async fn seed_customer(&self, code: &str, company_name: &str) -> customer::Model {
        customer::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            company_name: Set(company_name.to_string()),
            vat_number: Set(None),
            email: Set(None),
            phone: Set(None),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed customer")
    }

    pub async fn seed_division(&self, customer_uuid: Uuid, name: &str) -> customer_division::Model {
        customer_division::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            customer_uuid: Set(customer_uuid),
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(self.db())
        .await
        .expect("seed division")
    }

    pub async fn seed_employee(&self, first_name: &str, last_name: &str, matriculation: &str) -> employee::Model {
        employee::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            first_name: Set(first_name.to_string()),
            last_name: Set(last_name.to_string()),
            fiscal_code: Set(None),
            matriculation_number: Set(matriculation.to_string()),
            email: Set(None),
            portal_access: Set(false),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed employee")
    }

    pub async fn seed_order(&self, order: OrderSeed) -> production_order::Model {
        production_order::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            production_number: Set(order.production_number),
            customer_uuid: Set(order.customer_uuid),
            status: Set(order.status),
            total_quantity: Set(order.total_quantity),
            worked_quantity: Set(order.worked_quantity),
            delivery_date: Set(order.delivery_date),
            self_check_done: Set(order.self_check_done),
            created_at: Set(order.created_at),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed production order")
    }

    pub async fn seed_processing(
        &self,
        order_uuid: Uuid,
        employee_uuid: Uuid,
        quantity: i64,
        processed_at: DateTime<Utc>,
    ) -> production_order_processing::Model {
        production_order_processing::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            production_order_uuid: Set(order_uuid),
            employee_uuid: Set(employee_uuid),
            quantity: Set(quantity),
            processed_at: Set(processed_at),
            created_at: Set(Utc::now()),
        }
        .insert(self.db())
        .await
        .expect("seed processing")
    }
}

/// Production order fixture; defaults describe a fresh pending order created now.
#[derive(Debug, Clone)]
pub struct OrderSeed {
    pub production_number: String,
    pub customer_uuid: Uuid,
    pub status: OrderStatus,
    pub total_quantity: i64,
    pub worked_quantity: i64,
    pub delivery_date: Option<NaiveDate>,
    pub self_check_done: bool,
    pub created_at: DateTime<Utc>,
}

impl OrderSeed {
    pub fn new(production_number: &str, customer_uuid: Uuid) -> Self {
        Self {
            production_number: production_number.to_string(),
            customer_uuid,
            status: OrderStatus::Pending,
            total_quantity: 100,
            worked_quantity: 0,
            delivery_date: None,
            self_check_done: false,
            created_at: Utc::now(),
        }
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    pub fn quantities(mut self, total: i64, worked: i64) -> Self {
        self.total_quantity = total;
        self.worked_quantity = worked;
        self
    }

    pub fn delivery(mut self, date: NaiveDate) -> Self {
        self.delivery_date = Some(date);
        self
    }

    pub fn self_checked(mut self) -> Self {
        self.self_check_done = true;
        self
    }

    pub fn created_days_ago(mut self, days: i64) -> Self {
        self.created_at = Utc::now() - Duration::days(days);
        self
    }
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// `data` of a success envelope.
pub fn data(body: &Value) -> &Value {
    assert_eq!(body["success"], Value::Bool(true), "unexpected body: {}", body);
    &body["data"]
}
