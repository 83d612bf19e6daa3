pub mod alert_acknowledgement;
pub mod customer;
pub mod customer_division;
pub mod customer_shipping_address;
pub mod employee;
pub mod employee_contract;
pub mod production_order;
pub mod production_order_processing;
