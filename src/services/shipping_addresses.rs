use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::customers::DivisionView;
use super::listing::{ListQuery, Listing, Page};
use super::FormOption;
use crate::entities::{customer, customer_division, customer_shipping_address};
use crate::errors::{FieldErrors, ServiceError};

pub const DEFAULT_COUNTRY: &str = "IT";

static POSTAL_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{5}$").unwrap());
static TWO_LETTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2}$").unwrap());

const SORTABLE: [(&str, customer_shipping_address::Column); 4] = [
    ("city", customer_shipping_address::Column::City),
    ("postal_code", customer_shipping_address::Column::PostalCode),
    ("province", customer_shipping_address::Column::Province),
    ("created_at", customer_shipping_address::Column::CreatedAt),
];

fn validate_postal_code(value: &str) -> Result<(), ValidationError> {
    if POSTAL_CODE_RE.is_match(value) {
        return Ok(());
    }
    let mut err = ValidationError::new("postal_code");
    err.message = Some("Postal code must be 5 digits".into());
    Err(err)
}

fn validate_province(value: &str) -> Result<(), ValidationError> {
    if TWO_LETTER_RE.is_match(value) {
        return Ok(());
    }
    let mut err = ValidationError::new("province");
    err.message = Some("Province must be a 2-letter code".into());
    Err(err)
}

fn validate_country(value: &str) -> Result<(), ValidationError> {
    if TWO_LETTER_RE.is_match(value) {
        return Ok(());
    }
    let mut err = ValidationError::new("country");
    err.message = Some("Country must be an ISO 3166 alpha-2 code".into());
    Err(err)
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct ShippingAddressInput {
    pub customer_division_uuid: Uuid,
    #[validate(length(min = 1, max = 255, message = "Street is required"))]
    pub street: String,
    #[validate(length(min = 1, max = 100, message = "City is required"))]
    pub city: String,
    #[validate(custom = "validate_postal_code")]
    pub postal_code: String,
    #[validate(custom = "validate_province")]
    pub province: String,
    /// Defaults to `IT`
    #[validate(custom = "validate_country")]
    pub country: Option<String>,
}

impl ShippingAddressInput {
    fn normalized(self) -> Self {
        let country = super::normalize_optional(self.country)
            .map(|country| country.to_uppercase())
            .unwrap_or_else(|| DEFAULT_COUNTRY.to_string());
        Self {
            customer_division_uuid: self.customer_division_uuid,
            street: self.street.trim().to_string(),
            city: self.city.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            province: self.province.trim().to_uppercase(),
            country: Some(country),
        }
    }

    fn country(&self) -> String {
        self.country
            .clone()
            .unwrap_or_else(|| DEFAULT_COUNTRY.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ShippingAddressView {
    pub uuid: Uuid,
    pub customer_division_uuid: Uuid,
    pub division_name: Option<String>,
    pub customer_uuid: Option<Uuid>,
    pub customer_name: Option<String>,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub province: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShippingAddressForm {
    pub address: Option<ShippingAddressView>,
    pub customers: Vec<FormOption>,
    /// Divisions of the edited address' customer; loaded on demand otherwise.
    pub divisions: Vec<DivisionView>,
}

/// Division and customer labels keyed by division uuid.
type DivisionLabels = HashMap<Uuid, (customer_division::Model, Option<customer::Model>)>;

#[derive(Clone)]
pub struct ShippingAddressService {
    db: Arc<DatabaseConnection>,
}

impl ShippingAddressService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, query: &ListQuery) -> Result<Page<ShippingAddressView>, ServiceError> {
        let page = Listing::new(customer_shipping_address::Entity::find())
            .search(
                query.search_term(),
                &[
                    customer_shipping_address::Column::Street,
                    customer_shipping_address::Column::City,
                    customer_shipping_address::Column::PostalCode,
                ],
            )
            .sort(query, &SORTABLE, customer_shipping_address::Column::City)?
            .fetch(&*self.db, query)
            .await?;

        let ids: Vec<Uuid> = page.items.iter().map(|a| a.customer_division_uuid).collect();
        let labels = self.division_labels(&ids).await?;
        Ok(page.map(|model| view(model, &labels)))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<ShippingAddressView, ServiceError> {
        let model = self.find(id).await?;
        let labels = self.division_labels(&[model.customer_division_uuid]).await?;
        Ok(view(model, &labels))
    }

    pub async fn form(&self, id: Option<Uuid>) -> Result<ShippingAddressForm, ServiceError> {
        let address = match id {
            Some(id) => Some(self.get(id).await?),
            None => None,
        };

        let customers = customer::Entity::find()
            .order_by_asc(customer::Column::CompanyName)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|customer| FormOption::new(customer.uuid, customer.company_name))
            .collect();

        let divisions = match address.as_ref().and_then(|a| a.customer_uuid) {
            Some(customer_uuid) => customer_division::Entity::find()
                .filter(customer_division::Column::CustomerUuid.eq(customer_uuid))
                .order_by_asc(customer_division::Column::Name)
                .all(&*self.db)
                .await?
                .into_iter()
                .map(DivisionView::from)
                .collect(),
            None => Vec::new(),
        };

        Ok(ShippingAddressForm {
            address,
            customers,
            divisions,
        })
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: ShippingAddressInput) -> Result<ShippingAddressView, ServiceError> {
        let input = input.normalized();
        self.check(&input).await?;

        let model = customer_shipping_address::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            customer_division_uuid: Set(input.customer_division_uuid),
            country: Set(input.country()),
            street: Set(input.street),
            city: Set(input.city),
            postal_code: Set(input.postal_code),
            province: Set(input.province),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(address_id = %model.uuid, "shipping address created");
        self.get(model.uuid).await
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: Uuid,
        input: ShippingAddressInput,
    ) -> Result<ShippingAddressView, ServiceError> {
        let existing = self.find(id).await?;
        let input = input.normalized();
        self.check(&input).await?;

        let mut active: customer_shipping_address::ActiveModel = existing.into();
        active.customer_division_uuid = Set(input.customer_division_uuid);
        active.country = Set(input.country());
        active.street = Set(input.street);
        active.city = Set(input.city);
        active.postal_code = Set(input.postal_code);
        active.province = Set(input.province);
        active.update(&*self.db).await?;

        info!(address_id = %id, "shipping address updated");
        self.get(id).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.find(id).await?;
        customer_shipping_address::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await?;
        info!(address_id = %id, "shipping address deleted");
        Ok(())
    }

    async fn check(&self, input: &ShippingAddressInput) -> Result<(), ServiceError> {
        let mut fields = match input.validate() {
            Ok(()) => FieldErrors::new(),
            Err(errors) => FieldErrors::from(&errors),
        };
        let division = customer_division::Entity::find_by_id(input.customer_division_uuid)
            .one(&*self.db)
            .await?;
        if division.is_none() {
            fields.insert("customer_division_uuid", "Division not found");
        }
        if fields.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::InvalidFields(fields))
        }
    }

    async fn find(&self, id: Uuid) -> Result<customer_shipping_address::Model, ServiceError> {
        customer_shipping_address::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Shipping address", id))
    }

    async fn division_labels(&self, ids: &[Uuid]) -> Result<DivisionLabels, ServiceError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = customer_division::Entity::find()
            .filter(customer_division::Column::Uuid.is_in(ids.to_vec()))
            .find_also_related(customer::Entity)
            .all(&*self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(division, customer)| (division.uuid, (division, customer)))
            .collect())
    }
}

fn view(model: customer_shipping_address::Model, labels: &DivisionLabels) -> ShippingAddressView {
    let (division_name, customer_uuid, customer_name) = match labels.get(&model.customer_division_uuid) {
        Some((division, customer)) => (
            Some(division.name.clone()),
            Some(division.customer_uuid),
            customer.as_ref().map(|c| c.company_name.clone()),
        ),
        None => (None, None, None),
    };
    ShippingAddressView {
        uuid: model.uuid,
        customer_division_uuid: model.customer_division_uuid,
        division_name,
        customer_uuid,
        customer_name,
        street: model.street,
        city: model.city,
        postal_code: model.postal_code,
        province: model.province,
        country: model.country,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn input(postal_code: &str, province: &str, country: Option<&str>) -> ShippingAddressInput {
        ShippingAddressInput {
            customer_division_uuid: Uuid::new_v4(),
            street: " Via Roma 1 ".into(),
            city: "Milano".into(),
            postal_code: postal_code.into(),
            province: province.into(),
            country: country.map(str::to_string),
        }
    }

    #[test]
    fn country_defaults_to_italy() {
        let normalized = input("20100", "mi", None).normalized();
        assert_eq!(normalized.country(), "IT");
        assert_eq!(normalized.province, "MI");
        assert_eq!(normalized.street, "Via Roma 1");
        assert!(normalized.validate().is_ok());
    }

    #[rstest]
    #[case("2010", "MI", "postal_code", "Postal code must be 5 digits")]
    #[case("20100A", "MI", "postal_code", "Postal code must be 5 digits")]
    #[case("20100", "MIL", "province", "Province must be a 2-letter code")]
    #[case("20100", "1A", "province", "Province must be a 2-letter code")]
    fn malformed_fields_are_reported(
        #[case] postal_code: &str,
        #[case] province: &str,
        #[case] field: &str,
        #[case] message: &str,
    ) {
        let normalized = input(postal_code, province, Some("it")).normalized();
        let errors = normalized.validate().unwrap_err();
        let fields = FieldErrors::from(&errors);
        assert_eq!(fields.get(field), Some(message));
    }

    #[test]
    fn country_must_be_two_letters() {
        let normalized = input("20100", "MI", Some("Italy")).normalized();
        let fields = FieldErrors::from(&normalized.validate().unwrap_err());
        assert_eq!(fields.get("country"), Some("Country must be an ISO 3166 alpha-2 code"));
    }
}
