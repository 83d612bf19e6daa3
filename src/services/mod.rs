pub mod alerts;
pub mod contracts;
pub mod customers;
pub mod dashboard;
pub mod employees;
pub mod listing;
pub mod processings;
pub mod shipping_addresses;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use listing::{ListQuery, Listing, Page, SortOrder};

/// A value/label pair for select inputs on create and edit forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FormOption {
    pub value: String,
    pub label: String,
}

impl FormOption {
    pub fn new(value: impl ToString, label: impl Into<String>) -> Self {
        Self {
            value: value.to_string(),
            label: label.into(),
        }
    }
}

/// Trims text input; blank becomes `None`.
pub(crate) fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_optional_text_becomes_none() {
        assert_eq!(normalize_optional(Some("  ".into())), None);
        assert_eq!(normalize_optional(Some(" a ".into())), Some("a".into()));
        assert_eq!(normalize_optional(None), None);
    }
}
