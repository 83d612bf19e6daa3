use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Operational condition an alert reports on. Unique within one dashboard view.
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
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertKind {
    /// Open orders past their delivery date.
    Overdue,
    /// Orders put on hold.
    Suspended,
    /// Orders in production without a completed self-check.
    Autocontrollo,
}

impl AlertKind {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    pub fn title(self) -> &'static str {
        match self {
            AlertKind::Overdue => "Overdue orders",
            AlertKind::Suspended => "Suspended orders",
            AlertKind::Autocontrollo => "Missing self-check",
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    /// Display rank: critical sorts first.
    pub fn rank(self) -> u8 {
        match self {
            AlertSeverity::Critical => 0,
            AlertSeverity::High => 1,
            AlertSeverity::Medium => 2,
            AlertSeverity::Low => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Server-computed notice shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub count: u64,
    /// Production numbers of the affected orders, shown when the alert is expanded.
    #[serde(default)]
    pub orders: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_hash: Option<String>,
}

impl Alert {
    /// The acknowledgement this alert would send, if it can be persisted at all.
    pub fn acknowledgement(&self) -> Option<AcknowledgeAlertRequest> {
        match (&self.signature, &self.scope_hash) {
            (Some(signature), Some(scope_hash)) if !signature.is_empty() && !scope_hash.is_empty() => {
                Some(AcknowledgeAlertRequest {
                    alert_key: self.kind,
                    signature: signature.clone(),
                    scope_hash: scope_hash.clone(),
                })
            }
            _ => None,
        }
    }
}

/// Body of the alert-acknowledge endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Validate, ToSchema)]
pub struct AcknowledgeAlertRequest {
    pub alert_key: AlertKind,
    #[validate(length(min = 1, max = 128, message = "Signature must be between 1 and 128 characters"))]
    pub signature: String,
    #[validate(length(min = 1, max = 128, message = "Scope hash must be between 1 and 128 characters"))]
    pub scope_hash: String,
}
