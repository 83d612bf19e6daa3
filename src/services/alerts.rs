use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::alert_acknowledgement;
use crate::errors::ServiceError;
use crate::models::{AcknowledgeAlertRequest, AlertKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AcknowledgementView {
    pub alert_key: AlertKind,
    pub signature: String,
    pub scope_hash: String,
    pub acknowledged_at: DateTime<Utc>,
    /// False when the same acknowledgement already existed.
    pub created: bool,
}

#[derive(Clone)]
pub struct AlertService {
    db: Arc<DatabaseConnection>,
}

impl AlertService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Stores the acknowledgement once. Repeating it returns the stored record.
    #[instrument(skip(self, request), fields(alert_key = %request.alert_key))]
    pub async fn acknowledge(
        &self,
        request: AcknowledgeAlertRequest,
    ) -> Result<AcknowledgementView, ServiceError> {
        request.validate()?;

        if let Some(existing) = self.find(&request).await? {
            debug!("alert already acknowledged");
            return Ok(view(existing, request.alert_key, false));
        }

        let inserted = alert_acknowledgement::ActiveModel {
            id: Set(Uuid::new_v4()),
            alert_key: Set(request.alert_key.as_str().to_string()),
            signature: Set(request.signature.clone()),
            scope_hash: Set(request.scope_hash.clone()),
            acknowledged_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await;

        match inserted {
            Ok(model) => {
                counter!("packops_alert_acknowledgements_total", 1, "alert" => request.alert_key.as_str());
                info!(signature = %model.signature, "alert acknowledged");
                Ok(view(model, request.alert_key, true))
            }
            // Lost a race against an identical request.
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                let existing = self.find(&request).await?.ok_or_else(|| {
                    ServiceError::InternalError("acknowledgement vanished after conflict".into())
                })?;
                Ok(view(existing, request.alert_key, false))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// `(kind, signature)` pairs acknowledged within `scope_hash`.
    pub async fn acknowledged_in_scope(
        &self,
        scope_hash: &str,
    ) -> Result<HashSet<(String, String)>, ServiceError> {
        let rows = alert_acknowledgement::Entity::find()
            .filter(alert_acknowledgement::Column::ScopeHash.eq(scope_hash))
            .all(&*self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.alert_key, row.signature))
            .collect())
    }

    async fn find(
        &self,
        request: &AcknowledgeAlertRequest,
    ) -> Result<Option<alert_acknowledgement::Model>, ServiceError> {
        let found = alert_acknowledgement::Entity::find()
            .filter(alert_acknowledgement::Column::AlertKey.eq(request.alert_key.as_str()))
            .filter(alert_acknowledgement::Column::Signature.eq(request.signature.as_str()))
            .filter(alert_acknowledgement::Column::ScopeHash.eq(request.scope_hash.as_str()))
            .one(&*self.db)
            .await?;
        Ok(found)
    }
}

fn view(model: alert_acknowledgement::Model, kind: AlertKind, created: bool) -> AcknowledgementView {
    AcknowledgementView {
        alert_key: kind,
        signature: model.signature,
        scope_hash: model.scope_hash,
        acknowledged_at: model.acknowledged_at,
        created,
    }
}
