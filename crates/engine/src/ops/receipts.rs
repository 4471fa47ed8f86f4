use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{EngineError, Receipt, ResultEngine, receipts, util::normalize_optional_text};

use super::Engine;

impl Engine {
    /// Register a scanned receipt. It stays unattached until an expense
    /// references it.
    pub async fn create_receipt(
        &self,
        user_id: Uuid,
        image_url: &str,
        ocr_data: Option<&str>,
    ) -> ResultEngine<Receipt> {
        let image_url = image_url.trim();
        if image_url.is_empty() {
            return Err(EngineError::InvalidReceipt(
                "image_url is required".to_string(),
            ));
        }

        let now = Utc::now();
        let active = receipts::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            user_id: ActiveValue::Set(user_id),
            image_url: ActiveValue::Set(image_url.to_string()),
            ocr_data: ActiveValue::Set(normalize_optional_text(ocr_data)),
            scanned_at: ActiveValue::Set(now),
            expense_id: ActiveValue::Set(None),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
            deleted_at: ActiveValue::Set(None),
        };
        let model = active.insert(&self.database).await?;

        tracing::info!(receipt_id = %model.id, user_id = %user_id, "receipt registered");
        Ok(Receipt::from(model))
    }

    pub async fn receipt(&self, user_id: Uuid, receipt_id: Uuid) -> ResultEngine<Receipt> {
        receipts::Entity::find_by_id(receipt_id)
            .filter(receipts::Column::UserId.eq(user_id))
            .filter(receipts::Column::DeletedAt.is_null())
            .one(&self.database)
            .await?
            .map(Receipt::from)
            .ok_or_else(|| EngineError::KeyNotFound("receipt".to_string()))
    }
}
