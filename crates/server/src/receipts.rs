use api_types::receipt::{ReceiptNew, ReceiptView};
use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use engine::{Receipt, parse_uuid};

use crate::{ApiResult, AuthUser, ServerState, respond};

fn map_receipt(receipt: Receipt) -> ReceiptView {
    ReceiptView {
        id: receipt.id,
        image_url: receipt.image_url,
        ocr_data: receipt.ocr_data,
        scanned_at: receipt.scanned_at,
        expense_id: receipt.expense_id,
    }
}

pub async fn create(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    payload: Result<Json<ReceiptNew>, JsonRejection>,
) -> ApiResult<ReceiptView> {
    let Json(payload) = payload?;
    let receipt = state
        .engine
        .create_receipt(user.user_id, &payload.image_url, payload.ocr_data.as_deref())
        .await?;
    Ok(respond(
        StatusCode::CREATED,
        "receipt created successfully",
        map_receipt(receipt),
    ))
}

pub async fn get(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<ReceiptView> {
    let receipt_id = parse_uuid(&id, "receipt")?;
    let receipt = state.engine.receipt(user.user_id, receipt_id).await?;
    Ok(respond(
        StatusCode::OK,
        "receipt retrieved successfully",
        map_receipt(receipt),
    ))
}
