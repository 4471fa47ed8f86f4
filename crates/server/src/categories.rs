//! Categories API endpoints.

use api_types::{
    analysis::BudgetUsageView,
    category::{CategoryNew, CategorySummary, CategoryUpdate, CategoryView},
    envelope::ApiResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use engine::{Category, NewCategoryCmd, UpdateCategoryCmd, parse_uuid};

use crate::{ApiResult, AuthUser, ServerError, ServerState, budgets::map_usage, respond};

fn map_category(category: Category) -> CategoryView {
    CategoryView {
        id: category.id,
        user_id: category.user_id,
        name: category.name,
        description: category.description,
        color_code: category.color_code,
        is_default: category.is_default,
        created_at: category.created_at,
        updated_at: category.updated_at,
    }
}

pub async fn list(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> ApiResult<Vec<CategoryView>> {
    let categories = state
        .engine
        .list_categories(user.user_id)
        .await?
        .into_iter()
        .map(map_category)
        .collect();
    Ok(respond(
        StatusCode::OK,
        "categories retrieved successfully",
        categories,
    ))
}

pub async fn defaults(State(state): State<ServerState>) -> ApiResult<Vec<CategoryView>> {
    let categories = state
        .engine
        .default_categories()
        .await?
        .into_iter()
        .map(map_category)
        .collect();
    Ok(respond(
        StatusCode::OK,
        "default categories retrieved successfully",
        categories,
    ))
}

pub async fn get(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<CategoryView> {
    let category_id = parse_uuid(&id, "category")?;
    let category = state.engine.category(user.user_id, category_id).await?;
    Ok(respond(
        StatusCode::OK,
        "category retrieved successfully",
        map_category(category),
    ))
}

pub async fn create(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    payload: Result<Json<CategoryNew>, JsonRejection>,
) -> ApiResult<CategoryView> {
    let Json(payload) = payload?;
    let mut cmd = NewCategoryCmd::new(user.user_id, payload.name);
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    if let Some(color_code) = payload.color_code {
        cmd = cmd.color_code(color_code);
    }

    let category = state.engine.create_category(cmd).await?;
    Ok(respond(
        StatusCode::CREATED,
        "category created successfully",
        map_category(category),
    ))
}

pub async fn update(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    payload: Result<Json<CategoryUpdate>, JsonRejection>,
) -> ApiResult<CategoryView> {
    let Json(payload) = payload?;
    let mut cmd = UpdateCategoryCmd::new(user.user_id, parse_uuid(&id, "category")?);
    if let Some(name) = payload.name {
        cmd = cmd.name(name);
    }
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    if let Some(color_code) = payload.color_code {
        cmd = cmd.color_code(color_code);
    }

    let category = state.engine.update_category(cmd).await?;
    Ok(respond(
        StatusCode::OK,
        "category updated successfully",
        map_category(category),
    ))
}

pub async fn delete(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ServerError> {
    let category_id = parse_uuid(&id, "category")?;
    state
        .engine
        .delete_category(user.user_id, category_id)
        .await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::empty(200, "category deleted successfully")),
    ))
}

pub async fn summary(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<CategorySummary> {
    let category_id = parse_uuid(&id, "category")?;
    let summary = state
        .engine
        .category_summary(user.user_id, category_id)
        .await?;
    Ok(respond(
        StatusCode::OK,
        "category summary retrieved successfully",
        CategorySummary {
            category_id: summary.category_id,
            expense_count: summary.expense_count,
            total_spent: summary.total_spent.to_major(),
            average_expense: summary.average.to_major(),
            latest_expense_date: summary.latest_expense_date,
        },
    ))
}

pub async fn budget_status(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<BudgetUsageView> {
    let category_id = parse_uuid(&id, "category")?;
    match state
        .engine
        .category_budget_status(user.user_id, category_id)
        .await?
    {
        Some(usage) => Ok(respond(
            StatusCode::OK,
            "budget status retrieved successfully",
            map_usage(usage),
        )),
        None => Ok((
            StatusCode::OK,
            Json(ApiResponse::empty(200, "no active budget for this category")),
        )),
    }
}
