//! Budget API endpoints.

use api_types::{
    analysis::{BudgetAnalysisQuery, BudgetUsageView},
    budget::{BudgetListQuery, BudgetNew, BudgetUpdate, BudgetView},
    envelope::ApiResponse,
};
use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use engine::{
    Budget, BudgetAnalysis, BudgetAnalysisFilter, BudgetListFilter, BudgetPeriod, BudgetStatus,
    BudgetUsage, MoneyCents, NewBudgetCmd, UpdateBudgetCmd, parse_day, parse_uuid,
};

use crate::{ApiResult, AuthUser, ServerError, ServerState, respond};

fn map_budget(budget: Budget) -> BudgetView {
    BudgetView {
        id: budget.id,
        category_id: budget.category_id,
        amount: budget.amount.to_major(),
        start_date: budget.start_date,
        end_date: budget.end_date,
        created_at: budget.created_at,
        updated_at: budget.updated_at,
        deleted_at: budget.deleted_at,
    }
}

pub(crate) fn map_usage(usage: BudgetUsage) -> BudgetUsageView {
    BudgetUsageView {
        budget_id: usage.budget_id,
        category_id: usage.category_id,
        category_name: usage.category_name,
        budget_amount: usage.amount.to_major(),
        spent_amount: usage.spent.to_major(),
        remaining_amount: usage.remaining.to_major(),
        percentage_used: usage.percentage,
        exceeds_budget: usage.exceeds,
        start_date: usage.start_date,
        end_date: usage.end_date,
    }
}

pub async fn create(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    payload: Result<Json<BudgetNew>, JsonRejection>,
) -> ApiResult<BudgetView> {
    let Json(payload) = payload?;
    let cmd = NewBudgetCmd::new(
        user.user_id,
        parse_uuid(&payload.category_id, "category")?,
        MoneyCents::from_major(payload.amount)?,
        parse_day(&payload.start_date, "start_date")?,
        parse_day(&payload.end_date, "end_date")?,
    );

    let budget = state.engine.create_budget(cmd).await?;
    Ok(respond(
        StatusCode::CREATED,
        "budget created successfully",
        map_budget(budget),
    ))
}

pub async fn list(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    query: Result<Query<BudgetListQuery>, QueryRejection>,
) -> ApiResult<Vec<BudgetView>> {
    let Query(query) = query?;
    let filter = BudgetListFilter {
        category_id: query
            .category_id
            .as_deref()
            .map(|id| parse_uuid(id, "category"))
            .transpose()?,
        start_date: query
            .start_date
            .as_deref()
            .map(|day| parse_day(day, "start_date"))
            .transpose()?,
        end_date: query
            .end_date
            .as_deref()
            .map(|day| parse_day(day, "end_date"))
            .transpose()?,
        period: query
            .period
            .as_deref()
            .map(str::parse::<BudgetPeriod>)
            .transpose()?,
        status: query
            .status
            .as_deref()
            .map(str::parse::<BudgetStatus>)
            .transpose()?
            .unwrap_or_default(),
        as_of: None,
    };

    let budgets = state
        .engine
        .list_budgets(user.user_id, &filter)
        .await?
        .into_iter()
        .map(map_budget)
        .collect();
    Ok(respond(
        StatusCode::OK,
        "budgets retrieved successfully",
        budgets,
    ))
}

pub async fn get(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<BudgetView> {
    let budget_id = parse_uuid(&id, "budget")?;
    let budget = state.engine.budget(user.user_id, budget_id).await?;
    Ok(respond(
        StatusCode::OK,
        "budget retrieved successfully",
        map_budget(budget),
    ))
}

pub async fn update(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    payload: Result<Json<BudgetUpdate>, JsonRejection>,
) -> ApiResult<BudgetView> {
    let Json(payload) = payload?;
    let mut cmd = UpdateBudgetCmd::new(user.user_id, parse_uuid(&id, "budget")?);
    if let Some(category_id) = payload.category_id.as_deref() {
        cmd = cmd.category_id(parse_uuid(category_id, "category")?);
    }
    if let Some(amount) = payload.amount {
        cmd = cmd.amount(MoneyCents::from_major(amount)?);
    }
    if let Some(start) = payload.start_date.as_deref() {
        cmd = cmd.start_date(parse_day(start, "start_date")?);
    }
    if let Some(end) = payload.end_date.as_deref() {
        cmd = cmd.end_date(parse_day(end, "end_date")?);
    }

    let budget = state.engine.update_budget(cmd).await?;
    Ok(respond(
        StatusCode::OK,
        "budget updated successfully",
        map_budget(budget),
    ))
}

pub async fn delete(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ServerError> {
    let budget_id = parse_uuid(&id, "budget")?;
    state.engine.delete_budget(user.user_id, budget_id).await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::empty(200, "budget deleted successfully")),
    ))
}

pub async fn analysis(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    query: Result<Query<BudgetAnalysisQuery>, QueryRejection>,
) -> ApiResult<Vec<BudgetUsageView>> {
    let Query(query) = query?;
    let filter = BudgetAnalysisFilter {
        category_id: query
            .category_id
            .as_deref()
            .map(|id| parse_uuid(id, "category"))
            .transpose()?,
        start_date: query
            .start_date
            .as_deref()
            .map(|day| parse_day(day, "start_date"))
            .transpose()?,
        end_date: query
            .end_date
            .as_deref()
            .map(|day| parse_day(day, "end_date"))
            .transpose()?,
    };

    match state.engine.analyze_budgets(user.user_id, &filter).await? {
        BudgetAnalysis::NoBudgets => Ok(respond(
            StatusCode::OK,
            "no budgets found for the given criteria",
            Vec::new(),
        )),
        BudgetAnalysis::Report(rows) => Ok(respond(
            StatusCode::OK,
            "budget analysis retrieved successfully",
            rows.into_iter().map(map_usage).collect(),
        )),
    }
}
