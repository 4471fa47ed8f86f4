//! Expense API endpoints.

use api_types::{
    analysis::{
        CategoryShareView, ExpenseAnalysisQuery, ExpenseAnalysisView, FrequentCategoryView,
        PeriodTotalView, TimelineView, TotalsView,
    },
    envelope::{ApiResponse, PaginationMeta},
    expense::{ExpenseListQuery, ExpenseNew, ExpenseUpdate, ExpenseView},
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
    AnalysisPeriod, Expense, ExpenseAnalysis, ExpenseAnalysisFilter, ExpenseListFilter,
    ExpenseSort, MoneyCents, NewExpenseCmd, PageRequest, RecurrenceInterval, SortOrder,
    UpdateExpenseCmd, parse_day, parse_timestamp, parse_uuid,
};

use crate::{ApiResult, AuthUser, ServerError, ServerState, respond};

fn map_expense(expense: Expense) -> ExpenseView {
    ExpenseView {
        id: expense.id,
        category_id: expense.category_id,
        amount: expense.amount.to_major(),
        date: expense.date,
        description: expense.description,
        receipt_id: expense.receipt_id,
        is_recurring: expense.is_recurring,
        recurrence_interval: expense
            .recurrence_interval
            .map(|interval| interval.as_str().to_string()),
        created_at: expense.created_at,
        updated_at: expense.updated_at,
    }
}

fn map_analysis(analysis: ExpenseAnalysis) -> ExpenseAnalysisView {
    ExpenseAnalysisView {
        period: analysis.period.as_str().to_string(),
        totals: analysis.totals.map(|totals| TotalsView {
            total_amount: totals.total.to_major(),
            expense_count: totals.count,
            average_amount: totals.average.to_major(),
            max_amount: totals.max.to_major(),
        }),
        timeline: analysis.timeline.map(|timeline| TimelineView {
            distinct_days: timeline.distinct_days,
            daily_average: timeline.daily_average.to_major(),
            periods: timeline
                .buckets
                .into_iter()
                .map(|bucket| PeriodTotalView {
                    period: bucket.period,
                    total_amount: bucket.total.to_major(),
                    expense_count: bucket.count,
                })
                .collect(),
        }),
        categories: analysis.categories.map(|shares| {
            shares
                .into_iter()
                .map(|share| CategoryShareView {
                    category_id: share.category_id,
                    category_name: share.category_name,
                    total_amount: share.total.to_major(),
                    expense_count: share.count,
                    percentage: share.percentage,
                })
                .collect()
        }),
        most_frequent_category: analysis.most_frequent.map(|frequent| FrequentCategoryView {
            category_id: frequent.category_id,
            category_name: frequent.category_name,
            expense_count: frequent.count,
            total_amount: frequent.total.to_major(),
        }),
        unavailable: analysis.unavailable,
    }
}

fn parse_interval(value: Option<&str>) -> Result<Option<RecurrenceInterval>, ServerError> {
    Ok(value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::parse::<RecurrenceInterval>)
        .transpose()?)
}

pub async fn create(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    payload: Result<Json<ExpenseNew>, JsonRejection>,
) -> ApiResult<ExpenseView> {
    let Json(payload) = payload?;
    let mut cmd = NewExpenseCmd::new(
        user.user_id,
        parse_uuid(&payload.category_id, "category")?,
        MoneyCents::from_major(payload.amount)?,
        parse_timestamp(&payload.date, "date")?,
    );
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    if let Some(receipt_id) = payload.receipt_id.as_deref() {
        cmd = cmd.receipt_id(parse_uuid(receipt_id, "receipt")?);
    }
    cmd.is_recurring = payload.is_recurring;
    cmd.recurrence_interval = parse_interval(payload.recurrence_interval.as_deref())?;

    let expense = state.engine.create_expense(cmd).await?;
    Ok(respond(
        StatusCode::CREATED,
        "expense created successfully",
        map_expense(expense),
    ))
}

pub async fn list(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    query: Result<Query<ExpenseListQuery>, QueryRejection>,
) -> ApiResult<Vec<ExpenseView>> {
    let Query(query) = query?;
    let filter = ExpenseListFilter {
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
        category_id: query
            .category_id
            .as_deref()
            .map(|id| parse_uuid(id, "category"))
            .transpose()?,
        min_amount: query.min_amount.map(MoneyCents::from_major).transpose()?,
        max_amount: query.max_amount.map(MoneyCents::from_major).transpose()?,
        sort: query
            .sort
            .as_deref()
            .map(str::parse::<ExpenseSort>)
            .transpose()?
            .unwrap_or_default(),
        order: query
            .order
            .as_deref()
            .map(str::parse::<SortOrder>)
            .transpose()?
            .unwrap_or_default(),
    };
    let default_page = PageRequest::default();
    let page = PageRequest::new(
        query.page.unwrap_or(default_page.page()),
        query.limit.unwrap_or(default_page.per_page()),
    )?;

    let page = state
        .engine
        .list_expenses(user.user_id, &filter, page)
        .await?;
    let meta = PaginationMeta {
        total_count: page.total_count,
        page: page.page,
        per_page: page.per_page,
        total_pages: page.total_pages,
    };
    let items: Vec<ExpenseView> = page.items.into_iter().map(map_expense).collect();
    let (status, Json(body)) = respond(StatusCode::OK, "expenses retrieved successfully", items);
    Ok((status, Json(body.with_meta(meta))))
}

pub async fn get(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<ExpenseView> {
    let expense_id = parse_uuid(&id, "expense")?;
    let expense = state.engine.expense(user.user_id, expense_id).await?;
    Ok(respond(
        StatusCode::OK,
        "expense retrieved successfully",
        map_expense(expense),
    ))
}

pub async fn update(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    payload: Result<Json<ExpenseUpdate>, JsonRejection>,
) -> ApiResult<ExpenseView> {
    let Json(payload) = payload?;
    let mut cmd = UpdateExpenseCmd::new(user.user_id, parse_uuid(&id, "expense")?);
    if let Some(category_id) = payload.category_id.as_deref() {
        cmd = cmd.category_id(parse_uuid(category_id, "category")?);
    }
    if let Some(amount) = payload.amount {
        cmd = cmd.amount(MoneyCents::from_major(amount)?);
    }
    if let Some(date) = payload.date.as_deref() {
        cmd = cmd.date(parse_timestamp(date, "date")?);
    }
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    if let Some(receipt_id) = payload.receipt_id.as_deref() {
        cmd = cmd.receipt_id(parse_uuid(receipt_id, "receipt")?);
    }
    cmd.is_recurring = payload.is_recurring;
    cmd.recurrence_interval = parse_interval(payload.recurrence_interval.as_deref())?;

    let expense = state.engine.update_expense(cmd).await?;
    Ok(respond(
        StatusCode::OK,
        "expense updated successfully",
        map_expense(expense),
    ))
}

pub async fn delete(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ServerError> {
    let expense_id = parse_uuid(&id, "expense")?;
    state.engine.delete_expense(user.user_id, expense_id).await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::empty(200, "expense deleted successfully")),
    ))
}

pub async fn analysis(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    query: Result<Query<ExpenseAnalysisQuery>, QueryRejection>,
) -> ApiResult<ExpenseAnalysisView> {
    let Query(query) = query?;
    let filter = ExpenseAnalysisFilter {
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
        category_id: query
            .category_id
            .as_deref()
            .map(|id| parse_uuid(id, "category"))
            .transpose()?,
        period: query
            .period
            .as_deref()
            .map(str::parse::<AnalysisPeriod>)
            .transpose()?
            .unwrap_or_default(),
    };

    let analysis = state.engine.analyze_expenses(user.user_id, &filter).await?;
    Ok(respond(
        StatusCode::OK,
        "expense analysis retrieved successfully",
        map_analysis(analysis),
    ))
}
