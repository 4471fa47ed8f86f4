use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveValue, ConnectionTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select,
    TransactionTrait, prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    EngineError, Expense, MoneyCents, ResultEngine,
    commands::{NewExpenseCmd, UpdateExpenseCmd},
    expenses::{self, validate_recurrence},
    receipts,
    util::{end_of_day_exclusive, normalize_optional_text, start_of_day},
};

use super::{Engine, require_category, require_not_future, require_positive_amount, with_tx};

/// Largest page size accepted by [`PageRequest`].
pub const MAX_PAGE_SIZE: u64 = 100;
const DEFAULT_PAGE_SIZE: u64 = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExpenseSort {
    #[default]
    Date,
    Amount,
    CreatedAt,
}

impl FromStr for ExpenseSort {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(Self::Date),
            "amount" => Ok(Self::Amount),
            "created_at" => Ok(Self::CreatedAt),
            other => Err(EngineError::InvalidFilter(format!(
                "invalid sort field '{other}' (expected date, amount or created_at)"
            ))),
        }
    }
}

impl ExpenseSort {
    fn column(self) -> expenses::Column {
        match self {
            Self::Date => expenses::Column::Date,
            Self::Amount => expenses::Column::AmountMinor,
            Self::CreatedAt => expenses::Column::CreatedAt,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(EngineError::InvalidFilter(format!(
                "invalid sort order '{other}' (expected asc or desc)"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ExpenseListFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
    pub min_amount: Option<MoneyCents>,
    pub max_amount: Option<MoneyCents>,
    pub sort: ExpenseSort,
    pub order: SortOrder,
}

fn validate_list_filter(filter: &ExpenseListFilter) -> ResultEngine<()> {
    if let (Some(start), Some(end)) = (filter.start_date, filter.end_date)
        && end < start
    {
        return Err(EngineError::InvalidDate(
            "end_date must be later than or equal to start_date".to_string(),
        ));
    }
    if let (Some(min), Some(max)) = (filter.min_amount, filter.max_amount)
        && max < min
    {
        return Err(EngineError::InvalidAmount(
            "max_amount must be greater than or equal to min_amount".to_string(),
        ));
    }
    Ok(())
}

/// One-based page number and page size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    per_page: u64,
}

impl PageRequest {
    pub fn new(page: u64, per_page: u64) -> ResultEngine<Self> {
        if page == 0 {
            return Err(EngineError::InvalidFilter(
                "page must be at least 1".to_string(),
            ));
        }
        if per_page == 0 || per_page > MAX_PAGE_SIZE {
            return Err(EngineError::InvalidFilter(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(Self { page, per_page })
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

/// Filters shared by the expense list and the expense analysis.
pub(super) trait ExpenseQueryExt {
    fn owned_active(self, user_id: Uuid) -> Self;
    fn within_days(self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self;
    fn apply_expense_filters(self, filter: &ExpenseListFilter) -> Self;
}

impl ExpenseQueryExt for Select<expenses::Entity> {
    fn owned_active(self, user_id: Uuid) -> Self {
        self.filter(expenses::Column::UserId.eq(user_id))
            .filter(expenses::Column::DeletedAt.is_null())
    }

    fn within_days(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        if let Some(start) = start {
            self = self.filter(expenses::Column::Date.gte(start_of_day(start)));
        }
        if let Some(end) = end.and_then(end_of_day_exclusive) {
            self = self.filter(expenses::Column::Date.lt(end));
        }
        self
    }

    fn apply_expense_filters(mut self, filter: &ExpenseListFilter) -> Self {
        self = self.within_days(filter.start_date, filter.end_date);
        if let Some(category_id) = filter.category_id {
            self = self.filter(expenses::Column::CategoryId.eq(category_id));
        }
        if let Some(min) = filter.min_amount {
            self = self.filter(expenses::Column::AmountMinor.gte(min.cents()));
        }
        if let Some(max) = filter.max_amount {
            self = self.filter(expenses::Column::AmountMinor.lte(max.cents()));
        }
        self
    }
}

/// Sum, count and maximum of the amounts selected by `query`.
pub(super) async fn sum_count_max<C: ConnectionTrait>(
    db: &C,
    query: Select<expenses::Entity>,
) -> ResultEngine<(MoneyCents, u64, MoneyCents)> {
    let row: Option<(Option<i64>, i64, Option<i64>)> = query
        .select_only()
        .column_as(Expr::col(expenses::Column::AmountMinor).sum(), "total")
        .column_as(Expr::col(expenses::Column::Id).count(), "count")
        .column_as(Expr::col(expenses::Column::AmountMinor).max(), "max")
        .into_tuple()
        .one(db)
        .await?;

    let (total, count, max) = row.unwrap_or((None, 0, None));
    Ok((
        MoneyCents::new(total.unwrap_or(0)),
        u64::try_from(count).unwrap_or(0),
        MoneyCents::new(max.unwrap_or(0)),
    ))
}

async fn owned_expense<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    expense_id: Uuid,
) -> ResultEngine<expenses::Model> {
    expenses::Entity::find_by_id(expense_id)
        .owned_active(user_id)
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("expense".to_string()))
}

/// Link a receipt to `expense_id`.
///
/// The receipt must belong to the user and must not already back another
/// expense.
async fn attach_receipt<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    receipt_id: Uuid,
    expense_id: Uuid,
) -> ResultEngine<()> {
    let receipt = receipts::Entity::find_by_id(receipt_id)
        .filter(receipts::Column::UserId.eq(user_id))
        .filter(receipts::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::InvalidReceipt("invalid receipt".to_string()))?;

    if receipt.expense_id.is_some_and(|id| id != expense_id) {
        return Err(EngineError::InvalidReceipt(
            "receipt is already attached to another expense".to_string(),
        ));
    }

    let active = receipts::ActiveModel {
        id: ActiveValue::Unchanged(receipt.id),
        expense_id: ActiveValue::Set(Some(expense_id)),
        updated_at: ActiveValue::Set(Utc::now()),
        ..Default::default()
    };
    active.update(db).await?;
    Ok(())
}

async fn detach_receipt<C: ConnectionTrait>(db: &C, receipt_id: Uuid) -> ResultEngine<()> {
    let active = receipts::ActiveModel {
        id: ActiveValue::Unchanged(receipt_id),
        expense_id: ActiveValue::Set(None),
        updated_at: ActiveValue::Set(Utc::now()),
        ..Default::default()
    };
    active.update(db).await?;
    Ok(())
}

impl Engine {
    /// Record an expense.
    ///
    /// The category must exist; an attached receipt must belong to the user.
    /// Insert and receipt link are written in one transaction.
    pub async fn create_expense(&self, cmd: NewExpenseCmd) -> ResultEngine<Expense> {
        require_positive_amount(cmd.amount)?;
        require_not_future(cmd.date)?;
        validate_recurrence(cmd.is_recurring, cmd.recurrence_interval)?;
        let description = normalize_optional_text(cmd.description.as_deref());

        with_tx!(self, |db_tx| {
            let id = Uuid::new_v4();
            if let Some(receipt_id) = cmd.receipt_id {
                attach_receipt(&db_tx, cmd.user_id, receipt_id, id).await?;
            }
            require_category(&db_tx, cmd.category_id).await?;

            let now = Utc::now();
            let active = expenses::ActiveModel {
                id: ActiveValue::Set(id),
                user_id: ActiveValue::Set(cmd.user_id),
                category_id: ActiveValue::Set(cmd.category_id),
                amount_minor: ActiveValue::Set(cmd.amount.cents()),
                date: ActiveValue::Set(cmd.date),
                description: ActiveValue::Set(description),
                receipt_id: ActiveValue::Set(cmd.receipt_id),
                is_recurring: ActiveValue::Set(cmd.is_recurring),
                recurrence_interval: ActiveValue::Set(
                    cmd.recurrence_interval.map(|i| i.as_str().to_string()),
                ),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
                deleted_at: ActiveValue::Set(None),
            };
            let model = active.insert(&db_tx).await?;

            tracing::info!(expense_id = %id, user_id = %cmd.user_id, "expense created");
            Expense::try_from(model)
        })
    }

    /// One page of the user's expenses.
    pub async fn list_expenses(
        &self,
        user_id: Uuid,
        filter: &ExpenseListFilter,
        page: PageRequest,
    ) -> ResultEngine<Page<Expense>> {
        validate_list_filter(filter)?;

        let column = filter.sort.column();
        let query = expenses::Entity::find()
            .owned_active(user_id)
            .apply_expense_filters(filter);
        let query = match filter.order {
            SortOrder::Asc => query
                .order_by_asc(column)
                .order_by_asc(expenses::Column::Id),
            SortOrder::Desc => query
                .order_by_desc(column)
                .order_by_desc(expenses::Column::Id),
        };

        let paginator = query.paginate(&self.database, page.per_page());
        let totals = paginator.num_items_and_pages().await?;
        let models = paginator.fetch_page(page.page() - 1).await?;
        let items = models
            .into_iter()
            .map(Expense::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        Ok(Page {
            items,
            total_count: totals.number_of_items,
            page: page.page(),
            per_page: page.per_page(),
            total_pages: totals.number_of_pages,
        })
    }

    pub async fn expense(&self, user_id: Uuid, expense_id: Uuid) -> ResultEngine<Expense> {
        let model = owned_expense(&self.database, user_id, expense_id).await?;
        Expense::try_from(model)
    }

    /// Apply a partial update; recurrence is re-checked on the merged record.
    pub async fn update_expense(&self, cmd: UpdateExpenseCmd) -> ResultEngine<Expense> {
        if cmd.is_empty() {
            return Err(EngineError::NothingToUpdate);
        }
        if let Some(amount) = cmd.amount {
            require_positive_amount(amount)?;
        }
        if let Some(date) = cmd.date {
            require_not_future(date)?;
        }

        with_tx!(self, |db_tx| {
            let model = owned_expense(&db_tx, cmd.user_id, cmd.expense_id).await?;
            let mut expense = Expense::try_from(model)?;

            let is_recurring = cmd.is_recurring.unwrap_or(expense.is_recurring);
            let interval = if is_recurring {
                cmd.recurrence_interval.or(expense.recurrence_interval)
            } else {
                cmd.recurrence_interval
            };
            validate_recurrence(is_recurring, interval)?;
            expense.is_recurring = is_recurring;
            expense.recurrence_interval = interval;

            if let Some(receipt_id) = cmd.receipt_id
                && expense.receipt_id != Some(receipt_id)
            {
                attach_receipt(&db_tx, cmd.user_id, receipt_id, expense.id).await?;
                if let Some(previous) = expense.receipt_id {
                    detach_receipt(&db_tx, previous).await?;
                }
                expense.receipt_id = Some(receipt_id);
            }
            if let Some(category_id) = cmd.category_id {
                require_category(&db_tx, category_id).await?;
                expense.category_id = category_id;
            }
            if let Some(amount) = cmd.amount {
                expense.amount = amount;
            }
            if let Some(date) = cmd.date {
                expense.date = date;
            }
            if let Some(description) = cmd.description.as_deref() {
                expense.description = normalize_optional_text(Some(description));
            }
            expense.updated_at = Utc::now();

            let active = expenses::ActiveModel {
                id: ActiveValue::Unchanged(expense.id),
                category_id: ActiveValue::Set(expense.category_id),
                amount_minor: ActiveValue::Set(expense.amount.cents()),
                date: ActiveValue::Set(expense.date),
                description: ActiveValue::Set(expense.description.clone()),
                receipt_id: ActiveValue::Set(expense.receipt_id),
                is_recurring: ActiveValue::Set(expense.is_recurring),
                recurrence_interval: ActiveValue::Set(
                    expense.recurrence_interval.map(|i| i.as_str().to_string()),
                ),
                updated_at: ActiveValue::Set(expense.updated_at),
                ..Default::default()
            };
            active.update(&db_tx).await?;

            tracing::info!(expense_id = %expense.id, "expense updated");
            Ok(expense)
        })
    }

    /// Soft delete an expense together with its receipt.
    pub async fn delete_expense(&self, user_id: Uuid, expense_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = owned_expense(&db_tx, user_id, expense_id).await?;
            let now = Utc::now();

            if let Some(receipt_id) = model.receipt_id {
                let receipt = receipts::ActiveModel {
                    id: ActiveValue::Unchanged(receipt_id),
                    deleted_at: ActiveValue::Set(Some(now)),
                    updated_at: ActiveValue::Set(now),
                    ..Default::default()
                };
                receipt.update(&db_tx).await?;
            }

            let expense = expenses::ActiveModel {
                id: ActiveValue::Unchanged(model.id),
                deleted_at: ActiveValue::Set(Some(now)),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            };
            expense.update(&db_tx).await?;

            tracing::info!(
                expense_id = %expense_id,
                receipt_id = ?model.receipt_id,
                "expense deleted"
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_bounds() {
        assert!(PageRequest::new(0, 10).is_err());
        assert!(PageRequest::new(1, 0).is_err());
        assert!(PageRequest::new(1, 101).is_err());
        let page = PageRequest::new(3, 100).unwrap();
        assert_eq!((page.page(), page.per_page()), (3, 100));
        assert_eq!(PageRequest::default().per_page(), 10);
    }

    #[test]
    fn sort_fields_are_whitelisted() {
        assert_eq!("amount".parse::<ExpenseSort>().unwrap(), ExpenseSort::Amount);
        assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert!("amount; DROP TABLE expenses".parse::<ExpenseSort>().is_err());
        assert!("sideways".parse::<SortOrder>().is_err());
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        let filter = ExpenseListFilter {
            start_date: NaiveDate::from_ymd_opt(2024, 2, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..Default::default()
        };
        assert!(matches!(
            validate_list_filter(&filter),
            Err(EngineError::InvalidDate(_))
        ));

        let filter = ExpenseListFilter {
            min_amount: Some(MoneyCents::new(500)),
            max_amount: Some(MoneyCents::new(100)),
            ..Default::default()
        };
        assert!(matches!(
            validate_list_filter(&filter),
            Err(EngineError::InvalidAmount(_))
        ));
    }
}
