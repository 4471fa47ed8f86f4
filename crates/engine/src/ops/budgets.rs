use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, Select, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    Budget, BudgetPeriod, BudgetStatus, EngineError, ResultEngine, budgets,
    commands::{NewBudgetCmd, UpdateBudgetCmd},
    util::ensure_date_order,
};

use super::{Engine, require_category, require_positive_amount, with_tx};

/// Filters for [`Engine::list_budgets`].
///
/// `start_date` keeps budgets starting on or after the day, `end_date` keeps
/// budgets ending on or before it.
#[derive(Clone, Debug, Default)]
pub struct BudgetListFilter {
    pub category_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub period: Option<BudgetPeriod>,
    pub status: BudgetStatus,
    /// Reference day for `period`; defaults to today (UTC).
    pub as_of: Option<NaiveDate>,
}

trait BudgetQueryExt {
    fn apply_budget_filters(self, filter: &BudgetListFilter) -> Self;
}

impl BudgetQueryExt for Select<budgets::Entity> {
    fn apply_budget_filters(mut self, filter: &BudgetListFilter) -> Self {
        self = match filter.status {
            BudgetStatus::Active => self.filter(budgets::Column::DeletedAt.is_null()),
            BudgetStatus::Deleted => self.filter(budgets::Column::DeletedAt.is_not_null()),
            BudgetStatus::All => self,
        };
        if let Some(category_id) = filter.category_id {
            self = self.filter(budgets::Column::CategoryId.eq(category_id));
        }
        if let Some(start) = filter.start_date {
            self = self.filter(budgets::Column::StartDate.gte(start));
        }
        if let Some(end) = filter.end_date {
            self = self.filter(budgets::Column::EndDate.lte(end));
        }
        if let Some(period) = filter.period {
            let today = filter.as_of.unwrap_or_else(|| Utc::now().date_naive());
            self = match period {
                BudgetPeriod::Current => self
                    .filter(budgets::Column::StartDate.lte(today))
                    .filter(budgets::Column::EndDate.gte(today)),
                BudgetPeriod::Upcoming => self.filter(budgets::Column::StartDate.gt(today)),
                BudgetPeriod::Past => self.filter(budgets::Column::EndDate.lt(today)),
            };
        }
        self
    }
}

/// Fails with [`EngineError::BudgetOverlap`] if any other non-deleted budget of
/// the same user and category shares a day with `[start, end]`.
async fn ensure_no_overlap<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    category_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
    exclude: Option<Uuid>,
) -> ResultEngine<()> {
    // NOT (existing.end < start OR existing.start > end)
    let mut query = budgets::Entity::find()
        .filter(budgets::Column::UserId.eq(user_id))
        .filter(budgets::Column::CategoryId.eq(category_id))
        .filter(budgets::Column::DeletedAt.is_null())
        .filter(budgets::Column::EndDate.gte(start))
        .filter(budgets::Column::StartDate.lte(end));
    if let Some(id) = exclude {
        query = query.filter(budgets::Column::Id.ne(id));
    }

    if let Some(existing) = query.one(db).await? {
        return Err(EngineError::BudgetOverlap(format!(
            "budget period overlaps with an existing budget ({} to {})",
            existing.start_date, existing.end_date
        )));
    }
    Ok(())
}

async fn owned_budget<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    budget_id: Uuid,
) -> ResultEngine<budgets::Model> {
    budgets::Entity::find_by_id(budget_id)
        .filter(budgets::Column::UserId.eq(user_id))
        .filter(budgets::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("budget".to_string()))
}

impl Engine {
    /// Create a budget for one category over an inclusive date range.
    ///
    /// The overlap check and the insert share one transaction.
    pub async fn create_budget(&self, cmd: NewBudgetCmd) -> ResultEngine<Budget> {
        require_positive_amount(cmd.amount)?;
        ensure_date_order(cmd.start_date, cmd.end_date)?;

        with_tx!(self, |db_tx| {
            require_category(&db_tx, cmd.category_id).await?;
            ensure_no_overlap(
                &db_tx,
                cmd.user_id,
                cmd.category_id,
                cmd.start_date,
                cmd.end_date,
                None,
            )
            .await?;

            let now = Utc::now();
            let budget = Budget {
                id: Uuid::new_v4(),
                user_id: cmd.user_id,
                category_id: cmd.category_id,
                amount: cmd.amount,
                start_date: cmd.start_date,
                end_date: cmd.end_date,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            budgets::ActiveModel::from(&budget).insert(&db_tx).await?;

            tracing::info!(
                budget_id = %budget.id,
                user_id = %budget.user_id,
                category_id = %budget.category_id,
                "budget created"
            );
            Ok(budget)
        })
    }

    /// Budgets of `user_id` matching `filter`, ordered by `start_date`.
    pub async fn list_budgets(
        &self,
        user_id: Uuid,
        filter: &BudgetListFilter,
    ) -> ResultEngine<Vec<Budget>> {
        let models = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .apply_budget_filters(filter)
            .order_by_asc(budgets::Column::StartDate)
            .order_by_asc(budgets::Column::Id)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Budget::from).collect())
    }

    pub async fn budget(&self, user_id: Uuid, budget_id: Uuid) -> ResultEngine<Budget> {
        owned_budget(&self.database, user_id, budget_id)
            .await
            .map(Budget::from)
    }

    /// Apply a partial update.
    ///
    /// The merged record must keep `end_date >= start_date` and must not
    /// overlap any other budget of the same category.
    pub async fn update_budget(&self, cmd: UpdateBudgetCmd) -> ResultEngine<Budget> {
        if cmd.is_empty() {
            return Err(EngineError::NothingToUpdate);
        }
        if let Some(amount) = cmd.amount {
            require_positive_amount(amount)?;
        }
        if let (Some(start), Some(end)) = (cmd.start_date, cmd.end_date) {
            ensure_date_order(start, end)?;
        }

        with_tx!(self, |db_tx| {
            let model = owned_budget(&db_tx, cmd.user_id, cmd.budget_id).await?;
            let mut budget = Budget::from(model);

            if let Some(category_id) = cmd.category_id {
                require_category(&db_tx, category_id).await?;
                budget.category_id = category_id;
            }
            if let Some(amount) = cmd.amount {
                budget.amount = amount;
            }
            if let Some(start) = cmd.start_date {
                budget.start_date = start;
            }
            if let Some(end) = cmd.end_date {
                budget.end_date = end;
            }
            ensure_date_order(budget.start_date, budget.end_date)?;

            ensure_no_overlap(
                &db_tx,
                budget.user_id,
                budget.category_id,
                budget.start_date,
                budget.end_date,
                Some(budget.id),
            )
            .await?;

            budget.updated_at = Utc::now();
            let active = budgets::ActiveModel {
                id: ActiveValue::Unchanged(budget.id),
                category_id: ActiveValue::Set(budget.category_id),
                amount_minor: ActiveValue::Set(budget.amount.cents()),
                start_date: ActiveValue::Set(budget.start_date),
                end_date: ActiveValue::Set(budget.end_date),
                updated_at: ActiveValue::Set(budget.updated_at),
                ..Default::default()
            };
            active.update(&db_tx).await?;

            tracing::info!(budget_id = %budget.id, "budget updated");
            Ok(budget)
        })
    }

    /// Soft delete a budget owned by `user_id`.
    pub async fn delete_budget(&self, user_id: Uuid, budget_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = owned_budget(&db_tx, user_id, budget_id).await?;
            let now = Utc::now();
            let active = budgets::ActiveModel {
                id: ActiveValue::Unchanged(model.id),
                deleted_at: ActiveValue::Set(Some(now)),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            };
            active.update(&db_tx).await?;

            tracing::info!(budget_id = %budget_id, "budget deleted");
            Ok(())
        })
    }
}
