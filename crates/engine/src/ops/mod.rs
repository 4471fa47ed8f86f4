use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DatabaseConnection, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine};

mod analysis;
mod budgets;
mod categories;
mod expenses;
mod receipts;

pub use analysis::{
    AnalysisPeriod, BudgetAnalysis, BudgetAnalysisFilter, BudgetUsage, CategoryShare,
    ExpenseAnalysis, ExpenseAnalysisFilter, ExpenseTotals, FrequentCategory, PeriodTotal,
    TimelineStats,
};
pub use budgets::BudgetListFilter;
pub use categories::{CategorySummary, DEFAULT_CATEGORIES};
pub use expenses::{ExpenseListFilter, ExpenseSort, MAX_PAGE_SIZE, Page, PageRequest, SortOrder};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// Amounts written by users must be strictly positive.
fn require_positive_amount(amount: MoneyCents) -> ResultEngine<()> {
    if !amount.is_positive() {
        return Err(EngineError::InvalidAmount(
            "amount must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

fn require_not_future(date: DateTime<Utc>) -> ResultEngine<()> {
    if date > Utc::now() {
        return Err(EngineError::InvalidDate(
            "expense date cannot be in the future".to_string(),
        ));
    }
    Ok(())
}

/// Resolve a category that an expense or budget points at.
///
/// Any non-deleted category is accepted regardless of owner; a missing one is
/// an input error rather than a lookup error.
async fn require_category<C: ConnectionTrait>(
    db: &C,
    category_id: Uuid,
) -> ResultEngine<crate::categories::Model> {
    crate::categories::Entity::find_by_id(category_id)
        .filter(crate::categories::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::InvalidCategory("invalid category".to_string()))
}

/// Batched id → name lookup used by the analysis reports.
///
/// Never fails: ids that cannot be resolved, or a failing query, map to
/// `"Unknown"` and leave a warning in the log.
async fn category_names<C: ConnectionTrait>(
    db: &C,
    ids: impl IntoIterator<Item = Uuid>,
) -> HashMap<Uuid, String> {
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return HashMap::new();
    }

    let mut names = match crate::categories::Entity::find()
        .filter(crate::categories::Column::Id.is_in(ids.clone()))
        .all(db)
        .await
    {
        Ok(models) => models
            .into_iter()
            .map(|model| (model.id, model.name))
            .collect::<HashMap<_, _>>(),
        Err(err) => {
            tracing::warn!(error = %err, "category name lookup failed");
            HashMap::new()
        }
    };

    for id in ids {
        names.entry(id).or_insert_with(|| {
            tracing::warn!(category_id = %id, "category not found, using fallback name");
            UNKNOWN_CATEGORY.to_string()
        });
    }
    names
}

const UNKNOWN_CATEGORY: &str = "Unknown";

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
