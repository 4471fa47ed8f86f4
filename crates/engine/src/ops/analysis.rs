//! Spend-vs-budget and expense aggregate reports.
//!
//! Budget analysis compares each budget with the spend of its category over
//! the requested window. Expense analysis runs each aggregate as its own
//! query: one failing aggregate is reported in `unavailable` instead of
//! failing the whole report.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    str::FromStr,
};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sea_orm::{QueryFilter, QuerySelect, Select, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    Budget, BudgetPeriod, EngineError, MoneyCents, ResultEngine, expenses,
    util::{ensure_date_order, round2},
};

use super::{
    BudgetListFilter, Engine, UNKNOWN_CATEGORY,
    categories::average,
    category_names,
    expenses::{ExpenseQueryExt, sum_count_max},
};

#[derive(Clone, Debug, Default)]
pub struct BudgetAnalysisFilter {
    pub category_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BudgetAnalysis {
    /// The user has no active budget matching the filters.
    NoBudgets,
    Report(Vec<BudgetUsage>),
}

/// One budget compared with the spend of its category.
#[derive(Clone, Debug, PartialEq)]
pub struct BudgetUsage {
    pub budget_id: Uuid,
    pub category_id: Uuid,
    pub category_name: String,
    pub amount: MoneyCents,
    pub spent: MoneyCents,
    pub remaining: MoneyCents,
    /// `spent / amount * 100`, two decimals; `0` for a zero budget.
    pub percentage: f64,
    pub exceeds: bool,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl BudgetUsage {
    #[must_use]
    pub fn compute(budget: &Budget, category_name: String, spent: MoneyCents) -> Self {
        let percentage = if budget.amount.is_zero() {
            0.0
        } else {
            round2(spent.cents() as f64 * 100.0 / budget.amount.cents() as f64)
        };
        Self {
            budget_id: budget.id,
            category_id: budget.category_id,
            category_name,
            amount: budget.amount,
            spent,
            remaining: budget.amount - spent,
            percentage,
            exceeds: spent > budget.amount,
            start_date: budget.start_date,
            end_date: budget.end_date,
        }
    }
}

/// Granularity of the expense timeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnalysisPeriod {
    Day,
    Week,
    #[default]
    Month,
    Year,
}

impl AnalysisPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Bucket key: `YYYY-MM-DD`, `YYYY-Www` (ISO week), `YYYY-MM` or `YYYY`.
    pub fn bucket(self, date: DateTime<Utc>) -> String {
        match self {
            Self::Day => date.format("%Y-%m-%d").to_string(),
            Self::Week => {
                let week = date.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            Self::Month => date.format("%Y-%m").to_string(),
            Self::Year => date.format("%Y").to_string(),
        }
    }
}

impl FromStr for AnalysisPeriod {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            other => Err(EngineError::InvalidFilter(format!(
                "invalid period '{other}' (expected day, week, month or year)"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ExpenseAnalysisFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
    pub period: AnalysisPeriod,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpenseTotals {
    pub total: MoneyCents,
    pub count: u64,
    pub average: MoneyCents,
    pub max: MoneyCents,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeriodTotal {
    pub period: String,
    pub total: MoneyCents,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimelineStats {
    pub distinct_days: u64,
    pub daily_average: MoneyCents,
    pub buckets: Vec<PeriodTotal>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CategoryShare {
    pub category_id: Uuid,
    pub category_name: String,
    pub total: MoneyCents,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrequentCategory {
    pub category_id: Uuid,
    pub category_name: String,
    pub count: u64,
    pub total: MoneyCents,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExpenseAnalysis {
    pub period: AnalysisPeriod,
    pub totals: Option<ExpenseTotals>,
    pub timeline: Option<TimelineStats>,
    pub categories: Option<Vec<CategoryShare>>,
    pub most_frequent: Option<FrequentCategory>,
    /// Names of the aggregates that could not be computed.
    pub unavailable: Vec<String>,
}

/// Per-category `(total, count)` rows.
type CategoryRows = Vec<(Uuid, MoneyCents, u64)>;

fn settle<T>(name: &str, result: ResultEngine<T>, unavailable: &mut Vec<String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(aggregate = name, error = %err, "expense aggregate unavailable");
            unavailable.push(name.to_string());
            None
        }
    }
}

fn timeline_from_rows(rows: &[(DateTime<Utc>, i64)], period: AnalysisPeriod) -> TimelineStats {
    let mut buckets: BTreeMap<String, (MoneyCents, u64)> = BTreeMap::new();
    let mut days: BTreeSet<NaiveDate> = BTreeSet::new();
    let mut total = MoneyCents::ZERO;

    for (date, amount) in rows {
        let amount = MoneyCents::new(*amount);
        days.insert(date.date_naive());
        total += amount;
        let entry = buckets
            .entry(period.bucket(*date))
            .or_insert((MoneyCents::ZERO, 0));
        entry.0 += amount;
        entry.1 += 1;
    }

    let distinct_days = days.len() as u64;
    TimelineStats {
        distinct_days,
        daily_average: average(total, distinct_days),
        buckets: buckets
            .into_iter()
            .map(|(period, (total, count))| PeriodTotal {
                period,
                total,
                count,
            })
            .collect(),
    }
}

/// Shares sorted by total (desc), then id.
fn shares_from_rows(rows: &CategoryRows, names: &HashMap<Uuid, String>) -> Vec<CategoryShare> {
    let grand_total: MoneyCents = rows.iter().map(|(_, total, _)| *total).sum();
    let mut shares: Vec<CategoryShare> = rows
        .iter()
        .map(|(id, total, count)| CategoryShare {
            category_id: *id,
            category_name: category_name(names, id),
            total: *total,
            count: *count,
            percentage: if grand_total.is_zero() {
                0.0
            } else {
                round2(total.cents() as f64 * 100.0 / grand_total.cents() as f64)
            },
        })
        .collect();
    shares.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.category_id.cmp(&b.category_id))
    });
    shares
}

/// Highest count wins; ties go to the larger total, then the smaller id.
fn most_frequent_from_rows(rows: &CategoryRows) -> Option<(Uuid, MoneyCents, u64)> {
    rows.iter().copied().min_by(|a, b| {
        b.2.cmp(&a.2)
            .then_with(|| b.1.cmp(&a.1))
            .then_with(|| a.0.cmp(&b.0))
    })
}

fn category_name(names: &HashMap<Uuid, String>, id: &Uuid) -> String {
    names
        .get(id)
        .cloned()
        .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string())
}

impl Engine {
    /// Compare each active budget with the spend of its category.
    ///
    /// Spend covers `[start_date 00:00, end_date + 1 day)`; without dates it
    /// covers all of the user's expenses.
    pub async fn analyze_budgets(
        &self,
        user_id: Uuid,
        filter: &BudgetAnalysisFilter,
    ) -> ResultEngine<BudgetAnalysis> {
        if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
            ensure_date_order(start, end)?;
        }

        let budgets = self
            .list_budgets(
                user_id,
                &BudgetListFilter {
                    category_id: filter.category_id,
                    start_date: filter.start_date,
                    end_date: filter.end_date,
                    ..Default::default()
                },
            )
            .await?;
        if budgets.is_empty() {
            return Ok(BudgetAnalysis::NoBudgets);
        }

        let spent = self
            .spend_by_category(
                user_id,
                filter.category_id,
                filter.start_date,
                filter.end_date,
            )
            .await?;
        let names = category_names(&self.database, budgets.iter().map(|b| b.category_id)).await;

        let report = budgets
            .iter()
            .map(|budget| {
                BudgetUsage::compute(
                    budget,
                    category_name(&names, &budget.category_id),
                    spent
                        .get(&budget.category_id)
                        .copied()
                        .unwrap_or(MoneyCents::ZERO),
                )
            })
            .collect();
        Ok(BudgetAnalysis::Report(report))
    }

    /// Usage of the user's budget for a category that covers today, if any.
    pub async fn category_budget_status(
        &self,
        user_id: Uuid,
        category_id: Uuid,
    ) -> ResultEngine<Option<BudgetUsage>> {
        let category = self.category(user_id, category_id).await?;
        let budgets = self
            .list_budgets(
                user_id,
                &BudgetListFilter {
                    category_id: Some(category.id),
                    period: Some(BudgetPeriod::Current),
                    ..Default::default()
                },
            )
            .await?;
        let Some(budget) = budgets.into_iter().next() else {
            return Ok(None);
        };

        let spent = self
            .spend_by_category(
                user_id,
                Some(category.id),
                Some(budget.start_date),
                Some(budget.end_date),
            )
            .await?
            .get(&category.id)
            .copied()
            .unwrap_or(MoneyCents::ZERO);
        Ok(Some(BudgetUsage::compute(&budget, category.name, spent)))
    }

    /// Aggregate report over the user's expenses.
    pub async fn analyze_expenses(
        &self,
        user_id: Uuid,
        filter: &ExpenseAnalysisFilter,
    ) -> ResultEngine<ExpenseAnalysis> {
        if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
            ensure_date_order(start, end)?;
        }

        let mut unavailable = Vec::new();

        let totals = settle(
            "totals",
            self.expense_totals(user_id, filter).await,
            &mut unavailable,
        );
        let timeline = settle(
            "timeline",
            self.expense_timeline(user_id, filter).await,
            &mut unavailable,
        );
        let categories = settle(
            "categories",
            self.category_rows(user_id, filter).await,
            &mut unavailable,
        );
        // Ranked from the same grouped rows as the shares.
        if categories.is_none() {
            unavailable.push("most_frequent".to_string());
        }

        let ids: Vec<Uuid> = categories
            .iter()
            .flatten()
            .map(|(id, _, _)| *id)
            .collect();
        let names = category_names(&self.database, ids).await;

        Ok(ExpenseAnalysis {
            period: filter.period,
            totals,
            timeline,
            most_frequent: categories
                .as_ref()
                .and_then(most_frequent_from_rows)
                .map(|(id, total, count)| FrequentCategory {
                    category_id: id,
                    category_name: category_name(&names, &id),
                    count,
                    total,
                }),
            categories: categories.map(|rows| shares_from_rows(&rows, &names)),
            unavailable,
        })
    }

    fn analysis_scope(
        &self,
        user_id: Uuid,
        filter: &ExpenseAnalysisFilter,
    ) -> Select<expenses::Entity> {
        let mut query = expenses::Entity::find()
            .owned_active(user_id)
            .within_days(filter.start_date, filter.end_date);
        if let Some(category_id) = filter.category_id {
            query = query.filter(expenses::Column::CategoryId.eq(category_id));
        }
        query
    }

    async fn expense_totals(
        &self,
        user_id: Uuid,
        filter: &ExpenseAnalysisFilter,
    ) -> ResultEngine<ExpenseTotals> {
        let (total, count, max) =
            sum_count_max(&self.database, self.analysis_scope(user_id, filter)).await?;
        Ok(ExpenseTotals {
            total,
            count,
            average: average(total, count),
            max,
        })
    }

    async fn expense_timeline(
        &self,
        user_id: Uuid,
        filter: &ExpenseAnalysisFilter,
    ) -> ResultEngine<TimelineStats> {
        let rows: Vec<(DateTime<Utc>, i64)> = self
            .analysis_scope(user_id, filter)
            .select_only()
            .column(expenses::Column::Date)
            .column(expenses::Column::AmountMinor)
            .into_tuple()
            .all(&self.database)
            .await?;
        Ok(timeline_from_rows(&rows, filter.period))
    }

    async fn category_rows(
        &self,
        user_id: Uuid,
        filter: &ExpenseAnalysisFilter,
    ) -> ResultEngine<CategoryRows> {
        let rows: Vec<(Uuid, i64, i64)> = self
            .analysis_scope(user_id, filter)
            .select_only()
            .column(expenses::Column::CategoryId)
            .column_as(Expr::col(expenses::Column::AmountMinor).sum(), "total")
            .column_as(Expr::col(expenses::Column::Id).count(), "count")
            .group_by(expenses::Column::CategoryId)
            .into_tuple()
            .all(&self.database)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(id, total, count)| {
                (
                    id,
                    MoneyCents::new(total),
                    u64::try_from(count).unwrap_or(0),
                )
            })
            .collect())
    }

    /// Sum of non-deleted expense amounts per category.
    async fn spend_by_category(
        &self,
        user_id: Uuid,
        category_id: Option<Uuid>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> ResultEngine<HashMap<Uuid, MoneyCents>> {
        let mut query = expenses::Entity::find()
            .owned_active(user_id)
            .within_days(start, end);
        if let Some(category_id) = category_id {
            query = query.filter(expenses::Column::CategoryId.eq(category_id));
        }
        let rows: Vec<(Uuid, Option<i64>)> = query
            .select_only()
            .column(expenses::Column::CategoryId)
            .column_as(Expr::col(expenses::Column::AmountMinor).sum(), "spent")
            .group_by(expenses::Column::CategoryId)
            .into_tuple()
            .all(&self.database)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(id, spent)| (id, MoneyCents::new(spent.unwrap_or(0))))
            .collect())
    }
}
