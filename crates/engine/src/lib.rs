//! Domain core of the expense tracker.
//!
//! [`Engine`] owns every invariant: category ownership, expense validation,
//! budget non-overlap and the analysis reports. All operations receive the
//! caller's `user_id` explicitly; the engine never resolves identity itself.

pub use budgets::{Budget, BudgetPeriod, BudgetStatus};
pub use categories::Category;
pub use commands::{
    NewBudgetCmd, NewCategoryCmd, NewExpenseCmd, UpdateBudgetCmd, UpdateCategoryCmd,
    UpdateExpenseCmd,
};
pub use error::EngineError;
pub use expenses::{Expense, RecurrenceInterval};
pub use money::MoneyCents;
pub use ops::{
    AnalysisPeriod, BudgetAnalysis, BudgetAnalysisFilter, BudgetListFilter, BudgetUsage,
    CategoryShare, CategorySummary, DEFAULT_CATEGORIES, Engine, EngineBuilder, ExpenseAnalysis,
    ExpenseAnalysisFilter, ExpenseListFilter, ExpenseSort, ExpenseTotals, FrequentCategory,
    MAX_PAGE_SIZE, Page, PageRequest, PeriodTotal, SortOrder, TimelineStats,
};
pub use receipts::Receipt;
pub use util::{parse_day, parse_timestamp, parse_uuid};

mod budgets;
mod categories;
mod commands;
mod error;
mod expenses;
mod money;
mod ops;
mod receipts;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
