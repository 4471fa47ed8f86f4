//! Command structs for engine write operations.
//!
//! These types group parameters for create/update operations, keeping call
//! sites readable and avoiding long argument lists. Update commands use
//! `Option` for every patchable field: `None` means "leave unchanged", so a
//! value provided as zero or empty is still validated.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{MoneyCents, RecurrenceInterval};

/// Create a budget.
#[derive(Clone, Debug)]
pub struct NewBudgetCmd {
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub amount: MoneyCents,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl NewBudgetCmd {
    #[must_use]
    pub fn new(
        user_id: Uuid,
        category_id: Uuid,
        amount: MoneyCents,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            user_id,
            category_id,
            amount,
            start_date,
            end_date,
        }
    }
}

/// Partially update a budget.
#[derive(Clone, Debug)]
pub struct UpdateBudgetCmd {
    pub user_id: Uuid,
    pub budget_id: Uuid,
    pub amount: Option<MoneyCents>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
}

impl UpdateBudgetCmd {
    #[must_use]
    pub fn new(user_id: Uuid, budget_id: Uuid) -> Self {
        Self {
            user_id,
            budget_id,
            amount: None,
            start_date: None,
            end_date: None,
            category_id: None,
        }
    }

    #[must_use]
    pub fn amount(mut self, amount: MoneyCents) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self
    }

    #[must_use]
    pub fn end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    #[must_use]
    pub fn category_id(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.category_id.is_none()
    }
}

/// Create an expense.
#[derive(Clone, Debug)]
pub struct NewExpenseCmd {
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub amount: MoneyCents,
    pub date: DateTime<Utc>,
    pub description: Option<String>,
    pub receipt_id: Option<Uuid>,
    pub is_recurring: bool,
    pub recurrence_interval: Option<RecurrenceInterval>,
}

impl NewExpenseCmd {
    #[must_use]
    pub fn new(user_id: Uuid, category_id: Uuid, amount: MoneyCents, date: DateTime<Utc>) -> Self {
        Self {
            user_id,
            category_id,
            amount,
            date,
            description: None,
            receipt_id: None,
            is_recurring: false,
            recurrence_interval: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn receipt_id(mut self, receipt_id: Uuid) -> Self {
        self.receipt_id = Some(receipt_id);
        self
    }

    #[must_use]
    pub fn recurring(mut self, interval: RecurrenceInterval) -> Self {
        self.is_recurring = true;
        self.recurrence_interval = Some(interval);
        self
    }
}

/// Partially update an expense.
#[derive(Clone, Debug)]
pub struct UpdateExpenseCmd {
    pub user_id: Uuid,
    pub expense_id: Uuid,
    pub amount: Option<MoneyCents>,
    pub date: Option<DateTime<Utc>>,
    /// `Some("")` clears the description.
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub receipt_id: Option<Uuid>,
    pub is_recurring: Option<bool>,
    pub recurrence_interval: Option<RecurrenceInterval>,
}

impl UpdateExpenseCmd {
    #[must_use]
    pub fn new(user_id: Uuid, expense_id: Uuid) -> Self {
        Self {
            user_id,
            expense_id,
            amount: None,
            date: None,
            description: None,
            category_id: None,
            receipt_id: None,
            is_recurring: None,
            recurrence_interval: None,
        }
    }

    #[must_use]
    pub fn amount(mut self, amount: MoneyCents) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn category_id(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn receipt_id(mut self, receipt_id: Uuid) -> Self {
        self.receipt_id = Some(receipt_id);
        self
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.date.is_none()
            && self.description.is_none()
            && self.category_id.is_none()
            && self.receipt_id.is_none()
            && self.is_recurring.is_none()
            && self.recurrence_interval.is_none()
    }
}

/// Create a custom category.
#[derive(Clone, Debug)]
pub struct NewCategoryCmd {
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub color_code: Option<String>,
}

impl NewCategoryCmd {
    #[must_use]
    pub fn new(user_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            description: None,
            color_code: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn color_code(mut self, color_code: impl Into<String>) -> Self {
        self.color_code = Some(color_code.into());
        self
    }
}

/// Partially update a custom category.
#[derive(Clone, Debug)]
pub struct UpdateCategoryCmd {
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub name: Option<String>,
    pub description: Option<String>,
    pub color_code: Option<String>,
}

impl UpdateCategoryCmd {
    #[must_use]
    pub fn new(user_id: Uuid, category_id: Uuid) -> Self {
        Self {
            user_id,
            category_id,
            name: None,
            description: None,
            color_code: None,
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn color_code(mut self, color_code: impl Into<String>) -> Self {
        self.color_code = Some(color_code.into());
        self
    }
}
