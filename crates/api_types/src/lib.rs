use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod envelope {
    use super::*;

    /// Every response body, success or error, has this shape.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ApiResponse<T> {
        pub status_code: u16,
        pub message: String,
        pub data: Option<T>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub meta: Option<PaginationMeta>,
    }

    impl<T> ApiResponse<T> {
        pub fn new(status_code: u16, message: impl Into<String>, data: T) -> Self {
            Self {
                status_code,
                message: message.into(),
                data: Some(data),
                meta: None,
            }
        }

        pub fn empty(status_code: u16, message: impl Into<String>) -> Self {
            Self {
                status_code,
                message: message.into(),
                data: None,
                meta: None,
            }
        }

        pub fn with_meta(mut self, meta: PaginationMeta) -> Self {
            self.meta = Some(meta);
            self
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct PaginationMeta {
        pub total_count: u64,
        pub page: u64,
        pub per_page: u64,
        pub total_pages: u64,
    }
}

pub mod budget {
    use super::*;

    /// Amounts are decimal major units; dates are `YYYY-MM-DD`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetNew {
        pub category_id: String,
        pub amount: f64,
        pub start_date: String,
        pub end_date: String,
    }

    /// Partial update: omitted fields stay unchanged.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BudgetUpdate {
        pub category_id: Option<String>,
        pub amount: Option<f64>,
        pub start_date: Option<String>,
        pub end_date: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BudgetListQuery {
        pub category_id: Option<String>,
        pub start_date: Option<String>,
        pub end_date: Option<String>,
        /// `current`, `upcoming` or `past`.
        pub period: Option<String>,
        /// `active` (default), `deleted` or `all`.
        pub status: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetView {
        pub id: Uuid,
        pub category_id: Uuid,
        pub amount: f64,
        pub start_date: NaiveDate,
        pub end_date: NaiveDate,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        pub deleted_at: Option<DateTime<Utc>>,
    }
}

pub mod expense {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub category_id: String,
        pub amount: f64,
        /// `YYYY-MM-DD` or RFC 3339.
        pub date: String,
        pub description: Option<String>,
        pub receipt_id: Option<String>,
        #[serde(default)]
        pub is_recurring: bool,
        pub recurrence_interval: Option<String>,
    }

    /// Partial update: omitted fields stay unchanged, an empty description
    /// clears it.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseUpdate {
        pub category_id: Option<String>,
        pub amount: Option<f64>,
        pub date: Option<String>,
        pub description: Option<String>,
        pub receipt_id: Option<String>,
        pub is_recurring: Option<bool>,
        pub recurrence_interval: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseListQuery {
        pub start_date: Option<String>,
        pub end_date: Option<String>,
        pub category_id: Option<String>,
        pub min_amount: Option<f64>,
        pub max_amount: Option<f64>,
        /// `date` (default), `amount` or `created_at`.
        pub sort: Option<String>,
        /// `asc` (default) or `desc`.
        pub order: Option<String>,
        pub page: Option<u64>,
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: Uuid,
        pub category_id: Uuid,
        pub amount: f64,
        pub date: DateTime<Utc>,
        pub description: Option<String>,
        pub receipt_id: Option<Uuid>,
        pub is_recurring: bool,
        pub recurrence_interval: Option<String>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }
}

pub mod category {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryNew {
        pub name: String,
        pub description: Option<String>,
        /// `#RRGGBB` or `RRGGBB`; generated when omitted.
        pub color_code: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CategoryUpdate {
        pub name: Option<String>,
        pub description: Option<String>,
        pub color_code: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryView {
        pub id: Uuid,
        pub user_id: Option<Uuid>,
        pub name: String,
        pub description: Option<String>,
        pub color_code: String,
        pub is_default: bool,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategorySummary {
        pub category_id: Uuid,
        pub expense_count: u64,
        pub total_spent: f64,
        pub average_expense: f64,
        pub latest_expense_date: Option<DateTime<Utc>>,
    }
}

pub mod receipt {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReceiptNew {
        pub image_url: String,
        pub ocr_data: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReceiptView {
        pub id: Uuid,
        pub image_url: String,
        pub ocr_data: Option<String>,
        pub scanned_at: DateTime<Utc>,
        pub expense_id: Option<Uuid>,
    }
}

pub mod analysis {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BudgetAnalysisQuery {
        pub category_id: Option<String>,
        pub start_date: Option<String>,
        pub end_date: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetUsageView {
        pub budget_id: Uuid,
        pub category_id: Uuid,
        pub category_name: String,
        pub budget_amount: f64,
        pub spent_amount: f64,
        pub remaining_amount: f64,
        pub percentage_used: f64,
        pub exceeds_budget: bool,
        pub start_date: NaiveDate,
        pub end_date: NaiveDate,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseAnalysisQuery {
        pub start_date: Option<String>,
        pub end_date: Option<String>,
        pub category_id: Option<String>,
        /// `day`, `week`, `month` (default) or `year`.
        pub period: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TotalsView {
        pub total_amount: f64,
        pub expense_count: u64,
        pub average_amount: f64,
        pub max_amount: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PeriodTotalView {
        pub period: String,
        pub total_amount: f64,
        pub expense_count: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TimelineView {
        pub distinct_days: u64,
        pub daily_average: f64,
        pub periods: Vec<PeriodTotalView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryShareView {
        pub category_id: Uuid,
        pub category_name: String,
        pub total_amount: f64,
        pub expense_count: u64,
        pub percentage: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FrequentCategoryView {
        pub category_id: Uuid,
        pub category_name: String,
        pub expense_count: u64,
        pub total_amount: f64,
    }

    /// Aggregates that failed are `null` and listed in `unavailable`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseAnalysisView {
        pub period: String,
        pub totals: Option<TotalsView>,
        pub timeline: Option<TimelineView>,
        pub categories: Option<Vec<CategoryShareView>>,
        pub most_frequent_category: Option<FrequentCategoryView>,
        pub unavailable: Vec<String>,
    }
}
