//! Expense records.
//!
//! An expense belongs to a user, points at a category and may carry a receipt
//! and a recurrence hint.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use uuid::Uuid;

use crate::{EngineError, MoneyCents, ResultEngine};

/// How often a recurring expense repeats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecurrenceInterval {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurrenceInterval {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl FromStr for RecurrenceInterval {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(EngineError::InvalidRecurrence(format!(
                "invalid recurrence interval '{other}'"
            ))),
        }
    }
}

/// An interval is required for recurring expenses and meaningless otherwise.
pub(crate) fn validate_recurrence(
    is_recurring: bool,
    interval: Option<RecurrenceInterval>,
) -> ResultEngine<()> {
    match (is_recurring, interval) {
        (true, None) => Err(EngineError::InvalidRecurrence(
            "recurring expenses need a recurrence_interval".to_string(),
        )),
        (false, Some(_)) => Err(EngineError::InvalidRecurrence(
            "recurrence_interval requires is_recurring".to_string(),
        )),
        _ => Ok(()),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub amount: MoneyCents,
    pub date: DateTime<Utc>,
    pub description: Option<String>,
    pub receipt_id: Option<Uuid>,
    pub is_recurring: bool,
    pub recurrence_interval: Option<RecurrenceInterval>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<Model> for Expense {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let recurrence_interval = model
            .recurrence_interval
            .as_deref()
            .map(RecurrenceInterval::from_str)
            .transpose()?;
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            category_id: model.category_id,
            amount: MoneyCents::new(model.amount_minor),
            date: model.date,
            description: model.description,
            receipt_id: model.receipt_id,
            is_recurring: model.is_recurring,
            recurrence_interval,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub amount_minor: i64,
    pub date: DateTimeUtc,
    pub description: Option<String>,
    pub receipt_id: Option<Uuid>,
    pub is_recurring: bool,
    pub recurrence_interval: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recurrence_requires_interval_when_recurring() {
        assert!(validate_recurrence(true, Some(RecurrenceInterval::Monthly)).is_ok());
        assert!(validate_recurrence(false, None).is_ok());
        assert!(validate_recurrence(true, None).is_err());
        assert!(validate_recurrence(false, Some(RecurrenceInterval::Daily)).is_err());
    }

    #[test]
    fn interval_round_trips_through_str() {
        for interval in [
            RecurrenceInterval::Daily,
            RecurrenceInterval::Weekly,
            RecurrenceInterval::Monthly,
            RecurrenceInterval::Yearly,
        ] {
            assert_eq!(interval.as_str().parse::<RecurrenceInterval>().unwrap(), interval);
        }
        assert!("hourly".parse::<RecurrenceInterval>().is_err());
    }
}
