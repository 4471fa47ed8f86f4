//! The module contains the errors the engine can throw.
//!
//! Validation errors are raised before any write takes place:
//!
//! - [`InvalidAmount`] thrown when an amount is not strictly positive or has
//!   more than two decimals.
//! - [`InvalidDate`] thrown when a date does not parse or breaks an ordering
//!   rule (future expense, `end_date` before `start_date`).
//! - [`InvalidCategory`] thrown when a referenced category does not resolve.
//!
//! Lookup and ownership errors:
//!
//! - [`KeyNotFound`] thrown when a record is absent or owned by someone else.
//! - [`Forbidden`] thrown when a default category is the target of a mutation.
//! - [`BudgetOverlap`] thrown when a budget period collides with another one.
//!
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidDate`]: EngineError::InvalidDate
//!  [`InvalidCategory`]: EngineError::InvalidCategory
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`Forbidden`]: EngineError::Forbidden
//!  [`BudgetOverlap`]: EngineError::BudgetOverlap
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Invalid color: {0}")]
    InvalidColor(String),
    #[error("Invalid category: {0}")]
    InvalidCategory(String),
    #[error("Invalid receipt: {0}")]
    InvalidReceipt(String),
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    #[error("Invalid recurrence: {0}")]
    InvalidRecurrence(String),
    #[error("No fields to update")]
    NothingToUpdate,
    #[error("{0} not found")]
    KeyNotFound(String),
    #[error("{0} already exists")]
    ExistingKey(String),
    #[error("Budget period overlaps with an existing budget: {0}")]
    BudgetOverlap(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Returns `true` for errors caused by malformed or inconsistent input.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount(_)
                | Self::InvalidDate(_)
                | Self::InvalidId(_)
                | Self::InvalidName(_)
                | Self::InvalidColor(_)
                | Self::InvalidCategory(_)
                | Self::InvalidReceipt(_)
                | Self::InvalidFilter(_)
                | Self::InvalidRecurrence(_)
                | Self::NothingToUpdate
        )
    }
}
