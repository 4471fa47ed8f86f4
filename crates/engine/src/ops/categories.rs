use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, ConnectionTrait, Condition, PaginatorTrait, QueryFilter, QueryOrder, SqlErr,
    TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    Category, EngineError, MoneyCents, ResultEngine,
    categories::{self, ActiveModel},
    commands::{NewCategoryCmd, UpdateCategoryCmd},
    expenses,
    util::{
        normalize_color, normalize_display_name, normalize_name_key, normalize_optional_text,
        random_color,
    },
};

use super::{Engine, expenses::ExpenseQueryExt, expenses::sum_count_max, with_tx};

/// System categories seeded on first start: `(name, description, color)`.
pub const DEFAULT_CATEGORIES: [(&str, &str, &str); 10] = [
    ("Food & Dining", "Restaurants, groceries, and food delivery", "#E67E22"),
    ("Transportation", "Public transport, fuel, car maintenance", "#3498DB"),
    ("Housing", "Rent, mortgage, utilities, maintenance", "#8E44AD"),
    ("Entertainment", "Movies, games, hobbies, streaming services", "#E74C3C"),
    ("Shopping", "Clothing, electronics, personal items", "#F1C40F"),
    ("Healthcare", "Medical expenses, medications, insurance", "#1ABC9C"),
    ("Education", "Tuition, books, courses, training", "#2ECC71"),
    ("Utilities", "Electricity, water, internet, phone", "#34495E"),
    ("Travel", "Vacations, business trips, accommodations", "#16A085"),
    ("Insurance", "Health, life, car, home insurance", "#7F8C8D"),
];

/// Spending of one user in one category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategorySummary {
    pub category_id: Uuid,
    pub expense_count: u64,
    pub total_spent: MoneyCents,
    pub average: MoneyCents,
    pub latest_expense_date: Option<DateTime<Utc>>,
}

/// Load a category the user is allowed to mutate.
///
/// Defaults are `Forbidden`; missing or foreign categories are `KeyNotFound`.
async fn mutable_category<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    category_id: Uuid,
) -> ResultEngine<categories::Model> {
    let model = categories::Entity::find_by_id(category_id)
        .filter(categories::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("category".to_string()))?;

    if model.is_default {
        return Err(EngineError::Forbidden(
            "default categories cannot be modified".to_string(),
        ));
    }
    if model.user_id != Some(user_id) {
        return Err(EngineError::KeyNotFound("category".to_string()));
    }
    Ok(model)
}

async fn ensure_unique_name<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    name: &str,
    name_norm: &str,
    exclude: Option<Uuid>,
) -> ResultEngine<()> {
    let mut query = categories::Entity::find()
        .filter(categories::Column::UserId.eq(user_id))
        .filter(categories::Column::NameNorm.eq(name_norm))
        .filter(categories::Column::DeletedAt.is_null());
    if let Some(id) = exclude {
        query = query.filter(categories::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(EngineError::ExistingKey(format!("category '{name}'")));
    }
    Ok(())
}

/// The unique index on `(user_id, name_norm)` backs the explicit check.
fn map_unique_violation(err: DbErr, name: &str) -> EngineError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            EngineError::ExistingKey(format!("category '{name}'"))
        }
        _ => EngineError::Database(err),
    }
}

impl Engine {
    /// Insert the system categories if the table is empty.
    ///
    /// Returns how many rows were written; a second call is a no-op.
    pub async fn seed_default_categories(&self) -> ResultEngine<usize> {
        with_tx!(self, |db_tx| {
            let existing = categories::Entity::find().count(&db_tx).await?;
            if existing > 0 {
                tracing::debug!(existing, "categories already present, skipping seed");
                Ok(0)
            } else {
                let now = Utc::now();
                for (name, description, color) in DEFAULT_CATEGORIES {
                    let active = ActiveModel {
                        id: ActiveValue::Set(Uuid::new_v4()),
                        user_id: ActiveValue::Set(None),
                        name: ActiveValue::Set(name.to_string()),
                        name_norm: ActiveValue::Set(normalize_name_key(name)),
                        description: ActiveValue::Set(Some(description.to_string())),
                        color_code: ActiveValue::Set(color.to_string()),
                        is_default: ActiveValue::Set(true),
                        created_at: ActiveValue::Set(now),
                        updated_at: ActiveValue::Set(now),
                        deleted_at: ActiveValue::Set(None),
                    };
                    active.insert(&db_tx).await?;
                }
                tracing::info!(count = DEFAULT_CATEGORIES.len(), "default categories seeded");
                Ok(DEFAULT_CATEGORIES.len())
            }
        })
    }

    pub async fn default_categories(&self) -> ResultEngine<Vec<Category>> {
        let models = categories::Entity::find()
            .filter(categories::Column::IsDefault.eq(true))
            .filter(categories::Column::DeletedAt.is_null())
            .order_by_asc(categories::Column::NameNorm)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Category::from).collect())
    }

    /// Defaults first, then the user's own categories, each sorted by name.
    pub async fn list_categories(&self, user_id: Uuid) -> ResultEngine<Vec<Category>> {
        let models = categories::Entity::find()
            .filter(
                Condition::any()
                    .add(categories::Column::IsDefault.eq(true))
                    .add(categories::Column::UserId.eq(user_id)),
            )
            .filter(categories::Column::DeletedAt.is_null())
            .order_by_desc(categories::Column::IsDefault)
            .order_by_asc(categories::Column::NameNorm)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Category::from).collect())
    }

    /// A default category or one owned by `user_id`.
    pub async fn category(&self, user_id: Uuid, category_id: Uuid) -> ResultEngine<Category> {
        let model = categories::Entity::find_by_id(category_id)
            .filter(categories::Column::DeletedAt.is_null())
            .one(&self.database)
            .await?
            .filter(|model| model.is_default || model.user_id == Some(user_id))
            .ok_or_else(|| EngineError::KeyNotFound("category".to_string()))?;
        Ok(Category::from(model))
    }

    pub async fn create_category(&self, cmd: NewCategoryCmd) -> ResultEngine<Category> {
        let name = normalize_display_name(&cmd.name)?;
        let name_norm = normalize_name_key(&name);
        let color_code = match cmd.color_code.as_deref() {
            Some(color) => normalize_color(color)?,
            None => random_color(),
        };
        let description = normalize_optional_text(cmd.description.as_deref());

        with_tx!(self, |db_tx| {
            ensure_unique_name(&db_tx, cmd.user_id, &name, &name_norm, None).await?;

            let now = Utc::now();
            let active = ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                user_id: ActiveValue::Set(Some(cmd.user_id)),
                name: ActiveValue::Set(name.clone()),
                name_norm: ActiveValue::Set(name_norm.clone()),
                description: ActiveValue::Set(description),
                color_code: ActiveValue::Set(color_code),
                is_default: ActiveValue::Set(false),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
                deleted_at: ActiveValue::Set(None),
            };
            let model = active
                .insert(&db_tx)
                .await
                .map_err(|err| map_unique_violation(err, &name))?;

            tracing::info!(category_id = %model.id, user_id = %cmd.user_id, "category created");
            Ok(Category::from(model))
        })
    }

    pub async fn update_category(&self, cmd: UpdateCategoryCmd) -> ResultEngine<Category> {
        if cmd.name.is_none() && cmd.description.is_none() && cmd.color_code.is_none() {
            return Err(EngineError::NothingToUpdate);
        }
        let name = cmd.name.as_deref().map(normalize_display_name).transpose()?;
        let color_code = cmd.color_code.as_deref().map(normalize_color).transpose()?;

        with_tx!(self, |db_tx| {
            let model = mutable_category(&db_tx, cmd.user_id, cmd.category_id).await?;
            let mut active: ActiveModel = model.clone().into();

            if let Some(name) = name.as_ref() {
                let name_norm = normalize_name_key(name);
                if name_norm != model.name_norm {
                    ensure_unique_name(&db_tx, cmd.user_id, name, &name_norm, Some(model.id))
                        .await?;
                }
                active.name = ActiveValue::Set(name.clone());
                active.name_norm = ActiveValue::Set(name_norm);
            }
            if let Some(description) = cmd.description.as_deref() {
                active.description = ActiveValue::Set(normalize_optional_text(Some(description)));
            }
            match color_code {
                Some(color) => active.color_code = ActiveValue::Set(color),
                None if model.color_code.trim().is_empty() => {
                    active.color_code = ActiveValue::Set(random_color());
                }
                None => {}
            }
            active.updated_at = ActiveValue::Set(Utc::now());

            let updated = active
                .update(&db_tx)
                .await
                .map_err(|err| map_unique_violation(err, name.as_deref().unwrap_or(&model.name)))?;

            tracing::info!(category_id = %updated.id, "category updated");
            Ok(Category::from(updated))
        })
    }

    /// Hard delete a custom category.
    ///
    /// Expenses and budgets keep their `category_id`; reports show them under
    /// `"Unknown"`.
    pub async fn delete_category(&self, user_id: Uuid, category_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = mutable_category(&db_tx, user_id, category_id).await?;
            categories::Entity::delete_by_id(model.id)
                .exec(&db_tx)
                .await?;

            tracing::info!(category_id = %category_id, "category deleted");
            Ok(())
        })
    }

    /// Count, total, average and latest expense date of the user in a category.
    pub async fn category_summary(
        &self,
        user_id: Uuid,
        category_id: Uuid,
    ) -> ResultEngine<CategorySummary> {
        let category = self.category(user_id, category_id).await?;

        let scoped = || {
            expenses::Entity::find()
                .owned_active(user_id)
                .filter(expenses::Column::CategoryId.eq(category.id))
        };
        let (total_spent, expense_count, _) = sum_count_max(&self.database, scoped()).await?;
        let latest = scoped()
            .order_by_desc(expenses::Column::Date)
            .one(&self.database)
            .await?;

        Ok(CategorySummary {
            category_id: category.id,
            expense_count,
            total_spent,
            average: average(total_spent, expense_count),
            latest_expense_date: latest.map(|model| model.date),
        })
    }
}

/// Integer mean rounded to the nearest cent.
pub(super) fn average(total: MoneyCents, count: u64) -> MoneyCents {
    if count == 0 {
        return MoneyCents::ZERO;
    }
    MoneyCents::new((total.cents() as f64 / count as f64).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_unique_keys_and_valid_colors() {
        let mut keys: Vec<String> = DEFAULT_CATEGORIES
            .iter()
            .map(|(name, _, _)| normalize_name_key(name))
            .collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), DEFAULT_CATEGORIES.len());
        for (_, _, color) in DEFAULT_CATEGORIES {
            assert_eq!(normalize_color(color).unwrap(), color);
        }
    }

    #[test]
    fn average_rounds_to_nearest_cent() {
        assert_eq!(average(MoneyCents::new(1000), 3), MoneyCents::new(333));
        assert_eq!(average(MoneyCents::new(1001), 2), MoneyCents::new(501));
        assert_eq!(average(MoneyCents::new(500), 0), MoneyCents::ZERO);
    }
}
