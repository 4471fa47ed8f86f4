#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::Database;
use uuid::Uuid;

use engine::{Engine, MoneyCents};
use migration::MigratorTrait;

pub async fn engine() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    engine.seed_default_categories().await.unwrap();
    engine
}

/// Id of the default category with the given display name.
pub async fn default_category(engine: &Engine, name: &str) -> Uuid {
    engine
        .default_categories()
        .await
        .unwrap()
        .into_iter()
        .find(|category| category.name == name)
        .map(|category| category.id)
        .unwrap()
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    day(y, m, d).and_hms_opt(12, 0, 0).unwrap().and_utc()
}

pub fn cents(value: i64) -> MoneyCents {
    MoneyCents::new(value)
}
