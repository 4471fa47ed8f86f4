use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend, Statement};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use engine::Engine;
use server::ServerState;

struct TestApp {
    router: Router,
    db: DatabaseConnection,
    token: String,
}

async fn issue_token(db: &DatabaseConnection, user_id: Uuid, revoked: bool) -> String {
    let token = Uuid::new_v4().simple().to_string();
    db.execute(Statement::from_sql_and_values(
        DbBackend::Sqlite,
        "INSERT INTO auth_tokens (token, user_id, expires_at, revoked) VALUES (?, ?, NULL, ?)",
        [token.clone().into(), user_id.into(), revoked.into()],
    ))
    .await
    .unwrap();
    token
}

async fn setup() -> TestApp {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let engine = Engine::builder().database(db.clone()).build().await.unwrap();
    engine.seed_default_categories().await.unwrap();

    let token = issue_token(&db, Uuid::new_v4(), false).await;
    let router = server::app(ServerState {
        engine: Arc::new(engine),
        db: db.clone(),
    });

    TestApp { router, db, token }
}

impl TestApp {
    async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(method, uri, Some(&self.token), body).await
    }

    async fn default_category_id(&self) -> String {
        let (status, body) = self.call("GET", "/api/v1/categories/defaults", None).await;
        assert_eq!(status, StatusCode::OK);
        body["data"][0]["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn health_does_not_require_a_token() {
    let app = setup().await;
    let (status, body) = app.send("GET", "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "healthy");
}

#[tokio::test]
async fn protected_routes_reject_missing_or_unknown_tokens() {
    let app = setup().await;

    let (status, body) = app.send("GET", "/api/v1/budgets", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status_code"], 401);
    assert!(body["data"].is_null());

    let (status, _) = app
        .send("GET", "/api/v1/budgets", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let revoked = issue_token(&app.db, Uuid::new_v4(), true).await;
    let (status, _) = app
        .send("GET", "/api/v1/budgets", Some(&revoked), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn overlapping_budget_is_a_conflict() {
    let app = setup().await;
    let category_id = app.default_category_id().await;

    let (status, body) = app
        .call(
            "POST",
            "/api/v1/budgets",
            Some(json!({
                "category_id": category_id,
                "amount": 500.0,
                "start_date": "2025-01-01",
                "end_date": "2025-01-31",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status_code"], 201);
    assert_eq!(body["data"]["amount"], 500.0);
    let budget_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            "POST",
            "/api/v1/budgets",
            Some(json!({
                "category_id": category_id,
                "amount": 100.0,
                "start_date": "2025-01-15",
                "end_date": "2025-02-15",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status_code"], 409);

    let (status, body) = app
        .call("GET", &format!("/api/v1/budgets/{budget_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["start_date"], "2025-01-01");
}

#[tokio::test]
async fn budgets_are_private_to_their_owner() {
    let app = setup().await;
    let category_id = app.default_category_id().await;
    let (_, body) = app
        .call(
            "POST",
            "/api/v1/budgets",
            Some(json!({
                "category_id": category_id,
                "amount": 50.0,
                "start_date": "2025-03-01",
                "end_date": "2025-03-31",
            })),
        )
        .await;
    let budget_id = body["data"]["id"].as_str().unwrap().to_string();

    let other = issue_token(&app.db, Uuid::new_v4(), false).await;
    let (status, _) = app
        .send("GET", &format!("/api/v1/budgets/{budget_id}"), Some(&other), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn expense_validation_failures_are_bad_requests() {
    let app = setup().await;
    let category_id = app.default_category_id().await;

    let (status, _) = app
        .call(
            "POST",
            "/api/v1/expenses",
            Some(json!({ "category_id": category_id, "amount": 0.0, "date": "2025-01-10" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            "POST",
            "/api/v1/expenses",
            Some(json!({ "category_id": category_id, "amount": 10.0, "date": "2999-01-01" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            "POST",
            "/api/v1/expenses",
            Some(json!({
                "category_id": category_id,
                "amount": 10.0,
                "date": "2025-01-10",
                "is_recurring": true,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            "POST",
            "/api/v1/expenses",
            Some(json!({ "category_id": Uuid::new_v4(), "amount": 10.0, "date": "2025-01-10" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call("POST", "/api/v1/expenses", Some(json!({ "amount": "lots" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn expense_list_is_paginated() {
    let app = setup().await;
    let category_id = app.default_category_id().await;
    for (amount, day) in [(12.5, "2025-01-03"), (40.0, "2025-01-04"), (7.25, "2025-01-05")] {
        let (status, _) = app
            .call(
                "POST",
                "/api/v1/expenses",
                Some(json!({ "category_id": category_id, "amount": amount, "date": day })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .call("GET", "/api/v1/expenses?limit=2&sort=amount&order=desc", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total_count"], 3);
    assert_eq!(body["meta"]["total_pages"], 2);
    assert_eq!(body["meta"]["per_page"], 2);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["amount"], 40.0);
    assert_eq!(data[1]["amount"], 12.5);

    let (status, _) = app.call("GET", "/api/v1/expenses?limit=101", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.call("GET", "/api/v1/expenses?sort=colour", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn default_categories_cannot_be_changed() {
    let app = setup().await;
    let category_id = app.default_category_id().await;

    let (status, body) = app
        .call(
            "PUT",
            &format!("/api/v1/categories/{category_id}"),
            Some(json!({ "name": "Renamed" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["status_code"], 403);

    let (status, _) = app
        .call("DELETE", &format!("/api/v1/categories/{category_id}"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn custom_category_names_are_unique_per_user() {
    let app = setup().await;

    let (status, body) = app
        .call(
            "POST",
            "/api/v1/categories",
            Some(json!({ "name": "Coffee", "color_code": "a0b1c2" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["color_code"], "#A0B1C2");
    assert_eq!(body["data"]["is_default"], false);

    let (status, _) = app
        .call("POST", "/api/v1/categories", Some(json!({ "name": "  coffee " })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app.call("GET", "/api/v1/categories", None).await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|category| category["name"].as_str())
        .collect();
    assert_eq!(names.len(), 11);
    assert_eq!(names.last(), Some(&"Coffee"));
}

#[tokio::test]
async fn budget_analysis_reports_spend() {
    let app = setup().await;
    let category_id = app.default_category_id().await;

    let (status, body) = app.call("GET", "/api/v1/budgets/analysis", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    app.call(
        "POST",
        "/api/v1/budgets",
        Some(json!({
            "category_id": category_id,
            "amount": 100.0,
            "start_date": "2025-02-01",
            "end_date": "2025-02-28",
        })),
    )
    .await;
    app.call(
        "POST",
        "/api/v1/expenses",
        Some(json!({ "category_id": category_id, "amount": 125.0, "date": "2025-02-10" })),
    )
    .await;

    let (status, body) = app
        .call(
            "GET",
            "/api/v1/budgets/analysis?start_date=2025-02-01&end_date=2025-02-28",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let row = &body["data"][0];
    assert_eq!(row["spent_amount"], 125.0);
    assert_eq!(row["remaining_amount"], -25.0);
    assert_eq!(row["percentage_used"], 125.0);
    assert_eq!(row["exceeds_budget"], true);
}

#[tokio::test]
async fn expense_analysis_groups_by_period() {
    let app = setup().await;
    let category_id = app.default_category_id().await;
    for (amount, day) in [(10.0, "2025-01-03"), (20.0, "2025-01-20"), (30.0, "2025-02-02")] {
        app.call(
            "POST",
            "/api/v1/expenses",
            Some(json!({ "category_id": category_id, "amount": amount, "date": day })),
        )
        .await;
    }

    let (status, body) = app
        .call("GET", "/api/v1/expenses/analysis?period=month", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["period"], "month");
    assert_eq!(data["totals"]["total_amount"], 60.0);
    assert_eq!(data["totals"]["expense_count"], 3);
    assert_eq!(data["timeline"]["periods"].as_array().unwrap().len(), 2);
    assert_eq!(data["most_frequent_category"]["expense_count"], 3);
    assert_eq!(data["unavailable"], json!([]));

    let (status, _) = app
        .call("GET", "/api/v1/expenses/analysis?period=fortnight", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_an_expense_hides_its_receipt() {
    let app = setup().await;
    let category_id = app.default_category_id().await;

    let (status, body) = app
        .call(
            "POST",
            "/api/v1/receipts",
            Some(json!({ "image_url": "https://img.example/r1.png" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let receipt_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            "POST",
            "/api/v1/expenses",
            Some(json!({
                "category_id": category_id,
                "amount": 9.99,
                "date": "2025-01-10",
                "receipt_id": receipt_id,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let expense_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = app
        .call("GET", &format!("/api/v1/receipts/{receipt_id}"), None)
        .await;
    assert_eq!(body["data"]["expense_id"], expense_id.as_str());

    let (status, _) = app
        .call("DELETE", &format!("/api/v1/expenses/{expense_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call("GET", &format!("/api/v1/expenses/{expense_id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .call("GET", &format!("/api/v1/receipts/{receipt_id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
