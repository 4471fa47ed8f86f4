use api_types::envelope::ApiResponse;
use axum::{
    Json, Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use chrono::Utc;
use sea_orm::{DatabaseConnection, EntityTrait};
use uuid::Uuid;

use std::sync::Arc;

use crate::{ServerError, auth, budgets, categories, expenses, receipts};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
}

/// Identity resolved by the auth middleware, available to every protected
/// handler as an `Extension`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
}

async fn auth(
    State(state): State<ServerState>,
    auth_header: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Ok(TypedHeader(Authorization(bearer))) = auth_header else {
        return Err(ServerError::Unauthorized(
            "missing or malformed bearer token".to_string(),
        ));
    };

    let record = auth::Entity::find_by_id(bearer.token().to_string())
        .one(&state.db)
        .await
        .map_err(|err| {
            tracing::error!("token lookup failed: {err}");
            ServerError::Unauthorized("invalid token".to_string())
        })?;

    let Some(record) = record else {
        return Err(ServerError::Unauthorized("invalid token".to_string()));
    };
    if !record.is_valid_at(Utc::now()) {
        return Err(ServerError::Unauthorized(
            "token expired or revoked".to_string(),
        ));
    }

    request.extensions_mut().insert(AuthUser {
        user_id: record.user_id,
    });
    Ok(next.run(request).await)
}

async fn health() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::new(200, "ok", "healthy"))
}

/// Build the full application router.
///
/// Everything under `/api/v1` requires a bearer token, except `/api/v1/health`.
pub fn app(state: ServerState) -> Router {
    let api = Router::new()
        .route("/budgets", post(budgets::create).get(budgets::list))
        .route("/budgets/analysis", get(budgets::analysis))
        .route(
            "/budgets/{id}",
            get(budgets::get)
                .put(budgets::update)
                .delete(budgets::delete),
        )
        .route("/expenses", post(expenses::create).get(expenses::list))
        .route("/expenses/analysis", get(expenses::analysis))
        .route(
            "/expenses/{id}",
            get(expenses::get)
                .put(expenses::update)
                .delete(expenses::delete),
        )
        .route(
            "/categories",
            get(categories::list).post(categories::create),
        )
        .route("/categories/defaults", get(categories::defaults))
        .route(
            "/categories/{id}",
            get(categories::get)
                .put(categories::update)
                .delete(categories::delete),
        )
        .route("/categories/{id}/summary", get(categories::summary))
        .route("/categories/{id}/budget", get(categories::budget_status))
        .route("/receipts", post(receipts::create))
        .route("/receipts/{id}", get(receipts::get))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .route("/health", get(health));

    Router::new().nest("/api/v1", api).with_state(state)
}

pub async fn run(engine: Engine, db: DatabaseConnection, addr: &str) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, db, listener).await {
        tracing::error!("server failed: {err}");
    }
}

async fn run_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        db,
    };

    axum::serve(listener, app(state)).await
}
