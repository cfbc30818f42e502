use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::session::Session;
use crate::shared::error::ApiError;
use crate::shared::models::schema::{addons, subscriptions};
use crate::shared::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct Subscription {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = addons)]
pub struct Addon {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAddonRequest {
    pub name: String,
    pub description: Option<String>,
}

pub async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
    _session: Session,
) -> Result<Json<Vec<Subscription>>, ApiError> {
    let mut conn = state.conn.get().map_err(ApiError::db)?;
    let rows: Vec<Subscription> = subscriptions::table
        .order(subscriptions::name.asc())
        .load(&mut conn)?;
    Ok(Json(rows))
}

pub async fn create_subscription(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Json(req): Json<CreateSubscriptionRequest>,
) -> Result<Json<Subscription>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("subscription name is required".to_string()));
    }

    let mut conn = state.conn.get().map_err(ApiError::db)?;
    let row = Subscription {
        id: Uuid::new_v4(),
        name: req.name.trim().to_string(),
        description: req.description,
        price_cents: req.price_cents.unwrap_or(0),
        created_at: Utc::now(),
    };
    diesel::insert_into(subscriptions::table)
        .values(&row)
        .execute(&mut conn)?;
    Ok(Json(row))
}

pub async fn list_addons(
    State(state): State<Arc<AppState>>,
    _session: Session,
) -> Result<Json<Vec<Addon>>, ApiError> {
    let mut conn = state.conn.get().map_err(ApiError::db)?;
    let rows: Vec<Addon> = addons::table.order(addons::name.asc()).load(&mut conn)?;
    Ok(Json(rows))
}

pub async fn create_addon(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Json(req): Json<CreateAddonRequest>,
) -> Result<Json<Addon>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("addon name is required".to_string()));
    }

    let mut conn = state.conn.get().map_err(ApiError::db)?;
    let row = Addon {
        id: Uuid::new_v4(),
        name: req.name.trim().to_string(),
        description: req.description,
        created_at: Utc::now(),
    };
    diesel::insert_into(addons::table)
        .values(&row)
        .execute(&mut conn)?;
    Ok(Json(row))
}

pub fn configure_catalog_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/subscriptions",
            get(list_subscriptions).post(create_subscription),
        )
        .route("/api/addons", get(list_addons).post(create_addon))
}
