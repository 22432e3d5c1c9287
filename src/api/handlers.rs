//! REST API handlers
//!
//! Store calls are blocking, so every handler moves its work onto the
//! blocking pool through [`with_stores`].

use super::types::{EventListQuery, HealthResponse, PriceBody, PriceRangeQuery, StockListQuery};
use crate::db::Stores;
use crate::error::{AppError, Result};
use crate::models::{
    DateRange, Event, EventCreate, EventUpdate, Stock, StockCreate, StockPrice, StockUpdate,
};
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

type ApiState = State<Arc<AppState>>;

async fn with_stores<T, F>(state: &AppState, f: F) -> Result<T>
where
    F: FnOnce(&Stores) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let stores = state.stores.clone();
    tokio::task::spawn_blocking(move || f(&stores))
        .await
        .map_err(|e| AppError::Internal(format!("store task failed: {}", e)))?
}

// ============================================================================
// Health
// ============================================================================

pub async fn health_check(State(state): ApiState) -> Json<HealthResponse> {
    Json(HealthResponse::ok(
        state.stores.stock_backend(),
        state.stores.event_backend(),
    ))
}

// ============================================================================
// Stocks
// ============================================================================

/// GET /stocks
pub async fn list_stocks(
    State(state): ApiState,
    query: std::result::Result<Query<StockListQuery>, QueryRejection>,
) -> Result<Json<Vec<Stock>>> {
    let Query(query) = query?;
    let (filter, page) = query.into_parts()?;
    let stocks = with_stores(&state, move |s| s.get_stocks(&filter, page)).await?;
    Ok(Json(stocks))
}

/// POST /stocks
pub async fn create_stock(
    State(state): ApiState,
    body: std::result::Result<Json<StockCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<Stock>)> {
    let Json(input) = body?;
    let stock = with_stores(&state, move |s| s.create_stock(input)).await?;
    Ok((StatusCode::CREATED, Json(stock)))
}

/// GET /stocks/:symbol
pub async fn get_stock(
    State(state): ApiState,
    path: std::result::Result<Path<String>, PathRejection>,
) -> Result<Json<Stock>> {
    let Path(symbol) = path?;
    let stock = with_stores(&state, move |s| s.get_stock(&symbol)).await?;
    Ok(Json(stock))
}

/// PUT /stocks/:symbol
pub async fn update_stock(
    State(state): ApiState,
    path: std::result::Result<Path<String>, PathRejection>,
    body: std::result::Result<Json<StockUpdate>, JsonRejection>,
) -> Result<Json<Stock>> {
    let Path(symbol) = path?;
    let Json(input) = body?;
    let stock = with_stores(&state, move |s| s.update_stock(&symbol, &input)).await?;
    Ok(Json(stock))
}

/// DELETE /stocks/:symbol
pub async fn delete_stock(
    State(state): ApiState,
    path: std::result::Result<Path<String>, PathRejection>,
) -> Result<Json<Stock>> {
    let Path(symbol) = path?;
    let stock = with_stores(&state, move |s| s.remove_stock(&symbol)).await?;
    Ok(Json(stock))
}

// ============================================================================
// Prices
// ============================================================================

/// GET /stocks/:symbol/prices
pub async fn get_prices(
    State(state): ApiState,
    path: std::result::Result<Path<String>, PathRejection>,
    query: std::result::Result<Query<PriceRangeQuery>, QueryRejection>,
) -> Result<Json<Vec<StockPrice>>> {
    let Path(symbol) = path?;
    let Query(query) = query?;
    let range: DateRange = query.into();
    let prices = with_stores(&state, move |s| s.get_prices(&symbol, range)).await?;
    Ok(Json(prices))
}

/// POST /stocks/:symbol/prices
pub async fn upsert_price(
    State(state): ApiState,
    path: std::result::Result<Path<String>, PathRejection>,
    body: std::result::Result<Json<PriceBody>, JsonRejection>,
) -> Result<Json<StockPrice>> {
    let Path(symbol) = path?;
    let Json(body) = body?;
    let input = body.for_symbol(&symbol)?;
    let price = with_stores(&state, move |s| s.upsert_price(input)).await?;
    Ok(Json(price))
}

/// POST /stocks/:symbol/prices/batch
pub async fn batch_upsert_prices(
    State(state): ApiState,
    path: std::result::Result<Path<String>, PathRejection>,
    body: std::result::Result<Json<Vec<PriceBody>>, JsonRejection>,
) -> Result<Json<Vec<StockPrice>>> {
    let Path(symbol) = path?;
    let Json(bodies) = body?;
    let inputs = bodies
        .into_iter()
        .map(|b| b.for_symbol(&symbol))
        .collect::<Result<Vec<_>>>()?;
    let prices = with_stores(&state, move |s| s.batch_upsert_prices(inputs)).await?;
    Ok(Json(prices))
}

// ============================================================================
// Events
// ============================================================================

/// GET /stocks/:symbol/events
pub async fn list_stock_events(
    State(state): ApiState,
    path: std::result::Result<Path<String>, PathRejection>,
    query: std::result::Result<Query<EventListQuery>, QueryRejection>,
) -> Result<Json<Vec<Event>>> {
    let Path(symbol) = path?;
    let Query(query) = query?;
    let (mut filter, page) = query.into_parts()?;
    filter.stock_symbol = Some(symbol.clone());

    let events = with_stores(&state, move |s| {
        s.get_stock(&symbol)?;
        s.get_events(&filter, page)
    })
    .await?;
    Ok(Json(events))
}

/// GET /events
pub async fn list_events(
    State(state): ApiState,
    query: std::result::Result<Query<EventListQuery>, QueryRejection>,
) -> Result<Json<Vec<Event>>> {
    let Query(query) = query?;
    let (filter, page) = query.into_parts()?;
    let events = with_stores(&state, move |s| s.get_events(&filter, page)).await?;
    Ok(Json(events))
}

/// POST /events
pub async fn create_event(
    State(state): ApiState,
    body: std::result::Result<Json<EventCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<Event>)> {
    let Json(input) = body?;
    let event = with_stores(&state, move |s| s.create_event(input)).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// GET /events/:id
pub async fn get_event(
    State(state): ApiState,
    path: std::result::Result<Path<String>, PathRejection>,
) -> Result<Json<Event>> {
    let Path(id) = path?;
    let event = with_stores(&state, move |s| s.get_event(&id)).await?;
    Ok(Json(event))
}

/// PUT /events/:id
pub async fn update_event(
    State(state): ApiState,
    path: std::result::Result<Path<String>, PathRejection>,
    body: std::result::Result<Json<EventUpdate>, JsonRejection>,
) -> Result<Json<Event>> {
    let Path(id) = path?;
    let Json(input) = body?;
    let event = with_stores(&state, move |s| s.update_event(&id, &input)).await?;
    Ok(Json(event))
}

/// DELETE /events/:id
pub async fn delete_event(
    State(state): ApiState,
    path: std::result::Result<Path<String>, PathRejection>,
) -> Result<Json<Event>> {
    let Path(id) = path?;
    let event = with_stores(&state, move |s| s.remove_event(&id)).await?;
    Ok(Json(event))
}
