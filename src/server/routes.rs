//! REST route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<ServerState>`.
//! Domain errors map onto HTTP statuses here and nowhere else.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::ledger::ListStore;
use crate::types::{
    AddCardOutcome, BinderError, CardList, CardRef, GameType, ListWithValuation, QuantityOp,
};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct ServerState {
    pub store: ListStore,
}

pub type AppState = Arc<ServerState>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateListRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "default_owner")]
    pub created_by: String,
}

fn default_owner() -> String {
    "anonymous".to_string()
}

#[derive(Debug, Deserialize)]
pub struct CardRequest {
    pub game: String,
    pub card_id: String,
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub game: String,
    pub card_id: String,
    pub op: String,
}

#[derive(Debug, Deserialize)]
pub struct CollectedRequest {
    pub game: String,
    pub card_id: String,
    pub collected: bool,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RevalueResponse {
    pub revalued: usize,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Wrapper turning `BinderError` into an HTTP response.
pub struct ApiError(pub BinderError);

impl From<BinderError> for ApiError {
    fn from(e: BinderError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            BinderError::ListNotFound(_)
            | BinderError::CardNotFound { .. }
            | BinderError::CardNotInList { .. } => (StatusCode::NOT_FOUND, self.0.to_string()),
            BinderError::NothingToCollect => {
                (StatusCode::BAD_REQUEST, "nothing to collect".to_string())
            }
            BinderError::NothingToUncollect => {
                (StatusCode::BAD_REQUEST, "nothing to uncollect".to_string())
            }
            BinderError::InvalidCardType(_) | BinderError::InvalidOperation(_) => {
                (StatusCode::BAD_REQUEST, self.0.to_string())
            }
            BinderError::CorruptMembership(_) | BinderError::Storage(_) => {
                tracing::error!(error = %self.0, "Internal error serving request");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

fn card_ref(game: &str, card_id: &str) -> Result<CardRef, ApiError> {
    let game: GameType = game.parse()?;
    Ok(CardRef::new(game, card_id))
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// POST /api/lists
pub async fn create_list(
    State(state): State<AppState>,
    Json(req): Json<CreateListRequest>,
) -> Result<(StatusCode, Json<CardList>), ApiError> {
    let list = state
        .store
        .create_list(&req.name, &req.kind, &req.created_by)
        .await?;
    Ok((StatusCode::CREATED, Json(list)))
}

/// GET /api/lists/:id — the full-recompute read path.
pub async fn get_list(
    State(state): State<AppState>,
    Path(list_id): Path<i64>,
) -> Result<Json<ListWithValuation>, ApiError> {
    Ok(Json(state.store.get_with_valuation(list_id).await?))
}

/// DELETE /api/lists/:id
pub async fn delete_list(
    State(state): State<AppState>,
    Path(list_id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.store.delete_list(list_id).await?;
    Ok(Json(MessageResponse {
        message: "list deleted".to_string(),
    }))
}

/// POST /api/lists/:id/cards
pub async fn add_card(
    State(state): State<AppState>,
    Path(list_id): Path<i64>,
    Json(req): Json<CardRequest>,
) -> Result<Json<AddCardOutcome>, ApiError> {
    let card = card_ref(&req.game, &req.card_id)?;
    Ok(Json(state.store.add_card(list_id, &card).await?))
}

/// DELETE /api/lists/:id/cards
pub async fn remove_card(
    State(state): State<AppState>,
    Path(list_id): Path<i64>,
    Json(req): Json<CardRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let card = card_ref(&req.game, &req.card_id)?;
    state.store.remove_card(list_id, &card).await?;
    Ok(Json(MessageResponse {
        message: "card removed".to_string(),
    }))
}

/// POST /api/lists/:id/cards/quantity
pub async fn update_quantity(
    State(state): State<AppState>,
    Path(list_id): Path<i64>,
    Json(req): Json<QuantityRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let card = card_ref(&req.game, &req.card_id)?;
    let op: QuantityOp = req.op.parse()?;
    state.store.update_quantity(list_id, &card, op).await?;
    Ok(Json(MessageResponse {
        message: "quantity updated".to_string(),
    }))
}

/// POST /api/lists/:id/cards/collected
pub async fn set_collected(
    State(state): State<AppState>,
    Path(list_id): Path<i64>,
    Json(req): Json<CollectedRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let card = card_ref(&req.game, &req.card_id)?;
    state.store.set_collected(list_id, &card, req.collected).await?;
    Ok(Json(MessageResponse {
        message: "collection updated".to_string(),
    }))
}

/// POST /api/revalue — batch job entry point, idempotent.
pub async fn revalue(
    State(state): State<AppState>,
) -> Result<Json<RevalueResponse>, ApiError> {
    let revalued = state.store.revalue_flagged().await?;
    Ok(Json(RevalueResponse { revalued }))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
