//! Saga and event query endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use bus::MessageBus;
use common::{OrderId, TransactionId};
use domain::Envelope;
use orchestrator::SagaStore;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct StepResponse {
    pub stage: String,
    pub status: String,
    pub message: String,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct SagaResponse {
    pub order_id: String,
    pub transaction_id: String,
    pub current_stage: Option<String>,
    pub status: String,
    pub total_amount_cents: i64,
    pub total_items: u32,
    pub created_at: String,
    pub history: Vec<StepResponse>,
}

impl From<Envelope> for SagaResponse {
    fn from(envelope: Envelope) -> Self {
        Self {
            order_id: envelope.order_id.to_string(),
            transaction_id: envelope.transaction_id.to_string(),
            current_stage: envelope.current_stage.map(|stage| stage.to_string()),
            status: envelope.status.to_string(),
            total_amount_cents: envelope.payload.total_amount.cents(),
            total_items: envelope.payload.total_items,
            created_at: envelope.created_at.to_rfc3339(),
            history: envelope
                .history
                .into_iter()
                .map(|step| StepResponse {
                    stage: step.stage.to_string(),
                    status: step.status.to_string(),
                    message: step.message,
                    timestamp: step.timestamp.to_rfc3339(),
                })
                .collect(),
        }
    }
}

/// GET /api/sagas/{transaction_id} — load one saga with its history.
#[tracing::instrument(skip(state))]
pub async fn get_saga<B, S>(
    State(state): State<Arc<AppState<B, S>>>,
    Path(transaction_id): Path<String>,
) -> Result<Json<SagaResponse>, ApiError>
where
    B: MessageBus,
    S: SagaStore,
{
    let transaction_id = TransactionId::parse(transaction_id.as_str())
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let envelope = state
        .store
        .get(&transaction_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Saga {transaction_id} not found")))?;

    Ok(Json(SagaResponse::from(envelope)))
}

#[derive(Deserialize)]
pub struct EventFilters {
    pub order_id: Option<String>,
    pub transaction_id: Option<String>,
}

/// GET /api/events — list sagas by order ID or transaction ID.
///
/// At least one filter is required; the transaction filter wins when
/// both are present.
#[tracing::instrument(skip(state, filters))]
pub async fn find_events<B, S>(
    State(state): State<Arc<AppState<B, S>>>,
    Query(filters): Query<EventFilters>,
) -> Result<Json<Vec<SagaResponse>>, ApiError>
where
    B: MessageBus,
    S: SagaStore,
{
    if let Some(raw) = filters.transaction_id {
        let transaction_id = TransactionId::parse(raw.as_str())
            .map_err(|err| ApiError::BadRequest(err.to_string()))?;
        let found = state.store.get(&transaction_id).await?;
        return Ok(Json(found.into_iter().map(SagaResponse::from).collect()));
    }

    if let Some(raw) = filters.order_id {
        let uuid = uuid::Uuid::parse_str(&raw)
            .map_err(|err| ApiError::BadRequest(format!("Invalid order_id: {err}")))?;
        let found = state.store.find_by_order(OrderId::from(uuid)).await?;
        return Ok(Json(found.into_iter().map(SagaResponse::from).collect()));
    }

    Err(ApiError::BadRequest(
        "order_id or transaction_id must be informed".to_string(),
    ))
}
