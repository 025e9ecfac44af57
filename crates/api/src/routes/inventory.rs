//! Inventory endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::ProductId;
use domain::inventory::{AdjustmentReason, InventoryCommand};
use messaging::routing::queues;
use messaging::{CommandEnvelope, MessageBroker};
use serde::Deserialize;
use storage::StateStore;

use crate::error::ApiError;

use super::{AcceptedResponse, AppState};

/// Body of POST /inventory/{sku}/stock.
#[derive(Debug, Deserialize)]
pub struct SetStockRequest {
    pub quantity: u32,
    #[serde(default)]
    pub reason: AdjustmentReason,
}

/// POST /inventory/{sku}/stock — enqueue a stock adjustment.
#[tracing::instrument(skip(state, req))]
pub async fn set_stock<S, B>(
    State(state): State<Arc<AppState<S, B>>>,
    Path(sku): Path<String>,
    Json(req): Json<SetStockRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError>
where
    S: StateStore + 'static,
    B: MessageBroker + 'static,
{
    let envelope = CommandEnvelope::wrap(InventoryCommand::SetStock {
        product_id: ProductId::new(sku),
        quantity: req.quantity,
        reason: req.reason,
    });
    let command_id = envelope.command_id;

    state
        .broker
        .send_command(queues::INVENTORY_COMMANDS, envelope.into_message()?)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            command_id: command_id.to_string(),
            order_id: None,
        }),
    ))
}

/// GET /inventory/{sku} — current stock level from the read model.
#[tracing::instrument(skip(state))]
pub async fn get<S, B>(
    State(state): State<Arc<AppState<S, B>>>,
    Path(sku): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError>
where
    S: StateStore + 'static,
    B: MessageBroker + 'static,
{
    let product_id = ProductId::new(sku);
    match state.stock.get(&product_id).await {
        Some(available) => Ok(Json(serde_json::json!({
            "product_id": product_id,
            "available": available,
        }))),
        None => Err(ApiError::NotFound(format!(
            "no stock record for {product_id}"
        ))),
    }
}
