//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{GuestToken, ProductId};
use domain::cart::CartCommand;
use messaging::routing::queues;
use messaging::{CommandEnvelope, MessageBroker};
use serde::Deserialize;
use storage::StateStore;

use crate::error::ApiError;

use super::{AcceptedResponse, AppState};

/// Body of POST /carts/{guest_token}/items.
#[derive(Debug, Deserialize)]
pub struct AddCartItemRequest {
    pub product_id: String,
    pub quantity: u32,
}

/// POST /carts/{guest_token}/items — enqueue an add-to-cart command.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<S, B>(
    State(state): State<Arc<AppState<S, B>>>,
    Path(guest_token): Path<String>,
    Json(req): Json<AddCartItemRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError>
where
    S: StateStore + 'static,
    B: MessageBroker + 'static,
{
    if req.quantity == 0 {
        return Err(ApiError::BadRequest("quantity must be at least 1".to_string()));
    }
    if req.product_id.trim().is_empty() {
        return Err(ApiError::BadRequest("product_id must not be empty".to_string()));
    }

    let envelope = CommandEnvelope::wrap(CartCommand::AddCartItem {
        guest_token: GuestToken::new(guest_token),
        product_id: ProductId::new(req.product_id),
        quantity: req.quantity,
    });
    let command_id = envelope.command_id;

    state
        .broker
        .send_command(queues::CART_COMMANDS, envelope.into_message()?)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            command_id: command_id.to_string(),
            order_id: None,
        }),
    ))
}

/// DELETE /carts/{guest_token}/items/{sku} — enqueue a remove-item command.
#[tracing::instrument(skip(state))]
pub async fn remove_item<S, B>(
    State(state): State<Arc<AppState<S, B>>>,
    Path((guest_token, sku)): Path<(String, String)>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError>
where
    S: StateStore + 'static,
    B: MessageBroker + 'static,
{
    let envelope = CommandEnvelope::wrap(CartCommand::RemoveCartItem {
        guest_token: GuestToken::new(guest_token),
        product_id: ProductId::new(sku),
    });
    let command_id = envelope.command_id;

    state
        .broker
        .send_command(queues::CART_COMMANDS, envelope.into_message()?)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            command_id: command_id.to_string(),
            order_id: None,
        }),
    ))
}
