//! Checkout endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::{GuestToken, OrderId};
use domain::checkout::CheckoutCommand;
use domain::order::{CustomerInfo, ShippingAddress};
use messaging::routing::queues;
use messaging::{CommandEnvelope, MessageBroker};
use serde::Deserialize;
use storage::StateStore;

use crate::error::ApiError;

use super::{AcceptedResponse, AppState};

/// Body of POST /checkout.
#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub guest_token: String,
    pub customer: CustomerInfo,
    pub address: ShippingAddress,
    pub idempotency_key: String,
}

impl PlaceOrderRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.guest_token.trim().is_empty() {
            return Err(ApiError::BadRequest("guest_token must not be empty".to_string()));
        }
        if self.idempotency_key.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "idempotency_key must not be empty".to_string(),
            ));
        }
        if !self.customer.email.contains('@') {
            return Err(ApiError::BadRequest("customer.email is not valid".to_string()));
        }
        if self.address.address_line1.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "address.address_line1 must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// POST /checkout — validate shape, enqueue the checkout command, and
/// return 202 immediately; the saga runs asynchronously.
#[tracing::instrument(skip(state, req))]
pub async fn place<S, B>(
    State(state): State<Arc<AppState<S, B>>>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError>
where
    S: StateStore + 'static,
    B: MessageBroker + 'static,
{
    req.validate()?;

    let order_id = OrderId::for_idempotency_key(&req.idempotency_key);
    let envelope = CommandEnvelope::builder(CheckoutCommand::PlaceOrder {
        guest_token: GuestToken::new(req.guest_token),
        customer: req.customer,
        address: req.address,
        idempotency_key: req.idempotency_key,
    })
    .correlation_id(order_id.into())
    .build();
    let command_id = envelope.command_id;

    state
        .broker
        .send_command(queues::CHECKOUT_COMMANDS, envelope.into_message()?)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            command_id: command_id.to_string(),
            order_id: Some(order_id.to_string()),
        }),
    ))
}
