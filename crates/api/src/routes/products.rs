//! Product catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{Money, ProductId};
use domain::catalog::CatalogCommand;
use messaging::routing::queues;
use messaging::{CommandEnvelope, MessageBroker};
use serde::Deserialize;
use storage::StateStore;

use crate::error::ApiError;

use super::{AcceptedResponse, AppState};

/// Body of POST /products.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub unit_price_cents: i64,
}

/// Body of POST /products/{sku}/price.
#[derive(Debug, Deserialize)]
pub struct ChangePriceRequest {
    pub unit_price_cents: i64,
}

/// POST /products — enqueue a create-product command.
#[tracing::instrument(skip(state, req))]
pub async fn create<S, B>(
    State(state): State<Arc<AppState<S, B>>>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError>
where
    S: StateStore + 'static,
    B: MessageBroker + 'static,
{
    if req.sku.trim().is_empty() {
        return Err(ApiError::BadRequest("sku must not be empty".to_string()));
    }
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }
    if req.unit_price_cents <= 0 {
        return Err(ApiError::BadRequest(
            "unit_price_cents must be greater than 0".to_string(),
        ));
    }

    let envelope = CommandEnvelope::wrap(CatalogCommand::CreateProduct {
        product_id: ProductId::new(req.sku),
        name: req.name,
        description: req.description,
        unit_price: Money::from_cents(req.unit_price_cents),
    });
    let command_id = envelope.command_id;

    state
        .broker
        .send_command(queues::CATALOG_COMMANDS, envelope.into_message()?)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            command_id: command_id.to_string(),
            order_id: None,
        }),
    ))
}

/// POST /products/{sku}/price — enqueue a price change.
#[tracing::instrument(skip(state, req))]
pub async fn change_price<S, B>(
    State(state): State<Arc<AppState<S, B>>>,
    Path(sku): Path<String>,
    Json(req): Json<ChangePriceRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError>
where
    S: StateStore + 'static,
    B: MessageBroker + 'static,
{
    if req.unit_price_cents <= 0 {
        return Err(ApiError::BadRequest(
            "unit_price_cents must be greater than 0".to_string(),
        ));
    }

    let envelope = CommandEnvelope::wrap(CatalogCommand::ChangeProductPrice {
        product_id: ProductId::new(sku),
        new_price: Money::from_cents(req.unit_price_cents),
    });
    let command_id = envelope.command_id;

    state
        .broker
        .send_command(queues::CATALOG_COMMANDS, envelope.into_message()?)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            command_id: command_id.to_string(),
            order_id: None,
        }),
    ))
}
