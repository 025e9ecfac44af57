//! Order read-model endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::OrderId;
use messaging::MessageBroker;
use projections::OrderDetails;
use storage::StateStore;

use crate::error::ApiError;

use super::AppState;

/// GET /orders/{id} — order details from the read model.
///
/// Returns 404 until the saga has created the order and the projection has
/// caught up; callers poll this endpoint for the checkout's eventual
/// outcome.
#[tracing::instrument(skip(state))]
pub async fn get<S, B>(
    State(state): State<Arc<AppState<S, B>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderDetails>, ApiError>
where
    S: StateStore + 'static,
    B: MessageBroker + 'static,
{
    let uuid = uuid::Uuid::parse_str(&id)
        .map_err(|e| ApiError::BadRequest(format!("invalid order id: {e}")))?;
    let order_id = OrderId::from_uuid(uuid);

    match state.orders.get(order_id).await {
        Some(details) => Ok(Json(details)),
        None => Err(ApiError::NotFound(format!("order {order_id} not found"))),
    }
}
