//! HTTP boundary for the checkout platform.
//!
//! The API is accept-and-enqueue only: command endpoints validate shape,
//! wrap a command envelope, publish it, and answer 202 with the command ID.
//! They never wait for the saga. Reads are answered from the projection
//! views, which callers poll for a checkout's eventual outcome.

pub mod config;
pub mod error;
pub mod routes;
pub mod workers;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{delete, get, post};
use messaging::{InMemoryBroker, MessageBroker};
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{OrderDetailsView, ProjectionWorker, StockLevelsView};
use saga::InMemorySagaStore;
use storage::{InMemoryStateStore, StateStore};
use tokio::task::JoinHandle;

pub use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, B>(state: Arc<AppState<S, B>>, metrics_handle: PrometheusHandle) -> Router
where
    S: StateStore + 'static,
    B: MessageBroker + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/checkout", post(routes::checkout::place::<S, B>))
        .route(
            "/carts/{guest_token}/items",
            post(routes::carts::add_item::<S, B>),
        )
        .route(
            "/carts/{guest_token}/items/{sku}",
            delete(routes::carts::remove_item::<S, B>),
        )
        .route("/products", post(routes::products::create::<S, B>))
        .route(
            "/products/{sku}/price",
            post(routes::products::change_price::<S, B>),
        )
        .route(
            "/inventory/{sku}/stock",
            post(routes::inventory::set_stock::<S, B>),
        )
        .route("/inventory/{sku}", get(routes::inventory::get::<S, B>))
        .route("/orders/{id}", get(routes::orders::get::<S, B>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Wires the whole platform over in-memory infrastructure: state store,
/// broker, saga store, projections, and all background workers.
///
/// Returns the shared application state and the worker task handles.
pub async fn create_in_memory_stack(
    outbox_poll: Duration,
) -> messaging::Result<(
    Arc<AppState<InMemoryStateStore, InMemoryBroker>>,
    Vec<JoinHandle<()>>,
)> {
    let store = Arc::new(InMemoryStateStore::new());
    let broker = Arc::new(InMemoryBroker::new());
    let sagas = Arc::new(InMemorySagaStore::new());

    let orders = Arc::new(OrderDetailsView::new(store.clone()));
    let stock = Arc::new(StockLevelsView::new(store.clone()));

    let mut projection_worker = ProjectionWorker::new();
    projection_worker.register(orders.clone());
    projection_worker.register(stock.clone());

    let handles = workers::spawn_workers(
        store.clone(),
        sagas,
        broker.clone(),
        projection_worker,
        outbox_poll,
    )
    .await?;

    let state = Arc::new(AppState {
        broker,
        orders,
        stock,
    });

    Ok((state, handles))
}
