//! Background workers: command consumers, saga manager, projections, and
//! the outbox relay.

use std::sync::Arc;
use std::time::Duration;

use domain::cart::{CartCommand, CartCommandHandler};
use domain::catalog::{CatalogCommand, CatalogCommandHandler};
use domain::checkout::{CheckoutCommand, CheckoutCommandHandler};
use domain::inventory::{InventoryCommand, InventoryCommandHandler};
use domain::order::{OrderCommand, OrderCommandHandler};
use messaging::routing::queues;
use messaging::MessageBroker;
use projections::ProjectionWorker;
use saga::{CheckoutSagaManager, SagaStore};
use storage::{OutboxRelay, StateStore};
use tokio::task::JoinHandle;

/// Spawns every background worker of the platform and returns their task
/// handles.
///
/// Workers run until their channels close; the demo deployment simply drops
/// the handles and lets process shutdown take everything down.
pub async fn spawn_workers<S, G, B>(
    store: Arc<S>,
    sagas: Arc<G>,
    broker: Arc<B>,
    projection_worker: ProjectionWorker,
    outbox_poll: Duration,
) -> messaging::Result<Vec<JoinHandle<()>>>
where
    S: StateStore + 'static,
    G: SagaStore + 'static,
    B: MessageBroker + 'static,
{
    let mut handles = Vec::new();

    macro_rules! spawn_command_consumer {
        ($queue:expr, $handler:expr, $command:ty) => {{
            let mut rx = broker.consume_commands($queue).await?;
            let handler = $handler;
            handles.push(tokio::spawn(async move {
                while let Some(message) = rx.recv().await {
                    match message.decode::<$command>() {
                        Ok(envelope) => {
                            if let Err(e) = handler.handle(envelope).await {
                                tracing::error!(
                                    queue = $queue,
                                    error = %e,
                                    "command handling failed"
                                );
                            }
                        }
                        Err(e) => {
                            tracing::error!(queue = $queue, error = %e, "malformed command message");
                        }
                    }
                }
            }));
        }};
    }

    spawn_command_consumer!(
        queues::CART_COMMANDS,
        CartCommandHandler::new(store.clone(), broker.clone()),
        CartCommand
    );
    spawn_command_consumer!(
        queues::CATALOG_COMMANDS,
        CatalogCommandHandler::new(store.clone(), broker.clone()),
        CatalogCommand
    );
    spawn_command_consumer!(
        queues::INVENTORY_COMMANDS,
        InventoryCommandHandler::new(store.clone(), broker.clone()),
        InventoryCommand
    );
    spawn_command_consumer!(
        queues::ORDER_COMMANDS,
        OrderCommandHandler::new(store.clone(), broker.clone()),
        OrderCommand
    );
    spawn_command_consumer!(
        queues::CHECKOUT_COMMANDS,
        CheckoutCommandHandler::new(store.clone(), broker.clone()),
        CheckoutCommand
    );

    // Saga manager over its event subscriptions.
    let saga_events = broker
        .subscribe_events(&CheckoutSagaManager::<G, S, B>::SUBSCRIPTIONS)
        .await?;
    let manager = CheckoutSagaManager::new(sagas, store.clone(), broker.clone());
    handles.push(tokio::spawn(async move {
        manager.run(saga_events).await;
    }));

    // Projection worker over the union of the views' subscriptions.
    let projection_events = broker
        .subscribe_events(&projection_worker.subscriptions())
        .await?;
    handles.push(tokio::spawn(async move {
        projection_worker.run(projection_events).await;
    }));

    // Outbox relay.
    let relay = OutboxRelay::new(store, broker).with_poll_interval(outbox_poll);
    handles.push(tokio::spawn(async move {
        relay.run(std::future::pending::<()>()).await;
    }));

    Ok(handles)
}
