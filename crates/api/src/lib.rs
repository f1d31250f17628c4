//! HTTP ingress and wiring for the order saga system.
//!
//! Provides the create-order endpoint that starts sagas, saga/event
//! query endpoints backed by the orchestrator's store, and health plus
//! Prometheus metrics routes, with structured logging throughout.

pub mod config;
pub mod error;
pub mod notify;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use bus::{InMemoryBus, MessageBus, Topics};
use metrics_exporter_prometheus::PrometheusHandle;
use orchestrator::{InMemorySagaStore, Orchestrator, SagaStore, SagaTopology};
use participants::{
    InventoryHandler, PaymentHandler, ProductValidationHandler, register_participant,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use notify::SagaEndingLogger;

/// Product codes seeded into the validation catalog and the inventory.
pub const DEFAULT_CATALOG: &[&str] = &["COMIC_BOOKS", "BOOKS", "MOVIES", "MUSIC"];

/// Initial stock level for each seeded product.
const DEFAULT_STOCK_PER_PRODUCT: u32 = 120;

/// Shared application state accessible from all handlers.
pub struct AppState<B, S> {
    pub bus: B,
    pub store: S,
    pub topics: Topics,
}

/// A fully wired in-process saga deployment.
///
/// The participant handlers are exposed so tests and operators can
/// inspect their private stores.
pub struct SagaRuntime {
    pub bus: InMemoryBus,
    pub store: InMemorySagaStore,
    pub topics: Topics,
    pub validation: Arc<ProductValidationHandler>,
    pub payment: Arc<PaymentHandler>,
    pub inventory: Arc<InventoryHandler>,
}

impl SagaRuntime {
    /// Application state for the HTTP router over this runtime.
    pub fn app_state(&self) -> Arc<AppState<InMemoryBus, InMemorySagaStore>> {
        Arc::new(AppState {
            bus: self.bus.clone(),
            store: self.store.clone(),
            topics: self.topics.clone(),
        })
    }
}

/// Wires the orchestrator, the three participants and the ending
/// notification consumer onto a fresh in-memory bus, with the default
/// topics, catalog and stock levels.
pub async fn create_default_runtime() -> SagaRuntime {
    let bus = InMemoryBus::new();
    let topics = Topics::default();
    let store = InMemorySagaStore::new();

    let orchestrator = Arc::new(Orchestrator::new(
        bus.clone(),
        store.clone(),
        SagaTopology::standard(&topics),
        topics.clone(),
    ));
    orchestrator.register().await;

    let validation = Arc::new(ProductValidationHandler::new(DEFAULT_CATALOG.iter().copied()));
    register_participant(
        &bus,
        Arc::clone(&validation),
        &topics.product_validation_success,
        &topics.product_validation_fail,
        &topics.orchestrator,
    )
    .await;

    let payment = Arc::new(PaymentHandler::new());
    register_participant(
        &bus,
        Arc::clone(&payment),
        &topics.payment_success,
        &topics.payment_fail,
        &topics.orchestrator,
    )
    .await;

    let inventory = Arc::new(InventoryHandler::new(
        DEFAULT_CATALOG
            .iter()
            .map(|code| (*code, DEFAULT_STOCK_PER_PRODUCT)),
    ));
    register_participant(
        &bus,
        Arc::clone(&inventory),
        &topics.inventory_success,
        &topics.inventory_fail,
        &topics.orchestrator,
    )
    .await;

    bus.subscribe(&topics.notify_ending, Arc::new(SagaEndingLogger)).await;

    SagaRuntime {
        bus,
        store,
        topics,
        validation,
        payment,
        inventory,
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<B, S>(
    state: Arc<AppState<B, S>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    B: MessageBus + 'static,
    S: SagaStore + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/api/orders", post(routes::orders::create::<B, S>))
        .route("/api/sagas/{transaction_id}", get(routes::events::get_saga::<B, S>))
        .route("/api/events", get(routes::events::find_events::<B, S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
