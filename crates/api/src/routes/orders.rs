//! Order ingress endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use bus::MessageBus;
use common::Money;
use domain::{Envelope, Order, OrderProduct, Product};
use orchestrator::SagaStore;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub products: Vec<OrderProductRequest>,
}

#[derive(Deserialize)]
pub struct OrderProductRequest {
    pub product: ProductRequest,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct ProductRequest {
    pub code: String,
    pub unit_value_cents: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderCreatedResponse {
    pub order_id: String,
    pub transaction_id: String,
}

/// POST /api/orders — accept a new order and start its saga.
///
/// This is the only synchronous, caller-visible failure path of the
/// system: a structurally invalid request is rejected here, before any
/// envelope is published. Everything after the 201 happens
/// asynchronously on the bus.
#[tracing::instrument(skip(state, req))]
pub async fn create<B, S>(
    State(state): State<Arc<AppState<B, S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError>
where
    B: MessageBus,
    S: SagaStore,
{
    let products = validate_products(&req)?;

    let order = Order::new(products);
    let envelope = Envelope::new(order);
    let response = OrderCreatedResponse {
        order_id: envelope.order_id.to_string(),
        transaction_id: envelope.transaction_id.to_string(),
    };

    tracing::info!(
        order_id = %envelope.order_id,
        transaction_id = %envelope.transaction_id,
        "order accepted, starting saga"
    );
    state.bus.publish(&state.topics.start_saga, &envelope).await;

    Ok((StatusCode::CREATED, Json(response)))
}

fn validate_products(req: &CreateOrderRequest) -> Result<Vec<OrderProduct>, ApiError> {
    if req.products.is_empty() {
        return Err(ApiError::BadRequest("product list is empty".to_string()));
    }

    let mut products = Vec::with_capacity(req.products.len());
    for line in &req.products {
        if line.product.code.trim().is_empty() {
            return Err(ApiError::BadRequest("product code must be informed".to_string()));
        }
        if line.quantity == 0 {
            return Err(ApiError::BadRequest(format!(
                "quantity for product {} must be positive",
                line.product.code
            )));
        }
        if line.product.unit_value_cents < 0 {
            return Err(ApiError::BadRequest(format!(
                "unit value for product {} must not be negative",
                line.product.code
            )));
        }
        products.push(OrderProduct::new(
            Product::new(
                line.product.code.clone(),
                Money::from_cents(line.product.unit_value_cents),
            ),
            line.quantity,
        ));
    }
    Ok(products)
}
