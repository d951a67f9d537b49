//! REST surface for the customer collection under `/api/clientes`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use clientela_core::domain::customer::{
    Customer, CustomerId, CustomerPatch, DeleteAck, NewCustomer,
};
use clientela_core::errors::StoreError;
use clientela_db::CustomerStore;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

#[derive(Clone)]
pub struct ApiState {
    store: Arc<dyn CustomerStore>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiErrorBody {
    pub error: String,
    pub kind: String,
}

#[derive(Debug)]
pub struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            StoreError::Read(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StoreError::Operation(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        if status.is_server_error() {
            error!(
                event_name = "api.customers.failed",
                kind = self.0.kind(),
                error = %self.0,
                "customer request failed"
            );
        } else {
            warn!(
                event_name = "api.customers.rejected",
                kind = self.0.kind(),
                error = %self.0,
                "customer request rejected"
            );
        }

        let body = ApiErrorBody { error: self.0.to_string(), kind: self.0.kind().to_string() };
        (status, Json(body)).into_response()
    }
}

pub fn router(store: Arc<dyn CustomerStore>) -> Router {
    Router::new()
        .route("/api/clientes", get(list_customers).post(create_customer))
        .route(
            "/api/clientes/{id}",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        .with_state(ApiState { store })
}

pub async fn list_customers(
    State(state): State<ApiState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    let customers = match params.q.as_deref() {
        Some(term) => state.store.search(term).await?,
        None => state.store.list().await?,
    };
    Ok(Json(customers))
}

pub async fn get_customer(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Customer>, ApiError> {
    let id = CustomerId(id);
    match state.store.get_by_id(&id).await? {
        Some(customer) => Ok(Json(customer)),
        None => Err(StoreError::NotFound(id).into()),
    }
}

pub async fn create_customer(
    State(state): State<ApiState>,
    Json(fields): Json<NewCustomer>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    let customer = state.store.create(fields).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn update_customer(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(patch): Json<CustomerPatch>,
) -> Result<Json<Customer>, ApiError> {
    let customer = state.store.update(&CustomerId(id), patch).await?;
    Ok(Json(customer))
}

pub async fn delete_customer(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteAck>, ApiError> {
    let ack = state.store.delete(&CustomerId(id)).await?;
    Ok(Json(ack))
}
