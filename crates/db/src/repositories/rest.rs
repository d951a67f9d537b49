use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

use clientela_core::domain::customer::{
    Customer, CustomerId, CustomerPatch, DeleteAck, NewCustomer,
};
use clientela_core::errors::StoreError;

use super::{operation_failure, CustomerStore};

pub const COLLECTION_PATH: [&str; 2] = ["api", "clientes"];

/// Talks to a remote `/api/clientes` service exchanging the same JSON shape
/// the local slot stores.
#[derive(Clone, Debug)]
pub struct RestCustomerStore {
    client: Client,
    base_url: Url,
    api_token: Option<SecretString>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
    #[serde(default)]
    kind: Option<String>,
}

impl RestCustomerStore {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        api_token: Option<SecretString>,
    ) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StoreError::Operation(format!("invalid base url `{base_url}`: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Operation(format!("`{base_url}` cannot be used as a base url")));
        }
        let client = Client::builder().timeout(timeout).build().map_err(operation_failure)?;
        Ok(Self { client, base_url, api_token })
    }

    fn collection_url(&self) -> Url {
        self.resource_url(None)
    }

    fn resource_url(&self, id: Option<&CustomerId>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(COLLECTION_PATH);
            if let Some(id) = id {
                segments.push(id.as_str());
            }
        }
        url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, StoreError> {
        self.authorize(request).send().await.map_err(operation_failure)
    }
}

async fn decode_body<T>(response: Response) -> Result<T, StoreError>
where
    T: DeserializeOwned,
{
    let bytes = response.bytes().await.map_err(operation_failure)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| StoreError::Read(format!("unexpected response payload: {e}")))
}

async fn error_from_response(response: Response, id: Option<&CustomerId>) -> StoreError {
    let status = response.status();
    let body = response.json::<ApiErrorBody>().await.ok();
    let message = body
        .as_ref()
        .map(|body| body.error.clone())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    warn!(
        event_name = "store.rest.error_response",
        status = status.as_u16(),
        error = %message,
        "customer api returned an error"
    );

    match (status, body.and_then(|body| body.kind).as_deref(), id) {
        (StatusCode::NOT_FOUND, _, Some(id)) => StoreError::NotFound(id.clone()),
        (StatusCode::UNPROCESSABLE_ENTITY, _, _) | (StatusCode::BAD_REQUEST, _, _) => {
            StoreError::Validation(message)
        }
        (_, Some("read"), _) => StoreError::Read(message),
        _ => StoreError::Operation(format!("{status}: {message}")),
    }
}

#[async_trait]
impl CustomerStore for RestCustomerStore {
    async fn list(&self) -> Result<Vec<Customer>, StoreError> {
        let response = self.send(self.client.get(self.collection_url())).await?;
        if !response.status().is_success() {
            return Err(error_from_response(response, None).await);
        }
        decode_body(response).await
    }

    async fn get_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, StoreError> {
        let response = self.send(self.client.get(self.resource_url(Some(id)))).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(error_from_response(response, Some(id)).await);
        }
        decode_body(response).await.map(Some)
    }

    async fn create(&self, fields: NewCustomer) -> Result<Customer, StoreError> {
        let response = self.send(self.client.post(self.collection_url()).json(&fields)).await?;
        if !response.status().is_success() {
            return Err(error_from_response(response, None).await);
        }
        decode_body(response).await
    }

    async fn update(
        &self,
        id: &CustomerId,
        patch: CustomerPatch,
    ) -> Result<Customer, StoreError> {
        let response =
            self.send(self.client.put(self.resource_url(Some(id))).json(&patch)).await?;
        if !response.status().is_success() {
            return Err(error_from_response(response, Some(id)).await);
        }
        decode_body(response).await
    }

    async fn delete(&self, id: &CustomerId) -> Result<DeleteAck, StoreError> {
        let response = self.send(self.client.delete(self.resource_url(Some(id)))).await?;
        if !response.status().is_success() {
            return Err(error_from_response(response, None).await);
        }
        decode_body(response).await
    }
}
