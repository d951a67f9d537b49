use std::sync::Arc;

use async_trait::async_trait;

use clientela_core::domain::customer::{
    filter_by_term, Customer, CustomerId, CustomerPatch, DeleteAck, NewCustomer,
};
use clientela_core::errors::StoreError;

pub mod local;
pub mod memory;
pub mod rest;
pub mod sql;

pub use local::LocalCustomerStore;
pub use memory::InMemoryCustomerStore;
pub use rest::RestCustomerStore;
pub use sql::SqlCustomerStore;

/// The customer collection contract shared by every backend.
///
/// Operations are async even where the backing medium is local, so callers
/// are written once against the same shape a networked store has.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// All records in insertion order.
    async fn list(&self) -> Result<Vec<Customer>, StoreError>;

    /// A miss is `Ok(None)`, never an error.
    async fn get_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, StoreError>;

    async fn create(&self, fields: NewCustomer) -> Result<Customer, StoreError>;

    /// Fails with [`StoreError::NotFound`] when `id` is absent.
    async fn update(&self, id: &CustomerId, patch: CustomerPatch)
        -> Result<Customer, StoreError>;

    /// Deleting an absent id is acknowledged like any other delete.
    async fn delete(&self, id: &CustomerId) -> Result<DeleteAck, StoreError>;

    async fn search(&self, term: &str) -> Result<Vec<Customer>, StoreError> {
        let customers = self.list().await?;
        Ok(filter_by_term(customers, term))
    }
}

#[async_trait]
impl<T> CustomerStore for Arc<T>
where
    T: CustomerStore + ?Sized,
{
    async fn list(&self) -> Result<Vec<Customer>, StoreError> {
        (**self).list().await
    }

    async fn get_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, StoreError> {
        (**self).get_by_id(id).await
    }

    async fn create(&self, fields: NewCustomer) -> Result<Customer, StoreError> {
        (**self).create(fields).await
    }

    async fn update(
        &self,
        id: &CustomerId,
        patch: CustomerPatch,
    ) -> Result<Customer, StoreError> {
        (**self).update(id, patch).await
    }

    async fn delete(&self, id: &CustomerId) -> Result<DeleteAck, StoreError> {
        (**self).delete(id).await
    }

    async fn search(&self, term: &str) -> Result<Vec<Customer>, StoreError> {
        (**self).search(term).await
    }
}

pub(crate) fn operation_failure(error: impl std::fmt::Display) -> StoreError {
    StoreError::Operation(error.to_string())
}

/// Picks an id not already present in `existing`.
pub(crate) fn fresh_id(existing: &[Customer]) -> CustomerId {
    loop {
        let candidate = CustomerId::generate();
        if !existing.iter().any(|customer| customer.id == candidate) {
            return candidate;
        }
    }
}
