use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use clientela_core::domain::customer::{
    Customer, CustomerId, CustomerPatch, DeleteAck, NewCustomer,
};
use clientela_core::errors::StoreError;

use super::{fresh_id, CustomerStore};

#[derive(Default)]
pub struct InMemoryCustomerStore {
    customers: RwLock<Vec<Customer>>,
}

#[async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn list(&self) -> Result<Vec<Customer>, StoreError> {
        Ok(self.customers.read().await.clone())
    }

    async fn get_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, StoreError> {
        let customers = self.customers.read().await;
        Ok(customers.iter().find(|customer| &customer.id == id).cloned())
    }

    async fn create(&self, fields: NewCustomer) -> Result<Customer, StoreError> {
        fields.validate()?;
        let mut customers = self.customers.write().await;
        let customer = fields.into_customer(fresh_id(&customers), Utc::now());
        customers.push(customer.clone());
        Ok(customer)
    }

    async fn update(
        &self,
        id: &CustomerId,
        patch: CustomerPatch,
    ) -> Result<Customer, StoreError> {
        let mut customers = self.customers.write().await;
        let customer = customers
            .iter_mut()
            .find(|customer| &customer.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        patch.validate()?;
        customer.apply_patch(patch, Utc::now());
        Ok(customer.clone())
    }

    async fn delete(&self, id: &CustomerId) -> Result<DeleteAck, StoreError> {
        self.customers.write().await.retain(|customer| &customer.id != id);
        Ok(DeleteAck::new(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::InMemoryCustomerStore;
    use crate::repositories::contract;

    #[tokio::test]
    async fn in_memory_store_satisfies_contract() {
        contract::run_all(|| async { InMemoryCustomerStore::default() }).await;
    }
}
