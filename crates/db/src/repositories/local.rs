use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, trace};

use clientela_core::domain::customer::{
    Customer, CustomerId, CustomerPatch, DeleteAck, NewCustomer,
};
use clientela_core::errors::StoreError;

use super::{fresh_id, operation_failure, CustomerStore};
use crate::latency::{SimulatedLatency, StoreOperation};
use crate::slot::{SlotError, StorageSlot};

/// Keeps the whole collection as one JSON array in a [`StorageSlot`].
///
/// Every mutation reads the slot, changes the array in memory and writes it
/// back wholesale. `write_lock` makes this process the single writer.
pub struct LocalCustomerStore<S> {
    slot: S,
    latency: SimulatedLatency,
    write_lock: Mutex<()>,
}

impl<S> LocalCustomerStore<S>
where
    S: StorageSlot,
{
    pub fn new(slot: S) -> Self {
        Self::with_latency(slot, SimulatedLatency::none())
    }

    pub fn with_latency(slot: S, latency: SimulatedLatency) -> Self {
        Self { slot, latency, write_lock: Mutex::new(()) }
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    async fn load_all(&self) -> Result<Vec<Customer>, StoreError> {
        let payload = self.slot.read().await.map_err(slot_failure)?;
        match payload {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw).map_err(|error| {
                StoreError::Read(format!("slot `{}` holds malformed JSON: {error}", self.slot.key()))
            }),
            _ => Ok(Vec::new()),
        }
    }

    async fn save_all(&self, customers: &[Customer]) -> Result<(), StoreError> {
        let payload = serde_json::to_string(customers).map_err(operation_failure)?;
        self.slot.write(&payload).await.map_err(slot_failure)?;
        debug!(
            event_name = "store.slot.written",
            slot_key = self.slot.key(),
            record_count = customers.len(),
            "customer slot rewritten"
        );
        Ok(())
    }

    async fn begin(&self, operation: StoreOperation) {
        let delay = self.latency.delay_for(operation);
        if !delay.is_zero() {
            trace!(
                event_name = "store.latency.simulated",
                operation = operation.as_str(),
                delay_ms = delay.as_millis() as u64,
                "delaying store operation"
            );
        }
        self.latency.wait(operation).await;
    }
}

fn slot_failure(error: SlotError) -> StoreError {
    match error {
        SlotError::Read { .. } => StoreError::Read(error.to_string()),
        SlotError::Write { .. } => StoreError::Operation(error.to_string()),
    }
}

#[async_trait]
impl<S> CustomerStore for LocalCustomerStore<S>
where
    S: StorageSlot,
{
    async fn list(&self) -> Result<Vec<Customer>, StoreError> {
        self.begin(StoreOperation::List).await;
        self.load_all().await
    }

    async fn get_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, StoreError> {
        self.begin(StoreOperation::Get).await;
        let customers = self.load_all().await?;
        Ok(customers.into_iter().find(|customer| &customer.id == id))
    }

    async fn create(&self, fields: NewCustomer) -> Result<Customer, StoreError> {
        self.begin(StoreOperation::Create).await;
        fields.validate()?;

        let _guard = self.write_lock.lock().await;
        let mut customers = self.load_all().await?;
        let customer = fields.into_customer(fresh_id(&customers), Utc::now());
        customers.push(customer.clone());
        self.save_all(&customers).await?;

        info!(
            event_name = "store.customer.created",
            backend = "local",
            customer_id = %customer.id,
            "customer created"
        );
        Ok(customer)
    }

    async fn update(
        &self,
        id: &CustomerId,
        patch: CustomerPatch,
    ) -> Result<Customer, StoreError> {
        self.begin(StoreOperation::Update).await;

        let _guard = self.write_lock.lock().await;
        let mut customers = self.load_all().await?;
        let customer = customers
            .iter_mut()
            .find(|customer| &customer.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        patch.validate()?;
        customer.apply_patch(patch, Utc::now());
        let updated = customer.clone();
        self.save_all(&customers).await?;

        info!(
            event_name = "store.customer.updated",
            backend = "local",
            customer_id = %updated.id,
            "customer updated"
        );
        Ok(updated)
    }

    async fn delete(&self, id: &CustomerId) -> Result<DeleteAck, StoreError> {
        self.begin(StoreOperation::Delete).await;

        let _guard = self.write_lock.lock().await;
        let mut customers = self.load_all().await?;
        let before = customers.len();
        customers.retain(|customer| &customer.id != id);
        self.save_all(&customers).await?;

        info!(
            event_name = "store.customer.deleted",
            backend = "local",
            customer_id = %id,
            removed = before != customers.len(),
            "customer delete acknowledged"
        );
        Ok(DeleteAck::new(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tempfile::TempDir;
    use tokio::time::Instant;

    use clientela_core::domain::customer::CustomerId;
    use clientela_core::errors::StoreError;

    use super::LocalCustomerStore;
    use crate::latency::SimulatedLatency;
    use crate::repositories::{contract, CustomerStore};
    use crate::slot::{FileSlot, MemorySlot, StorageSlot};

    #[tokio::test]
    async fn memory_slot_store_satisfies_contract() {
        contract::run_all(|| async { LocalCustomerStore::new(MemorySlot::new("clientes")) }).await;
    }

    #[tokio::test]
    async fn file_slot_store_satisfies_contract() {
        let dir = TempDir::new().expect("tempdir");
        let counter = std::sync::atomic::AtomicUsize::new(0);
        contract::run_all(|| {
            let n = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let slot = FileSlot::new(dir.path(), format!("clientes-{n}"));
            async move { LocalCustomerStore::new(slot) }
        })
        .await;
    }

    #[tokio::test]
    async fn malformed_slot_payload_is_a_read_error() {
        let store = LocalCustomerStore::new(MemorySlot::with_payload("clientes", "{not json"));

        let error = store.list().await.expect_err("malformed payload must not read as empty");
        assert!(matches!(error, StoreError::Read(ref message) if message.contains("clientes")));

        let error = store
            .create(contract::fields("Ana", "Lopez", "a@x.com"))
            .await
            .expect_err("mutations must not overwrite a corrupt slot");
        assert_eq!(error.kind(), "read");
        assert_eq!(store.slot().read().await.expect("read").as_deref(), Some("{not json"));
    }

    #[tokio::test]
    async fn empty_payload_reads_as_empty_collection() {
        let store = LocalCustomerStore::new(MemorySlot::with_payload("clientes", ""));
        assert!(store.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn slot_holds_a_json_array_in_insertion_order() {
        let store = LocalCustomerStore::new(MemorySlot::new("clientes"));
        let ana = store.create(contract::fields("Ana", "Lopez", "a@x.com")).await.expect("create");
        let luis = store.create(contract::fields("Luis", "Perez", "l@x.com")).await.expect("create");

        let raw = store.slot().read().await.expect("read").expect("written");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        let ids: Vec<&str> = value
            .as_array()
            .expect("array")
            .iter()
            .filter_map(|record| record["id"].as_str())
            .collect();
        assert_eq!(ids, vec![ana.id.as_str(), luis.id.as_str()]);
        assert_eq!(value[0]["firstName"], "Ana");
    }

    #[tokio::test]
    async fn records_with_legacy_timestamp_ids_are_readable() {
        let payload = r#"[{"id":"1700000000000","firstName":"Juan","lastName":"García",
            "email":"juan@email.com","phone":"+503 0000-0000","address":"Calle Principal 123",
            "createdAt":"2024-01-01T00:00:00.000Z"}]"#;
        let store = LocalCustomerStore::new(MemorySlot::with_payload("clientes", payload));

        let found = store
            .get_by_id(&CustomerId::from("1700000000000"))
            .await
            .expect("get")
            .expect("legacy record present");
        assert_eq!(found.last_name, "García");
        assert_eq!(found.photo, None);
    }

    #[tokio::test]
    async fn file_slot_persists_across_store_instances() {
        let dir = TempDir::new().expect("tempdir");
        let created = {
            let store = LocalCustomerStore::new(FileSlot::new(dir.path(), "clientes"));
            store.create(contract::fields("Ana", "Lopez", "a@x.com")).await.expect("create")
        };

        let reopened = LocalCustomerStore::new(FileSlot::new(dir.path(), "clientes"));
        assert_eq!(reopened.list().await.expect("list"), vec![created]);
    }

    #[tokio::test(start_paused = true)]
    async fn configured_latency_delays_each_operation() {
        let store = LocalCustomerStore::with_latency(
            MemorySlot::new("clientes"),
            SimulatedLatency::network_like(),
        );

        let started = Instant::now();
        store.list().await.expect("list");
        assert!(started.elapsed() >= Duration::from_millis(200));

        let started = Instant::now();
        let created =
            store.create(contract::fields("Ana", "Lopez", "a@x.com")).await.expect("create");
        assert!(started.elapsed() >= Duration::from_millis(300));

        let started = Instant::now();
        store.get_by_id(&created.id).await.expect("get");
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn default_store_does_not_wait() {
        let store = LocalCustomerStore::new(MemorySlot::new("clientes"));

        let started = Instant::now();
        store.list().await.expect("list");
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn concurrent_creates_are_serialized() {
        let store = Arc::new(LocalCustomerStore::new(MemorySlot::new("clientes")));
        let mut handles = Vec::new();
        for n in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .create(contract::fields(&format!("Name{n}"), "Lopez", "a@x.com"))
                    .await
                    .expect("create")
            }));
        }
        for handle in handles {
            handle.await.expect("join");
        }

        assert_eq!(store.list().await.expect("list").len(), 16);
    }
}
