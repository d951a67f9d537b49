use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::{info, warn};

use clientela_core::domain::customer::{
    Customer, CustomerId, CustomerPatch, DeleteAck, NewCustomer,
};
use clientela_core::errors::StoreError;

use super::{operation_failure, CustomerStore};
use crate::DbPool;

/// Per-record keyed access to the `customer` table. Insertion order is the
/// autoincrement `seq` column.
pub struct SqlCustomerStore {
    pool: DbPool,
}

impl SqlCustomerStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "SELECT id, first_name, last_name, email, phone, address, photo,
        created_at, updated_at
     FROM customer";

fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Read(format!("invalid {column} `{value}`: {e}")))
}

fn row_to_customer(row: &sqlx::sqlite::SqliteRow) -> Result<Customer, StoreError> {
    let decode = |e: sqlx::Error| StoreError::Read(e.to_string());

    let id: String = row.try_get("id").map_err(decode)?;
    let first_name: String = row.try_get("first_name").map_err(decode)?;
    let last_name: String = row.try_get("last_name").map_err(decode)?;
    let email: String = row.try_get("email").map_err(decode)?;
    let phone: String = row.try_get("phone").map_err(decode)?;
    let address: String = row.try_get("address").map_err(decode)?;
    let photo: Option<String> = row.try_get("photo").map_err(decode)?;
    let created_at_str: String = row.try_get("created_at").map_err(decode)?;
    let updated_at_str: Option<String> = row.try_get("updated_at").map_err(decode)?;

    let created_at = parse_timestamp("created_at", &created_at_str)?;
    let updated_at =
        updated_at_str.map(|value| parse_timestamp("updated_at", &value)).transpose()?;

    Ok(Customer {
        id: CustomerId(id),
        first_name,
        last_name,
        email,
        phone,
        address,
        photo,
        created_at,
        updated_at,
    })
}

const MAX_ID_ATTEMPTS: usize = 3;

impl SqlCustomerStore {
    async fn insert(&self, customer: &Customer) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO customer (id, first_name, last_name, email, phone, address, photo,
                                   created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL)",
        )
        .bind(&customer.id.0)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(&customer.photo)
        .bind(customer.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map(|_| ())
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl CustomerStore for SqlCustomerStore {
    async fn list(&self) -> Result<Vec<Customer>, StoreError> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY seq ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(operation_failure)?;

        rows.iter().map(row_to_customer).collect::<Result<Vec<_>, _>>()
    }

    async fn get_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, StoreError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(operation_failure)?;

        row.as_ref().map(row_to_customer).transpose()
    }

    async fn create(&self, fields: NewCustomer) -> Result<Customer, StoreError> {
        fields.validate()?;
        let created_at = Utc::now();

        for _ in 0..MAX_ID_ATTEMPTS {
            let customer = fields.clone().into_customer(CustomerId::generate(), created_at);
            match self.insert(&customer).await {
                Ok(()) => {
                    info!(
                        event_name = "store.customer.created",
                        backend = "sqlite",
                        customer_id = %customer.id,
                        "customer created"
                    );
                    return Ok(customer);
                }
                Err(error) if is_unique_violation(&error) => {
                    warn!(
                        event_name = "store.customer.id_collision",
                        backend = "sqlite",
                        customer_id = %customer.id,
                        "generated id already taken, retrying"
                    );
                }
                Err(error) => return Err(operation_failure(error)),
            }
        }

        Err(StoreError::Operation(format!(
            "no unique customer id after {MAX_ID_ATTEMPTS} attempts"
        )))
    }

    async fn update(
        &self,
        id: &CustomerId,
        patch: CustomerPatch,
    ) -> Result<Customer, StoreError> {
        let mut tx = self.pool.begin().await.map_err(operation_failure)?;

        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(operation_failure)?;
        let mut customer = match row {
            Some(ref r) => row_to_customer(r)?,
            None => return Err(StoreError::NotFound(id.clone())),
        };
        patch.validate()?;
        customer.apply_patch(patch, Utc::now());

        sqlx::query(
            "UPDATE customer SET
                 first_name = ?, last_name = ?, email = ?, phone = ?, address = ?,
                 photo = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(&customer.photo)
        .bind(customer.updated_at.map(|dt| dt.to_rfc3339()))
        .bind(&customer.id.0)
        .execute(&mut *tx)
        .await
        .map_err(operation_failure)?;
        tx.commit().await.map_err(operation_failure)?;

        info!(
            event_name = "store.customer.updated",
            backend = "sqlite",
            customer_id = %customer.id,
            "customer updated"
        );
        Ok(customer)
    }

    async fn delete(&self, id: &CustomerId) -> Result<DeleteAck, StoreError> {
        let result = sqlx::query("DELETE FROM customer WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await
            .map_err(operation_failure)?;

        info!(
            event_name = "store.customer.deleted",
            backend = "sqlite",
            customer_id = %id,
            removed = result.rows_affected() > 0,
            "customer delete acknowledged"
        );
        Ok(DeleteAck::new(id.clone()))
    }
}
