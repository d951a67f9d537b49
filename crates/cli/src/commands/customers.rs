use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use clientela_core::config::LoadOptions;
use clientela_core::domain::customer::{CustomerId, CustomerPatch, NewCustomer};
use clientela_core::domain::photo::{encode_data_url, mime_for_path};
use clientela_core::errors::StoreError;
use clientela_db::{open_store, CustomerStore};
use serde::Serialize;
use serde_json::Value;

use crate::commands::{run_blocking, CommandResult};

#[derive(Debug, Args)]
pub struct CreateArgs {
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub phone: String,
    #[arg(long)]
    pub address: String,
    #[arg(long, help = "Image file embedded as the customer photo")]
    pub photo: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    pub id: String,
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long, help = "Image file replacing the customer photo")]
    pub photo: Option<PathBuf>,
    #[arg(long, conflicts_with = "photo", help = "Remove the customer photo")]
    pub clear_photo: bool,
}

type Outcome = Result<(String, Option<Value>), StoreError>;

pub fn list(options: LoadOptions) -> CommandResult {
    with_store("list", options, |store| async move {
        let customers = store.list().await?;
        Ok((format!("{} customers", customers.len()), to_data(&customers)))
    })
}

pub fn show(options: LoadOptions, id: String) -> CommandResult {
    with_store("show", options, |store| async move {
        let id = CustomerId(id);
        match store.get_by_id(&id).await? {
            Some(customer) => Ok((format!("customer {}", customer.id), to_data(&customer))),
            None => Err(StoreError::NotFound(id)),
        }
    })
}

pub fn create(options: LoadOptions, args: CreateArgs) -> CommandResult {
    let photo = match args.photo.as_deref().map(photo_data_url).transpose() {
        Ok(photo) => photo,
        Err(message) => return CommandResult::failure("create", "photo_read", message, 6),
    };
    let fields = NewCustomer {
        first_name: args.first_name,
        last_name: args.last_name,
        email: args.email,
        phone: args.phone,
        address: args.address,
        photo,
    };

    with_store("create", options, |store| async move {
        let customer = store.create(fields).await?;
        Ok((format!("created customer {}", customer.id), to_data(&customer)))
    })
}

pub fn update(options: LoadOptions, args: UpdateArgs) -> CommandResult {
    let photo = if args.clear_photo {
        Some(None)
    } else {
        match args.photo.as_deref().map(photo_data_url).transpose() {
            Ok(photo) => photo.map(Some),
            Err(message) => return CommandResult::failure("update", "photo_read", message, 6),
        }
    };
    let patch = CustomerPatch {
        first_name: args.first_name,
        last_name: args.last_name,
        email: args.email,
        phone: args.phone,
        address: args.address,
        photo,
    };
    if patch.is_empty() {
        return CommandResult::failure("update", "validation", "no fields to update", 6);
    }

    with_store("update", options, |store| async move {
        let customer = store.update(&CustomerId(args.id), patch).await?;
        Ok((format!("updated customer {}", customer.id), to_data(&customer)))
    })
}

pub fn delete(options: LoadOptions, id: String) -> CommandResult {
    with_store("delete", options, |store| async move {
        let ack = store.delete(&CustomerId(id)).await?;
        Ok((format!("deleted customer {}", ack.id), to_data(&ack)))
    })
}

pub fn search(options: LoadOptions, term: String) -> CommandResult {
    with_store("search", options, |store| async move {
        let customers = store.search(&term).await?;
        Ok((format!("{} customers match `{term}`", customers.len()), to_data(&customers)))
    })
}

fn with_store<F, Fut>(command: &'static str, options: LoadOptions, action: F) -> CommandResult
where
    F: FnOnce(Arc<dyn CustomerStore>) -> Fut,
    Fut: Future<Output = Outcome>,
{
    run_blocking(command, options, |config| async move {
        let store = match open_store(&config.store).await {
            Ok(store) => store,
            Err(error) => {
                return CommandResult::failure(command, "store_open", error.to_string(), 4);
            }
        };

        match action(store).await {
            Ok((message, data)) => CommandResult::success_with_data(command, message, data),
            Err(error) => store_failure(command, &error),
        }
    })
}

fn store_failure(command: &str, error: &StoreError) -> CommandResult {
    let exit_code = match error {
        StoreError::NotFound(_) => 5,
        StoreError::Validation(_) => 6,
        StoreError::Read(_) | StoreError::Operation(_) => 7,
    };
    CommandResult::failure(command, error.kind(), error.to_string(), exit_code)
}

fn to_data<T: Serialize>(value: &T) -> Option<Value> {
    serde_json::to_value(value).ok()
}

fn photo_data_url(path: &Path) -> Result<String, String> {
    fs::read(path)
        .map(|bytes| encode_data_url(mime_for_path(path), &bytes))
        .map_err(|error| format!("could not read photo `{}`: {error}", path.display()))
}
