//! List/form view state machine driving a [`CustomerStore`].
//!
//! Every store call sets `loading` beforehand and clears it as soon as the call
//! returns, so the flag is released on success and failure alike. Failures are
//! logged with full detail and surfaced as one short user-facing message.

use async_trait::async_trait;
use clientela_core::domain::customer::{Customer, CustomerId};
use clientela_core::errors::StoreError;
use clientela_db::CustomerStore;
use tracing::{error, info};

use super::form::{CustomerForm, FormField};

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this customer?";

pub const LOAD_ERROR: &str = "Error loading customers";
pub const REQUIRED_FIELDS_ERROR: &str = "All fields are required";
pub const CREATE_ERROR: &str = "Error creating customer";
pub const UPDATE_ERROR: &str = "Error updating customer";
pub const DELETE_ERROR: &str = "Error deleting customer";

/// Yes/no prompt shown before destructive actions.
#[async_trait]
pub trait Confirm {
    async fn confirm(&mut self, prompt: &str) -> bool;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    List,
    Form,
}

pub struct ViewController<S> {
    store: S,
    view: View,
    customers: Vec<Customer>,
    form: CustomerForm,
    editing: Option<Customer>,
    loading: bool,
    error: Option<String>,
}

impl<S: CustomerStore> ViewController<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            view: View::List,
            customers: Vec::new(),
            form: CustomerForm::default(),
            editing: None,
            loading: false,
            error: None,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn form(&self) -> &CustomerForm {
        &self.form
    }

    pub fn editing(&self) -> Option<&Customer> {
        self.editing.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn title(&self) -> &'static str {
        match (self.view, self.editing.is_some()) {
            (View::Form, true) => "Edit Customer",
            (View::Form, false) => "New Customer",
            (View::List, _) => "Customers",
        }
    }

    pub fn submit_label(&self) -> &'static str {
        if self.loading {
            "Saving..."
        } else if self.editing.is_some() {
            "Update"
        } else {
            "Save"
        }
    }

    /// Replaces the displayed list with a fresh read. The previous list is
    /// kept when the read fails.
    pub async fn load(&mut self) {
        self.loading = true;
        self.error = None;
        let result = self.store.list().await;
        self.loading = false;

        match result {
            Ok(customers) => {
                info!(
                    event_name = "ui.customers.loaded",
                    count = customers.len(),
                    "customer list loaded"
                );
                self.customers = customers;
            }
            Err(err) => self.fail("load", LOAD_ERROR, &err),
        }
    }

    pub fn new_customer(&mut self) {
        self.form = CustomerForm::default();
        self.editing = None;
        self.error = None;
        self.view = View::Form;
    }

    pub fn edit(&mut self, customer: &Customer) {
        self.form = CustomerForm::from_customer(customer);
        self.editing = Some(customer.clone());
        self.error = None;
        self.view = View::Form;
    }

    pub fn set_field(&mut self, field: FormField, value: impl Into<String>) {
        self.form.set(field, value);
    }

    pub fn set_photo(&mut self, photo: Option<String>) {
        self.form.photo = photo;
    }

    /// Creates or updates depending on the editing target. On success the
    /// list is reloaded and the view returns to the list; on failure the form
    /// keeps its input.
    pub async fn submit(&mut self) {
        if self.view != View::Form {
            return;
        }
        if !self.form.is_complete() {
            self.error = Some(REQUIRED_FIELDS_ERROR.to_string());
            return;
        }

        self.loading = true;
        self.error = None;
        let (operation, message, result) = match &self.editing {
            Some(target) => {
                let result = self.store.update(&target.id, self.form.to_patch()).await;
                ("update", UPDATE_ERROR, result)
            }
            None => {
                let result = self.store.create(self.form.to_new_customer()).await;
                ("create", CREATE_ERROR, result)
            }
        };
        self.loading = false;

        match result {
            Ok(customer) => {
                info!(
                    event_name = "ui.customer.saved",
                    operation,
                    customer_id = %customer.id,
                    "customer saved from form"
                );
                self.reset_form();
                self.view = View::List;
                self.load().await;
            }
            Err(err) => self.fail(operation, message, &err),
        }
    }

    pub fn cancel(&mut self) {
        self.reset_form();
        self.error = None;
        self.view = View::List;
    }

    /// Deletes `id` after the prompt accepts. Returns whether the delete was
    /// attempted.
    pub async fn confirm_delete(&mut self, id: &CustomerId, confirm: &mut dyn Confirm) -> bool {
        if !confirm.confirm(DELETE_PROMPT).await {
            return false;
        }

        self.loading = true;
        self.error = None;
        let result = self.store.delete(id).await;
        self.loading = false;

        match result {
            Ok(ack) => {
                info!(event_name = "ui.customer.deleted", customer_id = %ack.id, "customer deleted");
                self.load().await;
            }
            Err(err) => self.fail("delete", DELETE_ERROR, &err),
        }
        true
    }

    fn reset_form(&mut self) {
        self.form = CustomerForm::default();
        self.editing = None;
    }

    fn fail(&mut self, operation: &'static str, message: &str, err: &StoreError) {
        error!(
            event_name = "ui.customers.operation_failed",
            operation,
            kind = err.kind(),
            error = %err,
            "customer operation failed"
        );
        self.error = Some(message.to_string());
    }
}
