pub mod config;
pub mod domain;
pub mod errors;

pub use domain::customer::{
    filter_by_term, Customer, CustomerId, CustomerPatch, DeleteAck, NewCustomer,
};
pub use errors::StoreError;
