pub mod customer;
pub mod photo;
