pub mod controller;
pub mod form;
pub mod terminal;

pub use controller::{Confirm, View, ViewController, DELETE_PROMPT};
pub use form::{CustomerForm, FormField};
pub use terminal::Terminal;
