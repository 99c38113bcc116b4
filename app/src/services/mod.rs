pub mod greeting;
pub mod repository;
pub mod settings;

pub use greeting::Greeter;
pub use repository::{Customer, Order, Repository};
