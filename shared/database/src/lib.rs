pub mod models;
pub mod connection;
pub mod migrations;
pub mod store;

pub use models::*;
pub use connection::*;
pub use migrations::*;
pub use store::*;
