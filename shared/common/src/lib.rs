pub mod types;
pub mod error;
pub mod config;
pub mod http;
pub mod shutdown;

pub use types::*;
pub use error::*;
pub use config::*;
pub use http::*;
pub use shutdown::*;
