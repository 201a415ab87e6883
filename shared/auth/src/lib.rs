pub mod jwt;
pub mod otp;
pub mod middleware;
pub mod policy;

pub use jwt::*;
pub use otp::*;
pub use middleware::*;
