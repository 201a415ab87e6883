pub mod email;
pub mod notifier;
pub mod templates;

pub use email::*;
pub use notifier::*;
pub use templates::*;
