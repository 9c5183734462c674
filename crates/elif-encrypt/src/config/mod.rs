pub mod encrypt_config;
pub mod sources;
pub mod validation;

pub use encrypt_config::*;
pub use sources::*;
pub use validation::*;
