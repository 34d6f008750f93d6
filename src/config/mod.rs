pub mod paths;
pub mod types;

pub use types::{ClientConfig, Verbosity};
