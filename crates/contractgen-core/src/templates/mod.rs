pub mod manager;
pub mod types;

pub use manager::*;
pub use types::*;
