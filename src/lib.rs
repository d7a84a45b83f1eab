pub mod cli;
pub mod entity;
pub mod error;
pub mod store;

pub use error::{Result, TrellisError};
pub use store::Store;
