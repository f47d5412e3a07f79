pub mod backup;
pub mod checksum;
pub mod config;
pub mod constants;
pub mod error;
pub mod health;
pub mod monitor;
pub mod recovery;
pub mod restore;
pub mod rollback;

pub use error::{Result, WardenError};
