pub mod backup;
pub mod db;
pub mod error;
pub mod estimate;
pub mod models;
pub mod normalize;
pub mod search;
pub mod service;

pub use error::{Result, StoreError};
