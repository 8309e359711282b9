//! renderhook HTTP response models

pub mod models;

pub use models::*;
