//! Render API wire models
//!
//! Shapes of the JSON documents exchanged with `https://api.render.com/v1`.

pub mod models;

pub use models::*;
