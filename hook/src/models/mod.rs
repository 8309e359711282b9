//! Domain models

pub mod attempt;
pub mod project;
