//! Local HTTP server

pub mod errors;
pub mod handlers;
pub mod response;
pub mod serve;
pub mod state;
pub mod webhook;
