//! renderhook library
//!
//! Push webhook receiver that triggers Render deploys per project, guards
//! them with a cross-process lock and a cooldown, and reports each deploy's
//! outcome once it settles.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod gate;
pub mod http;
pub mod logs;
pub mod models;
pub mod notify;
pub mod server;
pub mod storage;
pub mod utils;
pub mod workers;
