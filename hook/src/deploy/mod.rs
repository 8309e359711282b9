//! Deploy monitoring

pub mod fsm;
pub mod monitor;
pub mod outcome;
