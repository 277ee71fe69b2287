//! Core services implementing the business logic.
//!
//! - `blockchain`: Provider clients, transports and the push bridge
//! - `notification`: Message rendering and chat delivery
//! - `txwatcher`: Tracking requests, monitors and the persistent registry

pub mod blockchain;
pub mod notification;
pub mod txwatcher;
