//! Core translation engine module

pub mod cache;
pub mod config;
pub mod errors;
pub mod limiter;
pub mod models;
pub mod orchestrator;
pub mod registry;
pub mod tags;
