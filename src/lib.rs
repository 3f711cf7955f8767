//! Relay Translator - Multi-provider batch translation library
//!
//! This library translates batches of text through several cloud
//! translation backends at once, with per-provider rate limiting,
//! concurrency gating, retry with fallback, and a persistent
//! translation cache.

#![forbid(unsafe_code)]

pub mod cli;
pub mod core;
pub mod providers;

// Re-export key types for convenience
pub use crate::core::{
    cache::{CacheStore, JsonFileStore, TranslationCache},
    config::TranslatorConfig,
    errors::{Result, TranslateError},
    models::{ErrorSink, ProgressSink, Provider, TagMap, TranslationTask},
    orchestrator::BatchOrchestrator,
    registry::ProviderRegistry,
    tags::{encode_tags, restore_tags},
};

pub use crate::providers::TranslateProvider;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
