//! Core data models for translation

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Translation backend identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    Microsoft,
    Baidu,
    Tencent,
    Volcano,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Microsoft => write!(f, "microsoft"),
            Provider::Baidu => write!(f, "baidu"),
            Provider::Tencent => write!(f, "tencent"),
            Provider::Volcano => write!(f, "volcano"),
        }
    }
}

/// Per-provider admission limits: (requests per second, in-flight ceiling).
/// The numbers match each backend's documented safe limits.
const PROVIDER_LIMITS: &[(Provider, usize, usize)] = &[
    (Provider::Microsoft, 10, 10),
    (Provider::Baidu, 10, 10),
    (Provider::Tencent, 4, 4),
    (Provider::Volcano, 10, 10),
];

impl Provider {
    /// Maximum requests per second for this backend
    pub fn max_requests_per_second(self) -> usize {
        PROVIDER_LIMITS
            .iter()
            .find(|(p, _, _)| *p == self)
            .map(|(_, rps, _)| *rps)
            .unwrap_or(1)
    }

    /// Maximum simultaneous in-flight requests for this backend
    pub fn max_concurrent(self) -> usize {
        PROVIDER_LIMITS
            .iter()
            .find(|(p, _, _)| *p == self)
            .map(|(_, _, conc)| *conc)
            .unwrap_or(1)
    }
}

/// Mapping from placeholder id (e.g. `"0"`) to the original markup it
/// stands in for (e.g. `"[Laceration]"`)
pub type TagMap = HashMap<String, String>;

/// Callback that applies a finished translation back to its origin.
/// Consumed at most once.
pub type WriteBack = Box<dyn FnOnce(String) + Send>;

/// One occurrence of text needing translation. Many tasks may share the
/// same `original_text`; each carries its own tag map and write-back.
pub struct TranslationTask {
    /// Canonical source text, placeholders already encoded
    pub original_text: String,
    /// Placeholder id -> original markup for this occurrence
    pub tag_map: TagMap,
    /// Applies the restored translation to wherever the text came from
    pub write_back: WriteBack,
}

impl TranslationTask {
    pub fn new(
        original_text: impl Into<String>,
        tag_map: TagMap,
        write_back: impl FnOnce(String) + Send + 'static,
    ) -> Self {
        Self {
            original_text: original_text.into(),
            tag_map,
            write_back: Box::new(write_back),
        }
    }
}

impl fmt::Debug for TranslationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationTask")
            .field("original_text", &self.original_text)
            .field("tag_map", &self.tag_map)
            .finish_non_exhaustive()
    }
}

/// Receives `(completed, total)` after every resolved group. Invoked from
/// whatever task finishes the work; thread marshalling is the caller's job.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, completed: usize, total: usize);
}

impl<F> ProgressSink for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn on_progress(&self, completed: usize, total: usize) {
        self(completed, total)
    }
}

/// Receives user-visible error messages the core cannot recover from
/// (e.g. no provider enabled). The core performs no UI rendering itself.
pub trait ErrorSink: Send + Sync {
    fn report(&self, message: &str);
}

impl<F> ErrorSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn report(&self, message: &str) {
        self(message)
    }
}

/// Default error sink: forward to the log
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn report(&self, message: &str) {
        tracing::error!("{message}");
    }
}
