//! Batch scheduler / orchestrator
//!
//! Top-level flow: deduplicate tasks by source text, short-circuit cache
//! hits, chunk the rest into batches, run batches concurrently (bounded by
//! each provider's gate), retry with exponential backoff, fall back to
//! per-item translation when a batch call fails or misaligns, and report
//! progress so every task is counted exactly once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::cache::{CacheStore, JsonFileStore, TranslationCache};
use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslateError};
use crate::core::models::{ErrorSink, LogErrorSink, ProgressSink, TranslationTask};
use crate::core::registry::{ProviderRegistry, ProviderState};
use crate::core::tags::restore_tags;

/// All pending tasks sharing one source text, translated as a unit
struct TaskGroup {
    text: String,
    tasks: Vec<TranslationTask>,
}

/// State shared by every concurrently running batch
struct Shared {
    registry: ProviderRegistry,
    cache: TranslationCache,
    errors: Arc<dyn ErrorSink>,
    cancel: CancellationToken,
    max_retries: u32,
}

/// Multi-provider batch-translation orchestrator.
///
/// Construct one per run (no ambient global state) and call
/// [`submit`](Self::submit); the same instance may serve multiple
/// submissions and shares its cache across them.
pub struct BatchOrchestrator {
    shared: Arc<Shared>,
    store: Option<Arc<dyn CacheStore>>,
}

impl BatchOrchestrator {
    /// Build from configuration: adapters for every enabled provider and,
    /// when a cache path is configured, the persisted cache loaded from it.
    pub fn new(config: &TranslatorConfig) -> Result<Self> {
        let registry = ProviderRegistry::from_config(config)?;

        let store: Option<Arc<dyn CacheStore>> = config
            .cache_path
            .as_ref()
            .map(|p| Arc::new(JsonFileStore::new(p)) as Arc<dyn CacheStore>);

        let cache = match &store {
            Some(store) => match store.load() {
                Ok(entries) => TranslationCache::with_entries(entries),
                Err(e) => {
                    warn!("failed to load translation cache: {e}");
                    TranslationCache::new()
                }
            },
            None => TranslationCache::new(),
        };

        Ok(Self {
            shared: Arc::new(Shared {
                registry,
                cache,
                errors: Arc::new(LogErrorSink),
                cancel: CancellationToken::new(),
                max_retries: config.max_retries,
            }),
            store,
        })
    }

    /// Create from environment
    pub fn from_env() -> Result<Self> {
        let config = TranslatorConfig::load().map_err(|e| TranslateError::Config {
            message: e.to_string(),
        })?;
        config.validate().map_err(|e| TranslateError::Config {
            message: e.to_string(),
        })?;
        Self::new(&config)
    }

    /// Build around an explicit registry (tests inject stub adapters)
    pub fn with_registry(registry: ProviderRegistry) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry,
                cache: TranslationCache::new(),
                errors: Arc::new(LogErrorSink),
                cancel: CancellationToken::new(),
                max_retries: 5,
            }),
            store: None,
        }
    }

    pub fn with_cache(mut self, cache: TranslationCache) -> Self {
        let shared = Arc::get_mut(&mut self.shared)
            .expect("configure the orchestrator before submitting");
        shared.cache = cache;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        let shared = Arc::get_mut(&mut self.shared)
            .expect("configure the orchestrator before submitting");
        shared.max_retries = max_retries.max(1);
        self
    }

    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        let shared = Arc::get_mut(&mut self.shared)
            .expect("configure the orchestrator before submitting");
        shared.errors = sink;
        self
    }

    /// Shared translation cache
    pub fn cache(&self) -> &TranslationCache {
        &self.shared.cache
    }

    /// Token observed at every suspension point; cancelling it stops new
    /// dispatches while in-flight requests finish under the HTTP timeout.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }

    /// Stop dispatching new work. Pending groups still count toward
    /// progress, so progress accounting stays conserved.
    pub fn cancel(&self) {
        self.shared.cancel.cancel();
    }

    /// Translate every task, writing results back through each task's
    /// callback and reporting `(completed, total)` after every resolved
    /// group. Exhausted retries leave a group's write-backs uninvoked but
    /// never abort sibling batches; the call itself only fails on setup
    /// problems, not on per-batch failures.
    pub async fn submit(
        &self,
        tasks: Vec<TranslationTask>,
        batch_size: usize,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let total = tasks.len();
        let completed = Arc::new(Mutex::new(0usize));
        let shared = &self.shared;

        let groups = group_by_text(tasks);
        debug!("{} tasks deduplicated into {} groups", total, groups.len());

        // Cache hits resolve immediately, bypassing the network entirely.
        let mut pending = Vec::new();
        for group in groups {
            match shared.cache.get(&group.text).await {
                Some(translated) => {
                    resolve_group(group, &translated, &completed, total, progress.as_ref());
                }
                None => pending.push(group),
            }
        }

        if pending.is_empty() {
            info!("all texts already cached, nothing to translate");
            self.persist().await;
            return Ok(());
        }

        if shared.registry.is_empty() {
            shared
                .errors
                .report("no translation provider is available; check provider settings");
            return Err(TranslateError::NoProviderAvailable);
        }

        // Clamp so any batch can go to any enabled provider, including the
        // one with a hard item limit.
        let batch_size = effective_batch_size(&shared.registry, batch_size.max(1));
        let batches = chunk(pending, batch_size);
        info!(
            "dispatching {} batches (batch size {batch_size})",
            batches.len()
        );

        let mut join_set = JoinSet::new();
        for batch in batches {
            let shared = Arc::clone(shared);
            let completed = Arc::clone(&completed);
            let progress = Arc::clone(&progress);
            join_set.spawn(run_batch(shared, batch, completed, total, progress));
        }

        while let Some(joined) = join_set.join_next().await {
            if let Err(e) = joined {
                warn!("batch task panicked: {e}");
            }
        }

        self.persist().await;
        Ok(())
    }

    /// Hand the cache back to the persistence store. Best effort: a save
    /// failure costs re-translation next run, not correctness.
    async fn persist(&self) {
        if let Some(store) = &self.store {
            let snapshot = self.shared.cache.snapshot().await;
            if let Err(e) = store.save(&snapshot) {
                warn!("failed to persist translation cache: {e}");
            }
        }
    }
}

/// Deduplicate tasks into groups keyed by source text, preserving
/// first-seen order so batch partitioning is stable for a submission.
fn group_by_text(tasks: Vec<TranslationTask>) -> Vec<TaskGroup> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<TaskGroup> = Vec::new();

    for task in tasks {
        match index.get(&task.original_text) {
            Some(&i) => groups[i].tasks.push(task),
            None => {
                index.insert(task.original_text.clone(), groups.len());
                groups.push(TaskGroup {
                    text: task.original_text.clone(),
                    tasks: vec![task],
                });
            }
        }
    }
    groups
}

/// Split groups into contiguous batches of at most `batch_size`
fn chunk(mut groups: Vec<TaskGroup>, batch_size: usize) -> Vec<Vec<TaskGroup>> {
    let mut batches = Vec::new();
    while !groups.is_empty() {
        let take = batch_size.min(groups.len());
        batches.push(groups.drain(..take).collect());
    }
    batches
}

/// Largest batch size every registered adapter accepts
fn effective_batch_size(registry: &ProviderRegistry, requested: usize) -> usize {
    match registry.max_batch_cap() {
        Some(cap) => requested.min(cap),
        None => requested,
    }
}

/// Apply one translated template to every task in a group: cache it,
/// restore each task's tags, invoke its write-back, advance progress.
fn resolve_group(
    group: TaskGroup,
    translated: &str,
    completed: &Mutex<usize>,
    total: usize,
    progress: &dyn ProgressSink,
) {
    let n = group.tasks.len();
    for task in group.tasks {
        let restored = restore_tags(translated, &task.tag_map);
        (task.write_back)(restored);
    }
    advance_progress(completed, n, total, progress);
}

/// Count a group that terminally failed (or was cancelled): no write-back,
/// but progress still advances so accounting sums to the total.
fn resolve_group_failed(
    group: TaskGroup,
    completed: &Mutex<usize>,
    total: usize,
    progress: &dyn ProgressSink,
) {
    advance_progress(completed, group.tasks.len(), total, progress);
}

/// Increment the counter and report it in one step. The sink runs under
/// the counter lock so concurrent batches can never deliver counts out of
/// order; the last report is always `(total, total)`.
fn advance_progress(completed: &Mutex<usize>, n: usize, total: usize, progress: &dyn ProgressSink) {
    let mut done = completed.lock().expect("progress counter poisoned");
    *done += n;
    progress.on_progress(*done, total);
}

/// Run one batch to completion: up to `max_retries` attempts, each against
/// the currently least-loaded provider, with exponential backoff between
/// failed attempts.
async fn run_batch(
    shared: Arc<Shared>,
    mut groups: Vec<TaskGroup>,
    completed: Arc<Mutex<usize>>,
    total: usize,
    progress: Arc<dyn ProgressSink>,
) {
    let texts: Vec<String> = groups.iter().map(|g| g.text.clone()).collect();

    for attempt in 1..=shared.max_retries {
        if shared.cancel.is_cancelled() {
            debug!("submission cancelled, abandoning batch");
            break;
        }

        let (provider, state) = match shared.registry.select_best() {
            Ok(picked) => picked,
            Err(_) => {
                shared
                    .errors
                    .report("no translation provider is available; check provider settings");
                break;
            }
        };

        // Slot is held for the whole attempt, fallback singles included;
        // the permit's drop releases it on every path out.
        let permit = state.acquire_slot().await;

        let admitted = tokio::select! {
            _ = shared.cancel.cancelled() => false,
            _ = state.admit() => true,
        };

        let outcome = if admitted {
            attempt_batch(&shared, state, &texts).await
        } else {
            Err(TranslateError::Network {
                message: "submission cancelled".to_string(),
            })
        };
        drop(permit);

        match outcome {
            Ok(results) if results.len() == groups.len() => {
                for (group, translated) in std::mem::take(&mut groups).into_iter().zip(results) {
                    shared
                        .cache
                        .insert(group.text.clone(), translated.clone())
                        .await;
                    resolve_group(group, &translated, &completed, total, progress.as_ref());
                }
                return;
            }
            Ok(results) => {
                // Alignment is a hard precondition for writing back;
                // anything else is treated as a failed attempt.
                warn!(
                    "[{provider}] attempt {attempt}: {} results for {} groups, retrying",
                    results.len(),
                    groups.len()
                );
            }
            Err(e) if e.is_recoverable() => {
                warn!("[{provider}] attempt {attempt} failed: {e}");
            }
            Err(e) => {
                shared.errors.report(&format!("translation aborted: {e}"));
                break;
            }
        }

        if attempt < shared.max_retries {
            let backoff = 1000u64 * 2u64.pow(attempt - 1)
                + rand::thread_rng().gen_range(100..300);
            debug!("[{provider}] backing off {backoff}ms before attempt {}", attempt + 1);
            tokio::select! {
                _ = shared.cancel.cancelled() => {}
                _ = sleep(Duration::from_millis(backoff)) => {}
            }
        }
    }

    // Retry budget exhausted (or aborted): tasks stay untranslated but
    // still count toward progress, and sibling batches keep running.
    for group in groups {
        resolve_group_failed(group, &completed, total, progress.as_ref());
    }
}

/// One attempt: batch call first; on failure or count mismatch, fall back
/// to per-item calls, re-acquiring rate-limit admission for each.
async fn attempt_batch(
    shared: &Shared,
    state: &ProviderState,
    texts: &[String],
) -> Result<Vec<String>> {
    let adapter = state.adapter();

    match adapter.translate_batch(texts).await {
        Ok(results) if results.len() == texts.len() => return Ok(results),
        Ok(results) => {
            warn!(
                "[{}] batch returned {} of {} translations, falling back to singles",
                adapter.name(),
                results.len(),
                texts.len()
            );
        }
        Err(e) if e.is_recoverable() => {
            warn!(
                "[{}] batch call failed ({e}), falling back to singles",
                adapter.name()
            );
        }
        Err(e) => return Err(e),
    }

    let mut fallback = Vec::with_capacity(texts.len());
    for text in texts {
        if shared.cancel.is_cancelled() {
            return Err(TranslateError::Network {
                message: "submission cancelled".to_string(),
            });
        }
        state.admit().await;
        let single = adapter.translate_single(text).await?;
        fallback.push(single);
    }

    if fallback.len() == texts.len() {
        Ok(fallback)
    } else {
        Err(TranslateError::CountMismatch {
            expected: texts.len(),
            actual: fallback.len(),
        })
    }
}
