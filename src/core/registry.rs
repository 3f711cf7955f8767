//! Provider registry: per-backend state and dispatch-time selection
//!
//! One entry per enabled backend, each holding its concurrency gate,
//! sliding-window limiter, and adapter. All cross-provider decisions
//! (which backend a batch attempt goes to) happen here.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslateError};
use crate::core::limiter::SlidingWindow;
use crate::core::models::Provider;
use crate::providers::{
    BaiduTranslator, MicrosoftTranslator, TencentTranslator, TranslateProvider,
    VolcanoTranslator,
};

/// Per-provider runtime state. Lives for the process lifetime; the gate
/// and window are mutated only through their own synchronization.
pub struct ProviderState {
    semaphore: Arc<Semaphore>,
    window: SlidingWindow,
    adapter: Arc<dyn TranslateProvider>,
}

impl ProviderState {
    fn new(provider: Provider, adapter: Arc<dyn TranslateProvider>) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(provider.max_concurrent())),
            window: SlidingWindow::new(provider.max_requests_per_second()),
            adapter,
        }
    }

    /// Occupy one in-flight slot. The permit releases itself on drop, on
    /// every exit path.
    pub async fn acquire_slot(&self) -> OwnedSemaphorePermit {
        // Never closed, so acquire cannot fail.
        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .expect("provider semaphore is never closed")
    }

    /// Wait for sliding-window admission for one request
    pub async fn admit(&self) {
        self.window.acquire().await
    }

    /// Currently free concurrency slots
    pub fn free_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn adapter(&self) -> &Arc<dyn TranslateProvider> {
        &self.adapter
    }
}

/// Registry of enabled providers, in tie-break order
pub struct ProviderRegistry {
    states: Vec<(Provider, ProviderState)>,
}

impl ProviderRegistry {
    /// Build adapters for every provider the configuration enables,
    /// sharing one connection-pooled HTTP client.
    pub fn from_config(config: &TranslatorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| TranslateError::Config {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        let from = config.source_lang.as_str();
        let to = config.target_lang.as_str();

        let mut adapters: Vec<(Provider, Arc<dyn TranslateProvider>)> = Vec::new();
        if config.microsoft.enabled {
            adapters.push((
                Provider::Microsoft,
                Arc::new(MicrosoftTranslator::new(
                    client.clone(),
                    &config.microsoft,
                    from,
                    to,
                )),
            ));
        }
        if config.baidu.enabled {
            adapters.push((
                Provider::Baidu,
                Arc::new(BaiduTranslator::new(client.clone(), &config.baidu, from, to)),
            ));
        }
        if config.tencent.enabled {
            adapters.push((
                Provider::Tencent,
                Arc::new(TencentTranslator::new(
                    client.clone(),
                    &config.tencent,
                    from,
                    to,
                )),
            ));
        }
        if config.volcano.enabled {
            adapters.push((
                Provider::Volcano,
                Arc::new(VolcanoTranslator::new(client, &config.volcano, from, to)),
            ));
        }

        Ok(Self::with_adapters(adapters))
    }

    /// Build a registry from explicit adapters (tests inject stubs here)
    pub fn with_adapters(adapters: Vec<(Provider, Arc<dyn TranslateProvider>)>) -> Self {
        let states = adapters
            .into_iter()
            .map(|(provider, adapter)| (provider, ProviderState::new(provider, adapter)))
            .collect();
        Self { states }
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn get(&self, provider: Provider) -> Option<&ProviderState> {
        self.states
            .iter()
            .find(|(p, _)| *p == provider)
            .map(|(_, s)| s)
    }

    /// Smallest per-request item cap among registered adapters, if any
    /// declares one. Batches no larger than this fit every backend, so the
    /// selector stays free to hand any batch to any provider.
    pub fn max_batch_cap(&self) -> Option<usize> {
        self.states
            .iter()
            .filter_map(|(_, s)| s.adapter.max_batch_len())
            .min()
    }

    /// Choose the enabled provider with the most free concurrency slots;
    /// ties go to the earlier entry. Re-evaluated on every batch attempt,
    /// so load rebalances as batches complete.
    pub fn select_best(&self) -> Result<(Provider, &ProviderState)> {
        let mut best: Option<(Provider, &ProviderState)> = None;
        let mut max_free = 0usize;

        for (provider, state) in &self.states {
            let free = state.free_slots();
            if best.is_none() || free > max_free {
                max_free = free;
                best = Some((*provider, state));
            }
        }

        match best {
            Some((provider, state)) => {
                debug!("selected {provider} with {max_free} free slots");
                Ok((provider, state))
            }
            None => Err(TranslateError::NoProviderAvailable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NoopAdapter;

    #[async_trait]
    impl TranslateProvider for NoopAdapter {
        fn name(&self) -> &'static str {
            "noop"
        }

        async fn translate_batch(&self, texts: &[String]) -> Result<Vec<String>> {
            Ok(texts.to_vec())
        }

        async fn translate_single(&self, text: &str) -> Result<String> {
            Ok(text.to_string())
        }
    }

    fn registry(providers: &[Provider]) -> ProviderRegistry {
        ProviderRegistry::with_adapters(
            providers
                .iter()
                .map(|p| (*p, Arc::new(NoopAdapter) as Arc<dyn TranslateProvider>))
                .collect(),
        )
    }

    #[tokio::test]
    async fn empty_registry_has_no_provider() {
        let reg = registry(&[]);
        assert!(matches!(
            reg.select_best(),
            Err(TranslateError::NoProviderAvailable)
        ));
    }

    #[tokio::test]
    async fn selects_provider_with_most_free_slots() {
        let reg = registry(&[Provider::Microsoft, Provider::Baidu]);

        // Occupy most of Microsoft's slots; Baidu becomes the best pick.
        let ms = reg.get(Provider::Microsoft).unwrap();
        let mut permits = Vec::new();
        for _ in 0..8 {
            permits.push(ms.acquire_slot().await);
        }

        let (picked, _) = reg.select_best().unwrap();
        assert_eq!(picked, Provider::Baidu);

        drop(permits);
        let (picked, _) = reg.select_best().unwrap();
        assert_eq!(picked, Provider::Microsoft); // tie broken by order
    }

    #[tokio::test]
    async fn batch_cap_is_smallest_adapter_cap() {
        struct CappedAdapter(usize);

        #[async_trait]
        impl TranslateProvider for CappedAdapter {
            fn name(&self) -> &'static str {
                "capped"
            }

            fn max_batch_len(&self) -> Option<usize> {
                Some(self.0)
            }

            async fn translate_batch(&self, texts: &[String]) -> Result<Vec<String>> {
                Ok(texts.to_vec())
            }

            async fn translate_single(&self, text: &str) -> Result<String> {
                Ok(text.to_string())
            }
        }

        assert_eq!(registry(&[Provider::Microsoft]).max_batch_cap(), None);

        let reg = ProviderRegistry::with_adapters(vec![
            (
                Provider::Microsoft,
                Arc::new(NoopAdapter) as Arc<dyn TranslateProvider>,
            ),
            (
                Provider::Volcano,
                Arc::new(CappedAdapter(16)) as Arc<dyn TranslateProvider>,
            ),
            (
                Provider::Baidu,
                Arc::new(CappedAdapter(8)) as Arc<dyn TranslateProvider>,
            ),
        ]);
        assert_eq!(reg.max_batch_cap(), Some(8));
    }

    #[tokio::test]
    async fn gate_caps_in_flight_permits() {
        let reg = registry(&[Provider::Tencent]);
        let state = reg.get(Provider::Tencent).unwrap();
        assert_eq!(state.free_slots(), 4);

        let _a = state.acquire_slot().await;
        let _b = state.acquire_slot().await;
        assert_eq!(state.free_slots(), 2);

        drop(_a);
        assert_eq!(state.free_slots(), 3);
    }
}
