//! Provider adapters
//!
//! One adapter per translation backend, each behind the same capability
//! pair: translate a batch of texts, or a single text. Adapters own their
//! backend's authentication scheme and response parsing; they signal
//! failure through [`TranslateError`] values, never panics, and guarantee
//! only structural parse success — count alignment is the orchestrator's
//! check.

use async_trait::async_trait;

use crate::core::errors::Result;

pub mod baidu;
pub mod microsoft;
mod sign;
pub mod tencent;
pub mod volcano;

pub use baidu::BaiduTranslator;
pub use microsoft::MicrosoftTranslator;
pub use tencent::TencentTranslator;
pub use volcano::VolcanoTranslator;

/// Uniform capability set implemented by every backend adapter
#[async_trait]
pub trait TranslateProvider: Send + Sync {
    /// Backend name, for logs and error messages
    fn name(&self) -> &'static str;

    /// Hard per-request item limit, if the backend documents one
    fn max_batch_len(&self) -> Option<usize> {
        None
    }

    /// Translate `texts` in one request. On success the returned list is
    /// positionally aligned with the input list.
    async fn translate_batch(&self, texts: &[String]) -> Result<Vec<String>>;

    /// Translate one text
    async fn translate_single(&self, text: &str) -> Result<String>;
}
