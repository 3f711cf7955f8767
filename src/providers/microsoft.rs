//! Microsoft Translator adapter (API-key header authentication)

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::core::config::MicrosoftConfig;
use crate::core::errors::{Result, TranslateError};
use crate::core::models::Provider;
use crate::providers::TranslateProvider;

const NAME: &str = "microsoft";

/// Map a generic language code onto Microsoft's dialect codes
fn lang_code(code: &str) -> &str {
    match code {
        "zh" => "zh-Hans",
        other => other,
    }
}

pub struct MicrosoftTranslator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    region: String,
    from: String,
    to: String,
}

impl MicrosoftTranslator {
    pub fn new(
        client: reqwest::Client,
        config: &MicrosoftConfig,
        source_lang: &str,
        target_lang: &str,
    ) -> Self {
        let mut endpoint = config.endpoint.clone();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }
        Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            region: config.region.clone(),
            from: lang_code(source_lang).to_string(),
            to: lang_code(target_lang).to_string(),
        }
    }

    fn url(&self) -> String {
        format!(
            "{}translate?api-version=3.0&from={}&to={}",
            self.endpoint, self.from, self.to
        )
    }
}

#[async_trait]
impl TranslateProvider for MicrosoftTranslator {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn translate_batch(&self, texts: &[String]) -> Result<Vec<String>> {
        let body: Vec<Value> = texts.iter().map(|t| json!({ "Text": t })).collect();

        let response = self
            .client
            .post(self.url())
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .header("Ocp-Apim-Subscription-Region", &self.region)
            .json(&body)
            .send()
            .await
            .map_err(|e| TranslateError::from_request(Provider::Microsoft, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TranslateError::Provider {
                provider: NAME,
                status: status.as_u16(),
                message,
            });
        }

        let items: Vec<Value> = response.json().await.map_err(|e| TranslateError::Parse {
            provider: NAME,
            message: e.to_string(),
        })?;

        debug!("microsoft returned {} items", items.len());

        items
            .iter()
            .map(|item| {
                item.pointer("/translations/0/text")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| TranslateError::Parse {
                        provider: NAME,
                        message: "missing translations[0].text".to_string(),
                    })
            })
            .collect()
    }

    async fn translate_single(&self, text: &str) -> Result<String> {
        let mut results = self.translate_batch(&[text.to_string()]).await?;
        results.pop().ok_or(TranslateError::CountMismatch {
            expected: 1,
            actual: 0,
        })
    }
}
