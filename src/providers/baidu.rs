//! Baidu Fanyi adapter (MD5 request signing)
//!
//! Baidu's batch endpoint takes one `q` field with texts joined by `\n`,
//! so embedded newlines are protected as `<BR>` before joining and
//! restored after the split.

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use tracing::debug;

use crate::core::config::BaiduConfig;
use crate::core::errors::{Result, TranslateError};
use crate::core::models::Provider;
use crate::providers::sign::md5_hex;
use crate::providers::TranslateProvider;

const NAME: &str = "baidu";
const DEFAULT_ENDPOINT: &str = "https://fanyi-api.baidu.com/api/trans/vip/translate";

/// Map a generic language code onto Baidu's codes
fn lang_code(code: &str) -> &str {
    match code {
        "ja" => "jp",
        "zh-Hans" => "zh",
        other => other,
    }
}

pub struct BaiduTranslator {
    client: reqwest::Client,
    endpoint: String,
    app_id: String,
    app_key: String,
    from: String,
    to: String,
}

impl BaiduTranslator {
    pub fn new(
        client: reqwest::Client,
        config: &BaiduConfig,
        source_lang: &str,
        target_lang: &str,
    ) -> Self {
        Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            app_id: config.app_id.clone(),
            app_key: config.app_key.clone(),
            from: lang_code(source_lang).to_string(),
            to: lang_code(target_lang).to_string(),
        }
    }

    /// Point the adapter at a different endpoint (tests, proxies)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn request(&self, q: &str) -> Result<Value> {
        let salt = rand::thread_rng().gen_range(100_000..1_000_000).to_string();
        let sign = md5_hex(&format!("{}{}{}{}", self.app_id, q, salt, self.app_key));

        let form = [
            ("q", q),
            ("from", &self.from),
            ("to", &self.to),
            ("appid", &self.app_id),
            ("salt", &salt),
            ("sign", &sign),
        ];

        let response = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| TranslateError::from_request(Provider::Baidu, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TranslateError::Provider {
                provider: NAME,
                status: status.as_u16(),
                message,
            });
        }

        let json: Value = response.json().await.map_err(|e| TranslateError::Parse {
            provider: NAME,
            message: e.to_string(),
        })?;

        // Baidu reports failures as 200 with an error_code payload.
        if let Some(code) = json.get("error_code").and_then(Value::as_str) {
            let message = json
                .get("error_msg")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(TranslateError::Provider {
                provider: NAME,
                status: code.parse().unwrap_or(0),
                message,
            });
        }

        Ok(json)
    }

    fn parse_results(json: &Value) -> Result<Vec<String>> {
        let results = json
            .get("trans_result")
            .and_then(Value::as_array)
            .ok_or_else(|| TranslateError::Parse {
                provider: NAME,
                message: "missing trans_result".to_string(),
            })?;

        results
            .iter()
            .map(|item| {
                item.get("dst")
                    .and_then(Value::as_str)
                    .map(|s| s.replace("<BR>", "\n").replace("<br>", "\n"))
                    .ok_or_else(|| TranslateError::Parse {
                        provider: NAME,
                        message: "missing dst".to_string(),
                    })
            })
            .collect()
    }
}

#[async_trait]
impl TranslateProvider for BaiduTranslator {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn translate_batch(&self, texts: &[String]) -> Result<Vec<String>> {
        let protected: Vec<String> = texts.iter().map(|t| t.replace('\n', "<BR>")).collect();
        let q = protected.join("\n");

        let json = self.request(&q).await?;
        let results = Self::parse_results(&json)?;
        debug!("baidu returned {} of {} lines", results.len(), texts.len());
        Ok(results)
    }

    async fn translate_single(&self, text: &str) -> Result<String> {
        let mut results = self.translate_batch(&[text.to_string()]).await?;
        results.pop().ok_or(TranslateError::CountMismatch {
            expected: 1,
            actual: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn adapter(endpoint: &str) -> BaiduTranslator {
        let config = BaiduConfig {
            enabled: true,
            app_id: "20240001".to_string(),
            app_key: "sekrit".to_string(),
        };
        BaiduTranslator::new(reqwest::Client::new(), &config, "ja", "zh")
            .with_endpoint(endpoint.to_string())
    }

    #[tokio::test]
    async fn batch_joins_and_splits_on_newline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("appid=20240001"))
            .and(body_string_contains("from=jp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "from": "jp",
                "to": "zh",
                "trans_result": [
                    { "src": "A", "dst": "甲" },
                    { "src": "B", "dst": "乙<BR>丙" }
                ]
            })))
            .mount(&server)
            .await;

        let out = adapter(&server.uri())
            .translate_batch(&["A".into(), "B\nC".into()])
            .await
            .unwrap();
        assert_eq!(out, vec!["甲".to_string(), "乙\n丙".to_string()]);
    }

    #[tokio::test]
    async fn request_is_md5_signed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "trans_result": [ { "src": "x", "dst": "y" } ]
            })))
            .mount(&server)
            .await;

        adapter(&server.uri())
            .translate_single("x")
            .await
            .unwrap();

        let requests: Vec<Request> = server.received_requests().await.unwrap();
        let body = String::from_utf8(requests[0].body.clone()).unwrap();

        let salt = body
            .split('&')
            .find_map(|kv| kv.strip_prefix("salt="))
            .unwrap()
            .to_string();
        let sign = body
            .split('&')
            .find_map(|kv| kv.strip_prefix("sign="))
            .unwrap()
            .to_string();
        assert_eq!(sign, md5_hex(&format!("20240001x{salt}sekrit")));
    }

    #[tokio::test]
    async fn error_code_payload_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error_code": "54003",
                "error_msg": "access frequency limited"
            })))
            .mount(&server)
            .await;

        let err = adapter(&server.uri())
            .translate_batch(&["x".into()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TranslateError::Provider { status: 54003, .. }
        ));
    }
}
