//! Volcano Engine adapter (HMAC-SHA256 canonical-request signing)
//!
//! The batch endpoint accepts at most 16 texts per request; the adapter
//! rejects oversized input before anything is sent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::core::config::VolcanoConfig;
use crate::core::errors::{Result, TranslateError};
use crate::core::models::Provider;
use crate::providers::sign::{hex_lower, hmac_sha256, sha256_hex};
use crate::providers::TranslateProvider;

const NAME: &str = "volcano";
const HOST: &str = "open.volcengineapi.com";
const SERVICE: &str = "translate";
const QUERY: &str = "Action=TranslateText&Version=2020-06-01";
const ALGORITHM: &str = "HMAC-SHA256";
const MAX_BATCH: usize = 16;

pub struct VolcanoTranslator {
    client: reqwest::Client,
    endpoint: String,
    access_key_id: String,
    secret_access_key: String,
    region: String,
    from: String,
    to: String,
}

impl VolcanoTranslator {
    pub fn new(
        client: reqwest::Client,
        config: &VolcanoConfig,
        source_lang: &str,
        target_lang: &str,
    ) -> Self {
        Self {
            client,
            endpoint: format!("https://{HOST}/"),
            access_key_id: config.access_key_id.clone(),
            secret_access_key: config.secret_access_key.clone(),
            region: config.region.clone(),
            from: source_lang.to_string(),
            to: target_lang.to_string(),
        }
    }

    /// Point the adapter at a different endpoint (tests, proxies)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Authorization header plus the two signed request headers
    /// (x-date, x-content-sha256) for the given payload.
    fn signed_headers(&self, now: DateTime<Utc>, payload: &str) -> (String, String, String) {
        let x_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let payload_hash = sha256_hex(payload);

        let canonical_headers = format!(
            "content-type:application/json\nhost:{HOST}\nx-content-sha256:{payload_hash}\nx-date:{x_date}\n"
        );
        let signed_header_names = "content-type;host;x-content-sha256;x-date";
        let canonical_request = format!(
            "POST\n/\n{QUERY}\n{canonical_headers}\n{signed_header_names}\n{payload_hash}"
        );

        let credential_scope = format!("{date}/{}/{SERVICE}/request", self.region);
        let string_to_sign = format!(
            "{ALGORITHM}\n{x_date}\n{credential_scope}\n{}",
            sha256_hex(&canonical_request)
        );

        let k_date = hmac_sha256(self.secret_access_key.as_bytes(), &date);
        let k_region = hmac_sha256(&k_date, &self.region);
        let k_service = hmac_sha256(&k_region, SERVICE);
        let k_signing = hmac_sha256(&k_service, "request");
        let signature = hex_lower(&hmac_sha256(&k_signing, &string_to_sign));

        let authorization = format!(
            "{ALGORITHM} Credential={}/{credential_scope}, \
             SignedHeaders={signed_header_names}, Signature={signature}",
            self.access_key_id
        );
        (authorization, x_date, payload_hash)
    }

    async fn call(&self, texts: &[String]) -> Result<Vec<String>> {
        let body = json!({
            "TargetLanguage": self.to,
            "SourceLanguage": self.from,
            "TextList": texts,
        });
        let payload = serde_json::to_string(&body)?;
        let (authorization, x_date, payload_hash) = self.signed_headers(Utc::now(), &payload);

        let url = format!("{}?{QUERY}", self.endpoint);
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("Host", HOST)
            .header("X-Content-Sha256", payload_hash)
            .header("X-Date", x_date)
            .header("Authorization", authorization)
            .body(payload)
            .send()
            .await
            .map_err(|e| TranslateError::from_request(Provider::Volcano, e))?;

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

        if let Some(error) = json.pointer("/ResponseMetadata/Error") {
            if !error.is_null() {
                return Err(TranslateError::Provider {
                    provider: NAME,
                    status: status.as_u16(),
                    message: error.to_string(),
                });
            }
        }

        let results = json
            .get("TranslationList")
            .and_then(Value::as_array)
            .ok_or_else(|| TranslateError::Parse {
                provider: NAME,
                message: "missing TranslationList".to_string(),
            })?;

        results
            .iter()
            .map(|item| {
                item.get("Translation")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| TranslateError::Parse {
                        provider: NAME,
                        message: "missing Translation".to_string(),
                    })
            })
            .collect()
    }
}

#[async_trait]
impl TranslateProvider for VolcanoTranslator {
    fn name(&self) -> &'static str {
        NAME
    }

    fn max_batch_len(&self) -> Option<usize> {
        Some(MAX_BATCH)
    }

    async fn translate_batch(&self, texts: &[String]) -> Result<Vec<String>> {
        if texts.len() > MAX_BATCH {
            return Err(TranslateError::BatchTooLarge {
                provider: NAME,
                limit: MAX_BATCH,
                len: texts.len(),
            });
        }
        self.call(texts).await
    }

    async fn translate_single(&self, text: &str) -> Result<String> {
        let mut results = self.call(&[text.to_string()]).await?;
        results.pop().ok_or(TranslateError::CountMismatch {
            expected: 1,
            actual: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(endpoint: &str) -> VolcanoTranslator {
        let config = VolcanoConfig {
            enabled: true,
            access_key_id: "AKLTtest".to_string(),
            secret_access_key: "secret".to_string(),
            region: "cn-north-1".to_string(),
        };
        VolcanoTranslator::new(reqwest::Client::new(), &config, "ja", "zh")
            .with_endpoint(endpoint.to_string())
    }

    #[tokio::test]
    async fn batch_parses_translation_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("Action", "TranslateText"))
            .and(query_param("Version", "2020-06-01"))
            .and(header_exists("Authorization"))
            .and(header_exists("X-Content-Sha256"))
            .and(header_exists("X-Date"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "TranslationList": [
                    { "Translation": "甲", "DetectedSourceLanguage": "ja" },
                    { "Translation": "乙", "DetectedSourceLanguage": "ja" }
                ],
                "ResponseMetadata": { "Action": "TranslateText" }
            })))
            .mount(&server)
            .await;

        let out = adapter(&server.uri())
            .translate_batch(&["A".into(), "B".into()])
            .await
            .unwrap();
        assert_eq!(out, vec!["甲", "乙"]);
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected_before_sending() {
        let server = MockServer::start().await;
        // No mock mounted: a request would 404 and fail differently.
        let texts: Vec<String> = (0..17).map(|i| format!("t{i}")).collect();
        let err = adapter(&server.uri())
            .translate_batch(&texts)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TranslateError::BatchTooLarge { limit: 16, len: 17, .. }
        ));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn metadata_error_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ResponseMetadata": {
                    "Error": { "Code": "MissingParameter", "Message": "TextList required" }
                }
            })))
            .mount(&server)
            .await;

        let err = adapter(&server.uri())
            .translate_batch(&["A".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, TranslateError::Provider { .. }));
    }

    #[test]
    fn signing_key_chain_is_date_scoped() {
        let config = VolcanoConfig {
            enabled: true,
            access_key_id: "AKLTtest".to_string(),
            secret_access_key: "secret".to_string(),
            region: "cn-north-1".to_string(),
        };
        let adapter = VolcanoTranslator::new(reqwest::Client::new(), &config, "ja", "zh");
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let (auth, x_date, _) = adapter.signed_headers(now, "{}");
        assert_eq!(x_date, "20231114T221320Z");
        assert!(auth.starts_with(
            "HMAC-SHA256 Credential=AKLTtest/20231114/cn-north-1/translate/request"
        ));
        assert!(auth.contains("SignedHeaders=content-type;host;x-content-sha256;x-date"));
    }
}
