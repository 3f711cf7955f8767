//! Tencent TMT adapter (TC3-HMAC-SHA256 request signing)
//!
//! The signature is computed over the exact serialized payload, so the
//! request body is built as a string once and sent byte-for-byte.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::core::config::TencentConfig;
use crate::core::errors::{Result, TranslateError};
use crate::core::models::Provider;
use crate::providers::sign::{hex_lower, hmac_sha256, sha256_hex};
use crate::providers::TranslateProvider;

const NAME: &str = "tencent";
const HOST: &str = "tmt.tencentcloudapi.com";
const SERVICE: &str = "tmt";
const VERSION: &str = "2018-03-21";
const ALGORITHM: &str = "TC3-HMAC-SHA256";

pub struct TencentTranslator {
    client: reqwest::Client,
    endpoint: String,
    secret_id: String,
    secret_key: String,
    region: String,
    from: String,
    to: String,
}

impl TencentTranslator {
    pub fn new(
        client: reqwest::Client,
        config: &TencentConfig,
        source_lang: &str,
        target_lang: &str,
    ) -> Self {
        Self {
            client,
            endpoint: format!("https://{HOST}/"),
            secret_id: config.secret_id.clone(),
            secret_key: config.secret_key.clone(),
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

    /// TC3 authorization header: canonicalize request, hash payload, derive
    /// the signing key by HMAC chaining over date and service, sign.
    fn authorization(&self, now: DateTime<Utc>, payload: &str) -> String {
        let canonical_headers =
            format!("content-type:application/json; charset=utf-8\nhost:{HOST}\n");
        let signed_headers = "content-type;host";
        let canonical_request = format!(
            "POST\n/\n\n{canonical_headers}\n{signed_headers}\n{}",
            sha256_hex(payload)
        );

        let date = now.format("%Y-%m-%d").to_string();
        let credential_scope = format!("{date}/{SERVICE}/tc3_request");
        let string_to_sign = format!(
            "{ALGORITHM}\n{}\n{credential_scope}\n{}",
            now.timestamp(),
            sha256_hex(&canonical_request)
        );

        let k_date = hmac_sha256(format!("TC3{}", self.secret_key).as_bytes(), &date);
        let k_service = hmac_sha256(&k_date, SERVICE);
        let k_signing = hmac_sha256(&k_service, "tc3_request");
        let signature = hex_lower(&hmac_sha256(&k_signing, &string_to_sign));

        format!(
            "{ALGORITHM} Credential={}/{credential_scope}, \
             SignedHeaders={signed_headers}, Signature={signature}"
        , self.secret_id)
    }

    async fn call(&self, action: &str, body: Value) -> Result<Value> {
        let payload = serde_json::to_string(&body)?;
        let now = Utc::now();
        let authorization = self.authorization(now, &payload);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json; charset=utf-8")
            .header("Host", HOST)
            .header("X-TC-Action", action)
            .header("X-TC-Version", VERSION)
            .header("X-TC-Timestamp", now.timestamp().to_string())
            .header("X-TC-Region", &self.region)
            .header("Authorization", authorization)
            .body(payload)
            .send()
            .await
            .map_err(|e| TranslateError::from_request(Provider::Tencent, e))?;

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

        let resp = json.get("Response").ok_or_else(|| TranslateError::Parse {
            provider: NAME,
            message: "missing Response".to_string(),
        })?;

        if let Some(error) = resp.get("Error") {
            return Err(TranslateError::Provider {
                provider: NAME,
                status: status.as_u16(),
                message: error.to_string(),
            });
        }

        Ok(resp.clone())
    }
}

#[async_trait]
impl TranslateProvider for TencentTranslator {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn translate_batch(&self, texts: &[String]) -> Result<Vec<String>> {
        let body = json!({
            "SourceTextList": texts,
            "Source": self.from,
            "Target": self.to,
            "ProjectId": 0,
        });

        let resp = self.call("TextTranslateBatch", body).await?;
        let results = resp
            .get("TargetTextList")
            .and_then(Value::as_array)
            .ok_or_else(|| TranslateError::Parse {
                provider: NAME,
                message: "missing TargetTextList".to_string(),
            })?;

        results
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| TranslateError::Parse {
                        provider: NAME,
                        message: "non-string entry in TargetTextList".to_string(),
                    })
            })
            .collect()
    }

    async fn translate_single(&self, text: &str) -> Result<String> {
        let body = json!({
            "SourceText": text,
            "Source": self.from,
            "Target": self.to,
            "ProjectId": 0,
        });

        let resp = self.call("TextTranslate", body).await?;
        resp.get("TargetText")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| TranslateError::Parse {
                provider: NAME,
                message: "missing TargetText".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, header_exists, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(endpoint: &str) -> TencentTranslator {
        let config = TencentConfig {
            enabled: true,
            secret_id: "AKIDtest".to_string(),
            secret_key: "secret".to_string(),
            region: "ap-guangzhou".to_string(),
        };
        TencentTranslator::new(reqwest::Client::new(), &config, "ja", "zh")
            .with_endpoint(endpoint.to_string())
    }

    #[tokio::test]
    async fn batch_parses_target_text_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("X-TC-Action", "TextTranslateBatch"))
            .and(header_exists("Authorization"))
            .and(header_exists("X-TC-Timestamp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Response": {
                    "TargetTextList": ["甲", "乙"],
                    "RequestId": "req-1"
                }
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
    async fn single_parses_target_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("X-TC-Action", "TextTranslate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Response": { "TargetText": "甲", "RequestId": "req-2" }
            })))
            .mount(&server)
            .await;

        let out = adapter(&server.uri()).translate_single("A").await.unwrap();
        assert_eq!(out, "甲");
    }

    #[tokio::test]
    async fn structured_error_payload_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Response": {
                    "Error": { "Code": "AuthFailure", "Message": "signature mismatch" }
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
    fn signature_is_stable_for_fixed_inputs() {
        let config = TencentConfig {
            enabled: true,
            secret_id: "AKIDtest".to_string(),
            secret_key: "secret".to_string(),
            region: "ap-guangzhou".to_string(),
        };
        let adapter = TencentTranslator::new(reqwest::Client::new(), &config, "ja", "zh");
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let a = adapter.authorization(now, r#"{"SourceText":"A"}"#);
        let b = adapter.authorization(now, r#"{"SourceText":"A"}"#);
        assert_eq!(a, b);
        assert!(a.starts_with("TC3-HMAC-SHA256 Credential=AKIDtest/2023-11-14/tmt/tc3_request"));
    }
}
