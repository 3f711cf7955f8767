//! Configuration management

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::models::Provider;

fn default_source_lang() -> String {
    "ja".to_string()
}

fn default_target_lang() -> String {
    "zh".to_string()
}

fn default_batch_size() -> usize {
    8
}

fn default_max_retries() -> u32 {
    5
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_microsoft_endpoint() -> String {
    "https://api.cognitive.microsofttranslator.com/".to_string()
}

fn default_microsoft_region() -> String {
    "eastasia".to_string()
}

fn default_tencent_region() -> String {
    "ap-guangzhou".to_string()
}

fn default_volcano_region() -> String {
    "cn-north-1".to_string()
}

/// Microsoft Translator credentials (API-key header auth)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MicrosoftConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_microsoft_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_microsoft_region")]
    pub region: String,
}

/// Baidu Fanyi credentials (MD5 request signing)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaiduConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_key: String,
}

/// Tencent TMT credentials (TC3-HMAC-SHA256 request signing)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TencentConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub secret_id: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_tencent_region")]
    pub region: String,
}

/// Volcano Engine credentials (HMAC-SHA256 request signing)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolcanoConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub secret_access_key: String,
    #[serde(default = "default_volcano_region")]
    pub region: String,
}

/// Configuration for the translator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    #[serde(default = "default_source_lang")]
    pub source_lang: String,
    #[serde(default = "default_target_lang")]
    pub target_lang: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Persisted translation cache; `None` disables persistence
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
    #[serde(default)]
    pub microsoft: MicrosoftConfig,
    #[serde(default)]
    pub baidu: BaiduConfig,
    #[serde(default)]
    pub tencent: TencentConfig,
    #[serde(default)]
    pub volcano: VolcanoConfig,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            source_lang: default_source_lang(),
            target_lang: default_target_lang(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_ms: default_timeout_ms(),
            cache_path: Some(PathBuf::from("translation_cache.json")),
            microsoft: MicrosoftConfig {
                endpoint: default_microsoft_endpoint(),
                region: default_microsoft_region(),
                ..Default::default()
            },
            baidu: BaiduConfig::default(),
            tencent: TencentConfig {
                region: default_tencent_region(),
                ..Default::default()
            },
            volcano: VolcanoConfig {
                region: default_volcano_region(),
                ..Default::default()
            },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_flag(key: &str) -> bool {
    matches!(
        std::env::var(key).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

impl TranslatorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let batch_size = env_or("BATCH_SIZE", "8").parse::<usize>()?;
        let max_retries = env_or("MAX_RETRIES", "5").parse::<u32>()?;
        let timeout_ms = env_or("REQUEST_TIMEOUT_MS", "20000").parse::<u64>()?;

        let cache_path = match std::env::var("CACHE_PATH") {
            Ok(p) if p.is_empty() => None,
            Ok(p) => Some(PathBuf::from(p)),
            Err(_) => Some(PathBuf::from("translation_cache.json")),
        };

        Ok(Self {
            source_lang: env_or("SOURCE_LANG", "ja"),
            target_lang: env_or("TARGET_LANG", "zh"),
            batch_size,
            max_retries,
            timeout_ms,
            cache_path,
            microsoft: MicrosoftConfig {
                enabled: env_flag("MICROSOFT_ENABLED"),
                api_key: env_or("MICROSOFT_API_KEY", ""),
                endpoint: env_or(
                    "MICROSOFT_ENDPOINT",
                    &default_microsoft_endpoint(),
                ),
                region: env_or("MICROSOFT_REGION", &default_microsoft_region()),
            },
            baidu: BaiduConfig {
                enabled: env_flag("BAIDU_ENABLED"),
                app_id: env_or("BAIDU_APP_ID", ""),
                app_key: env_or("BAIDU_APP_KEY", ""),
            },
            tencent: TencentConfig {
                enabled: env_flag("TENCENT_ENABLED"),
                secret_id: env_or("TENCENT_SECRET_ID", ""),
                secret_key: env_or("TENCENT_SECRET_KEY", ""),
                region: env_or("TENCENT_REGION", &default_tencent_region()),
            },
            volcano: VolcanoConfig {
                enabled: env_flag("VOLC_ENABLED"),
                access_key_id: env_or("VOLC_ACCESS_KEY_ID", ""),
                secret_access_key: env_or("VOLC_SECRET_ACCESS_KEY", ""),
                region: env_or("VOLC_REGION", &default_volcano_region()),
            },
        })
    }

    /// Load from environment, preferring `CONFIG_PATH` file when present
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(path) = std::env::var("CONFIG_PATH") {
            return Self::from_file(path);
        }
        Self::from_env()
    }

    /// Load from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch_size == 0 {
            return Err(anyhow::anyhow!("batch_size must be greater than 0"));
        }
        if self.max_retries == 0 {
            return Err(anyhow::anyhow!("max_retries must be greater than 0"));
        }

        if self.microsoft.enabled && self.microsoft.api_key.is_empty() {
            return Err(anyhow::anyhow!("microsoft enabled but api_key is empty"));
        }
        if self.baidu.enabled && (self.baidu.app_id.is_empty() || self.baidu.app_key.is_empty()) {
            return Err(anyhow::anyhow!("baidu enabled but app_id/app_key is empty"));
        }
        if self.tencent.enabled
            && (self.tencent.secret_id.is_empty() || self.tencent.secret_key.is_empty())
        {
            return Err(anyhow::anyhow!(
                "tencent enabled but secret_id/secret_key is empty"
            ));
        }
        if self.volcano.enabled
            && (self.volcano.access_key_id.is_empty()
                || self.volcano.secret_access_key.is_empty())
        {
            return Err(anyhow::anyhow!(
                "volcano enabled but access_key_id/secret_access_key is empty"
            ));
        }

        if self.enabled_providers().is_empty() {
            warn!("no translation provider is enabled");
        }

        Ok(())
    }

    /// Providers enabled by this configuration, in tie-break order
    pub fn enabled_providers(&self) -> Vec<Provider> {
        let mut out = Vec::new();
        if self.microsoft.enabled {
            out.push(Provider::Microsoft);
        }
        if self.baidu.enabled {
            out.push(Provider::Baidu);
        }
        if self.tencent.enabled {
            out.push(Provider::Tencent);
        }
        if self.volcano.enabled {
            out.push(Provider::Volcano);
        }
        out
    }
}
