use crate::api_spec::ApiKind;
use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Inputs {
    #[serde(default = "default_proxy_file")]
    pub proxy_file: PathBuf,
    #[serde(default = "default_address_file")]
    pub address_file: PathBuf,
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
    /// When false the proxy file is ignored and every request goes out directly.
    #[serde(default = "default_true")]
    pub use_proxies: bool,
}

fn default_true() -> bool {
    true
}
fn default_proxy_file() -> PathBuf {
    PathBuf::from("proxies.txt")
}
fn default_address_file() -> PathBuf {
    PathBuf::from("evm.txt")
}
fn default_output_file() -> PathBuf {
    PathBuf::from("results.json")
}

impl Default for Inputs {
    fn default() -> Self {
        Self {
            proxy_file: default_proxy_file(),
            address_file: default_address_file(),
            output_file: default_output_file(),
            use_proxies: default_true(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProxyCheck {
    #[serde(default = "default_proxy_test_url")]
    pub test_url: String,
    #[serde(default = "default_proxy_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Fixed seed for the working-set shuffle and proxy draws (tests, reproducible runs)
    #[serde(default)]
    pub shuffle_seed: Option<u64>,
}

fn default_proxy_test_url() -> String {
    "http://httpbin.org/ip".to_string()
}
fn default_proxy_timeout_seconds() -> u64 {
    5
}

impl Default for ProxyCheck {
    fn default() -> Self {
        Self {
            test_url: default_proxy_test_url(),
            timeout_seconds: default_proxy_timeout_seconds(),
            shuffle_seed: None,
        }
    }
}

impl ProxyCheck {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Fetch {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_max_attempts() -> u32 {
    5
}
fn default_retry_delay_ms() -> u64 {
    2_000
}
fn default_request_timeout_seconds() -> u64 {
    10
}

impl Default for Fetch {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl Fetch {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Run {
    /// APIs to report on; also the field order of every output record.
    #[serde(default = "default_apis")]
    pub apis: Vec<ApiKind>,
    /// Pause between two API batches.
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,
}

fn default_apis() -> Vec<ApiKind> {
    vec![
        ApiKind::Puffer,
        ApiKind::EigenS2,
        ApiKind::Renzo,
        ApiKind::Etherfi,
    ]
}
fn default_cooldown_seconds() -> u64 {
    30
}

impl Default for Run {
    fn default() -> Self {
        Self {
            apis: default_apis(),
            cooldown_seconds: default_cooldown_seconds(),
        }
    }
}

impl Run {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }
}

/// Per-API endpoint override. Headers and query pairs are lists of
/// `[name, value]` so their case survives the config loader.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct EndpointOverride {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub query: Option<Vec<(String, String)>>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub inputs: Inputs,
    #[serde(default)]
    pub proxy_check: ProxyCheck,
    #[serde(default)]
    pub fetch: Fetch,
    #[serde(default)]
    pub run: Run,
    /// Keyed by API name (`PUFFER`, `etherfi`, ...).
    #[serde(default)]
    pub endpoints: HashMap<String, EndpointOverride>,
}

impl Settings {
    /// Loads `Config.toml` from the working directory if present, then applies
    /// environment overrides.
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Loads the given config file (required) or the optional default
    /// `Config.toml`, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let source = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("Config").required(false),
        };
        let s = Config::builder().add_source(source).build()?;

        let mut settings: Self = s.try_deserialize()?;
        settings.apply_env_overrides()?;
        settings.validate()?;
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(path) = env::var("CLAIMS_PROXY_FILE") {
            if !path.trim().is_empty() {
                self.inputs.proxy_file = PathBuf::from(path.trim());
            }
        }
        if let Ok(path) = env::var("CLAIMS_ADDRESS_FILE") {
            if !path.trim().is_empty() {
                self.inputs.address_file = PathBuf::from(path.trim());
            }
        }
        if let Ok(path) = env::var("CLAIMS_OUTPUT_FILE") {
            if !path.trim().is_empty() {
                self.inputs.output_file = PathBuf::from(path.trim());
            }
        }
        if let Ok(raw_apis) = env::var("CLAIMS_APIS") {
            let list = parse_string_list(&raw_apis);
            if !list.is_empty() {
                self.run.apis = parse_api_list(&list)?;
            }
        }
        if let Ok(raw) = env::var("CLAIMS_COOLDOWN_SECONDS") {
            self.run.cooldown_seconds = raw.trim().parse().map_err(|e| {
                ConfigError::Message(format!("CLAIMS_COOLDOWN_SECONDS `{}`: {}", raw, e))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.max_attempts == 0 {
            return Err(ConfigError::Message(
                "fetch.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.run.apis.is_empty() {
            return Err(ConfigError::Message(
                "run.apis must name at least one API".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parses a list given either as a JSON array or as comma separated values.
pub fn parse_string_list(input: &str) -> Vec<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if trimmed.starts_with('[') {
        if let Ok(v) = serde_json::from_str::<Vec<String>>(trimmed) {
            return v;
        }
    }

    trimmed
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|s| s.trim().trim_matches('"').trim_matches('\'').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn parse_api_list(names: &[String]) -> Result<Vec<ApiKind>, ConfigError> {
    let mut apis = Vec::with_capacity(names.len());
    for name in names {
        let kind: ApiKind = name
            .parse()
            .map_err(|e: crate::api_spec::UnknownApi| ConfigError::Message(e.to_string()))?;
        if !apis.contains(&kind) {
            apis.push(kind);
        }
    }
    Ok(apis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.fetch.max_attempts, 5);
        assert_eq!(settings.fetch.retry_delay(), Duration::from_secs(2));
        assert_eq!(settings.fetch.request_timeout(), Duration::from_secs(10));
        assert_eq!(settings.proxy_check.timeout(), Duration::from_secs(5));
        assert_eq!(settings.run.cooldown(), Duration::from_secs(30));
        assert_eq!(
            settings.run.apis,
            vec![
                ApiKind::Puffer,
                ApiKind::EigenS2,
                ApiKind::Renzo,
                ApiKind::Etherfi
            ]
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_parse_string_list() {
        assert_eq!(parse_string_list("PUFFER, RENZO"), vec!["PUFFER", "RENZO"]);
        assert_eq!(
            parse_string_list(r#"["PUFFER","ETHERFI"]"#),
            vec!["PUFFER", "ETHERFI"]
        );
        assert_eq!(parse_string_list("[PUFFER, ETHERFI]"), vec!["PUFFER", "ETHERFI"]);
        assert!(parse_string_list("  ").is_empty());
    }

    #[test]
    fn test_parse_api_list_dedupes_and_rejects_unknown() {
        let names = vec!["puffer".to_string(), "PUFFER".to_string(), "renzo".to_string()];
        assert_eq!(
            parse_api_list(&names).unwrap(),
            vec![ApiKind::Puffer, ApiKind::Renzo]
        );
        assert!(parse_api_list(&["swell".to_string()]).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut settings = Settings::default();
        settings.fetch.max_attempts = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.run.apis.clear();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[fetch]
max_attempts = 3
retry_delay_ms = 10

[run]
apis = ["ETHERFI", "PUFFER"]
cooldown_seconds = 0

[endpoints.PUFFER]
url = "http://127.0.0.1:1/claims/{{address}}"
query = [["walletAddress", "{{address}}"]]
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.fetch.max_attempts, 3);
        assert_eq!(settings.fetch.request_timeout_seconds, 10);
        assert_eq!(settings.run.apis, vec![ApiKind::Etherfi, ApiKind::Puffer]);
        assert_eq!(settings.run.cooldown_seconds, 0);

        let endpoint = settings
            .endpoints
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("puffer"))
            .map(|(_, endpoint)| endpoint)
            .unwrap();
        assert_eq!(
            endpoint.url.as_deref(),
            Some("http://127.0.0.1:1/claims/{address}")
        );
        assert_eq!(
            endpoint.query.as_deref(),
            Some(&[("walletAddress".to_string(), "{address}".to_string())][..])
        );
    }
}
