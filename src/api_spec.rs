// src/api_spec.rs
//
// Static request descriptors for every supported claim API. The catalog is
// built once at startup (built-in defaults plus `[endpoints.*]` overrides from
// the settings) and handed to the fetcher by reference.

use crate::settings::{EndpointOverride, Settings};
use indexmap::IndexMap;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

/// Placeholder substituted with the wallet address in URL and query templates.
pub const ADDRESS_PLACEHOLDER: &str = "{address}";

/// Claim APIs known to the checker.
///
/// The declaration order is the fixed order in which the orchestrator runs the
/// per-API batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiKind {
    #[serde(alias = "puffer")]
    Puffer,
    #[serde(alias = "etherfi")]
    Etherfi,
    #[serde(alias = "eigen_s2")]
    EigenS2,
    #[serde(alias = "renzo")]
    Renzo,
}

impl ApiKind {
    pub const ALL: [ApiKind; 4] = [
        ApiKind::Puffer,
        ApiKind::Etherfi,
        ApiKind::EigenS2,
        ApiKind::Renzo,
    ];

    /// Upper-case name used in configuration and console output.
    pub fn label(&self) -> &'static str {
        match self {
            ApiKind::Puffer => "PUFFER",
            ApiKind::Etherfi => "ETHERFI",
            ApiKind::EigenS2 => "EIGEN_S2",
            ApiKind::Renzo => "RENZO",
        }
    }

    /// Lower-case field name used in the output records.
    pub fn key(&self) -> &'static str {
        match self {
            ApiKind::Puffer => "puffer",
            ApiKind::Etherfi => "etherfi",
            ApiKind::EigenS2 => "eigen_s2",
            ApiKind::Renzo => "renzo",
        }
    }
}

impl fmt::Display for ApiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown API `{0}` (expected one of PUFFER, ETHERFI, EIGEN_S2, RENZO)")]
pub struct UnknownApi(pub String);

impl FromStr for ApiKind {
    type Err = UnknownApi;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        ApiKind::ALL
            .into_iter()
            .find(|kind| kind.label() == normalized)
            .ok_or_else(|| UnknownApi(s.trim().to_string()))
    }
}

#[derive(Debug, Error)]
pub enum ApiSpecError {
    #[error(transparent)]
    UnknownApi(#[from] UnknownApi),
    #[error("{api}: invalid header name `{name}`")]
    HeaderName { api: ApiKind, name: String },
    #[error("{api}: invalid value for header `{name}`")]
    HeaderValue { api: ApiKind, name: String },
    #[error("{api}: invalid URL template `{template}`: {source}")]
    UrlTemplate {
        api: ApiKind,
        template: String,
        #[source]
        source: url::ParseError,
    },
}

/// Immutable request descriptor for one claim API.
#[derive(Debug, Clone)]
pub struct ApiSpec {
    pub kind: ApiKind,
    url_template: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
}

impl ApiSpec {
    pub fn new<H, Q>(
        kind: ApiKind,
        url_template: impl Into<String>,
        headers: H,
        query: Q,
    ) -> Result<Self, ApiSpecError>
    where
        H: IntoIterator<Item = (String, String)>,
        Q: IntoIterator<Item = (String, String)>,
    {
        let url_template = url_template.into();
        // Reject templates that cannot produce a URL for any address.
        Url::parse(&url_template.replace(ADDRESS_PLACEHOLDER, "0x0")).map_err(|source| {
            ApiSpecError::UrlTemplate {
                api: kind,
                template: url_template.clone(),
                source,
            }
        })?;

        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                ApiSpecError::HeaderName {
                    api: kind,
                    name: name.clone(),
                }
            })?;
            let header_value =
                HeaderValue::from_str(&value).map_err(|_| ApiSpecError::HeaderValue {
                    api: kind,
                    name: name.clone(),
                })?;
            header_map.insert(header_name, header_value);
        }

        Ok(Self {
            kind,
            url_template,
            headers: header_map,
            query: query.into_iter().collect(),
        })
    }

    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Builds the request URL for `address`, substituting it into the URL
    /// template and every query value.
    pub fn request_url(&self, address: &str) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.url_template.replace(ADDRESS_PLACEHOLDER, address))?;
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &self.query {
                pairs.append_pair(name, &value.replace(ADDRESS_PLACEHOLDER, address));
            }
        }
        Ok(url)
    }

    fn apply_override(self, endpoint: &EndpointOverride) -> Result<Self, ApiSpecError> {
        let url_template = endpoint
            .url
            .clone()
            .unwrap_or_else(|| self.url_template.clone());
        let query = endpoint.query.clone().unwrap_or_else(|| self.query.clone());

        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        headers.extend(endpoint.headers.iter().cloned());

        ApiSpec::new(self.kind, url_template, headers, query)
    }
}

fn base_headers() -> Vec<(String, String)> {
    [
        ("accept", "application/json"),
        ("content-type", "application/json"),
        ("accept-encoding", "gzip, deflate, br"),
        ("accept-language", "en,en-US;q=0.9"),
        ("priority", "u=1, i"),
        (
            "sec-ch-ua",
            "\"Chromium\";v=\"128\", \"Not;A=Brand\";v=\"24\", \"Google Chrome\";v=\"128\"",
        ),
        ("sec-ch-ua-mobile", "?0"),
        ("sec-ch-ua-platform", "\"macOS\""),
        ("sec-fetch-dest", "empty"),
        ("sec-fetch-mode", "cors"),
        (
            "user-agent",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36",
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn with_extra(extra: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut headers = base_headers();
    headers.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    headers
}

/// Built-in descriptor for `kind`.
pub fn default_spec(kind: ApiKind) -> Result<ApiSpec, ApiSpecError> {
    let address_query = |name: &str| vec![(name.to_string(), ADDRESS_PLACEHOLDER.to_string())];
    match kind {
        ApiKind::Puffer => ApiSpec::new(
            kind,
            "https://api.hedgey.finance/token-claims/{address}",
            with_extra(&[
                ("origin", "https://claims.puffer.fi"),
                ("referer", "https://claims.puffer.fi/"),
            ]),
            Vec::new(),
        ),
        ApiKind::Etherfi => ApiSpec::new(
            kind,
            "https://claim.ether.fi/api/eigenlayer-claim-data",
            with_extra(&[("referer", "https://claim.ether.fi/eigenlayer")]),
            address_query("address"),
        ),
        ApiKind::EigenS2 => ApiSpec::new(
            kind,
            "https://claims.eigenfoundation.org/clique-eigenlayer-api-v2/campaign/eigenlayer/credentials",
            with_extra(&[
                ("referer", "https://claims.eigenfoundation.org/"),
                ("origin", "https://claims.eigenfoundation.org"),
            ]),
            address_query("walletAddress"),
        ),
        ApiKind::Renzo => ApiSpec::new(
            kind,
            "https://airdrop-data-ezeigen.s3.us-west-2.amazonaws.com/{address}/0x6910c6df496dcb1fb2e2983ca69bb6fe62a7ade8d6289d9ad91d493d05a40aea-{address}.json",
            with_extra(&[("referer", "https://ezeigen.liquifi.finance/")]),
            Vec::new(),
        ),
    }
}

/// Descriptors for every [`ApiKind`], keyed in the fixed run order.
#[derive(Debug, Clone)]
pub struct ApiCatalog {
    specs: IndexMap<ApiKind, ApiSpec>,
}

impl ApiCatalog {
    /// Built-in endpoints without overrides.
    pub fn builtin() -> Result<Self, ApiSpecError> {
        let specs = ApiKind::ALL
            .into_iter()
            .map(|kind| default_spec(kind).map(|spec| (kind, spec)))
            .collect::<Result<_, _>>()?;
        Ok(Self { specs })
    }

    /// Built-in endpoints with the `[endpoints.*]` overrides of `settings` applied.
    pub fn from_settings(settings: &Settings) -> Result<Self, ApiSpecError> {
        let mut catalog = Self::builtin()?;
        for (name, endpoint) in &settings.endpoints {
            let kind: ApiKind = name.parse()?;
            if let Some(spec) = catalog.specs.shift_remove(&kind) {
                catalog.insert(spec.apply_override(endpoint)?);
            }
        }
        catalog.specs.sort_keys();
        Ok(catalog)
    }

    pub fn insert(&mut self, spec: ApiSpec) {
        self.specs.insert(spec.kind, spec);
    }

    pub fn get(&self, kind: ApiKind) -> Option<&ApiSpec> {
        self.specs.get(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ApiSpec> {
        self.specs.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_kind_names() {
        assert_eq!(ApiKind::EigenS2.label(), "EIGEN_S2");
        assert_eq!(ApiKind::EigenS2.key(), "eigen_s2");
        assert_eq!("eigen-s2".parse::<ApiKind>().unwrap(), ApiKind::EigenS2);
        assert_eq!(" renzo ".parse::<ApiKind>().unwrap(), ApiKind::Renzo);
        assert!("swell".parse::<ApiKind>().is_err());

        let parsed: ApiKind = serde_json::from_str("\"EIGEN_S2\"").unwrap();
        assert_eq!(parsed, ApiKind::EigenS2);
        let lower: ApiKind = serde_json::from_str("\"etherfi\"").unwrap();
        assert_eq!(lower, ApiKind::Etherfi);
    }

    #[test]
    fn test_request_url_substitutes_path_and_query() {
        let catalog = ApiCatalog::builtin().unwrap();

        let renzo = catalog.get(ApiKind::Renzo).unwrap();
        let url = renzo.request_url("0xabc").unwrap();
        assert_eq!(url.path().matches("0xabc").count(), 2);

        let eigen = catalog.get(ApiKind::EigenS2).unwrap();
        let url = eigen.request_url("0xabc").unwrap();
        assert_eq!(url.query(), Some("walletAddress=0xabc"));

        let puffer = catalog.get(ApiKind::Puffer).unwrap();
        let url = puffer.request_url("0xabc").unwrap();
        assert_eq!(url.as_str(), "https://api.hedgey.finance/token-claims/0xabc");
        assert_eq!(
            puffer.headers().get("origin").unwrap(),
            "https://claims.puffer.fi"
        );
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let result = ApiSpec::new(
            ApiKind::Puffer,
            "http://localhost/{address}",
            vec![("bad header".to_string(), "x".to_string())],
            Vec::new(),
        );
        assert!(matches!(result, Err(ApiSpecError::HeaderName { .. })));

        let result = ApiSpec::new(ApiKind::Puffer, "not a url", Vec::new(), Vec::new());
        assert!(matches!(result, Err(ApiSpecError::UrlTemplate { .. })));
    }

    #[test]
    fn test_catalog_applies_overrides() {
        let mut settings = Settings::default();
        settings.endpoints.insert(
            "etherfi".to_string(),
            EndpointOverride {
                url: Some("http://127.0.0.1:9999/etherfi".to_string()),
                headers: vec![("x-test".to_string(), "1".to_string())],
                query: None,
            },
        );

        let catalog = ApiCatalog::from_settings(&settings).unwrap();
        let spec = catalog.get(ApiKind::Etherfi).unwrap();
        assert_eq!(
            spec.request_url("0x1").unwrap().as_str(),
            "http://127.0.0.1:9999/etherfi?address=0x1"
        );
        assert_eq!(spec.headers().get("x-test").unwrap(), "1");
        assert_eq!(
            spec.headers().get("referer").unwrap(),
            "https://claim.ether.fi/eigenlayer"
        );

        let order: Vec<ApiKind> = catalog.iter().map(|s| s.kind).collect();
        assert_eq!(order, ApiKind::ALL.to_vec());

        settings
            .endpoints
            .insert("swell".to_string(), EndpointOverride::default());
        assert!(matches!(
            ApiCatalog::from_settings(&settings),
            Err(ApiSpecError::UnknownApi(_))
        ));
    }
}
