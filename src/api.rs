//! Synchronous client for the **RGPH census API**.
//!
//! Every endpoint answers with the `{ success, data, message?, error? }` envelope
//! (`models::ApiResponse`). Accessors return that envelope unchanged; use
//! `ApiResponse::into_result` to unwrap it.
//!
//! ### Notes
//! - One GET per call, parameters in the query string, no request bodies.
//! - No retry or backoff: a failed call is logged and handed back to the caller.
//! - Path segments (codes, slugs) are percent-encoded.
//!
//! Typical usage:
//! ```no_run
//! # use rgph::{Client, AdminLevel};
//! let client = Client::new("http://localhost:5000/api")?;
//! let geo = client.geojson(AdminLevel::Region)?.into_result()?;
//! println!("{} features", geo.feature_count());
//! # Ok::<(), rgph::ApiError>(())
//! ```
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{
    AdminLevel, ApiResponse, ChartDataEntry, GeoJsonData, Indicator, IndicatorParams, Language,
    MapDataParams, MapDataPayload, Region, RegionParams, SearchResult, Theme,
};
use log::{debug, error};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    http: HttpClient,
}

// Allow -, _, . unescaped in codes (common for region/indicator ids)
const SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

const NO_QUERY: &[(&str, &str)] = &[];

fn enc(segment: &str) -> String {
    percent_encoding::utf8_percent_encode(segment.trim(), SAFE).to_string()
}

impl Client {
    /// Client bound to `base_url` with default timeouts.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::from_config(&Config {
            api_base: base_url.to_string(),
            ..Config::default()
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let base_url = config.api_base.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::InvalidBaseUrl(config.api_base.clone()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = HttpClient::builder()
            .default_headers(headers)
            .timeout(config.timeout) // total request timeout
            .connect_timeout(config.connect_timeout)
            .redirect(Policy::limited(5)) // cap redirects
            .user_agent(concat!("rgph/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path such as `/regions`.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issue one GET and decode the envelope. Failures are logged before being returned.
    fn get<T, Q>(&self, path: &str, query: &Q) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.url_for(path);
        debug!("GET {}", url);
        let result = self.send(&url, query);
        if let Err(e) = &result {
            error!("API error [{}]: {}", path, e);
        }
        result
    }

    fn send<T, Q>(&self, url: &str, query: &Q) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let resp = self
            .http
            .get(url)
            .query(query)
            .send()
            .map_err(|source| ApiError::Transport {
                url: url.to_string(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        resp.json().map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }

    // ---------------------------------------------------------------- regions

    pub fn regions(&self, params: &RegionParams) -> Result<ApiResponse<Vec<Region>>, ApiError> {
        self.get("/regions", params)
    }

    pub fn region(&self, code: &str) -> Result<ApiResponse<Region>, ApiError> {
        self.get(&format!("/regions/{}", enc(code)), NO_QUERY)
    }

    pub fn region_children(&self, code: &str) -> Result<ApiResponse<Vec<Region>>, ApiError> {
        self.get(&format!("/regions/{}/children", enc(code)), NO_QUERY)
    }

    pub fn region_indicators(
        &self,
        code: &str,
        params: &IndicatorParams,
    ) -> Result<ApiResponse<Vec<Indicator>>, ApiError> {
        self.get(&format!("/regions/{}/indicators", enc(code)), params)
    }

    // ----------------------------------------------------------------- themes

    pub fn themes(&self) -> Result<ApiResponse<Vec<Theme>>, ApiError> {
        self.get("/themes", NO_QUERY)
    }

    pub fn theme(&self, slug: &str) -> Result<ApiResponse<Theme>, ApiError> {
        self.get(&format!("/themes/{}", enc(slug)), NO_QUERY)
    }

    /// Headline figures of a theme. The shape is theme-specific, so rows stay untyped.
    pub fn theme_key_figures(&self, slug: &str) -> Result<ApiResponse<Vec<Value>>, ApiError> {
        self.get(&format!("/themes/{}/key-figures", enc(slug)), NO_QUERY)
    }

    // ------------------------------------------------------------- indicators

    pub fn indicators(
        &self,
        params: &IndicatorParams,
    ) -> Result<ApiResponse<Vec<Indicator>>, ApiError> {
        self.get("/indicators", params)
    }

    pub fn indicators_by_theme(
        &self,
        theme_slug: &str,
        params: &IndicatorParams,
    ) -> Result<ApiResponse<Vec<Indicator>>, ApiError> {
        self.get(&format!("/indicators/by-theme/{}", enc(theme_slug)), params)
    }

    pub fn map_data(
        &self,
        indicator_code: &str,
        params: &MapDataParams,
    ) -> Result<ApiResponse<MapDataPayload>, ApiError> {
        self.get(
            &format!("/indicators/map-data/{}", enc(indicator_code)),
            params,
        )
    }

    /// Chart rows for an indicator; `params` is passed through as query pairs.
    pub fn chart_data(
        &self,
        indicator_code: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<ApiResponse<Vec<ChartDataEntry>>, ApiError> {
        self.get(
            &format!("/indicators/chart-data/{}", enc(indicator_code)),
            params,
        )
    }

    /// Compare one indicator across regions (`regions=a,b,c`).
    pub fn compare(&self, indicator: &str, regions: &[String]) -> Result<ApiResponse<Value>, ApiError> {
        let regions = regions
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .collect::<Vec<_>>()
            .join(",");
        self.get(
            "/indicators/compare",
            &[("indicator", indicator), ("regions", regions.as_str())],
        )
    }

    // -------------------------------------------------------------------- geo

    pub fn geojson(&self, level: AdminLevel) -> Result<ApiResponse<GeoJsonData>, ApiError> {
        self.get(&format!("/geo/{}", level.as_str()), NO_QUERY)
    }

    // ----------------------------------------------------------------- search

    pub fn search(
        &self,
        query: &str,
        lang: Language,
    ) -> Result<ApiResponse<Vec<SearchResult>>, ApiError> {
        self.get("/search", &[("q", query), ("lang", lang.code())])
    }
}
