use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ApiError;
use crate::i18n::{localized_name, localized_with_variants};

/// Granularity of geographic aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminLevel {
    #[default]
    Region,
    District,
    Commune,
}

impl AdminLevel {
    pub const ALL: [AdminLevel; 3] = [AdminLevel::Region, AdminLevel::District, AdminLevel::Commune];

    pub fn as_str(self) -> &'static str {
        match self {
            AdminLevel::Region => "region",
            AdminLevel::District => "district",
            AdminLevel::Commune => "commune",
        }
    }

    /// Slot index used by per-level caches.
    pub(crate) fn index(self) -> usize {
        match self {
            AdminLevel::Region => 0,
            AdminLevel::District => 1,
            AdminLevel::Commune => 2,
        }
    }
}

impl fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for AdminLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "region" => Ok(AdminLevel::Region),
            "district" => Ok(AdminLevel::District),
            "commune" => Ok(AdminLevel::Commune),
            other => Err(format!(
                "unknown admin level {other:?}, expected region, district or commune"
            )),
        }
    }
}

/// Supported display languages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Fr,
    Ar,
    En,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Fr, Language::Ar, Language::En];

    pub fn code(self) -> &'static str {
        match self {
            Language::Fr => "fr",
            Language::Ar => "ar",
            Language::En => "en",
        }
    }

    /// Parse a language tag such as `fr`, `ar-DJ` or `en_US.UTF-8`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag
            .trim()
            .split(['-', '_', '.', '@'])
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        match primary.as_str() {
            "fr" => Some(Language::Fr),
            "ar" => Some(Language::Ar),
            "en" => Some(Language::En),
            _ => None,
        }
    }

    pub fn is_rtl(self) -> bool {
        self == Language::Ar
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::from_tag(s).ok_or_else(|| format!("unsupported language {s:?}, expected fr, ar or en"))
    }
}

/// A display name: either one plain string or one string per language code.
///
/// Translations may be `null`; they resolve like missing ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalizedText {
    Plain(String),
    Localized(BTreeMap<String, Option<String>>),
}

impl LocalizedText {
    /// Build a per-language name from `(code, text)` pairs.
    pub fn localized<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        LocalizedText::Localized(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), Some(v.to_string())))
                .collect(),
        )
    }

    pub fn resolve(&self, lang: Language) -> String {
        localized_name(Some(self), lang)
    }
}

impl From<&str> for LocalizedText {
    fn from(s: &str) -> Self {
        LocalizedText::Plain(s.to_string())
    }
}

impl From<String> for LocalizedText {
    fn from(s: String) -> Self {
        LocalizedText::Plain(s)
    }
}

/// Standard `{ success, data, message?, error? }` envelope wrapping every response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(error.into()),
        }
    }

    /// Unwrap the envelope, turning `success: false` or missing data into an error.
    pub fn into_result(self) -> Result<T, ApiError> {
        if !self.success {
            let reason = self
                .error
                .or(self.message)
                .unwrap_or_else(|| "request unsuccessful".to_string());
            return Err(ApiError::Unsuccessful(reason));
        }
        self.data.ok_or(ApiError::MissingData)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub code: String,
    pub name: LocalizedText,
    pub name_ar: Option<String>,
    pub name_en: Option<String>,
    #[serde(default)]
    pub level: AdminLevel,
    pub parent_code: Option<String>,
    pub population: Option<f64>,
    pub area: Option<f64>,
    pub children_count: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Region {
    pub fn display_name(&self, lang: Language) -> String {
        localized_with_variants(
            Some(&self.name),
            self.name_ar.as_deref(),
            self.name_en.as_deref(),
            lang,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub slug: String,
    pub name: LocalizedText,
    pub name_ar: Option<String>,
    pub name_en: Option<String>,
    pub description: Option<LocalizedText>,
    pub description_ar: Option<String>,
    pub description_en: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub order: Option<i32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Theme {
    pub fn display_name(&self, lang: Language) -> String {
        localized_with_variants(
            Some(&self.name),
            self.name_ar.as_deref(),
            self.name_en.as_deref(),
            lang,
        )
    }

    /// Description in `lang`; empty when the theme has none.
    pub fn display_description(&self, lang: Language) -> String {
        localized_with_variants(
            self.description.as_ref(),
            self.description_ar.as_deref(),
            self.description_en.as_deref(),
            lang,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Indicator {
    pub code: String,
    pub name: LocalizedText,
    pub name_ar: Option<String>,
    pub name_en: Option<String>,
    #[serde(default)]
    pub theme_slug: String,
    pub unit: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Indicator {
    pub fn display_name(&self, lang: Language) -> String {
        localized_with_variants(
            Some(&self.name),
            self.name_ar.as_deref(),
            self.name_en.as_deref(),
            lang,
        )
    }
}

/// One value per geographic unit for an indicator at an admin level.
///
/// `value: None` means "no data" and is kept distinct from zero everywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapDataEntry {
    pub region_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commune_code: Option<String>,
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_name: Option<LocalizedText>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MapDataEntry {
    pub fn new(region_code: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            region_code: region_code.into(),
            district_code: None,
            commune_code: None,
            value,
            name: None,
            region_name: None,
            extra: Map::new(),
        }
    }

    /// Code of the finest unit this row describes.
    pub fn unit_code(&self) -> &str {
        self.commune_code
            .as_deref()
            .or(self.district_code.as_deref())
            .unwrap_or(&self.region_code)
    }

    /// Localized region name, then the plain `name`, then the unit code.
    pub fn display_name(&self, lang: Language) -> String {
        let localized = localized_name(self.region_name.as_ref(), lang);
        if !localized.is_empty() {
            return localized;
        }
        match self.name.as_deref() {
            Some(n) if !n.trim().is_empty() => n.to_string(),
            _ => self.unit_code().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDataEntry {
    pub label: String,
    pub value: f64,
    pub percentage: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Region,
    Indicator,
    Theme,
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            SearchKind::Region => "region",
            SearchKind::Indicator => "indicator",
            SearchKind::Theme => "theme",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(rename = "type")]
    pub kind: SearchKind,
    pub code: Option<String>,
    pub slug: Option<String>,
    pub name: String,
    pub name_ar: Option<String>,
    pub name_en: Option<String>,
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SearchResult {
    /// Code for regions/indicators, slug for themes.
    pub fn key(&self) -> &str {
        self.code.as_deref().or(self.slug.as_deref()).unwrap_or("")
    }

    pub fn display_name(&self, lang: Language) -> String {
        localized_with_variants(
            Some(&LocalizedText::Plain(self.name.clone())),
            self.name_ar.as_deref(),
            self.name_en.as_deref(),
            lang,
        )
    }
}

/// GeoJSON feature collection, kept as an opaque blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeoJsonData(pub Value);

impl GeoJsonData {
    /// Number of entries in `features`, or 0 when the blob has none.
    pub fn feature_count(&self) -> usize {
        self.0
            .get("features")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }
}

/// Two-stop colour ramp for choropleth shading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorScale {
    pub min: String,
    pub max: String,
}

impl Default for ColorScale {
    fn default() -> Self {
        Self {
            min: "#FEE5D9".into(),
            max: "#A50F15".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visualization {
    pub color_scale: Option<ColorScale>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `data` of the map-data endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapDataPayload {
    pub map_data: Vec<MapDataEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualization: Option<Visualization>,
}

impl MapDataPayload {
    pub fn color_scale(&self) -> Option<&ColorScale> {
        self.visualization.as_ref()?.color_scale.as_ref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<AdminLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapDataParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<AdminLevel>,
    /// Sent as a JSON-encoded string in the query.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "json_string"
    )]
    pub disaggregation: Option<BTreeMap<String, Value>>,
}

impl MapDataParams {
    pub fn at_level(level: AdminLevel) -> Self {
        Self {
            level: Some(level),
            disaggregation: None,
        }
    }
}

fn json_string<S>(value: &Option<BTreeMap<String, Value>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(map) => {
            let text = serde_json::to_string(map).map_err(serde::ser::Error::custom)?;
            serializer.serialize_str(&text)
        }
        None => serializer.serialize_none(),
    }
}
