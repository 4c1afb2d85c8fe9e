//! Data bundled into the binary for when the API is unreachable.

use log::error;

use crate::models::{AdminLevel, GeoJsonData, LocalizedText, MapDataEntry};

/// Simplified outlines of the six regions, keyed by `properties.code`.
const REGION_GEOJSON: &str = include_str!("../assets/djibouti-regions.geojson");

/// Bundled geometry for `level`, if any. Only the region level ships one.
pub fn geometry(level: AdminLevel) -> Option<GeoJsonData> {
    match level {
        AdminLevel::Region => match serde_json::from_str(REGION_GEOJSON) {
            Ok(geo) => Some(geo),
            Err(e) => {
                error!("Failed to load fallback GeoJSON: {}", e);
                None
            }
        },
        AdminLevel::District | AdminLevel::Commune => None,
    }
}

/// Region population rows used as an offline value table.
pub fn map_data() -> Vec<MapDataEntry> {
    const ROWS: [(&str, f64, &str, &str, &str); 6] = [
        ("DJ-DJ", 693_000.0, "Djibouti", "جيبوتي", "Djibouti"),
        ("DJ-AR", 65_000.0, "Arta", "أرتا", "Arta"),
        ("DJ-AS", 105_000.0, "Ali Sabieh", "علي صبيح", "Ali Sabieh"),
        ("DJ-DI", 120_000.0, "Dikhil", "دخيل", "Dikhil"),
        ("DJ-TA", 95_000.0, "Tadjourah", "تاجورة", "Tadjourah"),
        ("DJ-OB", 50_000.0, "Obock", "أوبوك", "Obock"),
    ];
    ROWS.iter()
        .map(|&(code, value, fr, ar, en)| MapDataEntry {
            region_name: Some(LocalizedText::localized([("fr", fr), ("ar", ar), ("en", en)])),
            ..MapDataEntry::new(code, Some(value))
        })
        .collect()
}
