//! rgph
//!
//! A lightweight Rust library for retrieving and caching RGPH 2024 census data
//! (regions, themes, indicators, per-indicator map values, GeoJSON geometry).
//! Pairs with the `rgph` CLI.
//!
//! ### Features
//! - Typed blocking client for every census API endpoint
//! - Localized names in French, Arabic and English with a fallback chain
//! - Map store: per-level geometry cache, value table, out-of-order response guard
//! - Theme registry with built-in defaults
//! - Choropleth colours, summary statistics, CSV/JSON export
//!
//! ### Example
//! ```no_run
//! use rgph::{AdminLevel, Client, Language, MapStore};
//! use rgph::models::MapDataParams;
//!
//! let client = Client::new("http://localhost:5000/api")?;
//! let store = MapStore::new(client);
//! store.fetch_geojson(AdminLevel::Region)?;
//! store.load_map_data("POP_TOTAL", &MapDataParams::default())?;
//! for row in store.map_data() {
//!     println!("{} {:?}", row.display_name(Language::Fr), row.value);
//! }
//! # Ok::<(), rgph::ApiError>(())
//! ```

pub mod api;
pub mod choropleth;
pub mod config;
pub mod error;
pub mod fallback;
pub mod format;
pub mod i18n;
pub mod models;
pub mod preference;
pub mod source;
pub mod stats;
pub mod storage;
pub mod store;

pub use api::Client;
pub use config::Config;
pub use error::ApiError;
pub use models::{AdminLevel, ApiResponse, ColorScale, Language, LocalizedText, MapDataEntry};
pub use source::CensusSource;
pub use store::map::MapStore;
pub use store::theme::ThemeStore;
