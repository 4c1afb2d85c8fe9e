//! Map state: geometry per admin level and the current indicator's values.
//!
//! ### Geometry
//! Each level moves `absent → loading → cached`. A cached level is returned
//! without touching the network. A caller that finds its level `loading`
//! waits for that fetch instead of starting another. When a fetch fails the
//! bundled geometry (region level only) is installed as a *fallback*: it is
//! readable through [`MapStore::geo_data`], but the next
//! [`MapStore::fetch_geojson`] tries the network again. Without a bundled
//! fallback the level returns to `absent`.
//!
//! ### Values
//! Indicator values are never cached per indicator. Each load replaces the
//! whole table. Requests carry a sequence number and a response older than the
//! last applied one is dropped, so a slow stale answer cannot overwrite a
//! newer one.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use log::{debug, error, warn};

use crate::choropleth;
use crate::error::ApiError;
use crate::fallback;
use crate::models::{AdminLevel, ColorScale, GeoJsonData, MapDataEntry, MapDataParams, MapDataPayload};
use crate::source::CensusSource;
use crate::stats::{self, Summary};
use crate::store::lock;

/// Message shown to users when indicator values cannot be loaded.
pub const MAP_DATA_ERROR: &str = "Failed to load map data";

#[derive(Debug, Clone, Default)]
enum GeoSlot {
    #[default]
    Absent,
    Loading,
    Cached(Arc<GeoJsonData>),
    Fallback(Arc<GeoJsonData>),
}

impl GeoSlot {
    fn data(&self) -> Option<Arc<GeoJsonData>> {
        match self {
            GeoSlot::Cached(g) | GeoSlot::Fallback(g) => Some(Arc::clone(g)),
            GeoSlot::Absent | GeoSlot::Loading => None,
        }
    }
}

/// Where a level's geometry currently comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoStatus {
    Absent,
    Loading,
    Cached,
    Fallback,
}

#[derive(Debug)]
struct ViewState {
    current_level: AdminLevel,
    selected_region: Option<String>,
    current_indicator: Option<String>,
    map_data: Vec<MapDataEntry>,
    color_scale: ColorScale,
    error: Option<String>,
    /// Sequence number of the newest settled value request.
    applied_seq: u64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            current_level: AdminLevel::Region,
            selected_region: None,
            current_indicator: None,
            map_data: Vec::new(),
            color_scale: ColorScale::default(),
            error: None,
            applied_seq: 0,
        }
    }
}

/// A value-table request, stamped with its sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct MapDataRequest {
    pub seq: u64,
    pub indicator: String,
    pub params: MapDataParams,
}

/// Outcome of a [`MapDataRequest`].
#[derive(Debug)]
pub struct MapDataResponse {
    pub request: MapDataRequest,
    pub outcome: Result<MapDataPayload, ApiError>,
}

/// What [`MapStore::apply_map_data`] did with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The table now holds this response's rows.
    Replaced,
    /// The request failed; the error was recorded and the table kept.
    Failed,
    /// A newer request already settled; the response was dropped.
    Stale,
}

/// Point-in-time copy of the map state.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSnapshot {
    pub current_level: AdminLevel,
    pub selected_region: Option<String>,
    pub current_indicator: Option<String>,
    pub map_data: Vec<MapDataEntry>,
    pub color_scale: ColorScale,
    pub error: Option<String>,
    pub loading: bool,
}

/// Decrements the in-flight counter when dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        InFlight(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Holds a level's pre-fetch slot while its geometry is `loading`.
///
/// Dropped without [`GeoLoad::finish`] (the source panicked), it puts the slot
/// back and wakes waiters so the level is not stuck in `loading`.
struct GeoLoad<'a> {
    slots: &'a Mutex<[GeoSlot; 3]>,
    settled: &'a Condvar,
    idx: usize,
    previous: Option<GeoSlot>,
}

impl GeoLoad<'_> {
    fn finish(mut self) -> GeoSlot {
        self.previous.take().unwrap_or_default()
    }
}

impl Drop for GeoLoad<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            warn!("geometry fetch aborted, resetting slot {}", self.idx);
            lock(self.slots)[self.idx] = previous;
            self.settled.notify_all();
        }
    }
}

pub struct MapStore<S> {
    source: S,
    geo: Mutex<[GeoSlot; 3]>,
    geo_settled: Condvar,
    view: Mutex<ViewState>,
    next_seq: AtomicU64,
    in_flight: AtomicUsize,
}

impl<S: CensusSource> MapStore<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            geo: Mutex::new(Default::default()),
            geo_settled: Condvar::new(),
            view: Mutex::new(ViewState::default()),
            next_seq: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    // ------------------------------------------------------------- geometry

    /// Geometry for `level`, fetched at most once per successful load.
    ///
    /// On failure the bundled fallback is returned when the level has one;
    /// otherwise the error is returned and the level is left `absent`.
    pub fn fetch_geojson(&self, level: AdminLevel) -> Result<Arc<GeoJsonData>, ApiError> {
        let idx = level.index();
        let mut slots = lock(&self.geo);
        let mut waited = false;
        loop {
            match &slots[idx] {
                GeoSlot::Cached(g) => return Ok(Arc::clone(g)),
                GeoSlot::Fallback(g) if waited => return Ok(Arc::clone(g)),
                GeoSlot::Absent | GeoSlot::Fallback(_) => break,
                GeoSlot::Loading => {}
            }
            debug!("waiting for in-flight {} geometry", level);
            slots = self
                .geo_settled
                .wait(slots)
                .unwrap_or_else(PoisonError::into_inner);
            waited = true;
        }
        let previous = std::mem::replace(&mut slots[idx], GeoSlot::Loading);
        drop(slots);

        let load = GeoLoad {
            slots: &self.geo,
            settled: &self.geo_settled,
            idx,
            previous: Some(previous),
        };
        let outcome = self.source.geojson(level).and_then(|r| r.into_result());
        let previous = load.finish();

        let mut slots = lock(&self.geo);
        let result = match outcome {
            Ok(geo) => {
                let geo = Arc::new(geo);
                slots[idx] = GeoSlot::Cached(Arc::clone(&geo));
                Ok(geo)
            }
            Err(e) => {
                error!("Error fetching {} GeoJSON: {}", level, e);
                let fallback = match previous {
                    GeoSlot::Fallback(g) => Some(g),
                    _ => fallback::geometry(level).map(Arc::new),
                };
                match fallback {
                    Some(g) => {
                        warn!("using bundled {} geometry", level);
                        slots[idx] = GeoSlot::Fallback(Arc::clone(&g));
                        Ok(g)
                    }
                    None => {
                        slots[idx] = GeoSlot::Absent;
                        Err(e)
                    }
                }
            }
        };
        drop(slots);
        self.geo_settled.notify_all();
        result
    }

    /// Geometry already held for `level` (cached or fallback), without fetching.
    pub fn geo_data(&self, level: AdminLevel) -> Option<Arc<GeoJsonData>> {
        lock(&self.geo)[level.index()].data()
    }

    pub fn geo_status(&self, level: AdminLevel) -> GeoStatus {
        match lock(&self.geo)[level.index()] {
            GeoSlot::Absent => GeoStatus::Absent,
            GeoSlot::Loading => GeoStatus::Loading,
            GeoSlot::Cached(_) => GeoStatus::Cached,
            GeoSlot::Fallback(_) => GeoStatus::Fallback,
        }
    }

    // --------------------------------------------------------------- values

    /// Stamp a value request. The level defaults to the current level.
    pub fn begin_map_data(&self, indicator: &str, params: &MapDataParams) -> MapDataRequest {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let mut params = params.clone();
        if params.level.is_none() {
            params.level = Some(lock(&self.view).current_level);
        }
        MapDataRequest {
            seq,
            indicator: indicator.to_string(),
            params,
        }
    }

    /// Settle a response. Newer-than-applied responses win; older ones are dropped.
    pub fn apply_map_data(&self, response: MapDataResponse) -> Applied {
        let MapDataResponse { request, outcome } = response;
        match outcome {
            Ok(payload) => self.settle(&request, Ok(payload)),
            Err(e) => self.settle(&request, Err(&e)),
        }
    }

    fn settle(&self, request: &MapDataRequest, outcome: Result<MapDataPayload, &ApiError>) -> Applied {
        let mut view = lock(&self.view);
        if request.seq <= view.applied_seq {
            debug!(
                "dropping stale map data for {} (request {}, applied {})",
                request.indicator, request.seq, view.applied_seq
            );
            return Applied::Stale;
        }
        view.applied_seq = request.seq;
        match outcome {
            Ok(payload) => {
                if let Some(scale) = payload.color_scale() {
                    view.color_scale = scale.clone();
                }
                view.map_data = payload.map_data;
                view.current_indicator = Some(request.indicator.clone());
                view.error = None;
                Applied::Replaced
            }
            Err(e) => {
                error!("Error fetching map data for {}: {}", request.indicator, e);
                view.error = Some(MAP_DATA_ERROR.to_string());
                Applied::Failed
            }
        }
    }

    /// Fetch and apply the values of `indicator`.
    ///
    /// Returns the API error on failure (the table is left untouched and
    /// [`MapStore::error`] is set). A response overtaken by a newer request
    /// yields `Ok(Applied::Stale)`, whether it succeeded or not.
    pub fn load_map_data(&self, indicator: &str, params: &MapDataParams) -> Result<Applied, ApiError> {
        let request = self.begin_map_data(indicator, params);
        let outcome = {
            let _guard = InFlight::enter(&self.in_flight);
            self.source
                .map_data(&request.indicator, &request.params)
                .and_then(|r| r.into_result())
        };
        match outcome {
            Ok(payload) => Ok(self.settle(&request, Ok(payload))),
            Err(e) => match self.settle(&request, Err(&e)) {
                Applied::Stale => Ok(Applied::Stale),
                Applied::Failed | Applied::Replaced => Err(e),
            },
        }
    }

    /// Install the bundled region rows as the value table.
    pub fn load_fallback_map_data(&self, indicator: &str) -> Applied {
        let request = self.begin_map_data(indicator, &MapDataParams::at_level(AdminLevel::Region));
        warn!("using bundled map data for {}", indicator);
        self.apply_map_data(MapDataResponse {
            request,
            outcome: Ok(MapDataPayload {
                map_data: fallback::map_data(),
                visualization: None,
            }),
        })
    }

    // ------------------------------------------------------- view accessors

    pub fn set_level(&self, level: AdminLevel) {
        lock(&self.view).current_level = level;
    }

    pub fn current_level(&self) -> AdminLevel {
        lock(&self.view).current_level
    }

    pub fn set_selected_region(&self, region: Option<&str>) {
        lock(&self.view).selected_region = region.map(str::to_string);
    }

    pub fn selected_region(&self) -> Option<String> {
        lock(&self.view).selected_region.clone()
    }

    pub fn current_indicator(&self) -> Option<String> {
        lock(&self.view).current_indicator.clone()
    }

    pub fn map_data(&self) -> Vec<MapDataEntry> {
        lock(&self.view).map_data.clone()
    }

    pub fn color_scale(&self) -> ColorScale {
        lock(&self.view).color_scale.clone()
    }

    pub fn error(&self) -> Option<String> {
        lock(&self.view).error.clone()
    }

    /// True while a value request is in flight.
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Value of the first row for `region_code`; `None` when absent or no data.
    pub fn region_value(&self, region_code: &str) -> Option<f64> {
        lock(&self.view)
            .map_data
            .iter()
            .find(|e| e.region_code == region_code)
            .and_then(|e| e.value)
    }

    pub fn summary(&self) -> Summary {
        stats::summarize(&lock(&self.view).map_data)
    }

    /// Choropleth fill per row as `(unit code, colour)`; `None` for no data.
    pub fn fill_colors(&self) -> Vec<(String, Option<String>)> {
        let view = lock(&self.view);
        choropleth::fill_colors(&view.map_data, &view.color_scale)
            .into_iter()
            .map(|(code, fill)| (code.to_string(), fill))
            .collect()
    }

    pub fn snapshot(&self) -> MapSnapshot {
        let loading = self.is_loading();
        let view = lock(&self.view);
        MapSnapshot {
            current_level: view.current_level,
            selected_region: view.selected_region.clone(),
            current_indicator: view.current_indicator.clone(),
            map_data: view.map_data.clone(),
            color_scale: view.color_scale.clone(),
            error: view.error.clone(),
            loading,
        }
    }
}
