use rgph::models::{GeoJsonData, MapDataParams, MapDataPayload, Theme, Visualization};
use rgph::store::map::{Applied, GeoStatus, MAP_DATA_ERROR, MapDataResponse};
use rgph::{AdminLevel, ApiError, ApiResponse, CensusSource, ColorScale, MapDataEntry, MapStore};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

/// Scripted source: geometry succeeds unless `fail_geo` is set; map data is
/// answered from `payloads`, unknown indicators get `success: false`.
#[derive(Default)]
struct FakeSource {
    geo_calls: AtomicUsize,
    map_calls: AtomicUsize,
    fail_geo: AtomicBool,
    payloads: Mutex<HashMap<String, MapDataPayload>>,
    last_params: Mutex<Option<MapDataParams>>,
}

impl FakeSource {
    fn with(payloads: &[(&str, MapDataPayload)]) -> Self {
        let s = FakeSource::default();
        for (code, p) in payloads {
            s.payloads.lock().unwrap().insert(code.to_string(), p.clone());
        }
        s
    }
}

fn geometry(tag: &str) -> GeoJsonData {
    GeoJsonData(json!({
        "type": "FeatureCollection",
        "features": [{"type": "Feature", "properties": {"code": tag}, "geometry": null}]
    }))
}

fn payload(rows: &[(&str, Option<f64>)]) -> MapDataPayload {
    MapDataPayload {
        map_data: rows.iter().map(|(c, v)| MapDataEntry::new(*c, *v)).collect(),
        visualization: None,
    }
}

impl CensusSource for FakeSource {
    fn geojson(&self, level: AdminLevel) -> Result<ApiResponse<GeoJsonData>, ApiError> {
        self.geo_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_geo.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                url: format!("http://test/geo/{level}"),
                status: 503,
            });
        }
        Ok(ApiResponse::ok(geometry(level.as_str())))
    }

    fn map_data(
        &self,
        indicator_code: &str,
        params: &MapDataParams,
    ) -> Result<ApiResponse<MapDataPayload>, ApiError> {
        self.map_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_params.lock().unwrap() = Some(params.clone());
        Ok(match self.payloads.lock().unwrap().get(indicator_code) {
            Some(p) => ApiResponse::ok(p.clone()),
            None => ApiResponse::failed("unknown indicator"),
        })
    }

    fn themes(&self) -> Result<ApiResponse<Vec<Theme>>, ApiError> {
        Ok(ApiResponse::ok(vec![]))
    }
}

#[test]
fn geometry_is_fetched_once_per_level() {
    let store = MapStore::new(FakeSource::default());
    let a = store.fetch_geojson(AdminLevel::Region).unwrap();
    let b = store.fetch_geojson(AdminLevel::Region).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(store.source().geo_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.geo_status(AdminLevel::Region), GeoStatus::Cached);

    // Other levels have their own slot.
    assert!(store.geo_data(AdminLevel::District).is_none());
    store.fetch_geojson(AdminLevel::District).unwrap();
    assert_eq!(store.source().geo_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn failed_region_geometry_falls_back_to_bundled_data() {
    let source = FakeSource::default();
    source.fail_geo.store(true, Ordering::SeqCst);
    let store = MapStore::new(source);

    let geo = store.fetch_geojson(AdminLevel::Region).unwrap();
    assert_eq!(geo.feature_count(), 6);
    assert!(store.geo_data(AdminLevel::Region).is_some());
    assert_eq!(store.geo_status(AdminLevel::Region), GeoStatus::Fallback);

    // A fallback is not a cache hit: the next request goes to the network again.
    store.fetch_geojson(AdminLevel::Region).unwrap();
    assert_eq!(store.source().geo_calls.load(Ordering::SeqCst), 2);

    store.source().fail_geo.store(false, Ordering::SeqCst);
    let live = store.fetch_geojson(AdminLevel::Region).unwrap();
    assert_eq!(live.feature_count(), 1);
    assert_eq!(store.geo_status(AdminLevel::Region), GeoStatus::Cached);
    assert_eq!(store.source().geo_calls.load(Ordering::SeqCst), 3);
}

#[test]
fn failed_commune_geometry_returns_to_absent() {
    let source = FakeSource::default();
    source.fail_geo.store(true, Ordering::SeqCst);
    let store = MapStore::new(source);

    let err = store.fetch_geojson(AdminLevel::Commune).unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 503, .. }));
    assert!(store.geo_data(AdminLevel::Commune).is_none());
    assert_eq!(store.geo_status(AdminLevel::Commune), GeoStatus::Absent);

    assert!(store.fetch_geojson(AdminLevel::Commune).is_err());
    assert_eq!(store.source().geo_calls.load(Ordering::SeqCst), 2);
}

/// Blocks inside `geojson` until released, so a second caller arrives mid-flight.
struct GatedSource {
    calls: AtomicUsize,
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl CensusSource for GatedSource {
    fn geojson(&self, _level: AdminLevel) -> Result<ApiResponse<GeoJsonData>, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.lock().unwrap().send(()).ok();
        self.release
            .lock()
            .unwrap()
            .recv_timeout(Duration::from_secs(5))
            .ok();
        Ok(ApiResponse::ok(geometry("gated")))
    }

    fn map_data(&self, _: &str, _: &MapDataParams) -> Result<ApiResponse<MapDataPayload>, ApiError> {
        Err(ApiError::MissingData)
    }

    fn themes(&self) -> Result<ApiResponse<Vec<Theme>>, ApiError> {
        Err(ApiError::MissingData)
    }
}

#[test]
fn concurrent_geometry_requests_share_one_fetch() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let store = MapStore::new(GatedSource {
        calls: AtomicUsize::new(0),
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
    });

    let (a, b) = thread::scope(|s| {
        let first = s.spawn(|| store.fetch_geojson(AdminLevel::Region));
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(store.geo_status(AdminLevel::Region), GeoStatus::Loading);

        let second = s.spawn(|| store.fetch_geojson(AdminLevel::Region));
        thread::sleep(Duration::from_millis(50));
        release_tx.send(()).unwrap();
        (first.join().unwrap().unwrap(), second.join().unwrap().unwrap())
    });

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(store.source().calls.load(Ordering::SeqCst), 1);
}

/// Panics on its first geometry request, then behaves.
#[derive(Default)]
struct PanicOnceSource {
    calls: AtomicUsize,
}

impl CensusSource for PanicOnceSource {
    fn geojson(&self, level: AdminLevel) -> Result<ApiResponse<GeoJsonData>, ApiError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("source blew up");
        }
        Ok(ApiResponse::ok(geometry(level.as_str())))
    }

    fn map_data(&self, _: &str, _: &MapDataParams) -> Result<ApiResponse<MapDataPayload>, ApiError> {
        Err(ApiError::MissingData)
    }

    fn themes(&self) -> Result<ApiResponse<Vec<Theme>>, ApiError> {
        Err(ApiError::MissingData)
    }
}

#[test]
fn panicking_geometry_fetch_does_not_wedge_the_level() {
    let store = Arc::new(MapStore::new(PanicOnceSource::default()));

    let first = {
        let store = Arc::clone(&store);
        thread::spawn(move || store.fetch_geojson(AdminLevel::District)).join()
    };
    assert!(first.is_err());
    assert_eq!(store.geo_status(AdminLevel::District), GeoStatus::Absent);

    let (tx, rx) = mpsc::channel();
    {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            tx.send(store.fetch_geojson(AdminLevel::District).is_ok()).ok();
        });
    }
    assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
    assert_eq!(store.geo_status(AdminLevel::District), GeoStatus::Cached);
    assert_eq!(store.source().calls.load(Ordering::SeqCst), 2);
}

#[test]
fn loading_a_new_indicator_replaces_the_table() {
    let store = MapStore::new(FakeSource::with(&[
        ("X", payload(&[("DJ-AR", Some(1.0)), ("DJ-OB", Some(2.0)), ("DJ-TA", Some(3.0))])),
        ("Y", payload(&[("DJ-DI", Some(9.0))])),
    ]));

    assert_eq!(store.load_map_data("X", &MapDataParams::default()).unwrap(), Applied::Replaced);
    assert_eq!(store.map_data().len(), 3);

    store.load_map_data("Y", &MapDataParams::default()).unwrap();
    let rows = store.map_data();
    assert_eq!(rows, payload(&[("DJ-DI", Some(9.0))]).map_data);
    assert_eq!(store.current_indicator().as_deref(), Some("Y"));
    assert_eq!(store.region_value("DJ-AR"), None);
    assert_eq!(store.source().map_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn values_are_refetched_every_time() {
    let store = MapStore::new(FakeSource::with(&[("X", payload(&[("DJ-AR", Some(1.0))]))]));
    store.load_map_data("X", &MapDataParams::default()).unwrap();
    store.load_map_data("X", &MapDataParams::default()).unwrap();
    assert_eq!(store.source().map_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn null_values_stay_null() {
    let store = MapStore::new(FakeSource::with(&[(
        "X",
        payload(&[("DJ-AR", None), ("DJ-OB", Some(0.0))]),
    )]));
    store.load_map_data("X", &MapDataParams::default()).unwrap();

    assert_eq!(store.region_value("DJ-AR"), None);
    assert_eq!(store.region_value("DJ-OB"), Some(0.0));
    let rows = store.map_data();
    assert_eq!(rows[0].value, None);

    let v = serde_json::to_value(&rows).unwrap();
    assert!(v[0]["value"].is_null());
    assert_eq!(v[1]["value"], json!(0.0));

    let summary = store.summary();
    assert_eq!(summary.count, 1);
    assert_eq!(summary.missing, 1);

    let fills = store.fill_colors();
    assert_eq!(fills[0], ("DJ-AR".to_string(), None));
    assert!(fills[1].1.is_some());
}

#[test]
fn failed_load_keeps_previous_table_and_sets_error() {
    let store = MapStore::new(FakeSource::with(&[("X", payload(&[("DJ-AR", Some(1.0))]))]));
    store.load_map_data("X", &MapDataParams::default()).unwrap();

    let err = store.load_map_data("MISSING", &MapDataParams::default()).unwrap_err();
    assert!(matches!(err, ApiError::Unsuccessful(ref m) if m == "unknown indicator"));
    assert_eq!(store.error().as_deref(), Some(MAP_DATA_ERROR));
    assert_eq!(store.current_indicator().as_deref(), Some("X"));
    assert_eq!(store.region_value("DJ-AR"), Some(1.0));
    assert!(!store.is_loading());

    store.load_map_data("X", &MapDataParams::default()).unwrap();
    assert_eq!(store.error(), None);
}

#[test]
fn color_scale_follows_the_response_when_given() {
    let custom = ColorScale {
        min: "#EFF3FF".into(),
        max: "#08519C".into(),
    };
    let mut styled = payload(&[("DJ-AR", Some(1.0))]);
    styled.visualization = Some(Visualization {
        color_scale: Some(custom.clone()),
        ..Default::default()
    });
    let store = MapStore::new(FakeSource::with(&[
        ("STYLED", styled),
        ("PLAIN", payload(&[("DJ-OB", Some(2.0))])),
    ]));

    assert_eq!(store.color_scale(), ColorScale::default());
    store.load_map_data("STYLED", &MapDataParams::default()).unwrap();
    assert_eq!(store.color_scale(), custom);
    store.load_map_data("PLAIN", &MapDataParams::default()).unwrap();
    assert_eq!(store.color_scale(), custom);
}

#[test]
fn stale_responses_are_dropped() {
    let store = MapStore::new(FakeSource::default());
    let older = store.begin_map_data("X", &MapDataParams::default());
    let newer = store.begin_map_data("Y", &MapDataParams::default());
    assert!(newer.seq > older.seq);

    let applied = store.apply_map_data(MapDataResponse {
        request: newer,
        outcome: Ok(payload(&[("DJ-DI", Some(9.0))])),
    });
    assert_eq!(applied, Applied::Replaced);

    let applied = store.apply_map_data(MapDataResponse {
        request: older,
        outcome: Ok(payload(&[("DJ-AR", Some(1.0))])),
    });
    assert_eq!(applied, Applied::Stale);
    assert_eq!(store.current_indicator().as_deref(), Some("Y"));
    assert_eq!(store.map_data(), payload(&[("DJ-DI", Some(9.0))]).map_data);
}

#[test]
fn stale_failure_does_not_set_error() {
    let store = MapStore::new(FakeSource::default());
    let older = store.begin_map_data("X", &MapDataParams::default());
    let newer = store.begin_map_data("Y", &MapDataParams::default());
    store.apply_map_data(MapDataResponse {
        request: newer,
        outcome: Ok(payload(&[("DJ-DI", Some(9.0))])),
    });
    let applied = store.apply_map_data(MapDataResponse {
        request: older,
        outcome: Err(ApiError::MissingData),
    });
    assert_eq!(applied, Applied::Stale);
    assert_eq!(store.error(), None);
}

#[test]
fn requests_default_to_the_current_level() {
    let store = MapStore::new(FakeSource::with(&[("X", payload(&[("DJ-AR", Some(1.0))]))]));
    store.set_level(AdminLevel::District);
    let req = store.begin_map_data("X", &MapDataParams::default());
    assert_eq!(req.params.level, Some(AdminLevel::District));

    store
        .load_map_data("X", &MapDataParams::at_level(AdminLevel::Commune))
        .unwrap();
    let sent = store.source().last_params.lock().unwrap().clone().unwrap();
    assert_eq!(sent.level, Some(AdminLevel::Commune));
}

#[test]
fn bundled_map_data_can_stand_in() {
    let store = MapStore::new(FakeSource::default());
    assert_eq!(store.load_fallback_map_data("POP"), Applied::Replaced);
    assert_eq!(store.map_data().len(), 6);
    assert_eq!(store.region_value("DJ-DJ"), Some(693_000.0));
    assert_eq!(store.source().map_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn selection_state_round_trips() {
    let store = MapStore::new(FakeSource::default());
    assert_eq!(store.current_level(), AdminLevel::Region);
    store.set_selected_region(Some("DJ-TA"));
    assert_eq!(store.selected_region().as_deref(), Some("DJ-TA"));
    store.set_selected_region(None);

    let snap = store.snapshot();
    assert_eq!(snap.selected_region, None);
    assert!(!snap.loading);
    assert!(snap.map_data.is_empty());
}
