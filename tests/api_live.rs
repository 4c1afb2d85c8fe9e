//! Live API tests. Run with: `RGPH_API_BASE=https://... cargo test --features online -- --nocapture`
#![cfg(feature = "online")]

use rgph::models::{IndicatorParams, MapDataParams, RegionParams};
use rgph::{AdminLevel, Client, Config, Language, MapStore};

fn client() -> Client {
    Client::from_config(&Config::from_env()).unwrap()
}

#[test]
fn list_regions_and_themes() {
    let cli = client();
    let regions = cli
        .regions(&RegionParams {
            level: Some(AdminLevel::Region),
            parent_code: None,
        })
        .unwrap()
        .into_result()
        .unwrap();
    assert!(!regions.is_empty());
    assert!(regions.iter().all(|r| !r.display_name(Language::Fr).is_empty()));

    let themes = cli.themes().unwrap().into_result().unwrap();
    assert!(!themes.is_empty());
}

#[test]
fn first_indicator_loads_into_store() {
    let cli = client();
    let indicators = cli
        .indicators(&IndicatorParams {
            limit: Some(1),
            ..Default::default()
        })
        .unwrap()
        .into_result()
        .unwrap();
    let first = indicators.first().expect("at least one indicator");

    let store = MapStore::new(cli.clone());
    store.load_map_data(&first.code, &MapDataParams::default()).unwrap();
    assert_eq!(store.current_indicator().as_deref(), Some(first.code.as_str()));

    store.fetch_geojson(AdminLevel::Region).unwrap();
    assert!(store.geo_data(AdminLevel::Region).is_some());
}
