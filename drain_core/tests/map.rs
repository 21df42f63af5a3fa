use drain_core::config::MonitorCfg;
use drain_core::gps::{GeoPoint, geo_uri};
use drain_core::mocks::RecordingMap;
use drain_core::{Engine, open_map};
use drain_store::MemoryStore;
use serde_json::json;
use std::time::Instant;

#[test]
fn map_opens_at_last_fix_or_fallback() {
    let mut engine = Engine::new(MemoryStore::new(), &MonitorCfg::default());
    let mut map = RecordingMap::default();

    let p = open_map(&engine, &mut map).unwrap();
    assert_eq!(p, GeoPoint::FALLBACK);

    engine.on_snapshot(&json!({"gps": "-33.868820,151.209290"}), Instant::now());
    open_map(&engine, &mut map).unwrap();

    engine.on_snapshot(&json!({"gps": "garbage"}), Instant::now());
    open_map(&engine, &mut map).unwrap();

    assert_eq!(
        map.opened,
        vec![
            (23.811_855, 90.357_140),
            (-33.868_82, 151.209_29),
            (23.811_855, 90.357_140),
        ]
    );
}

#[test]
fn geo_uri_uses_canonical_order() {
    let p = GeoPoint::new(-33.86882, 151.20929).unwrap();
    assert_eq!(
        geo_uri(p),
        "geo:-33.868820,151.209290?q=-33.868820,151.209290"
    );
}
