//! Hot reload integration tests
//!
//! - Sync mode: checks run inline before reads
//! - Async mode: checks run on a background thread
//! - Change detection for created and deleted files

mod common;

use common::{Fixture, Recorder, Shared};
use rcprops::{Error, HotReload, MethodDescriptor};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_sync_reload_on_read() {
    let fx = Fixture::new();
    fx.write("app.properties", "port=80\n");
    let config = fx
        .builder("app::Config")
        .source(fx.spec("app.properties"))
        .hot_reload(HotReload::sync(Duration::ZERO))
        .build()
        .unwrap();
    let port = MethodDescriptor::of::<u16>().key("port");
    assert_eq!(config.get::<u16>(&port).unwrap(), Some(80));

    fx.touch_with("app.properties", "port=8080\n", 10);

    assert_eq!(config.get::<u16>(&port).unwrap(), Some(8080));
}

#[test]
fn test_sync_reload_respects_interval() {
    let fx = Fixture::new();
    fx.write("app.properties", "port=80\n");
    let config = fx
        .builder("app::Config")
        .source(fx.spec("app.properties"))
        .hot_reload(HotReload::sync(Duration::from_secs(3600)))
        .build()
        .unwrap();

    fx.touch_with("app.properties", "port=8080\n", 10);

    assert_eq!(config.get_property("port").unwrap().as_deref(), Some("80"));
}

#[test]
fn test_created_source_is_picked_up() {
    let fx = Fixture::new();
    let config = fx
        .builder("app::Config")
        .source(fx.spec("late.properties"))
        .hot_reload(HotReload::sync(Duration::ZERO))
        .build()
        .unwrap();
    assert_eq!(config.watched_files(), [fx.path("late.properties")]);
    assert!(config.property_names().is_empty());

    fx.write("late.properties", "ready=yes\n");

    assert_eq!(config.get_property("ready").unwrap().as_deref(), Some("yes"));
}

#[test]
fn test_deleted_source_clears_values() {
    let fx = Fixture::new();
    let path = fx.write("app.properties", "a=1\n");
    let config = fx
        .builder("app::Config")
        .source(fx.spec("app.properties"))
        .hot_reload(HotReload::sync(Duration::ZERO))
        .build()
        .unwrap();
    let recorder = Arc::new(Recorder::default());
    config.add_property_change_listener(Shared::of(&recorder));

    std::fs::remove_file(path).unwrap();

    assert_eq!(config.get_property("a").unwrap(), None);
    assert_eq!(recorder.keys(), ["a"]);
}

#[test]
fn test_sync_reload_failure_keeps_values() {
    let fx = Fixture::new();
    fx.write("app.json", r#"{"a": "1"}"#);
    let config = fx
        .builder("app::Config")
        .source(fx.spec("app.json"))
        .hot_reload(HotReload::sync(Duration::ZERO))
        .build()
        .unwrap();

    fx.touch_with("app.json", "{ broken", 10);
    assert_eq!(config.get_property("a").unwrap().as_deref(), Some("1"));

    // The broken version was seen once; the next change is reloaded again
    fx.touch_with("app.json", r#"{"a": "2"}"#, 20);
    assert_eq!(config.get_property("a").unwrap().as_deref(), Some("2"));
}

#[test]
fn test_manual_check_without_hot_reload() {
    let fx = Fixture::new();
    fx.write("app.properties", "a=1\n");
    let config = fx
        .builder("app::Config")
        .source(fx.spec("app.properties"))
        .build()
        .unwrap();

    fx.touch_with("app.properties", "a=2\n", 10);

    assert!(!config.check_and_reload().unwrap());
    assert!(config.watched_files().is_empty());
    assert_eq!(config.get_property("a").unwrap().as_deref(), Some("1"));
}

#[test]
fn test_background_reload() {
    let fx = Fixture::new();
    fx.write("app.properties", "a=1\n");
    let config = fx
        .builder("app::Config")
        .source(fx.spec("app.properties"))
        .hot_reload(HotReload::background(Duration::from_millis(20)))
        .build()
        .unwrap();

    fx.touch_with("app.properties", "a=2\n", 10);

    let deadline = Instant::now() + Duration::from_secs(5);
    while config.get_property("a").unwrap().as_deref() != Some("2") {
        assert!(Instant::now() < deadline, "background reload did not happen");
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_background_requires_interval() {
    let fx = Fixture::new();

    let result = fx
        .builder("app::Config")
        .hot_reload(HotReload::background(Duration::ZERO))
        .build();

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_dropping_config_stops_background_thread() {
    let fx = Fixture::new();
    fx.write("app.properties", "a=1\n");
    let config = fx
        .builder("app::Config")
        .source(fx.spec("app.properties"))
        .hot_reload(HotReload::background(Duration::from_millis(10)))
        .build()
        .unwrap();

    let started = Instant::now();
    drop(config);

    assert!(started.elapsed() < Duration::from_secs(2));
}
