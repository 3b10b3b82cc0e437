use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use motion_watch::config::{SourceKind, WatchConfig};
use motion_watch::SourceSelection;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "MOTION_WATCH_CONFIG",
        "MOTION_WATCH_SOURCE",
        "MOTION_WATCH_DEVICE",
        "MOTION_WATCH_MIN_AREA",
        "MOTION_WATCH_WORKING_WIDTH",
        "MOTION_WATCH_THRESHOLD",
        "MOTION_WATCH_BLUR_KERNEL",
        "MOTION_WATCH_DILATE_ITERATIONS",
        "MOTION_WATCH_REBASELINE_EVERY",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_json_config_with_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "source": {
            "kind": "camera",
            "device": "/dev/video2",
            "target_fps": 15,
            "width": 800,
            "height": 600,
            "warmup_ms": 500
        },
        "detector": {
            "min_area": 900.0,
            "blur_kernel": 15,
            "threshold_cutoff": 40,
            "dilate_iterations": 3
        },
        "runtime": {
            "max_source_retries": 8,
            "retry_backoff_ms": 100,
            "max_invalid_frames": 4,
            "display": true
        }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("MOTION_WATCH_CONFIG", file.path());
    std::env::set_var("MOTION_WATCH_MIN_AREA", "1200");
    std::env::set_var("MOTION_WATCH_REBASELINE_EVERY", "300");

    let cfg = WatchConfig::load().expect("load config");

    assert_eq!(cfg.source.kind, SourceKind::Camera);
    assert_eq!(cfg.source.device, "/dev/video2");
    assert_eq!(cfg.detector.min_area, 1200.0);
    assert_eq!(cfg.detector.blur_kernel, 15);
    assert_eq!(cfg.detector.threshold_cutoff, 40);
    assert_eq!(cfg.detector.dilate_iterations, 3);
    assert_eq!(cfg.detector.working_width, 500);
    assert_eq!(cfg.detector.rebaseline_every, Some(300));
    assert_eq!(cfg.runtime.pipeline.max_source_retries, 8);
    assert_eq!(cfg.runtime.pipeline.retry_backoff, Duration::from_millis(100));
    assert_eq!(cfg.runtime.pipeline.max_invalid_frames, 4);
    assert!(cfg.runtime.display);

    match cfg.source.selection() {
        SourceSelection::Camera(camera) => {
            assert_eq!(camera.device, "/dev/video2");
            assert_eq!(camera.target_fps, 15);
            assert_eq!((camera.width, camera.height), (800, 600));
            assert_eq!(camera.warmup, Duration::from_millis(500));
        }
        other => panic!("expected camera selection, got {other:?}"),
    }

    clear_env();
}

#[test]
fn loads_toml_config_and_switches_to_file_source() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
        [source]
        kind = "camera"
        device = "stub://porch"

        [detector]
        working_width = 320
    "#;
    file.write_all(toml.as_bytes()).expect("write config");

    std::env::set_var("MOTION_WATCH_CONFIG", file.path());
    std::env::set_var("MOTION_WATCH_SOURCE", "/srv/clips/porch.mp4");
    std::env::set_var("MOTION_WATCH_THRESHOLD", "30");

    let cfg = WatchConfig::load().expect("load config");

    assert_eq!(cfg.detector.working_width, 320);
    assert_eq!(cfg.detector.threshold_cutoff, 30);
    match cfg.source.selection() {
        SourceSelection::File(clip) => assert_eq!(clip.path, "/srv/clips/porch.mp4"),
        other => panic!("expected file selection, got {other:?}"),
    }

    clear_env();
}

#[test]
fn defaults_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = WatchConfig::load().expect("load defaults");
    assert_eq!(cfg.source.kind, SourceKind::Camera);
    assert_eq!(cfg.detector.min_area, 500.0);
    assert_eq!(cfg.detector.blur_kernel, 21);
    assert_eq!(cfg.detector.threshold_cutoff, 25);
    assert_eq!(cfg.detector.dilate_iterations, 2);
    assert_eq!(cfg.detector.rebaseline_every, None);
    assert!(!cfg.runtime.display);

    clear_env();
}

#[test]
fn rejects_invalid_env_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("MOTION_WATCH_BLUR_KERNEL", "20");
    assert!(WatchConfig::load().is_err());
    clear_env();

    std::env::set_var("MOTION_WATCH_THRESHOLD", "300");
    let err = WatchConfig::load().unwrap_err();
    assert!(err.to_string().contains("MOTION_WATCH_THRESHOLD"));
    clear_env();

    std::env::set_var("MOTION_WATCH_MIN_AREA", "lots");
    assert!(WatchConfig::load().is_err());
    clear_env();

    std::env::set_var("MOTION_WATCH_WORKING_WIDTH", "0");
    assert!(WatchConfig::load().is_err());
    clear_env();
}

#[test]
fn rejects_malformed_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(b"{ \"detector\": { \"min_area\": \"big\" } }")
        .expect("write config");
    std::env::set_var("MOTION_WATCH_CONFIG", file.path());

    let err = WatchConfig::load().unwrap_err();
    assert!(err.to_string().contains("invalid config file"));

    clear_env();
}
