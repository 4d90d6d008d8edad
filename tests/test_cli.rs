//! Tests for the process boundary: JSON on stdout and exit codes.

mod common;

use std::path::Path;
use std::process::{Command, Output};

use common::*;

fn plantscan(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_plantscan"))
        .args(args)
        .env_remove("PLANTSCAN_CONFIG")
        .env_remove("PLANTSCAN_FONT")
        .env_remove("PLANTSCAN_CONF_THRESHOLD")
        .output()
        .expect("Failed to run plantscan")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

#[test]
fn test_detect_prints_detections() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let model = write_replay_file(
        dir.path(),
        &[
            raw([0.1, 0.2, 0.5, 0.6], 2, 0.9),
            raw([0.1, 0.2, 0.5, 0.6], 1, 1.5),
            raw([0.0, 0.0, 0.1, 0.1], 0, 0.2),
        ],
    );
    let image = create_test_image(100, 80);

    let output = plantscan(&[
        "detect",
        "--model",
        path_str(&model),
        "--image",
        path_str(image.path()),
    ]);

    assert!(output.status.success());
    let json = stdout_json(&output);
    let items = json.as_array().expect("array of detections");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["class"], 2);
    assert_eq!(items[0]["bbox"].as_array().map(Vec::len), Some(4));
    Ok(())
}

#[test]
fn test_detect_conf_flag_overrides_threshold() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let model = write_replay_file(dir.path(), &[raw([0.0, 0.0, 0.1, 0.1], 0, 0.2)]);
    let image = create_test_image(20, 20);

    let output = plantscan(&[
        "detect",
        "--model",
        path_str(&model),
        "--image",
        path_str(image.path()),
        "--conf",
        "0.1",
    ]);

    assert!(output.status.success());
    assert_eq!(stdout_json(&output).as_array().map(Vec::len), Some(1));
    Ok(())
}

#[test]
fn test_detect_failure_emits_error_object() -> anyhow::Result<()> {
    let image = create_test_image(20, 20);

    let output = plantscan(&[
        "detect",
        "--model",
        "/nonexistent/model.json",
        "--image",
        path_str(image.path()),
    ]);

    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    let message = json["error"].as_str().expect("error string");
    assert!(message.starts_with("failed to load model"));
    Ok(())
}

#[test]
fn test_visualize_writes_output() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let image = create_test_image(100, 100);
    let out_path = dir.path().join("annotated.png");
    let detections = r#"[
        {"bbox": [0.2, 0.3, 0.6, 0.9], "confidence": 0.9, "disease": "blight"},
        {"bbox": [0.9, 0.3, 0.6, 0.9], "confidence": 0.7}
    ]"#;

    let output = plantscan(&[
        "visualize",
        "--image",
        path_str(image.path()),
        "--detections",
        detections,
        "--output",
        path_str(&out_path),
    ]);

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    let saved = image::open(&out_path)?.to_rgb8();
    assert_eq!(*saved.get_pixel(20, 60), SEVERE_RED);
    Ok(())
}

#[test]
fn test_visualize_rejects_bad_json() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let image = create_test_image(10, 10);
    let out_path = dir.path().join("annotated.png");

    let output = plantscan(&[
        "visualize",
        "--image",
        path_str(image.path()),
        "--detections",
        "not json",
        "--output",
        path_str(&out_path),
    ]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout_json(&output)["error"].is_string());
    assert!(!out_path.exists());
    Ok(())
}
