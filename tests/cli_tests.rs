use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SCRIPT: &str = r#"{
    "scenes": [
        {
            "id": "intro",
            "sequence": 1,
            "background_type": "castle",
            "characters": [
                {"character_id": "hero", "position": {"x": 0.3, "y": 0.7}, "expression": "happy"}
            ],
            "narration": "Hello",
            "duration": 2.0
        }
    ]
}"#;

fn storyframe() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_storyframe"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write_script(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("story.json");
    fs::write(&path, SCRIPT).unwrap();
    path
}

#[test]
fn test_cli_help() {
    storyframe()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Storyboard scene renderer"));
}

#[test]
fn test_cli_render_summary() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path());

    storyframe()
        .arg("render")
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("Total frames: 60"))
        .stdout(predicate::str::contains("Frame rate: 30 fps"))
        .stdout(predicate::str::contains("Scene 1: 'intro'"));
}

#[test]
fn test_cli_render_json() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path());

    let output = storyframe().arg("render").arg(&script).arg("--json").output().unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["total_frames"], 60);
    assert_eq!(summary["frame_rate"], 30);
    assert_eq!(summary["preview_frame"]["nodes"][0]["id"], "background-castle");
}

#[test]
fn test_cli_render_missing_script() {
    storyframe()
        .arg("render")
        .arg("does/not/exist.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read script file"));
}

#[test]
fn test_cli_preview_svg() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path());
    let out = dir.path().join("intro.svg");

    storyframe()
        .arg("preview")
        .arg(&script)
        .arg("--scene")
        .arg("intro")
        .arg("--frame")
        .arg("30")
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Preview written"));

    let svg = fs::read_to_string(&out).unwrap();
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("background-castle"));
    assert!(svg.contains("speech-bubble"));
}

#[test]
fn test_cli_preview_unknown_scene() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path());

    storyframe()
        .arg("preview")
        .arg(&script)
        .arg("--scene")
        .arg("epilogue")
        .arg("--out")
        .arg(dir.path().join("x.svg"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not found"));
}

#[test]
fn test_cli_keyframes() {
    storyframe()
        .arg("keyframes")
        .arg("entrance")
        .arg("--duration")
        .arg("1")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"frame\": 29"))
        .stdout(predicate::str::contains("\"frame\": 30").not());
}

#[test]
fn test_cli_mouth_track() {
    let output = storyframe()
        .arg("mouth-track")
        .arg("Hello")
        .arg("--duration")
        .arg("2")
        .output()
        .unwrap();
    assert!(output.status.success());

    let track: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(track.len(), 60);
    assert_eq!(track[0]["mouth_shape"], "rest");
    assert_eq!(track[30]["mouth_shape"], "wide");
}

#[test]
fn test_cli_config_toml() {
    storyframe()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("encoder_binary = \"ffmpeg\""))
        .stdout(predicate::str::contains("frame_rate = 30"));
}

#[test]
fn test_cli_export_without_encoder() {
    let dir = TempDir::new().unwrap();
    let script = write_script(dir.path());
    let output_root = dir.path().join("videos");

    storyframe()
        .env("STORYFRAME__EXPORT__ENCODER_BINARY", "/nonexistent/storyframe-ffmpeg")
        .env("STORYFRAME__EXPORT__STAGING_ROOT", dir.path().join("frames"))
        .env("STORYFRAME__EXPORT__OUTPUT_ROOT", &output_root)
        .arg("export")
        .arg(&script)
        .arg("--project")
        .arg("demo")
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"success\": false"))
        .stdout(predicate::str::contains("EncodingError"));

    assert!(!output_root.join("demo.mp4").exists());
}

#[test]
fn test_cli_mux_without_encoder() {
    let dir = TempDir::new().unwrap();
    let video = dir.path().join("demo.mp4");
    let audio = dir.path().join("voice.wav");
    fs::write(&video, b"video").unwrap();
    fs::write(&audio, b"audio").unwrap();
    let out = dir.path().join("demo.voiced.mp4");

    storyframe()
        .env("STORYFRAME__EXPORT__ENCODER_BINARY", "/nonexistent/storyframe-ffmpeg")
        .arg("mux")
        .arg(&video)
        .arg(&audio)
        .arg("--out")
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to mux"));

    assert!(!out.exists());
}
