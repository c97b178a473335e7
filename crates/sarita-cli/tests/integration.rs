//! Integration tests for sarita-cli.
//!
//! Each test drives the `sarita` binary end to end inside a temporary
//! directory.

use sarita_config::{CorrelatorMode, ProcessorSettings};
use sarita_io::read_wav_channels;
use std::path::Path;
use std::process::{Command, Output};

/// Helper to get the path to the `sarita` binary built by cargo.
fn sarita_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sarita"))
}

fn run(dir: &Path, args: &[&str]) -> Output {
    sarita_bin()
        .current_dir(dir)
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run sarita")
}

/// Runs `sarita` and asserts it exits successfully.
fn run_ok(dir: &Path, args: &[&str]) -> Output {
    let output = run(dir, args);
    assert!(output.status.success(), "sarita {args:?} failed: {output:?}");
    output
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ---------------------------------------------------------------------------
// `sarita generate` and `sarita info`
// ---------------------------------------------------------------------------

#[test]
fn test_generate_geometry_then_info() {
    let dir = tempfile::tempdir().unwrap();
    run_ok(
        dir.path(),
        &["generate", "geometry", "ring.cfg", "--sensors", "4", "--density", "2"],
    );
    assert!(dir.path().join("ring.cfg").is_file());

    let output = run_ok(dir.path(), &["info", "ring.cfg", "--points"]);
    let text = stdout(&output);
    assert!(text.contains("Number of Sensors: 8"), "{text}");
    assert!(text.contains("Sparse Channels:   4"), "{text}");
    assert!(text.contains("Dense points:"));
    assert!(text.contains("[0:0.500 1:0.500]"), "{text}");
}

#[test]
fn test_generate_signal_from_geometry() {
    let dir = tempfile::tempdir().unwrap();
    run_ok(dir.path(), &["generate", "geometry", "ring.cfg", "--sensors", "6"]);
    run_ok(
        dir.path(),
        &["generate", "signal", "in.wav", "--geometry", "ring.cfg", "--duration", "0.05"],
    );

    let (channels, spec) = read_wav_channels(dir.path().join("in.wav")).unwrap();
    assert_eq!(channels.len(), 6);
    assert_eq!(spec.sample_rate, 48000);
    assert_eq!(channels[0].len(), 2400);

    let output = run_ok(dir.path(), &["info", "in.wav"]);
    assert!(stdout(&output).contains("Channels:    6"));
}

#[test]
fn test_info_lists_installed_geometries() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_ok(dir.path(), &["info"]);
    assert!(stdout(&output).contains("Geometries in"));
}

// ---------------------------------------------------------------------------
// `sarita upsample`
// ---------------------------------------------------------------------------

#[test]
fn test_upsample_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let settings = ProcessorSettings {
        frame_size: 128,
        correlator: CorrelatorMode::Direct,
        ..ProcessorSettings::default()
    };
    settings.save(dir.path().join("settings.toml")).unwrap();

    run_ok(
        dir.path(),
        &["generate", "geometry", "ring.cfg", "--sensors", "4", "--density", "2"],
    );
    run_ok(
        dir.path(),
        &["generate", "signal", "in.wav", "--geometry", "ring.cfg", "--duration", "0.1"],
    );

    let output = run_ok(
        dir.path(),
        &[
            "upsample",
            "in.wav",
            "out.wav",
            "--geometry",
            "ring.cfg",
            "--settings",
            "settings.toml",
        ],
    );
    // frame 128 plus the derived shift bound of 10
    assert!(stdout(&output).contains("latency 138 samples (compensated)"));

    let (sparse, _) = read_wav_channels(dir.path().join("in.wav")).unwrap();
    let (dense, spec) = read_wav_channels(dir.path().join("out.wav")).unwrap();
    assert_eq!(dense.len(), 8);
    assert_eq!(spec.channels, 8);
    assert_eq!(dense[0].len(), sparse[0].len());

    // even points sit on the sensors
    for (sensor, point) in [(0, 0), (1, 2), (2, 4), (3, 6)] {
        for k in 256..sparse[0].len() {
            assert!(
                (dense[point][k] - sparse[sensor][k]).abs() < 1e-4,
                "point {point} sample {k}"
            );
        }
    }
}

#[test]
fn test_upsample_missing_geometry_fails() {
    let dir = tempfile::tempdir().unwrap();
    run_ok(dir.path(), &["generate", "signal", "in.wav", "--duration", "0.01"]);

    let output = run(
        dir.path(),
        &["upsample", "in.wav", "out.wav", "--geometry", "no_such_geometry"],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "{stderr}");
    assert!(!dir.path().join("out.wav").exists());
}

#[test]
fn test_upsample_rejects_bad_bit_depth() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(
        dir.path(),
        &["upsample", "in.wav", "out.wav", "--bit-depth", "12"],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("bit depth"));
}

#[test]
fn test_upsample_rejects_overlap_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(
        dir.path(),
        &["upsample", "in.wav", "out.wav", "--overlap", "80"],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("out of range"), "{stderr}");
    assert!(stderr.contains("12.5, 25, 50"), "{stderr}");
}
