//! Integration tests for sarita-io WAV I/O and offline rendering.

use sarita_analysis::CorrelatorKind;
use sarita_config::{DensePoint, Geometry, GeometryBuilder};
use sarita_io::{
    Error, RenderOptions, Renderer, WavFormat, WavSpec, read_wav_channels, read_wav_info,
    write_wav_channels,
};
use std::sync::Arc;
use tempfile::NamedTempFile;

fn sine(sample_rate: u32, freq_hz: f32, num_samples: usize, delay: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f32 - delay as f32;
            0.5 * (2.0 * std::f32::consts::PI * freq_hz * t / sample_rate as f32).sin()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// WAV roundtrip tests
// ---------------------------------------------------------------------------

#[test]
fn test_wav_roundtrip_four_channels_f32() {
    let channels: Vec<Vec<f32>> = (0..4).map(|d| sine(48000, 440.0, 4800, d * 3)).collect();
    let file = NamedTempFile::new().unwrap();
    write_wav_channels(file.path(), &channels, WavSpec::default()).unwrap();

    let (loaded, spec) = read_wav_channels(file.path()).unwrap();
    assert_eq!(spec.channels, 4);
    assert_eq!(spec.sample_rate, 48000);
    assert_eq!(loaded, channels);
}

#[test]
fn test_wav_roundtrip_int_formats() {
    let channels = vec![sine(44100, 1000.0, 2000, 0), sine(44100, 1000.0, 2000, 5)];
    for (bits, tol) in [(16u16, 1e-4f32), (24, 1e-6)] {
        let file = NamedTempFile::new().unwrap();
        let spec = WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: bits,
        };
        write_wav_channels(file.path(), &channels, spec).unwrap();

        let (loaded, loaded_spec) = read_wav_channels(file.path()).unwrap();
        assert_eq!(loaded_spec, spec);
        for (a, b) in channels.iter().flatten().zip(loaded.iter().flatten()) {
            assert!((a - b).abs() < tol, "{bits}-bit: {a} vs {b}");
        }
    }
}

#[test]
fn test_wav_info_reports_frames() {
    let channels = vec![vec![0.0f32; 1200]; 3];
    let file = NamedTempFile::new().unwrap();
    write_wav_channels(file.path(), &channels, WavSpec::default()).unwrap();

    let info = read_wav_info(file.path()).unwrap();
    assert_eq!(info.channels, 3);
    assert_eq!(info.num_frames, 1200);
    assert_eq!(info.format, WavFormat::IeeeFloat);
    assert!((info.duration_secs - 0.025).abs() < 1e-9);
}

#[test]
fn test_write_rejects_ragged_channels() {
    let file = NamedTempFile::new().unwrap();
    let channels = vec![vec![0.0; 10], vec![0.0; 9]];
    let err = write_wav_channels(file.path(), &channels, WavSpec::default()).unwrap_err();
    assert!(matches!(
        err,
        Error::ChannelLength {
            channel: 1,
            len: 9,
            expected: 10
        }
    ));

    let err = write_wav_channels(file.path(), &[], WavSpec::default()).unwrap_err();
    assert!(matches!(err, Error::ChannelCount { found: 0, .. }));
}

#[test]
fn test_read_missing_file_fails() {
    assert!(matches!(
        read_wav_channels("/nonexistent/array.wav"),
        Err(Error::Wav(_))
    ));
}

// ---------------------------------------------------------------------------
// File to file rendering
// ---------------------------------------------------------------------------

fn pair_geometry() -> Geometry {
    GeometryBuilder::new(48000)
        .max_shift_overall(4)
        .combination(0, 1)
        .point(DensePoint::new(0.0, 0.0, 0.5).neighbor(0, 1.0))
        .point(DensePoint::new(0.78, 0.0, 0.5).neighbor(0, 0.5).neighbor(1, 0.5))
        .build()
        .unwrap()
}

#[test]
fn test_render_files_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let geometry_path = dir.path().join("pair.cfg");
    let sparse_path = dir.path().join("sparse.wav");
    let dense_path = dir.path().join("dense.wav");

    pair_geometry().save(&geometry_path).unwrap();
    let len = 256 * 12;
    let a = sine(48000, 2400.0, len, 0);
    let b = sine(48000, 2400.0, len, 2);
    write_wav_channels(&sparse_path, &[a.clone(), b], WavSpec::default()).unwrap();

    let geometry = Arc::new(Geometry::load(&geometry_path).unwrap());
    let (sparse, spec) = read_wav_channels(&sparse_path).unwrap();
    let options = RenderOptions {
        correlator: CorrelatorKind::Fft,
        ..RenderOptions::default()
    };
    let mut renderer = Renderer::new(geometry, spec.sample_rate, options).unwrap();
    assert!(renderer.warnings().is_empty());
    let dense = renderer.render(&sparse, |_, _| {}).unwrap();
    write_wav_channels(&dense_path, &dense, spec).unwrap();

    let (loaded, loaded_spec) = read_wav_channels(&dense_path).unwrap();
    assert_eq!(loaded_spec.channels, 2);
    assert_eq!(loaded[0].len(), len);

    // point 0 reproduces sensor 0 in place
    for k in 256..len {
        assert!((loaded[0][k] - a[k]).abs() < 1e-4, "sample {k}");
    }
    // point 1 sits halfway between the sensors
    let mid = sine(48000, 2400.0, len, 1);
    for k in 256..len - 512 {
        assert!((loaded[1][k] - mid[k]).abs() < 1e-3, "sample {k}");
    }
}
