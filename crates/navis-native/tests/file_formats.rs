//! Loader and saver integration tests against real files

use std::fs;

use navis_core::codec::aedat::LocalizationWord;
use navis_core::normalize::normalize;
use navis_core::{
    AddressSize, LocalizationConfig, OutputFormat, Population, PopulationBounds, RecordingConfig,
    SpikeEvent, SpikeStream,
};
use navis_native::loaders::{
    load_aedat, load_aedat_localization, load_any, load_csv, load_inferred, load_zynq_grabber,
    InputFormat,
};
use navis_native::savers::{save_aedat, save_as, save_csv, save_txt_relative};
use navis_native::LoadError;
use tempfile::tempdir;

fn sample_stream() -> SpikeStream {
    SpikeStream::from_events([
        SpikeEvent::new(1, 0),
        SpikeEvent::new(7, 200),
        SpikeEvent::new(3, 400),
        SpikeEvent::new(3, 1_000),
    ])
}

fn localization_bounds() -> LocalizationConfig {
    LocalizationConfig::new(PopulationBounds::new(0, 10, 8), PopulationBounds::new(0, 10, 4))
        .unwrap()
}

fn record(out: &mut Vec<u8>, word: u16, ticks: u32) {
    out.extend_from_slice(&word.to_be_bytes());
    out.extend_from_slice(&ticks.to_be_bytes());
}

#[test]
fn test_aedat_save_then_load() {
    let dir = tempdir().unwrap();
    let config = RecordingConfig::default();
    let stream = sample_stream();

    let path = save_aedat(&stream, dir.path().join("rec"), &config).unwrap();
    assert_eq!(path, dir.path().join("rec.aedat"));
    assert_eq!(fs::metadata(&path).unwrap().len(), 4 * 6);

    let mut loaded = load_aedat(&path, &config).unwrap();
    assert_eq!(loaded.timestamps(), &[0, 1_000, 2_000, 5_000]);
    normalize(&mut loaded, &config);
    assert_eq!(loaded, stream);
}

#[test]
fn test_raw_ticks_survive_resave() {
    let dir = tempdir().unwrap();
    let config = RecordingConfig::default();
    let stream = SpikeStream::from_events([SpikeEvent::new(1, 0), SpikeEvent::new(2, 1_000)]);
    let source = save_aedat(&stream, dir.path().join("source"), &config).unwrap();

    let raw = load_aedat(&source, &config).unwrap();
    assert_eq!(raw.timestamps(), &[0, 5_000]);

    let paths = save_as(&raw, dir.path().join("copy"), OutputFormat::Aedat, &config.as_raw_ticks())
        .unwrap();
    let copied = load_aedat(&paths[0], &config).unwrap();
    assert_eq!(copied, raw);
    assert_eq!(fs::read(&paths[0]).unwrap(), fs::read(&source).unwrap());
}

#[test]
fn test_aedat_header_and_truncated_tail() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("header.aedat");

    let mut bytes = b"#!AER-DAT2.0\r\n# created by a test\n".to_vec();
    record(&mut bytes, 4, 10);
    record(&mut bytes, 5, 20);
    bytes.extend_from_slice(&[0, 1, 0]);
    fs::write(&path, bytes).unwrap();

    let loaded = load_aedat(&path, &RecordingConfig::default()).unwrap();
    assert_eq!(loaded.addresses(), &[4, 5]);
    assert_eq!(loaded.timestamps(), &[10, 20]);
}

#[test]
fn test_aedat_four_byte_addresses() {
    let dir = tempdir().unwrap();
    let config = RecordingConfig::builder(64).address_size(AddressSize::Four).build().unwrap();
    let stream = SpikeStream::from_events([SpikeEvent::new(70_000, 0), SpikeEvent::new(2, 200)]);

    let path = save_aedat(&stream, dir.path().join("wide"), &config).unwrap();
    let mut loaded = load_aedat(&path, &config).unwrap();
    normalize(&mut loaded, &config);
    assert_eq!(loaded, stream);
}

#[test]
fn test_save_as_every_format_round_trips() {
    let dir = tempdir().unwrap();
    let config = RecordingConfig::builder(64).timestamp_tick(1.0).build().unwrap();
    let stream = sample_stream();

    for format in OutputFormat::ALL {
        let base = dir.path().join(format!("rec_{}", format.name()));
        let paths = save_as(&stream, &base, format, &config).unwrap();
        assert!(paths.iter().all(|p| p.exists()), "{format}: {paths:?}");

        let input: InputFormat = format.name().parse().unwrap();
        let loaded = load_any(&paths[0], input, &config).unwrap();
        assert_eq!(loaded, stream, "{format}");
    }
}

#[test]
fn test_csv_custom_delimiter() {
    let dir = tempdir().unwrap();
    let stream = sample_stream();
    let path = save_csv(&stream, dir.path().join("semi"), ";").unwrap();
    assert_eq!(load_csv(&path, ";").unwrap(), stream);

    // The wrong delimiter leaves every line malformed.
    assert!(load_csv(&path, ",").unwrap().is_empty());
}

#[test]
fn test_txt_relative_files_hold_deltas() {
    let dir = tempdir().unwrap();
    let paths = save_txt_relative(&sample_stream(), dir.path().join("rel")).unwrap();
    let timestamps = fs::read_to_string(&paths[1]).unwrap();
    let deltas: Vec<&str> = timestamps.lines().collect();
    assert_eq!(deltas, ["0", "200", "200", "600"]);
}

#[test]
fn test_load_inferred_by_extension() {
    let dir = tempdir().unwrap();
    let config = RecordingConfig::default();
    let path = save_csv(&sample_stream(), dir.path().join("inferred"), ",").unwrap();
    assert_eq!(load_inferred(&path, &config).unwrap(), sample_stream());
}

#[test]
fn test_missing_file_reports_path() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("absent.aedat");
    let err = load_aedat(&missing, &RecordingConfig::default()).unwrap_err();
    match err {
        LoadError::Io { path, .. } => assert_eq!(path, missing),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_binary_file_is_not_text() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("binary.csv");
    fs::write(&path, [0xFF, 0xFE, 0x00]).unwrap();
    let err = load_csv(&path, ",").unwrap_err();
    assert!(matches!(err, LoadError::NotText { .. }));
}

#[test]
fn test_aedat_localization_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dual.aedat");
    let size = AddressSize::Two;

    let mso = LocalizationWord { population: Population::Mso, neuron_id: 3, channel: 2 };
    let lso_out_of_range = LocalizationWord { population: Population::Lso, neuron_id: 1, channel: 40 };
    let mut bytes = Vec::new();
    record(&mut bytes, 5, 10);
    record(&mut bytes, mso.pack(size) as u16, 20);
    record(&mut bytes, lso_out_of_range.pack(size) as u16, 30);
    fs::write(&path, bytes).unwrap();

    let decoded =
        load_aedat_localization(&path, &RecordingConfig::default(), &localization_bounds())
            .unwrap();
    assert_eq!(decoded.audio.addresses(), &[5]);
    assert_eq!(decoded.localization.mso.neuron_ids(), &[3]);
    assert_eq!(decoded.localization.mso.channels(), &[2]);
    assert_eq!(decoded.localization.mso.timestamps(), &[20]);
    assert!(decoded.localization.lso.is_empty());
    assert_eq!(decoded.dropped.lso, 1);
}

#[test]
fn test_zynq_grabber_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("zynq.txt");
    fs::write(&path, "100,0,0,0,0,5,1\n300,1,0,0,2,7,0\nnot a line\n").unwrap();

    let config = RecordingConfig::default();
    let decoded = load_zynq_grabber(&path, &config, &localization_bounds()).unwrap();
    assert_eq!(decoded.audio.addresses(), &[11]);
    assert_eq!(decoded.localization.mso.neuron_ids(), &[2]);
    assert_eq!(decoded.skipped_lines, 1);
}
