//! Line-oriented text codecs
//!
//! | format          | layout                                                        |
//! |-----------------|---------------------------------------------------------------|
//! | CSV             | `address<d>timestamp`                                         |
//! | CSV + loc.      | `address<d>timestamp<d>auditory_model<d>xso_type<d>neuron_id` |
//! | TXT             | `<name>_addrs.txt` and `<name>_tss.txt`, one value per line   |
//! | TXT relative    | as TXT, timestamps are deltas from the previous event         |
//! | ZynqGrabber     | `ts,auditory_model,side,xso_type,neuron_id,channel,polarity`  |
//!
//! Blank lines are ignored. Lines with the wrong field count or unparsable
//! numbers are skipped and counted, never fatal.

use core::fmt::Write as _;

use super::aedat::route_localization_event;
use super::{Encoded, LocalizationDecode, OutputFormat, StreamEncoder};
use crate::config::{LocalizationConfig, RecordingConfig};
use crate::error::{Diagnostic, ErrorKind, Result};
use crate::types::{Population, SpikeEvent, SpikeStream};

/// Delimiter used when none is given.
pub const DEFAULT_DELIMITER: &str = ",";

/// Field count of a ZynqGrabber line.
pub const ZYNQ_FIELDS: usize = 7;

/// Stream decoded from text plus the number of rejected lines.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextDecode {
    /// Decoded events
    pub stream: SpikeStream,
    /// Lines that did not match the layout
    pub skipped_lines: usize,
}

impl TextDecode {
    /// Warning for skipped lines, if any.
    #[must_use]
    pub fn warning(&self, operation: &'static str) -> Option<Diagnostic> {
        (self.skipped_lines > 0).then(|| {
            Diagnostic::new(
                "Text",
                operation,
                ErrorKind::MalformedLine,
                format!("skipped {} malformed lines", self.skipped_lines),
            )
        })
    }
}

fn content_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

fn split_fields<'a>(line: &'a str, delimiter: &'a str) -> impl Iterator<Item = &'a str> {
    line.split(delimiter).map(str::trim)
}

/// Parse a timestamp field in microseconds.
///
/// A trailing `ps` unit marks picosecond simulator output, scaled by `1e-6`.
/// Fractional values are floored.
#[must_use]
pub fn parse_timestamp(field: &str) -> Option<i64> {
    let field = field.trim();
    if let Some(picos) = field.strip_suffix("ps") {
        let value: f64 = picos.trim().parse().ok()?;
        return value.is_finite().then(|| (value / 1e6).floor() as i64);
    }
    if let Ok(value) = field.parse::<i64>() {
        return Some(value);
    }
    let value: f64 = field.parse().ok()?;
    value.is_finite().then(|| value.floor() as i64)
}

fn parse_int(field: &str) -> Option<i64> {
    field.trim().parse().ok()
}

// ============================================================================
// CSV
// ============================================================================

/// Decode `address<delimiter>timestamp` lines.
#[must_use]
pub fn decode_csv(text: &str, delimiter: &str) -> TextDecode {
    let mut out = TextDecode::default();
    for line in content_lines(text) {
        let fields: Vec<&str> = split_fields(line, delimiter).collect();
        let event = match fields.as_slice() {
            [address, timestamp] => parse_int(address)
                .zip(parse_timestamp(timestamp))
                .map(|(a, t)| SpikeEvent::new(a, t)),
            _ => None,
        };
        match event {
            Some(event) => out.stream.push(event),
            None => out.skipped_lines += 1,
        }
    }
    out
}

/// Encode one `address<delimiter>timestamp` line per event.
#[must_use]
pub fn encode_csv(stream: &SpikeStream, delimiter: &str) -> String {
    let mut out = String::with_capacity(stream.len() * 12);
    for event in stream.iter() {
        let _ = writeln!(out, "{}{delimiter}{}", event.address, event.timestamp);
    }
    out
}

fn parse_localization_row(fields: &[&str]) -> Option<(i64, i64, i64, i64, i64)> {
    let [address, timestamp, model, xso, neuron] = fields else {
        return None;
    };
    Some((
        parse_int(address)?,
        parse_timestamp(timestamp)?,
        parse_int(model)?,
        parse_int(xso)?,
        parse_int(neuron)?,
    ))
}

/// Decode CSV lines carrying localization columns.
///
/// Rows with `auditory_model == 0` are audio events. Other rows go to the
/// population selected by `xso_type` (0 MSO, 1 LSO) with the address column
/// read as the frequency channel, and are dropped if outside `bounds`.
#[must_use]
pub fn decode_csv_localization(
    text: &str,
    delimiter: &str,
    bounds: &LocalizationConfig,
) -> LocalizationDecode {
    let mut out = LocalizationDecode::default();
    for line in content_lines(text) {
        let fields: Vec<&str> = split_fields(line, delimiter).collect();
        let Some((address, timestamp, model, xso, neuron_id)) = parse_localization_row(&fields)
        else {
            out.skipped_lines += 1;
            continue;
        };
        if model == 0 {
            out.audio.push(SpikeEvent::new(address, timestamp));
        } else {
            let population = Population::from_bit(xso != 0);
            route_localization_event(&mut out, bounds, population, neuron_id, address, timestamp);
        }
    }
    out
}

// ============================================================================
// TXT (split files)
// ============================================================================

fn pair_lines(
    addresses: &str,
    timestamps: &str,
    mut parse_ts: impl FnMut(&str) -> Option<i64>,
) -> TextDecode {
    let mut out = TextDecode::default();
    let mut address_lines = content_lines(addresses);
    let mut timestamp_lines = content_lines(timestamps);
    loop {
        match (address_lines.next(), timestamp_lines.next()) {
            (Some(a), Some(t)) => match parse_int(a).zip(parse_ts(t)) {
                Some((address, timestamp)) => out.stream.push(SpikeEvent::new(address, timestamp)),
                None => out.skipped_lines += 1,
            },
            (Some(_), None) | (None, Some(_)) => out.skipped_lines += 1,
            (None, None) => break,
        }
    }
    out
}

/// Decode a pair of address and timestamp files.
///
/// Lines are matched by position; surplus lines in the longer file are skipped.
#[must_use]
pub fn decode_txt(addresses: &str, timestamps: &str) -> TextDecode {
    pair_lines(addresses, timestamps, parse_timestamp)
}

/// Decode a pair of files whose timestamps are deltas from the previous event.
#[must_use]
pub fn decode_txt_relative(addresses: &str, timestamps: &str) -> TextDecode {
    let mut clock = 0_i64;
    pair_lines(addresses, timestamps, |field| {
        let delta = parse_timestamp(field)?;
        clock += delta;
        Some(clock)
    })
}

fn join_lines(values: impl Iterator<Item = i64>) -> String {
    let mut out = String::new();
    for value in values {
        let _ = writeln!(out, "{value}");
    }
    out
}

/// Encode as `(addresses, timestamps)` file contents.
#[must_use]
pub fn encode_txt(stream: &SpikeStream) -> (String, String) {
    (
        join_lines(stream.addresses().iter().copied()),
        join_lines(stream.timestamps().iter().copied()),
    )
}

/// Encode in timestamp order with deltas from the previous event.
///
/// The first timestamp line is always `0`.
#[must_use]
pub fn encode_txt_relative(stream: &SpikeStream) -> (String, String) {
    let sorted = stream.time_ordered();
    let timestamps = sorted.timestamps();
    let deltas = timestamps
        .first()
        .map(|_| 0)
        .into_iter()
        .chain(timestamps.windows(2).map(|w| w[1] - w[0]));
    (join_lines(sorted.addresses().iter().copied()), join_lines(deltas))
}

// ============================================================================
// ZynqGrabber
// ============================================================================

/// Decode ZynqGrabber capture lines.
///
/// Audio events are re-addressed as
/// `channel * f + polarity + num_channels * side * f` with `f` the polarity
/// factor of `config`.
#[must_use]
pub fn decode_zynq_grabber(
    text: &str,
    config: &RecordingConfig,
    bounds: &LocalizationConfig,
) -> LocalizationDecode {
    let factor = config.on_off_both.factor() as i64;
    let num_channels = i64::from(config.num_channels);
    let mut out = LocalizationDecode::default();

    for line in content_lines(text) {
        let fields: Vec<&str> = split_fields(line, ",").collect();
        if fields.len() != ZYNQ_FIELDS {
            out.skipped_lines += 1;
            continue;
        }
        let Some(timestamp) = parse_timestamp(fields[0]) else {
            out.skipped_lines += 1;
            continue;
        };
        let values: Option<Vec<i64>> = fields[1..].iter().map(|f| parse_int(f)).collect();
        let Some([model, side, xso, neuron_id, channel, polarity]) =
            values.and_then(|v| <[i64; 6]>::try_from(v).ok())
        else {
            out.skipped_lines += 1;
            continue;
        };

        if model == 0 {
            let address = channel * factor + polarity + num_channels * side * factor;
            out.audio.push(SpikeEvent::new(address, timestamp));
        } else {
            let population = Population::from_bit(xso != 0);
            route_localization_event(&mut out, bounds, population, neuron_id, channel, timestamp);
        }
    }
    out
}

// ============================================================================
// Encoders
// ============================================================================

/// [`StreamEncoder`] for [`OutputFormat::Csv`] with [`DEFAULT_DELIMITER`].
#[derive(Copy, Clone, Debug, Default)]
pub struct CsvEncoder;

impl StreamEncoder for CsvEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Csv
    }

    fn encode(&self, stream: &SpikeStream, _config: &RecordingConfig) -> Result<Encoded> {
        Ok(Encoded::Single(encode_csv(stream, DEFAULT_DELIMITER).into_bytes()))
    }
}

/// [`StreamEncoder`] for [`OutputFormat::Txt`].
#[derive(Copy, Clone, Debug, Default)]
pub struct TxtEncoder;

impl StreamEncoder for TxtEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Txt
    }

    fn encode(&self, stream: &SpikeStream, _config: &RecordingConfig) -> Result<Encoded> {
        let (addresses, timestamps) = encode_txt(stream);
        Ok(Encoded::Split { addresses: addresses.into_bytes(), timestamps: timestamps.into_bytes() })
    }
}

/// [`StreamEncoder`] for [`OutputFormat::TxtRelative`].
#[derive(Copy, Clone, Debug, Default)]
pub struct TxtRelativeEncoder;

impl StreamEncoder for TxtRelativeEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::TxtRelative
    }

    fn encode(&self, stream: &SpikeStream, _config: &RecordingConfig) -> Result<Encoded> {
        let (addresses, timestamps) = encode_txt_relative(stream);
        Ok(Encoded::Split { addresses: addresses.into_bytes(), timestamps: timestamps.into_bytes() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DroppedEvents;
    use crate::config::{OnOffBoth, PopulationBounds};

    fn bounds() -> LocalizationConfig {
        LocalizationConfig::new(PopulationBounds::new(0, 31, 16), PopulationBounds::new(0, 31, 16))
            .unwrap()
    }

    #[test]
    fn test_csv_roundtrip_with_separator() {
        let stream = SpikeStream::new(vec![3, 12, 7], vec![0, 15, 15]).unwrap();
        let text = encode_csv(&stream, ", ");
        assert_eq!(text, "3, 0\n12, 15\n7, 15\n");
        let decoded = decode_csv(&text, ",");
        assert_eq!(decoded.stream, stream);
        assert_eq!(decoded.skipped_lines, 0);
    }

    #[test]
    fn test_csv_skips_malformed_lines() {
        let decoded = decode_csv("1,10\n\nfoo,20\n2,30,4\n3,40\r\n", ",");
        assert_eq!(decoded.stream.addresses(), &[1, 3]);
        assert_eq!(decoded.skipped_lines, 2);
        assert_eq!(decoded.warning("decode_csv").unwrap().kind, ErrorKind::MalformedLine);
    }

    #[test]
    fn test_picosecond_timestamps() {
        assert_eq!(parse_timestamp("2500000 ps"), Some(2));
        assert_eq!(parse_timestamp("1000000ps"), Some(1));
        assert_eq!(parse_timestamp("42"), Some(42));
        assert_eq!(parse_timestamp("12.9"), Some(12));
        assert_eq!(parse_timestamp("ps"), None);
    }

    #[test]
    fn test_csv_localization_routing() {
        let text = "5,100,0,0,0\n10,2000000 ps,1,0,3\n11,300,1,1,20\n12,400,1,1,1\nbad line\n";
        let decoded = decode_csv_localization(text, ",", &bounds());
        assert_eq!(decoded.audio.addresses(), &[5]);
        assert_eq!(decoded.localization.mso.timestamps(), &[2]);
        assert_eq!(decoded.localization.mso.channels(), &[10]);
        assert_eq!(decoded.localization.lso.neuron_ids(), &[1]);
        assert_eq!(decoded.dropped, DroppedEvents { mso: 0, lso: 1 });
        assert_eq!(decoded.skipped_lines, 1);
    }

    #[test]
    fn test_txt_pairs_lines_by_position() {
        let decoded = decode_txt("1\n2\n3\n", "10\n20\n");
        assert_eq!(decoded.stream.addresses(), &[1, 2]);
        assert_eq!(decoded.stream.timestamps(), &[10, 20]);
        assert_eq!(decoded.skipped_lines, 1);
    }

    #[test]
    fn test_txt_relative_roundtrip() {
        let stream = SpikeStream::new(vec![1, 2, 3], vec![0, 40, 15]).unwrap();
        let (addresses, timestamps) = encode_txt_relative(&stream);
        assert_eq!(addresses, "1\n3\n2\n");
        assert_eq!(timestamps, "0\n15\n25\n");

        let decoded = decode_txt_relative(&addresses, &timestamps);
        assert_eq!(decoded.stream.timestamps(), &[0, 15, 40]);
        assert_eq!(decoded.stream.addresses(), &[1, 3, 2]);
    }

    #[test]
    fn test_zynq_grabber_addressing() {
        let config = RecordingConfig::builder(64).on_off_both(OnOffBoth::Both).build().unwrap();
        let text = "\
            100,0,0,0,0,5,1\n\
            200,0,1,0,0,5,0\n\
            300,1,0,1,4,7,0\n\
            400,0,0,0\n";
        let decoded = decode_zynq_grabber(text, &config, &bounds());
        assert_eq!(decoded.audio.addresses(), &[11, 138]);
        assert_eq!(decoded.audio.timestamps(), &[100, 200]);
        assert_eq!(decoded.localization.lso.neuron_ids(), &[4]);
        assert_eq!(decoded.localization.lso.channels(), &[7]);
        assert_eq!(decoded.skipped_lines, 1);
    }
}
