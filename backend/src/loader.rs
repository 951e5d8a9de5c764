// Dataset, weather, and results loading.
// Reshapes the long-format telemetry CSV into ordered wide records and
// precomputes the course geometry handed to the engine.

use std::collections::HashMap;
use std::env;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use tracing::{info, warn};

use race_core::model::{RawRecord, WeatherSnapshot};
use race_core::results::{LapResult, ResultsFeed};
use race_core::track::{GeoPoint, GpsBounds, TrackConfig};

use crate::constants::{TELEMETRY_FILE_PREFIX, TOTAL_LAPS_FLOOR};

// Channels forward-filled after the pivot so playback has no gaps.
const FFILL_CHANNELS: &[&str] = &[
    "speed",
    "Speed",
    "SPEED",
    "nmot",
    "RPM",
    "gear",
    "Gear",
    "Throttle",
    "aps",
    "Brake",
    "brake_pressure",
    "accx_can",
    "lat_g",
    "accy_can",
    "long_g",
    "VBOX_Lat_Min",
    "GPS_Lat",
    "VBOX_Long_Minutes",
    "GPS_Long",
];

const LAT_COLUMNS: &[&str] = &["VBOX_Lat_Min", "GPS_Lat"];
const LONG_COLUMNS: &[&str] = &["VBOX_Long_Minutes", "GPS_Long"];

pub struct Dataset {
    pub records: Vec<RawRecord>,
    pub track: TrackConfig,
    pub first_lap: u32,
    pub total_laps: u32,
}

pub fn resolve_data_dir() -> PathBuf {
    if let Ok(value) = env::var("PITWALL_DATA_DIR") {
        return PathBuf::from(value);
    }
    let local = PathBuf::from("./data");
    if local.is_dir() {
        return local;
    }
    let parent = PathBuf::from("../data");
    if parent.is_dir() {
        return parent;
    }
    local
}

/// First `telemetry_*.csv` found under the data directory.
pub fn find_telemetry_file(data_dir: &Path) -> Option<PathBuf> {
    let mut pending = vec![data_dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            let name = match path.file_name().and_then(|name| name.to_str()) {
                Some(name) => name,
                None => continue,
            };
            if name.starts_with(TELEMETRY_FILE_PREFIX)
                && name.to_ascii_lowercase().ends_with(".csv")
            {
                return Some(path);
            }
        }
    }
    None
}

struct LongRow {
    timestamp: String,
    vehicle: Option<String>,
    name: String,
    value: Option<f64>,
    lap: Option<u32>,
}

/// Load and pivot the long-format telemetry CSV for one car.
pub fn load_dataset(path: &Path, hero_car: &str, max_rows: usize) -> Result<Dataset> {
    let file = File::open(path)
        .with_context(|| format!("failed to open telemetry file {}", path.display()))?;
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(file);
    let headers = reader.headers().context("telemetry csv has no header")?.clone();
    let column = |name: &str| headers.iter().position(|header| header == name);

    let ts_idx = column("timestamp").context("telemetry csv missing timestamp column")?;
    let name_idx = column("telemetry_name").context("telemetry csv missing telemetry_name")?;
    let value_idx = column("telemetry_value").context("telemetry csv missing telemetry_value")?;
    let vehicle_idx = column("vehicle_id");
    let lap_idx = column("lap");

    let mut rows = Vec::new();
    for record in reader.records() {
        if rows.len() >= max_rows {
            break;
        }
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!(?err, "skipping malformed telemetry row");
                continue;
            }
        };
        let timestamp = match record.get(ts_idx) {
            Some(ts) if !ts.is_empty() => ts.to_string(),
            _ => continue,
        };
        let name = match record.get(name_idx) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };
        rows.push(LongRow {
            timestamp,
            vehicle: vehicle_idx
                .and_then(|idx| record.get(idx))
                .map(|value| value.to_string()),
            name,
            value: parse_channel_value(&record, value_idx),
            lap: lap_idx
                .and_then(|idx| record.get(idx))
                .and_then(|value| value.parse::<f64>().ok())
                .map(|value| value.max(0.0) as u32),
        });
    }

    if vehicle_idx.is_some() {
        let mut cars: Vec<String> = Vec::new();
        for row in &rows {
            if let Some(vehicle) = &row.vehicle {
                if !cars.contains(vehicle) {
                    cars.push(vehicle.clone());
                }
            }
        }
        if !cars.is_empty() {
            let target = if cars.iter().any(|car| car == hero_car) {
                hero_car.to_string()
            } else {
                cars[0].clone()
            };
            info!(cars = cars.len(), %target, "focusing on one car");
            rows.retain(|row| row.vehicle.as_deref() == Some(target.as_str()));
        }
    }

    // Pivot long -> wide, keeping the first value per (timestamp, channel).
    let mut order: Vec<String> = Vec::new();
    let mut by_timestamp: HashMap<String, RawRecord> = HashMap::new();
    for row in rows {
        let entry = by_timestamp
            .entry(row.timestamp.clone())
            .or_insert_with(|| {
                order.push(row.timestamp.clone());
                RawRecord {
                    t: row.timestamp.parse::<f64>().ok(),
                    timestamp: row.timestamp.clone(),
                    lap: None,
                    channels: HashMap::new(),
                }
            });
        if let Some(value) = row.value {
            entry.channels.entry(row.name).or_insert(value);
        }
        if entry.lap.is_none() {
            entry.lap = row.lap;
        }
    }

    let mut records: Vec<RawRecord> = order
        .into_iter()
        .filter_map(|timestamp| by_timestamp.remove(&timestamp))
        .collect();
    records.sort_by(|a, b| match (a.t, b.t) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
        _ => a.timestamp.cmp(&b.timestamp),
    });

    fill_gaps(&mut records);

    let first_lap = records
        .iter()
        .filter_map(|record| record.lap)
        .min()
        .unwrap_or(1)
        .max(1);
    let total_laps = records
        .iter()
        .filter_map(|record| record.lap)
        .max()
        .unwrap_or(0)
        .max(TOTAL_LAPS_FLOOR);

    let track = build_track(&records);
    info!(
        ticks = records.len(),
        map_points = track.shape.len(),
        first_lap,
        total_laps,
        "telemetry dataset ready"
    );

    Ok(Dataset {
        records,
        track,
        first_lap,
        total_laps,
    })
}

fn parse_channel_value(record: &csv::StringRecord, idx: usize) -> Option<f64> {
    record
        .get(idx)
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

// Forward- then backward-fill the known channels across the timeline.
fn fill_gaps(records: &mut [RawRecord]) {
    for name in FFILL_CHANNELS {
        let mut last = None;
        for record in records.iter_mut() {
            match record.channel(name) {
                Some(value) => last = Some(value),
                None => {
                    if let Some(value) = last {
                        record.channels.insert(name.to_string(), value);
                    }
                }
            }
        }
        let mut next = None;
        for record in records.iter_mut().rev() {
            match record.channel(name) {
                Some(value) => next = Some(value),
                None => {
                    if let Some(value) = next {
                        record.channels.insert(name.to_string(), value);
                    }
                }
            }
        }
    }
}

// Carve the static map from the densest lap to avoid cross-lap chords.
fn build_track(records: &[RawRecord]) -> TrackConfig {
    let lat_col = LAT_COLUMNS
        .iter()
        .find(|name| records.iter().any(|record| record.channel(name).is_some()));
    let long_col = LONG_COLUMNS
        .iter()
        .find(|name| records.iter().any(|record| record.channel(name).is_some()));
    let (Some(lat_col), Some(long_col)) = (lat_col, long_col) else {
        warn!("no GPS channels in dataset; course geometry disabled");
        return TrackConfig::fallback();
    };

    let positions: Vec<(Option<u32>, GeoPoint)> = records
        .iter()
        .filter_map(|record| {
            let lat = record.channel(lat_col)?;
            let long = record.channel(long_col)?;
            Some((record.lap, GeoPoint::new(lat, long)))
        })
        .collect();
    if positions.is_empty() {
        return TrackConfig::fallback();
    }

    let bounds = GpsBounds {
        min_lat: positions.iter().map(|(_, p)| p.lat).fold(f64::MAX, f64::min),
        max_lat: positions.iter().map(|(_, p)| p.lat).fold(f64::MIN, f64::max),
        min_long: positions.iter().map(|(_, p)| p.long).fold(f64::MAX, f64::min),
        max_long: positions.iter().map(|(_, p)| p.long).fold(f64::MIN, f64::max),
    };

    let mut lap_counts: HashMap<u32, usize> = HashMap::new();
    for (lap, _) in &positions {
        if let Some(lap) = lap {
            *lap_counts.entry(*lap).or_insert(0) += 1;
        }
    }
    let densest = lap_counts
        .iter()
        .max_by_key(|(_, count)| **count)
        .map(|(lap, _)| *lap);

    let mut shape = match densest {
        Some(lap) => {
            let lap_slice: Vec<GeoPoint> = positions
                .iter()
                .filter(|(record_lap, _)| *record_lap == Some(lap))
                .map(|(_, point)| *point)
                .collect();
            if lap_slice.len() > 10 {
                decimate(&lap_slice, 3)
            } else {
                Vec::new()
            }
        }
        None => Vec::new(),
    };
    if shape.len() < 30 {
        let all: Vec<GeoPoint> = positions.iter().map(|(_, point)| *point).collect();
        shape = decimate(&all, 5);
    }

    let start = shape
        .first()
        .copied()
        .unwrap_or_else(|| GeoPoint::new(race_core::track::FALLBACK_LAT, race_core::track::FALLBACK_LONG));
    let (boxes, markers) = TrackConfig::derive_sectors(bounds);

    TrackConfig {
        start,
        boxes,
        markers,
        shape,
        bounds,
    }
}

fn decimate(points: &[GeoPoint], step: usize) -> Vec<GeoPoint> {
    let mut out: Vec<GeoPoint> = points.iter().copied().step_by(step.max(1)).collect();
    out.dedup();
    out
}

/// Weather rows from the `;`-separated feed, defaulting missing fields.
pub fn load_weather(path: &Path) -> Result<Vec<WeatherSnapshot>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open weather file {}", path.display()))?;
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(file);
    let headers = reader.headers().context("weather csv has no header")?.clone();
    let column = |name: &str| headers.iter().position(|header| header == name);
    let temp_idx = column("AIR_TEMP");
    let track_idx = column("TRACK_TEMP");
    let humidity_idx = column("HUMIDITY");
    let wind_idx = column("WIND_SPEED");
    let wind_dir_idx = column("WIND_DIRECTION");
    let rain_idx = column("RAIN");

    let field = |record: &csv::StringRecord, idx: Option<usize>, default: f64| -> f64 {
        idx.and_then(|idx| record.get(idx))
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite())
            .unwrap_or(default)
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!(?err, "skipping malformed weather row");
                continue;
            }
        };
        rows.push(WeatherSnapshot {
            temp_c: field(&record, temp_idx, 28.0),
            track_temp_c: field(&record, track_idx, 32.0),
            humidity: field(&record, humidity_idx, 55.0) as u32,
            wind_kph: field(&record, wind_idx, 8.0),
            wind_dir: field(&record, wind_dir_idx, 0.0),
            rain: field(&record, rain_idx, 0.0) as u8,
        });
    }
    Ok(rows)
}

/// Authoritative per-lap results keyed by lap number.
pub fn load_results(path: &Path) -> Result<ResultsFeed> {
    let file = File::open(path)
        .with_context(|| format!("failed to open results file {}", path.display()))?;
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(file);
    let headers = reader.headers().context("results csv has no header")?.clone();
    let column = |name: &str| headers.iter().position(|header| header == name);
    let lap_idx = column("lap").context("results csv missing lap column")?;
    let time_idx = column("lap_time_s");
    let s1_idx = column("sector1_s");
    let s2_idx = column("sector2_s");
    let s3_idx = column("sector3_s");
    let speed_idx = column("top_speed_kph");

    let field = |record: &csv::StringRecord, idx: Option<usize>| -> Option<f64> {
        idx.and_then(|idx| record.get(idx))
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite())
    };

    let mut feed = ResultsFeed::default();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!(?err, "skipping malformed results row");
                continue;
            }
        };
        let Some(lap) = record
            .get(lap_idx)
            .and_then(|value| value.trim().parse::<u32>().ok())
        else {
            continue;
        };
        feed.insert(
            lap,
            LapResult {
                lap_time_s: field(&record, time_idx),
                sector1_s: field(&record, s1_idx),
                sector2_s: field(&record, s2_idx),
                sector3_s: field(&record, s3_idx),
                top_speed_kph: field(&record, speed_idx),
            },
        );
    }
    Ok(feed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write csv");
        file
    }

    #[test]
    fn pivots_long_rows_into_wide_records() {
        let csv = "\
timestamp,vehicle_id,telemetry_name,telemetry_value,lap
100.0,car-1,speed,120.5,3
100.0,car-1,RPM,5400,3
100.1,car-1,speed,121.0,3
100.2,car-1,RPM,5500,4
";
        let file = write_csv(csv);
        let dataset = load_dataset(file.path(), "car-1", 1000).unwrap();
        assert_eq!(dataset.records.len(), 3);
        assert_eq!(dataset.records[0].channel("speed"), Some(120.5));
        assert_eq!(dataset.records[0].channel("RPM"), Some(5400.0));
        assert_eq!(dataset.records[0].lap, Some(3));
        assert_eq!(dataset.first_lap, 3);
        // dataset max is 4 but the configured floor applies
        assert_eq!(dataset.total_laps, TOTAL_LAPS_FLOOR);
    }

    #[test]
    fn forward_fill_bridges_sparse_channels() {
        let csv = "\
timestamp,vehicle_id,telemetry_name,telemetry_value,lap
100.0,car-1,speed,120.0,1
100.1,car-1,RPM,5400,1
100.2,car-1,RPM,5500,1
";
        let file = write_csv(csv);
        let dataset = load_dataset(file.path(), "car-1", 1000).unwrap();
        // speed only appeared at 100.0 but is filled through the gap
        assert_eq!(dataset.records[1].channel("speed"), Some(120.0));
        assert_eq!(dataset.records[2].channel("speed"), Some(120.0));
        // backward fill covers the leading RPM gap
        assert_eq!(dataset.records[0].channel("RPM"), Some(5400.0));
    }

    #[test]
    fn hero_car_filter_prefers_configured_id() {
        let csv = "\
timestamp,vehicle_id,telemetry_name,telemetry_value,lap
100.0,car-2,speed,80.0,1
100.0,car-1,speed,120.0,1
100.1,car-2,speed,81.0,1
";
        let file = write_csv(csv);
        let dataset = load_dataset(file.path(), "car-1", 1000).unwrap();
        assert_eq!(dataset.records.len(), 1);
        assert_eq!(dataset.records[0].channel("speed"), Some(120.0));
    }

    #[test]
    fn unknown_hero_falls_back_to_first_car() {
        let csv = "\
timestamp,vehicle_id,telemetry_name,telemetry_value,lap
100.0,car-2,speed,80.0,1
100.1,car-2,speed,81.0,1
";
        let file = write_csv(csv);
        let dataset = load_dataset(file.path(), "car-9", 1000).unwrap();
        assert_eq!(dataset.records.len(), 2);
    }

    #[test]
    fn gps_channels_build_course_geometry() {
        let mut csv = String::from("timestamp,vehicle_id,telemetry_name,telemetry_value,lap\n");
        for tick in 0..40 {
            let t = 100.0 + tick as f64 * 0.1;
            csv.push_str(&format!("{t},car-1,GPS_Lat,{},2\n", 33.5 + tick as f64 * 0.001));
            csv.push_str(&format!("{t},car-1,GPS_Long,{},2\n", -86.7 + tick as f64 * 0.001));
        }
        let file = write_csv(&csv);
        let dataset = load_dataset(file.path(), "car-1", 10_000).unwrap();
        assert!(!dataset.track.shape.is_empty());
        assert_eq!(dataset.track.boxes.len(), 3);
        assert!(dataset.track.bounds.max_lat > dataset.track.bounds.min_lat);
        assert_eq!(dataset.track.start, dataset.track.shape[0]);
    }

    #[test]
    fn weather_rows_parse_with_defaults() {
        let csv = "\
AIR_TEMP;TRACK_TEMP;HUMIDITY;WIND_SPEED;WIND_DIRECTION;RAIN
26.5;31.0;60;12.0;180;0
;;;;;
";
        let file = write_csv(csv);
        let rows = load_weather(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].temp_c, 26.5);
        assert_eq!(rows[0].humidity, 60);
        // blank row resolves to the paddock defaults
        assert_eq!(rows[1].temp_c, 28.0);
        assert_eq!(rows[1].track_temp_c, 32.0);
    }

    #[test]
    fn results_feed_parses_lap_times() {
        let csv = "\
lap,lap_time_s,sector1_s,sector2_s,sector3_s,top_speed_kph
3,92.41,30.1,31.2,31.11,212.0
4,,30.0,31.0,31.0,
";
        let file = write_csv(csv);
        let feed = load_results(file.path()).unwrap();
        assert_eq!(feed.lap_time_s(3), Some(92.41));
        assert_eq!(feed.lap_time_s(4), None);
    }
}
