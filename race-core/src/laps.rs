// Lap boundary detection from two independent signals.
// A debounced geofence crossing around the start/finish point, and a
// categorical lap-index transition carried by the dataset. The categorical
// signal wins whenever it fires; the geofence is the fallback for data
// without lap indices.

use crate::config::EngineConfig;
use crate::model::Sample;
use crate::track::{haversine_m, GeoPoint};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LapSignal {
    Categorical,
    Geofence,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LapCrossing {
    pub signal: LapSignal,
    /// Locally timed duration of the lap just completed. Absent on the
    /// first crossing or when timestamps are malformed.
    pub duration_s: Option<f64>,
    /// New lap index reported by the categorical signal.
    pub lap_index: Option<u32>,
}

pub struct LapBoundaryDetector {
    start: GeoPoint,
    enter_m: f64,
    exit_m: f64,
    debounce_s: f64,
    near_start: bool,
    last_cross: Option<f64>,
    last_lap_index: Option<u32>,
    prev_t: Option<f64>,
}

impl LapBoundaryDetector {
    pub fn new(config: &EngineConfig, start: GeoPoint) -> Self {
        Self {
            start,
            enter_m: config.geofence_enter_m,
            exit_m: config.geofence_exit_m,
            debounce_s: config.crossing_debounce_s,
            near_start: false,
            last_cross: None,
            last_lap_index: None,
            prev_t: None,
        }
    }

    /// Evaluate both signals for one tick and reconcile them into at most
    /// one crossing. `now_s` is monotonic session time.
    pub fn evaluate(&mut self, sample: &Sample, now_s: f64) -> Option<LapCrossing> {
        let categorical = self.evaluate_categorical(sample);
        self.prev_t = sample.t.or(self.prev_t);
        let geofence = self.evaluate_geofence(sample, now_s);

        // Categorical precedence: the geometric signal only stands in when
        // the data carries no lap index at all.
        if categorical.is_some() {
            categorical
        } else if sample.lap_index.is_none() {
            geofence
        } else {
            None
        }
    }

    fn evaluate_categorical(&mut self, sample: &Sample) -> Option<LapCrossing> {
        let index = sample.lap_index?;
        let previous = self.last_lap_index.replace(index);
        let crossed = matches!(previous, Some(prev) if index > prev);

        let duration_s = if crossed {
            match (sample.t, self.prev_t) {
                (Some(now), Some(prev)) if now > prev => Some(now - prev),
                _ => None,
            }
        } else {
            None
        };

        if crossed {
            Some(LapCrossing {
                signal: LapSignal::Categorical,
                duration_s,
                lap_index: Some(index),
            })
        } else {
            None
        }
    }

    fn evaluate_geofence(&mut self, sample: &Sample, now_s: f64) -> Option<LapCrossing> {
        let position = GeoPoint::new(sample.lat, sample.long);
        let distance = haversine_m(position, self.start);

        if distance < self.enter_m {
            let debounced = match self.last_cross {
                Some(last) => now_s - last > self.debounce_s,
                None => true,
            };
            if !self.near_start && debounced {
                let duration_s = self.last_cross.map(|last| now_s - last);
                self.last_cross = Some(now_s);
                self.near_start = true;
                return Some(LapCrossing {
                    signal: LapSignal::Geofence,
                    duration_s,
                    lap_index: None,
                });
            }
        } else if distance > self.exit_m {
            self.near_start = false;
        }

        None
    }
}
