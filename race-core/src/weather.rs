// Weather feed cursor and the snapshot damper that keeps noisy sensor
// streams from flickering the dashboard.

use crate::model::WeatherSnapshot;

/// Read-only cursor over pre-parsed weather rows, advanced one step per
/// tick and wrapping at the end.
#[derive(Clone, Debug)]
pub struct WeatherCursor {
    rows: Vec<WeatherSnapshot>,
    index: usize,
}

impl WeatherCursor {
    pub fn new(rows: Vec<WeatherSnapshot>) -> Option<Self> {
        if rows.is_empty() {
            None
        } else {
            Some(Self { rows, index: 0 })
        }
    }

    pub fn advance(&mut self) -> WeatherSnapshot {
        let snapshot = self.rows[self.index];
        self.index = (self.index + 1) % self.rows.len();
        snapshot
    }
}

/// Suppresses snapshot updates below the change threshold; the previous
/// dispatched snapshot is reused verbatim.
#[derive(Clone, Debug)]
pub struct WeatherDamper {
    delta_c: f64,
    last_sent: Option<WeatherSnapshot>,
}

impl WeatherDamper {
    pub fn new(delta_c: f64) -> Self {
        Self {
            delta_c,
            last_sent: None,
        }
    }

    pub fn resolve(&mut self, current: Option<WeatherSnapshot>) -> Option<WeatherSnapshot> {
        match (current, self.last_sent) {
            (Some(snapshot), Some(sent)) => {
                let temp_delta = (snapshot.temp_c - sent.temp_c).abs();
                let track_delta = (snapshot.track_temp_c - sent.track_temp_c).abs();
                if temp_delta < self.delta_c && track_delta < self.delta_c {
                    Some(sent)
                } else {
                    self.last_sent = Some(snapshot);
                    Some(snapshot)
                }
            }
            (Some(snapshot), None) => {
                self.last_sent = Some(snapshot);
                Some(snapshot)
            }
            (None, sent) => sent,
        }
    }
}
