// Authoritative per-lap results used to override locally timed durations
// in the session statistics.

use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LapResult {
    pub lap_time_s: Option<f64>,
    pub sector1_s: Option<f64>,
    pub sector2_s: Option<f64>,
    pub sector3_s: Option<f64>,
    pub top_speed_kph: Option<f64>,
}

#[derive(Clone, Debug, Default)]
pub struct ResultsFeed {
    laps: HashMap<u32, LapResult>,
}

impl ResultsFeed {
    pub fn new(laps: HashMap<u32, LapResult>) -> Self {
        Self { laps }
    }

    pub fn insert(&mut self, lap: u32, result: LapResult) {
        self.laps.insert(lap, result);
    }

    pub fn is_empty(&self) -> bool {
        self.laps.is_empty()
    }

    /// Authoritative lap duration, only when present and positive.
    pub fn lap_time_s(&self, lap: u32) -> Option<f64> {
        self.laps
            .get(&lap)
            .and_then(|result| result.lap_time_s)
            .filter(|duration| *duration > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_durations_are_ignored() {
        let mut feed = ResultsFeed::default();
        feed.insert(
            3,
            LapResult {
                lap_time_s: Some(0.0),
                ..Default::default()
            },
        );
        feed.insert(
            4,
            LapResult {
                lap_time_s: Some(92.4),
                ..Default::default()
            },
        );
        assert_eq!(feed.lap_time_s(3), None);
        assert_eq!(feed.lap_time_s(4), Some(92.4));
        assert_eq!(feed.lap_time_s(99), None);
    }
}
