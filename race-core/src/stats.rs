// Rolling session statistics over completed laps.
// Sole mutator of the SessionInsights snapshot; everything else reads it.

use crate::buffers::RingBuffer;
use crate::config::EngineConfig;
use crate::model::{LapRecord, SectorBest, SessionInsights};

pub struct SessionStats {
    history: RingBuffer<LapRecord>,
    consistency_window: usize,
    warmup_laps: u32,
    first_lap: u32,
    top_speed_margin: f64,
    insights: SessionInsights,
    last_emitted: Option<SessionInsights>,
}

impl SessionStats {
    pub fn new(config: &EngineConfig, first_lap: u32) -> Self {
        Self {
            history: RingBuffer::new(config.lap_history_window),
            consistency_window: config.consistency_window,
            warmup_laps: config.warmup_laps,
            first_lap,
            top_speed_margin: config.top_speed_margin_kph,
            insights: SessionInsights::default(),
            last_emitted: None,
        }
    }

    /// First lap number counted toward official statistics.
    fn official_from(&self) -> u32 {
        self.first_lap.saturating_add(self.warmup_laps)
    }

    /// Record a completed lap. The authoritative duration wins for
    /// statistics when present; warm-up laps are kept in the history but
    /// excluded from the aggregates.
    pub fn record_lap(&mut self, lap: u32, local_s: Option<f64>, official_s: Option<f64>) {
        let duration_s = official_s.or(local_s).filter(|d| *d > 0.0);
        if duration_s.is_none() {
            return;
        }
        self.history.push(LapRecord {
            lap,
            duration_s,
            official_s,
            provisional: false,
        });
        self.recompute();
    }

    /// Track top speed, gated to laps at or past the warm-up threshold and
    /// a strictly-greater-by-margin comparison against the previous best.
    pub fn observe_speed(&mut self, lap: u32, speed_kph: f64) -> bool {
        if lap < self.official_from() || !speed_kph.is_finite() {
            return false;
        }
        let beats = match self.insights.top_speed_kph {
            Some(best) => speed_kph > best + self.top_speed_margin,
            None => speed_kph > 0.0,
        };
        if beats {
            self.insights.top_speed_kph = Some(speed_kph);
        }
        beats
    }

    pub fn record_pit_stop(&mut self) {
        self.insights.pit_count += 1;
    }

    pub fn set_best_sectors(&mut self, splits: Vec<SectorBest>) {
        self.insights.best_sectors = splits;
    }

    pub fn best_lap_s(&self) -> Option<f64> {
        self.insights.best_lap_s
    }

    pub fn top_speed_kph(&self) -> Option<f64> {
        self.insights.top_speed_kph
    }

    /// Most recent official durations, oldest first.
    pub fn recent_durations(&self, n: usize) -> Vec<f64> {
        self.history
            .tail(n)
            .into_iter()
            .filter(|record| record.lap >= self.official_from())
            .filter_map(|record| record.duration_s)
            .collect()
    }

    /// Current snapshot with a provisional entry for the in-progress lap.
    pub fn snapshot(&self, current_lap: u32) -> SessionInsights {
        let mut insights = self.insights.clone();
        insights.laps = self.history.to_vec_ordered();
        insights.laps.push(LapRecord {
            lap: current_lap,
            duration_s: None,
            official_s: None,
            provisional: true,
        });
        insights
    }

    /// Snapshot only when any aggregate changed since the last emission.
    pub fn take_snapshot_if_changed(&mut self, current_lap: u32) -> Option<SessionInsights> {
        let snapshot = self.snapshot(current_lap);
        if self.last_emitted.as_ref() == Some(&snapshot) {
            return None;
        }
        self.last_emitted = Some(snapshot.clone());
        Some(snapshot)
    }

    fn recompute(&mut self) {
        let official_from = self.official_from();
        let durations: Vec<f64> = self
            .history
            .to_vec_ordered()
            .into_iter()
            .filter(|record| record.lap >= official_from)
            .filter_map(|record| record.duration_s)
            .collect();

        if durations.is_empty() {
            self.insights.best_lap_s = None;
            self.insights.avg_lap_s = None;
            self.insights.consistency_s = None;
            self.insights.latest_vs_best_s = None;
            return;
        }

        let best = durations.iter().copied().fold(f64::INFINITY, f64::min);
        let avg = durations.iter().sum::<f64>() / durations.len() as f64;
        self.insights.best_lap_s = Some(best);
        self.insights.avg_lap_s = Some(avg);
        self.insights.latest_vs_best_s = durations.last().map(|latest| latest - best);

        let window_start = durations.len().saturating_sub(self.consistency_window);
        let window = &durations[window_start..];
        self.insights.consistency_s = if window.len() >= 2 {
            Some(stddev(window))
        } else {
            None
        };
    }
}

fn stddev(values: &[f64]) -> f64 {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values
        .iter()
        .map(|value| {
            let delta = value - mean;
            delta * delta
        })
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}
