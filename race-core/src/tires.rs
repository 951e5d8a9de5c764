// Four-corner heuristic tire wear model.
// Monotone decreasing within a session; reset is the only increase path.

use serde::Serialize;

const CORNER_LOAD_PER_G: f64 = 0.02;
const REAR_CORNER_FACTOR: f64 = 0.9;
const BRAKE_LOAD_PER_PCT: f64 = 0.01;
const BRAKE_WEAR_FACTOR: f64 = 0.25;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TireSet {
    pub fl: f64,
    pub fr: f64,
    pub rl: f64,
    pub rr: f64,
}

impl Default for TireSet {
    fn default() -> Self {
        Self {
            fl: 100.0,
            fr: 100.0,
            rl: 100.0,
            rr: 100.0,
        }
    }
}

impl TireSet {
    /// Decay wear from one tick of braking and lateral load. Positive
    /// lateral g loads the left side, negative the right.
    pub fn apply_loads(&mut self, brake_pct: f64, lateral_g: f64) {
        let brake_load = brake_pct * BRAKE_LOAD_PER_PCT;
        let corner_load = lateral_g.abs() * CORNER_LOAD_PER_G;

        if lateral_g >= 0.0 {
            self.fl = (self.fl - corner_load).max(0.0);
            self.rl = (self.rl - corner_load * REAR_CORNER_FACTOR).max(0.0);
        } else {
            self.fr = (self.fr - corner_load).max(0.0);
            self.rr = (self.rr - corner_load * REAR_CORNER_FACTOR).max(0.0);
        }

        let brake_wear = brake_load * BRAKE_WEAR_FACTOR;
        self.fl = (self.fl - brake_wear).max(0.0);
        self.fr = (self.fr - brake_wear).max(0.0);
        self.rl = (self.rl - brake_wear).max(0.0);
        self.rr = (self.rr - brake_wear).max(0.0);
    }

    /// Mean of the four wheels, rounded to 2 decimals.
    pub fn health(&self) -> f64 {
        let mean = (self.fl + self.fr + self.rl + self.rr) / 4.0;
        (mean * 100.0).round() / 100.0
    }

    pub fn front_avg(&self) -> f64 {
        (self.fl + self.fr) / 2.0
    }

    pub fn rear_avg(&self) -> f64 {
        (self.rl + self.rr) / 2.0
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn left_side_wears_under_positive_lateral_g() {
        let mut tires = TireSet::default();
        tires.apply_loads(0.0, 1.5);
        assert!(tires.fl < 100.0);
        assert!(tires.rl < 100.0);
        assert!(tires.rl > tires.fl);
        assert_eq!(tires.fr, 100.0);
        assert_eq!(tires.rr, 100.0);
    }

    #[test]
    fn braking_wears_all_four() {
        let mut tires = TireSet::default();
        tires.apply_loads(80.0, -0.5);
        assert!(tires.fl < 100.0);
        assert!(tires.fr < 100.0);
        assert!(tires.rl < 100.0);
        assert!(tires.rr < 100.0);
        // right side carries the cornering wear on top of the brake wear
        assert!(tires.fr < tires.fl);
    }

    #[test]
    fn wear_clamps_at_zero() {
        let mut tires = TireSet::default();
        for _ in 0..100_000 {
            tires.apply_loads(100.0, 2.5);
        }
        assert_eq!(tires.fl, 0.0);
        assert_eq!(tires.fr, 0.0);
        assert_eq!(tires.rl, 0.0);
        assert_eq!(tires.rr, 0.0);
        assert_eq!(tires.health(), 0.0);
    }

    #[test]
    fn health_rounds_to_two_decimals() {
        let tires = TireSet {
            fl: 99.111,
            fr: 99.111,
            rl: 99.111,
            rr: 99.111,
        };
        assert_eq!(tires.health(), 99.11);
    }

    proptest! {
        #[test]
        fn wear_stays_bounded_and_non_increasing(
            loads in proptest::collection::vec((0.0f64..=100.0, -3.0f64..=3.0), 1..200)
        ) {
            let mut tires = TireSet::default();
            let mut prev = tires;
            for (brake, lat_g) in loads {
                tires.apply_loads(brake, lat_g);
                for (wheel, before) in [
                    (tires.fl, prev.fl),
                    (tires.fr, prev.fr),
                    (tires.rl, prev.rl),
                    (tires.rr, prev.rr),
                ] {
                    prop_assert!((0.0..=100.0).contains(&wheel));
                    prop_assert!(wheel <= before);
                }
                prev = tires;
            }
        }
    }
}
