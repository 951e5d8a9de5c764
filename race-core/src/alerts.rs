// Rule-based coaching alerts and the priority-ordered tip chain.
// Threshold rules are independent: every matching rule fires in the same
// tick. The tip chain is strict first-match.

use crate::model::{Alert, AlertSeverity, WeatherSnapshot};

/// Fully resolved tick state the rules evaluate against.
#[derive(Clone, Debug, Default)]
pub struct TickContext {
    pub speed: f64,
    pub rpm: f64,
    pub throttle: f64,
    pub brake: f64,
    pub g_lat: f64,
    /// Resolved speed of the previous tick.
    pub prev_speed: f64,
    pub tire_health: f64,
    pub front_tire_avg: f64,
    pub rear_tire_avg: f64,
    pub weather: Option<WeatherSnapshot>,
    pub lap: u32,
    pub lap_finished: bool,
    /// Locally timed duration of the lap completed this tick.
    pub lap_duration_s: Option<f64>,
    pub session_best_s: Option<f64>,
    /// Most recent completed lap durations, oldest first.
    pub recent_laps: Vec<f64>,
    pub new_top_speed: bool,
}

struct Rule {
    severity: AlertSeverity,
    msg: &'static str,
    check: fn(&TickContext) -> bool,
}

const RULES: &[Rule] = &[
    Rule {
        severity: AlertSeverity::Warn,
        msg: "Heavy braking sustained; lift sooner to save brakes.",
        check: |ctx| ctx.brake > 85.0 && ctx.speed > 80.0,
    },
    Rule {
        severity: AlertSeverity::Info,
        msg: "Separate brake and throttle to reduce scrub.",
        check: |ctx| ctx.brake > 30.0 && ctx.throttle > 20.0,
    },
    Rule {
        severity: AlertSeverity::Info,
        msg: "Carry more mid-corner speed; open steering earlier.",
        check: |ctx| ctx.g_lat.abs() > 1.2 && ctx.speed < 90.0,
    },
    Rule {
        severity: AlertSeverity::Warn,
        msg: "Ease throttle to prevent over-rotation.",
        check: |ctx| ctx.g_lat.abs() > 1.6 && ctx.throttle > 40.0,
    },
    Rule {
        severity: AlertSeverity::Warn,
        msg: "Peak lateral load; unwind steering sooner.",
        check: |ctx| ctx.g_lat.abs() > 1.8,
    },
    Rule {
        severity: AlertSeverity::Info,
        msg: "Feed throttle earlier on exit to recover speed.",
        check: |ctx| ctx.throttle < 35.0 && ctx.brake < 5.0 && ctx.prev_speed - ctx.speed > 8.0,
    },
    Rule {
        severity: AlertSeverity::Warn,
        msg: "High RPM; upshift sooner to protect engine.",
        check: |ctx| ctx.rpm > 7200.0,
    },
    Rule {
        severity: AlertSeverity::Info,
        msg: "Short-shift to reduce tire slip.",
        check: |ctx| ctx.tire_health < 85.0 && ctx.rpm > 6500.0,
    },
    Rule {
        severity: AlertSeverity::Info,
        msg: "Tire wear emerging - manage inputs.",
        check: |ctx| ctx.tire_health < 90.0,
    },
    Rule {
        severity: AlertSeverity::Warn,
        msg: "Fronts wearing faster; release brake earlier or bias rearward.",
        check: |ctx| ctx.brake > 80.0 && ctx.front_tire_avg + 5.0 < ctx.rear_tire_avg,
    },
    Rule {
        severity: AlertSeverity::Info,
        msg: "Hot track; back off 5% entry to save tires.",
        check: |ctx| {
            matches!(ctx.weather, Some(w) if w.track_temp_c > 40.0) && ctx.tire_health < 80.0
        },
    },
    Rule {
        severity: AlertSeverity::Warn,
        msg: "Rain detected; extend brake zones and smooth throttle.",
        check: |ctx| matches!(ctx.weather, Some(w) if w.rain > 0),
    },
    Rule {
        severity: AlertSeverity::Info,
        msg: "High wind; expect aero loss in fast corners.",
        check: |ctx| matches!(ctx.weather, Some(w) if w.wind_kph > 15.0),
    },
];

struct Tip {
    check: fn(&TickContext) -> bool,
    render: fn(&TickContext) -> String,
}

// Evaluated top to bottom; the first matching entry wins.
const TIP_CHAIN: &[Tip] = &[
    Tip {
        check: |ctx| ctx.brake > 50.0 && ctx.throttle > 30.0,
        render: |_| "Blend off brake before throttle to reduce tire scrub.".to_string(),
    },
    Tip {
        check: |ctx| ctx.g_lat.abs() > 1.2 && ctx.speed < 80.0,
        render: |_| "Carry a touch more mid-corner speed; open steering sooner.".to_string(),
    },
    Tip {
        check: |ctx| ctx.tire_health < 85.0,
        render: |_| "Back off 5% entry speed to save fronts for the stint.".to_string(),
    },
    Tip {
        check: |ctx| ctx.lap_finished && ctx.lap_duration_s.is_none(),
        render: |ctx| format!("Lap {} complete. Compare sector deltas.", ctx.lap),
    },
];

/// Single coaching tip from the priority chain, if any predicate holds.
pub fn coaching_tip(ctx: &TickContext) -> Option<String> {
    TIP_CHAIN
        .iter()
        .find(|tip| (tip.check)(ctx))
        .map(|tip| (tip.render)(ctx))
}

/// Evaluate the full rule set for one tick. Returns the alert list and the
/// chosen coaching tip; the output is never empty.
pub fn evaluate(ctx: &TickContext) -> (Vec<Alert>, Option<String>) {
    let mut alerts: Vec<Alert> = RULES
        .iter()
        .filter(|rule| (rule.check)(ctx))
        .map(|rule| Alert::new(rule.msg, rule.severity))
        .collect();

    if let Some(duration) = ctx.lap_duration_s {
        alerts.push(Alert::new(
            format!("Lap {} complete in {:.1}s", ctx.lap, duration),
            AlertSeverity::Success,
        ));
        if let Some(best) = ctx.session_best_s {
            let delta = duration - best;
            if delta > 1.0 {
                alerts.push(Alert::new(
                    format!("Off best by {:.1}s; focus on earlier throttle at exit.", delta),
                    AlertSeverity::Info,
                ));
            }
        }
        if ctx.recent_laps.len() >= 3 {
            let recent = &ctx.recent_laps[ctx.recent_laps.len() - 3..];
            let spread = recent.iter().copied().fold(f64::MIN, f64::max)
                - recent.iter().copied().fold(f64::MAX, f64::min);
            if spread > 0.8 {
                alerts.push(Alert::new(
                    "Lap variance high; stabilize braking points.",
                    AlertSeverity::Info,
                ));
            }
        }
    }

    if ctx.new_top_speed && ctx.speed > 120.0 {
        alerts.push(Alert::new(
            format!("New top speed {:.1} km/h", ctx.speed),
            AlertSeverity::Success,
        ));
    }

    let tip = coaching_tip(ctx);
    if let Some(tip_text) = &tip {
        alerts.push(Alert::new(tip_text.clone(), AlertSeverity::Info));
    }

    if alerts.is_empty() {
        alerts.push(Alert::new(
            "Pace steady. Look for brake markers.",
            AlertSeverity::Info,
        ));
    }

    (alerts, tip)
}
