// Mission phase + legend -> effective environment for one tick.

use crate::domain::tuning::{LegendConfig, MissionPhase};

/// Length of the intensifying window at the end of a run.
pub const LATE_RAMP_MS: i64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Environment {
    pub wind_force: f64,
    pub wind_variance: f64,
    pub current_bias: f64,
    pub reef_severity: f64,
    /// Additive ingress on top of the baseline rate.
    pub ingress: f64,
    pub heel_risk: f64,
}

/// Last phase whose threshold has passed. Phases are sorted by `t_ms`.
pub fn phase_index(phases: &[MissionPhase], elapsed_ms: i64) -> usize {
    phases
        .iter()
        .take_while(|p| p.t_ms <= elapsed_ms)
        .count()
        .saturating_sub(1)
}

/// 0 until the final minute of the run, then rises linearly to 1.
pub fn late_ramp(elapsed_ms: i64, duration_ms: i64) -> f64 {
    let ramp_start = (duration_ms - LATE_RAMP_MS).max(0);
    ((elapsed_ms - ramp_start) as f64 / LATE_RAMP_MS as f64).clamp(0.0, 1.0)
}

pub fn effective(legend: &LegendConfig, phase: &MissionPhase, ramp: f64) -> Environment {
    let m = &phase.modifiers;
    let base = Environment {
        wind_force: legend.wind_force * m.wind_force.unwrap_or(1.0),
        wind_variance: (legend.wind_variance * m.wind_variance.unwrap_or(1.0)).max(0.0),
        current_bias: legend.current_bias + m.current_bias.unwrap_or(0.0),
        reef_severity: (legend.reef_severity + m.reef_severity.unwrap_or(0.0)).max(0.0),
        ingress: m.ingress.unwrap_or(0.0),
        heel_risk: m.heel_risk.unwrap_or(1.0),
    };

    Environment {
        wind_force: base.wind_force * (1.0 + 0.12 * ramp),
        wind_variance: base.wind_variance * (1.0 + 0.5 * ramp),
        current_bias: base.current_bias + 0.02 * ramp,
        reef_severity: (base.reef_severity + 0.2 * ramp).min(1.0),
        ingress: base.ingress + 0.05 * ramp,
        heel_risk: base.heel_risk * (1.0 + 0.25 * ramp),
    }
}

/// Oscillates around the legend direction; deterministic in server time and seed.
pub fn wind_direction(legend: &LegendConfig, server_time_ms: i64, seed: u32, variance: f64) -> f64 {
    let swing = (server_time_ms as f64 / 1000.0 + f64::from(seed)).sin() * 30.0 * variance;
    wrap_degrees(legend.wind_dir + swing)
}

/// Wraps into [0, 360).
pub fn wrap_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}
