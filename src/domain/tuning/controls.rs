//! Gameplay tuning for crew controls.
//!
//! Keep this separate from runtime/server configuration (tick rates, ports, etc.).

/// Accepted tap cadence window for rhythm-based roles (bailer, rower).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CadenceBand {
    /// Exclusive lower bound in seconds between taps.
    pub min_secs: f64,
    /// Exclusive upper bound in seconds between taps.
    pub max_secs: f64,
    /// Cadence with full efficiency.
    pub target_secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlTuning {
    pub bailing: CadenceBand,
    pub rowing: CadenceBand,

    /// Time after the last tap over which a rhythm loses all power.
    pub freshness_ms: f64,

    /// How recent a lookout spot must be to (re)arm the team buff.
    pub lookout_recent_ms: i64,

    /// Upper bound on one buff window.
    pub lookout_max_buff_ms: f64,

    /// Buff length per unit of lookout focus.
    pub lookout_focus_scale_ms: f64,

    /// Focus assumed when a lookout never set one.
    pub default_lookout_focus: f64,
}

impl Default for ControlTuning {
    fn default() -> Self {
        Self {
            bailing: CadenceBand {
                min_secs: 0.2,
                max_secs: 1.0,
                target_secs: 0.5,
            },
            rowing: CadenceBand {
                min_secs: 0.3,
                max_secs: 1.2,
                target_secs: 0.6,
            },
            freshness_ms: 2000.0,
            lookout_recent_ms: 5000,
            lookout_max_buff_ms: 10_000.0,
            lookout_focus_scale_ms: 15_000.0,
            default_lookout_focus: 0.5,
        }
    }
}
