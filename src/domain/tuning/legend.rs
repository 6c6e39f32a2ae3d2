//! Static scenario tables ("legends").
//!
//! Each legend fixes the base sea conditions a run starts from. Mission phases
//! and hazard events modify these values at runtime; the tables themselves
//! never change.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const FIVE_MINUTES_MS: i64 = 5 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegendId {
    OpenSea,
    CrosswindReefs,
    StormRun,
    SinkingShip,
}

impl LegendId {
    pub const ALL: [LegendId; 4] = [
        LegendId::OpenSea,
        LegendId::CrosswindReefs,
        LegendId::StormRun,
        LegendId::SinkingShip,
    ];

    pub fn config(self) -> &'static LegendConfig {
        match self {
            LegendId::OpenSea => &OPEN_SEA,
            LegendId::CrosswindReefs => &CROSSWIND_REEFS,
            LegendId::StormRun => &STORM_RUN,
            LegendId::SinkingShip => &SINKING_SHIP,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LegendId::OpenSea => "open_sea",
            LegendId::CrosswindReefs => "crosswind_reefs",
            LegendId::StormRun => "storm_run",
            LegendId::SinkingShip => "sinking_ship",
        }
    }
}

impl fmt::Display for LegendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown legend `{0}`")]
pub struct UnknownLegend(pub String);

impl FromStr for LegendId {
    type Err = UnknownLegend;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        LegendId::ALL
            .into_iter()
            .find(|id| id.as_str() == value)
            .ok_or_else(|| UnknownLegend(value.to_string()))
    }
}

/// Base environment of a legend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegendConfig {
    pub id: LegendId,
    pub name: &'static str,
    /// Per-second velocity retention; higher keeps momentum longer.
    pub sea_drag: f64,
    /// Degrees, 0..360.
    pub wind_dir: f64,
    /// 0..1.
    pub wind_force: f64,
    /// 0..1 amplitude of the wind direction oscillation.
    pub wind_variance: f64,
    /// Drift in degrees per second (scaled by 20 in the turn rate).
    pub current_bias: f64,
    /// Extra water ingress factor and reef damage driver.
    pub reef_severity: f64,
    pub max_duration_ms: i64,
    /// Abstract meters along +x to the goal.
    pub target_distance: f64,
}

impl LegendConfig {
    /// Goal position; the run starts at the origin.
    pub fn target_point(&self) -> (f64, f64) {
        (self.target_distance, 0.0)
    }
}

pub static OPEN_SEA: LegendConfig = LegendConfig {
    id: LegendId::OpenSea,
    name: "Open Sea (Calm)",
    sea_drag: 0.85,
    wind_dir: 60.0,
    wind_force: 0.35,
    wind_variance: 0.1,
    current_bias: 0.0,
    reef_severity: 0.0,
    max_duration_ms: FIVE_MINUTES_MS,
    target_distance: 1000.0,
};

pub static CROSSWIND_REEFS: LegendConfig = LegendConfig {
    id: LegendId::CrosswindReefs,
    name: "Crosswind Reefs",
    sea_drag: 0.7,
    wind_dir: 90.0,
    wind_force: 0.55,
    wind_variance: 0.2,
    current_bias: 0.05,
    reef_severity: 0.5,
    max_duration_ms: FIVE_MINUTES_MS,
    target_distance: 1400.0,
};

pub static STORM_RUN: LegendConfig = LegendConfig {
    id: LegendId::StormRun,
    name: "Storm Run",
    sea_drag: 0.6,
    wind_dir: 120.0,
    wind_force: 0.9,
    wind_variance: 0.35,
    current_bias: 0.08,
    reef_severity: 0.2,
    max_duration_ms: FIVE_MINUTES_MS,
    target_distance: 1200.0,
};

pub static SINKING_SHIP: LegendConfig = LegendConfig {
    id: LegendId::SinkingShip,
    name: "Sinking Ship Challenge",
    sea_drag: 0.9,
    wind_dir: 45.0,
    wind_force: 0.45,
    wind_variance: 0.3,
    current_bias: 0.03,
    // Shorter distance, heavy reef damage.
    reef_severity: 0.8,
    max_duration_ms: FIVE_MINUTES_MS,
    target_distance: 800.0,
};
