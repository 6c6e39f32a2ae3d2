//! Mission scripts: time-indexed phases that modify the legend environment.

use super::legend::LegendConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const FIVE_MINUTES_MS: i64 = 5 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionId {
    MaidenVoyage,
    ChannelDash,
    SurvivalChallenge,
}

impl MissionId {
    pub const ALL: [MissionId; 3] = [
        MissionId::MaidenVoyage,
        MissionId::ChannelDash,
        MissionId::SurvivalChallenge,
    ];

    pub fn mission(self) -> &'static Mission {
        match self {
            MissionId::MaidenVoyage => &MAIDEN_VOYAGE,
            MissionId::ChannelDash => &CHANNEL_DASH,
            MissionId::SurvivalChallenge => &SURVIVAL_CHALLENGE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MissionId::MaidenVoyage => "maiden_voyage",
            MissionId::ChannelDash => "channel_dash",
            MissionId::SurvivalChallenge => "survival_challenge",
        }
    }
}

impl fmt::Display for MissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mission `{0}`")]
pub struct UnknownMission(pub String);

impl FromStr for MissionId {
    type Err = UnknownMission;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        MissionId::ALL
            .into_iter()
            .find(|id| id.as_str() == value)
            .ok_or_else(|| UnknownMission(value.to_string()))
    }
}

/// Phase modifiers. Multipliers default to 1, additive terms to 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseModifiers {
    pub wind_force: Option<f64>,
    pub wind_variance: Option<f64>,
    pub current_bias: Option<f64>,
    pub reef_severity: Option<f64>,
    pub ingress: Option<f64>,
    pub heel_risk: Option<f64>,
}

impl PhaseModifiers {
    pub const NONE: PhaseModifiers = PhaseModifiers {
        wind_force: None,
        wind_variance: None,
        current_bias: None,
        reef_severity: None,
        ingress: None,
        heel_risk: None,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissionPhase {
    /// Milliseconds since run start at which the phase activates.
    pub t_ms: i64,
    pub name: &'static str,
    pub modifiers: PhaseModifiers,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mission {
    pub id: MissionId,
    pub name: &'static str,
    pub duration_ms: i64,
    /// Sorted by `t_ms` ascending; the first phase starts at 0.
    pub phases: &'static [MissionPhase],
}

/// Phases and duration actually used for a run.
#[derive(Debug, Clone, Copy)]
pub struct MissionPlan {
    pub phases: &'static [MissionPhase],
    pub duration_ms: i64,
}

impl MissionPlan {
    /// Free sail (no mission) runs the legend environment for its full duration.
    pub fn resolve(mission: Option<MissionId>, legend: &LegendConfig) -> Self {
        match mission {
            Some(id) => {
                let mission = id.mission();
                Self {
                    phases: mission.phases,
                    duration_ms: mission.duration_ms,
                }
            }
            None => Self {
                phases: &FREE_SAIL_PHASES,
                duration_ms: legend.max_duration_ms,
            },
        }
    }
}

const fn phase(t_ms: i64, name: &'static str, modifiers: PhaseModifiers) -> MissionPhase {
    MissionPhase {
        t_ms,
        name,
        modifiers,
    }
}

const NONE: PhaseModifiers = PhaseModifiers::NONE;

pub static FREE_SAIL_PHASES: [MissionPhase; 1] = [phase(0, "Open Water", NONE)];

pub static MAIDEN_VOYAGE: Mission = Mission {
    id: MissionId::MaidenVoyage,
    name: "Maiden Voyage",
    duration_ms: FIVE_MINUTES_MS,
    phases: &[
        phase(0, "Calm Start", PhaseModifiers { wind_force: Some(0.9), wind_variance: Some(0.7), reef_severity: Some(0.05), ..NONE }),
        phase(15_000, "Gentle Breeze", PhaseModifiers { wind_force: Some(1.0), wind_variance: Some(0.8), reef_severity: Some(0.1), ..NONE }),
        phase(30_000, "Light Chop", PhaseModifiers { ingress: Some(0.03), reef_severity: Some(0.2), wind_force: Some(1.1), ..NONE }),
        phase(60_000, "Steady Wind", PhaseModifiers { wind_force: Some(1.2), wind_variance: Some(1.0), heel_risk: Some(1.1), ..NONE }),
        phase(90_000, "Cross Current", PhaseModifiers { current_bias: Some(0.05), wind_force: Some(1.25), ..NONE }),
        phase(120_000, "Moderate Seas", PhaseModifiers { reef_severity: Some(0.4), ingress: Some(0.04), wind_variance: Some(1.2), ..NONE }),
        phase(160_000, "Rising Wind", PhaseModifiers { wind_force: Some(1.4), wind_variance: Some(1.3), heel_risk: Some(1.2), ..NONE }),
        phase(200_000, "Squall Approach", PhaseModifiers { wind_force: Some(1.5), wind_variance: Some(1.4), heel_risk: Some(1.25), ingress: Some(0.05), ..NONE }),
        phase(240_000, "Storm Building", PhaseModifiers { wind_force: Some(1.6), wind_variance: Some(1.5), heel_risk: Some(1.3), reef_severity: Some(0.5), ..NONE }),
        phase(270_000, "Final Challenge", PhaseModifiers { wind_force: Some(1.65), wind_variance: Some(1.6), heel_risk: Some(1.35), reef_severity: Some(0.6), ..NONE }),
    ],
};

pub static CHANNEL_DASH: Mission = Mission {
    id: MissionId::ChannelDash,
    name: "Channel Dash",
    duration_ms: FIVE_MINUTES_MS,
    phases: &[
        phase(0, "Steady Start", PhaseModifiers { wind_force: Some(1.0), ..NONE }),
        phase(22_000, "Channel Entry", PhaseModifiers { reef_severity: Some(0.2), ingress: Some(0.02), ..NONE }),
        phase(45_000, "Beam Wind", PhaseModifiers { wind_force: Some(1.15), wind_variance: Some(1.1), ..NONE }),
        phase(75_000, "First Narrows", PhaseModifiers { current_bias: Some(0.06), reef_severity: Some(0.3), ..NONE }),
        phase(105_000, "Mid Channel", PhaseModifiers { wind_variance: Some(1.3), ingress: Some(0.03), ..NONE }),
        phase(140_000, "Reef Section", PhaseModifiers { reef_severity: Some(0.5), ingress: Some(0.04), ..NONE }),
        phase(175_000, "Wind Funnel", PhaseModifiers { wind_force: Some(1.35), heel_risk: Some(1.2), ..NONE }),
        phase(210_000, "Gusty Stretch", PhaseModifiers { wind_force: Some(1.4), wind_variance: Some(1.4), heel_risk: Some(1.25), ..NONE }),
        phase(240_000, "Channel Exit", PhaseModifiers { wind_force: Some(1.45), wind_variance: Some(1.5), current_bias: Some(0.08), ..NONE }),
        phase(270_000, "Final Sprint", PhaseModifiers { wind_force: Some(1.5), wind_variance: Some(1.6), heel_risk: Some(1.3), ..NONE }),
    ],
};

pub static SURVIVAL_CHALLENGE: Mission = Mission {
    id: MissionId::SurvivalChallenge,
    name: "Survival Challenge",
    duration_ms: FIVE_MINUTES_MS,
    phases: &[
        phase(0, "Initial Damage", PhaseModifiers { ingress: Some(0.08), reef_severity: Some(0.3), ..NONE }),
        phase(30_000, "Water Rising", PhaseModifiers { ingress: Some(0.12), reef_severity: Some(0.4), wind_force: Some(1.1), ..NONE }),
        phase(60_000, "Hull Stress", PhaseModifiers { ingress: Some(0.15), heel_risk: Some(1.2), wind_variance: Some(1.3), ..NONE }),
        phase(90_000, "Structural Issues", PhaseModifiers { ingress: Some(0.18), reef_severity: Some(0.6), wind_force: Some(1.25), ..NONE }),
        phase(120_000, "Critical State", PhaseModifiers { ingress: Some(0.22), heel_risk: Some(1.3), wind_variance: Some(1.4), ..NONE }),
        phase(150_000, "Emergency Measures", PhaseModifiers { ingress: Some(0.26), reef_severity: Some(0.7), wind_force: Some(1.35), ..NONE }),
        phase(180_000, "Ship Failing", PhaseModifiers { ingress: Some(0.30), heel_risk: Some(1.4), wind_variance: Some(1.6), ..NONE }),
        phase(210_000, "Desperate Times", PhaseModifiers { ingress: Some(0.34), reef_severity: Some(0.8), wind_force: Some(1.45), ..NONE }),
        phase(240_000, "Final Minutes", PhaseModifiers { ingress: Some(0.38), heel_risk: Some(1.5), wind_variance: Some(1.7), ..NONE }),
        phase(270_000, "Last Chance", PhaseModifiers { ingress: Some(0.42), reef_severity: Some(0.9), wind_force: Some(1.55), ..NONE }),
    ],
};
