// Replicated lobby document: ship state, per-connection intents and presence.
// Field names serialize in camelCase because browser clients read the same document.

use super::tuning::{LegendId, MissionId, MissionPlan};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Crew roles a connection can claim through presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Helmsman,
    Sail,
    Bailer,
    Rower,
    Lookout,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Helmsman,
        Role::Sail,
        Role::Bailer,
        Role::Rower,
        Role::Lookout,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Lobby,
    Countdown,
    Playing,
    Finished,
}

/// Scripted hazard events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardEvent {
    FloodSpike,
    GustSquall,
    CrossSet,
    BroachRisk,
    HullBreach,
    SuddenWindShift,
    SteeringFailure,
}

impl HazardEvent {
    /// Maps a uniform roll in [0,1] onto an event via fixed cumulative thresholds.
    pub fn from_roll(roll: f64) -> Self {
        if roll < 0.15 {
            HazardEvent::FloodSpike
        } else if roll < 0.3 {
            HazardEvent::GustSquall
        } else if roll < 0.45 {
            HazardEvent::CrossSet
        } else if roll < 0.6 {
            HazardEvent::BroachRisk
        } else if roll < 0.75 {
            HazardEvent::HullBreach
        } else if roll < 0.9 {
            HazardEvent::SuddenWindShift
        } else {
            HazardEvent::SteeringFailure
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptReason {
    Success,
    Timeout,
    Overflow,
    Dead,
}

impl AttemptReason {
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptReason::Success => "success",
            AttemptReason::Timeout => "timeout",
            AttemptReason::Overflow => "overflow",
            AttemptReason::Dead => "dead",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Penalties {
    pub reef_hits: u32,
    pub broaches: u32,
    pub overflow: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptStats {
    pub max_water: f64,
    pub min_health: f64,
    pub avg_coop_score: f64,
    pub active_players: u32,
    pub end_health: f64,
    pub end_water: f64,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamPerformance {
    pub most_active: String,
    pub best_responder: String,
    pub total_switches: u32,
}

/// One finished run. Appended once, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptLogEntry {
    pub at: i64,
    pub finished_at: i64,
    pub dist_left: f64,
    pub reason: AttemptReason,
    pub stats: AttemptStats,
    pub team_perf: TeamPerformance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerActivity {
    pub display_name: String,
    pub actions: u32,
    pub last_active: i64,
}

/// Running statistics for the attempt in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub max_water: f64,
    pub min_health: f64,
    pub coop_score_sum: f64,
    pub coop_samples: u32,
    pub player_actions: BTreeMap<String, PlayerActivity>,
    pub start_time: i64,
}

impl RunStats {
    pub fn new(start_time: i64) -> Self {
        Self {
            max_water: 0.0,
            min_health: 100.0,
            coop_score_sum: 0.0,
            coop_samples: 0,
            player_actions: BTreeMap::new(),
            start_time,
        }
    }
}

/// The authoritative simulation entity. Only the elected host writes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipState {
    pub phase: Phase,
    pub legend_id: LegendId,
    /// `None` sails the legend without a mission script.
    pub mission_id: Option<MissionId>,
    pub mission_phase_idx: usize,
    pub mission_phase_name: String,

    pub event_name: Option<HazardEvent>,
    pub event_until: i64,
    pub last_event_at: i64,

    /// Seconds left before play starts.
    pub countdown: f64,
    pub start_timestamp: i64,
    pub end_timestamp: i64,

    pub heading: f64,
    pub angular_velocity: f64,
    pub speed: f64,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,

    pub health: f64,
    pub water: f64,
    pub heel: f64,
    pub sail_eff: f64,
    pub distance_remaining: f64,

    pub coop_score: f64,
    pub coop_curve: Vec<(i64, f64)>,
    pub penalties: Penalties,

    pub attempts: u32,
    pub attempt_log: Vec<AttemptLogEntry>,
    pub current_attempt_stats: Option<RunStats>,
    pub lookout_buff_until: i64,
    pub seed: u32,
}

impl ShipState {
    pub fn new(legend_id: LegendId, mission_id: Option<MissionId>, seed: u32) -> Self {
        let legend = legend_id.config();
        let plan = MissionPlan::resolve(mission_id, legend);
        Self {
            phase: Phase::Lobby,
            legend_id,
            mission_id,
            mission_phase_idx: 0,
            mission_phase_name: plan.phases[0].name.to_string(),
            event_name: None,
            event_until: 0,
            last_event_at: 0,
            countdown: 3.0,
            start_timestamp: 0,
            end_timestamp: 0,
            heading: 0.0,
            angular_velocity: 0.0,
            speed: 0.0,
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            health: 100.0,
            water: 0.0,
            heel: 0.0,
            sail_eff: 0.0,
            distance_remaining: legend.target_distance,
            coop_score: 100.0,
            coop_curve: Vec::new(),
            penalties: Penalties::default(),
            attempts: 0,
            attempt_log: Vec::new(),
            current_attempt_stats: None,
            lookout_buff_until: 0,
            seed,
        }
    }

    /// Resets everything a new attempt needs while keeping the attempt history,
    /// the scenario selection and the seed.
    pub fn reset_for_restart(&mut self, countdown_secs: f64) {
        let attempts = self.attempts;
        let attempt_log = std::mem::take(&mut self.attempt_log);
        *self = ShipState {
            attempts,
            attempt_log,
            ..ShipState::new(self.legend_id, self.mission_id, self.seed)
        };
        self.phase = Phase::Countdown;
        self.countdown = countdown_secs;
    }
}

/// Latest control input of one connection, merged in place by its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub role: Role,
    pub updated_at: i64,
    pub helm_delta: f64,
    pub sail_trim: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sail_gust_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bail_tap_at1: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bail_tap_at2: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_left_tap_at1: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_left_tap_at2: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_right_tap_at1: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_right_tap_at2: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookout_ack_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookout_focus: Option<f64>,
}

impl Intent {
    pub fn for_role(role: Role) -> Self {
        Self {
            role,
            ..Self::default()
        }
    }
}

impl Default for Intent {
    fn default() -> Self {
        Self {
            role: Role::Helmsman,
            updated_at: 0,
            helm_delta: 0.0,
            sail_trim: 0.5,
            sail_gust_at: None,
            bail_tap_at1: None,
            bail_tap_at2: None,
            row_left_tap_at1: None,
            row_left_tap_at2: None,
            row_right_tap_at1: None,
            row_right_tap_at2: None,
            lookout_ack_at: None,
            lookout_focus: None,
        }
    }
}

/// Ordered map keeps iteration stable so every peer aggregates identically.
pub type IntentsByConn = BTreeMap<String, Intent>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    pub display_name: String,
    pub role: Option<Role>,
}

pub type PresenceMap = BTreeMap<String, Presence>;

/// Full shared document of one lobby.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyState {
    pub host_connection_id: String,
    pub ship: ShipState,
    pub intents: IntentsByConn,
}

impl LobbyState {
    pub fn new(legend_id: LegendId, mission_id: Option<MissionId>, seed: u32) -> Self {
        Self {
            host_connection_id: String::new(),
            ship: ShipState::new(legend_id, mission_id, seed),
            intents: IntentsByConn::new(),
        }
    }
}
