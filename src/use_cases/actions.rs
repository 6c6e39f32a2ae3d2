// Player-facing commands: each one is a single transaction on the lobby document.
//
// Connections only ever touch their own presence and intent entries, except for
// the lobby lifecycle commands which rewrite the ship outside of a run.

use crate::domain::state::{Intent, Phase, Role, ShipState};
use crate::domain::tuning::{LegendId, MissionId, MissionPlan};
use crate::domain::{LobbyDocument, Precondition, StoreError};
use std::sync::Arc;

/// Longest countdown a client may request, seconds.
pub const MAX_COUNTDOWN_SECS: f64 = 60.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("cannot {action} while the ship is {phase:?}")]
    InvalidPhase { action: &'static str, phase: Phase },
    #[error("intent field `{0}` must be a finite number")]
    InvalidIntent(&'static str),
    #[error("countdown must be between 0 and 60 seconds, got {0}")]
    InvalidCountdown(f64),
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresencePatch {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Partial intent update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentPatch {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub helm_delta: Option<f64>,
    #[serde(default)]
    pub sail_trim: Option<f64>,
    /// Marks a sail gust response at the current server time.
    #[serde(default)]
    pub sail_gust: bool,
    #[serde(default)]
    pub lookout_focus: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowSide {
    Left,
    Right,
}

fn finite(value: Option<f64>, field: &'static str) -> Result<Option<f64>, ActionError> {
    match value {
        Some(v) if !v.is_finite() => Err(ActionError::InvalidIntent(field)),
        other => Ok(other),
    }
}

fn ensure_idle(ship: &ShipState, action: &'static str) -> Result<(), ActionError> {
    match ship.phase {
        Phase::Lobby | Phase::Finished => Ok(()),
        phase => Err(ActionError::InvalidPhase { action, phase }),
    }
}

/// Command surface of one attached connection.
pub struct PlayerSession<D> {
    conn_id: String,
    document: Arc<D>,
    default_countdown_secs: f64,
}

impl<D: LobbyDocument> PlayerSession<D> {
    pub fn new(conn_id: String, document: Arc<D>, default_countdown_secs: f64) -> Self {
        Self {
            conn_id,
            document,
            default_countdown_secs,
        }
    }

    pub fn conn_id(&self) -> &str {
        &self.conn_id
    }

    pub async fn set_presence(&self, patch: PresencePatch) -> Result<(), ActionError> {
        let conn_id = self.conn_id.clone();
        self.document
            .transact(Precondition::Any, move |state, presence| -> Result<(), ActionError> {
                let entry = presence
                    .get_mut(&conn_id)
                    .ok_or_else(|| ActionError::Store(StoreError::NotJoined(conn_id.clone())))?;
                if let Some(name) = patch.display_name {
                    entry.display_name = name.trim().to_string();
                }
                if let Some(role) = patch.role {
                    entry.role = Some(role);
                    // Keep an existing intent counting under the new role.
                    if let Some(intent) = state.intents.get_mut(&conn_id) {
                        intent.role = role;
                    }
                }
                Ok(())
            })
            .await?
    }

    /// Merges `patch` over this connection's intent (a helmsman one if missing) and stamps it.
    pub async fn set_intent(&self, patch: IntentPatch) -> Result<(), ActionError> {
        let helm_delta = finite(patch.helm_delta, "helmDelta")?;
        let sail_trim = finite(patch.sail_trim, "sailTrim")?;
        let lookout_focus = finite(patch.lookout_focus, "lookoutFocus")?;
        let role = patch.role;
        let sail_gust = patch.sail_gust;

        self.update_intent(Role::Helmsman, move |intent, now| {
            if let Some(role) = role {
                intent.role = role;
            }
            if let Some(delta) = helm_delta {
                intent.helm_delta = delta.clamp(-1.0, 1.0);
            }
            if let Some(trim) = sail_trim {
                intent.sail_trim = trim.clamp(0.0, 1.0);
            }
            if let Some(focus) = lookout_focus {
                intent.lookout_focus = Some(focus.clamp(0.0, 1.0));
            }
            if sail_gust {
                intent.sail_gust_at = Some(now);
            }
        })
        .await
    }

    pub async fn bail_tap(&self) -> Result<(), ActionError> {
        self.update_intent(Role::Bailer, |intent, now| {
            intent.bail_tap_at2 = intent.bail_tap_at1;
            intent.bail_tap_at1 = Some(now);
        })
        .await
    }

    pub async fn row_tap(&self, side: RowSide) -> Result<(), ActionError> {
        self.update_intent(Role::Rower, move |intent, now| match side {
            RowSide::Left => {
                intent.row_left_tap_at2 = intent.row_left_tap_at1;
                intent.row_left_tap_at1 = Some(now);
            }
            RowSide::Right => {
                intent.row_right_tap_at2 = intent.row_right_tap_at1;
                intent.row_right_tap_at1 = Some(now);
            }
        })
        .await
    }

    pub async fn lookout_spot(&self) -> Result<(), ActionError> {
        self.update_intent(Role::Lookout, |intent, now| {
            intent.lookout_ack_at = Some(now)
        })
            .await
    }

    /// A missing intent is created for `new_role` before `apply` runs.
    async fn update_intent<F>(&self, new_role: Role, apply: F) -> Result<(), ActionError>
    where
        F: FnOnce(&mut Intent, i64) + Send + 'static,
    {
        let now = self.document.server_timestamp();
        let conn_id = self.conn_id.clone();
        self.document
            .transact(Precondition::Any, move |state, _| {
                let intent = state
                    .intents
                    .entry(conn_id)
                    .or_insert_with(|| Intent::for_role(new_role));
                apply(intent, now);
                intent.updated_at = now;
            })
            .await?;
        Ok(())
    }

    /// Switches the legend and resets the remaining distance to its target.
    pub async fn set_legend(&self, legend: LegendId) -> Result<(), ActionError> {
        self.document
            .transact(Precondition::Any, move |state, _| -> Result<(), ActionError> {
                let ship = &mut state.ship;
                ensure_idle(ship, "change legend")?;
                ship.legend_id = legend;
                ship.distance_remaining = legend.config().target_distance;
                reset_mission_phase(ship);
                Ok(())
            })
            .await?
    }

    /// `None` selects free sail.
    pub async fn set_mission(&self, mission: Option<MissionId>) -> Result<(), ActionError> {
        self.document
            .transact(Precondition::Any, move |state, _| -> Result<(), ActionError> {
                let ship = &mut state.ship;
                ensure_idle(ship, "change mission")?;
                ship.mission_id = mission;
                reset_mission_phase(ship);
                Ok(())
            })
            .await?
    }

    pub async fn start_countdown(&self, seconds: Option<f64>) -> Result<(), ActionError> {
        let seconds = self.countdown_seconds(seconds)?;
        self.document
            .transact(Precondition::Any, move |state, _| -> Result<(), ActionError> {
                let ship = &mut state.ship;
                if ship.phase != Phase::Lobby {
                    return Err(ActionError::InvalidPhase {
                        action: "start countdown",
                        phase: ship.phase,
                    });
                }
                ship.phase = Phase::Countdown;
                ship.countdown = seconds;
                ship.start_timestamp = 0;
                Ok(())
            })
            .await?
    }

    /// Ends the run without recording an attempt. Returns false if already finished.
    pub async fn force_finish(&self) -> Result<bool, ActionError> {
        let now = self.document.server_timestamp();
        let finished = self
            .document
            .transact(Precondition::Any, move |state, _| {
                let ship = &mut state.ship;
                if ship.phase == Phase::Finished {
                    return false;
                }
                ship.phase = Phase::Finished;
                ship.end_timestamp = now;
                true
            })
            .await?;
        Ok(finished)
    }

    /// Full ship reset into a fresh countdown; the attempt history survives.
    pub async fn restart_mission(&self, seconds: Option<f64>) -> Result<(), ActionError> {
        let seconds = self.countdown_seconds(seconds)?;
        self.document
            .transact(Precondition::Any, move |state, _| {
                state.ship.reset_for_restart(seconds);
                state.intents.clear();
            })
            .await?;
        Ok(())
    }

    fn countdown_seconds(&self, requested: Option<f64>) -> Result<f64, ActionError> {
        let seconds = requested.unwrap_or(self.default_countdown_secs);
        if seconds.is_finite() && (0.0..=MAX_COUNTDOWN_SECS).contains(&seconds) {
            Ok(seconds)
        } else {
            Err(ActionError::InvalidCountdown(seconds))
        }
    }
}

fn reset_mission_phase(ship: &mut ShipState) {
    let plan = MissionPlan::resolve(ship.mission_id, ship.legend_id.config());
    ship.mission_phase_idx = 0;
    ship.mission_phase_name = plan.phases[0].name.to_string();
}
