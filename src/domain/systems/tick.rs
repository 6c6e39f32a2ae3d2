//! One authoritative simulation step.
//!
//! `advance` is the whole host tick body: countdown, mission phase, hazard
//! events, intent aggregation, physics, scoring and finalization, applied to
//! the document inside a single transaction. It is pure with respect to its
//! inputs, which is what lets any peer take over the host seat mid-run.

use super::environment::{self, wind_direction};
use super::events;
use super::finalize::{self, TickOutcome};
use super::intents::{self, CrewMakeup};
use super::physics::{self, PhysicsInput};
use super::scoring;
use crate::domain::state::{LobbyState, Phase, PresenceMap, ShipState};
use crate::domain::tuning::{ControlTuning, LegendConfig, MissionPlan};

/// Countdown entered without a start time gets a provisional one this far ahead.
const COUNTDOWN_REFERENCE_MS: i64 = 1_000;

#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    /// Server time of this tick, epoch milliseconds.
    pub now_ms: i64,
    /// Clamped step in seconds.
    pub dt: f64,
    pub legend: &'a LegendConfig,
    pub tuning: &'a ControlTuning,
}

pub fn advance(state: &mut LobbyState, presence: &PresenceMap, ctx: &TickContext<'_>) -> TickOutcome {
    match state.ship.phase {
        Phase::Countdown => {
            run_countdown(&mut state.ship, ctx);
            TickOutcome::Continue
        }
        Phase::Playing => play(state, presence, ctx),
        Phase::Lobby | Phase::Finished => TickOutcome::Continue,
    }
}

fn run_countdown(ship: &mut ShipState, ctx: &TickContext<'_>) {
    if ship.start_timestamp == 0 {
        ship.start_timestamp = ctx.now_ms + COUNTDOWN_REFERENCE_MS;
    }
    if ship.countdown > 0.0 {
        ship.countdown = (ship.countdown - ctx.dt).max(0.0);
    }
    if ship.countdown <= 0.0 {
        ship.phase = Phase::Playing;
        ship.start_timestamp = ctx.now_ms;
        // Calm start: the first hazard waits a full interval.
        ship.last_event_at = ctx.now_ms;
        ship.angular_velocity = 0.0;
        ship.speed = 0.0;
        ship.water = 0.0;
        ship.health = 100.0;
    }
}

fn play(state: &mut LobbyState, presence: &PresenceMap, ctx: &TickContext<'_>) -> TickOutcome {
    let LobbyState { ship, intents, .. } = state;
    let now = ctx.now_ms;
    let plan = MissionPlan::resolve(ship.mission_id, ctx.legend);

    let started = if ship.start_timestamp != 0 {
        ship.start_timestamp
    } else {
        now
    };
    let elapsed = (now - started).max(0);

    // Watermark: the phase never moves backwards during a run.
    let last_phase = plan.phases.len().saturating_sub(1);
    let phase_idx = environment::phase_index(plan.phases, elapsed)
        .max(ship.mission_phase_idx)
        .min(last_phase);
    let phase = &plan.phases[phase_idx];
    ship.mission_phase_idx = phase_idx;
    if ship.mission_phase_name != phase.name {
        ship.mission_phase_name = phase.name.to_string();
    }

    let ramp = environment::late_ramp(elapsed, plan.duration_ms);
    let mut env = environment::effective(ctx.legend, phase, ramp);

    let event_active = events::is_active(ship, now);
    events::maybe_start(ship, now, elapsed);
    if events::is_active(ship, now) {
        if let Some(event) = ship.event_name {
            events::apply_modifiers(&mut env, event, ship.seed, elapsed);
        }
    }

    let wind_dir = wind_direction(ctx.legend, now, ship.seed, env.wind_variance);

    let signals = intents::aggregate(intents, presence, now, ctx.tuning);
    if let Some(until) = signals.lookout_buff_until {
        ship.lookout_buff_until = until;
    }
    let crew = CrewMakeup::from_presence(presence);
    let team = physics::team_multiplier(
        ship.lookout_buff_until > now,
        crew.role_holders,
        crew.distinct_roles,
    );

    physics::integrate(
        ship,
        &PhysicsInput {
            signals: &signals,
            env: &env,
            wind_dir,
            team,
            sea_drag: ctx.legend.sea_drag,
            target: ctx.legend.target_point(),
            elapsed_ms: elapsed,
            event_active,
        },
        ctx.dt,
    );

    let target = scoring::coop_target(intents, presence, &signals, now);
    scoring::converge_coop(ship, target, ctx.dt);
    scoring::record_coop_sample(ship, now);
    scoring::accumulate_stats(ship, intents, presence, now);

    let outcome = finalize::evaluate(ship, elapsed, plan.duration_ms);
    if let TickOutcome::Terminate(reason) = outcome {
        finalize::finalize(ship, reason, now);
    }
    outcome
}
