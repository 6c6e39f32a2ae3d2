// One integration step of the ship while playing.

use super::environment::{Environment, wrap_degrees};
use super::intents::ControlSignals;
use crate::domain::state::ShipState;

/// Ships within this many units of the goal have arrived.
pub const ARRIVAL_RADIUS: f64 = 20.0;
pub const MAX_SPEED: f64 = 10.0;

const LOOKOUT_BONUS: f64 = 1.3;
const SMALL_CREW_PENALTY: f64 = 0.7;
const PARTIAL_CREW_PENALTY: f64 = 0.85;
const ROLE_COVERAGE_BONUS: f64 = 1.15;
const MAX_BAILING_RATE: f64 = 0.5;

/// Crew-wide efficiency factor applied to sails and bailing.
pub fn team_multiplier(lookout_buff_active: bool, role_holders: usize, distinct_roles: usize) -> f64 {
    let mut multiplier = if lookout_buff_active { LOOKOUT_BONUS } else { 1.0 };
    if role_holders < 3 {
        multiplier *= SMALL_CREW_PENALTY;
    } else if role_holders < 4 {
        multiplier *= PARTIAL_CREW_PENALTY;
    }
    if distinct_roles >= 4 {
        multiplier *= ROLE_COVERAGE_BONUS;
    }
    multiplier
}

/// Signed angle from the wind to the heading, in (-180, 180].
pub fn relative_wind(heading: f64, wind_dir: f64) -> f64 {
    (heading - wind_dir + 540.0).rem_euclid(360.0) - 180.0
}

/// Peaks on a beam reach (wind at 90 degrees), zero head-to-wind or dead downwind.
pub fn sail_efficiency(relative_abs: f64, team: f64) -> f64 {
    (1.0 - (relative_abs - 90.0).abs() / 90.0).max(0.0) * team
}

pub fn sail_power(sail_eff: f64, trim: f64, wind_force: f64) -> f64 {
    (sail_eff * (1.0 - (sail_eff - trim).abs())).max(0.0) * wind_force
}

/// Baseline water ingress per second before reef, environment and multipliers.
pub fn ingress_rate(elapsed_ms: i64, event_active: bool, heel: f64, speed: f64) -> f64 {
    let minutes = elapsed_ms as f64 / 60_000.0;
    let mut rate = 0.005;
    if minutes > 1.0 {
        rate += 0.002;
    }
    if minutes > 2.5 {
        rate += 0.003;
    }
    if minutes > 4.0 {
        rate += 0.005;
    }
    if event_active {
        rate += 0.015;
    }
    if heel > 60.0 {
        rate += 0.002 * (heel - 60.0) / 40.0;
    }
    if speed > 6.0 {
        rate += 0.001 * (speed - 6.0);
    }
    rate
}

/// Hull damage per second as a fraction of full health.
pub fn health_loss_rate(water: f64, heel: f64, speed: f64, reef: f64, event_active: bool) -> f64 {
    let mut loss = 0.0;
    if water > 50.0 {
        loss += ((water - 50.0) / 50.0).powi(2) * 0.08;
    }
    if heel > 70.0 {
        loss += ((heel - 70.0) / 30.0).powi(2) * 0.05;
    }
    if event_active && reef > 0.3 {
        loss += reef * 0.15;
    }
    if speed > 7.0 && (event_active || heel > 60.0) {
        loss += (speed - 7.0) * 0.02;
    }
    loss
}

/// Everything the integrator needs besides the ship itself.
#[derive(Debug, Clone, Copy)]
pub struct PhysicsInput<'a> {
    pub signals: &'a ControlSignals,
    pub env: &'a Environment,
    pub wind_dir: f64,
    pub team: f64,
    pub sea_drag: f64,
    pub target: (f64, f64),
    pub elapsed_ms: i64,
    /// Event state sampled before this tick could start a new one.
    pub event_active: bool,
}

/// Advances kinematics, heel, water and hull by `dt` seconds.
pub fn integrate(ship: &mut ShipState, input: &PhysicsInput<'_>, dt: f64) {
    let signals = input.signals;
    let env = input.env;

    let relative = relative_wind(ship.heading, input.wind_dir);
    let sail_eff = sail_efficiency(relative.abs(), input.team);
    ship.sail_eff = sail_eff.clamp(0.0, 1.0);
    let power = sail_power(sail_eff, signals.sail_trim, env.wind_force);

    let thrust = power + (signals.row_left + signals.row_right) * 0.7;
    ship.speed = (ship.speed + (thrust * 8.0 - ship.speed * 2.0) * dt).clamp(0.0, MAX_SPEED);

    // Degrees per second.
    let weather_helm = power * 0.3 * if relative > 0.0 { 1.0 } else { -1.0 };
    let mut turn = signals.helm * 60.0
        + weather_helm
        + env.current_bias * 20.0
        + (signals.row_right - signals.row_left) * 30.0;
    turn *= 1.0 - (ship.heel / 100.0).min(1.0) * 0.5;

    ship.angular_velocity += (turn - ship.angular_velocity * 3.0) * dt;
    ship.heading = wrap_degrees(ship.heading + ship.angular_velocity * dt);

    let heel_target = (power * 45.0 * env.heel_risk).min(85.0);
    ship.heel = (ship.heel + (heel_target - ship.heel * 0.8) * dt * 2.0).clamp(0.0, 100.0);

    let heading_rad = ship.heading.to_radians();
    let speed_ms = ship.speed * 0.5;
    ship.vx += heading_rad.sin() * speed_ms * dt;
    ship.vy += heading_rad.cos() * speed_ms * dt;
    ship.x += ship.vx * dt;
    ship.y += ship.vy * dt;
    let drag = input.sea_drag.powf(dt);
    ship.vx *= drag;
    ship.vy *= drag;

    let heel_factor = 1.0 + (ship.heel / 100.0).powf(1.5) * 2.0;
    let speed_factor = 1.0 + ship.speed / MAX_SPEED * 0.8;
    let ingress = (ingress_rate(input.elapsed_ms, input.event_active, ship.heel, ship.speed)
        + env.reef_severity * 0.2
        + env.ingress)
        * heel_factor
        * speed_factor;
    let bailed = signals.bailing * MAX_BAILING_RATE * input.team;
    let net = (ingress - bailed).max(0.0);
    ship.water = (ship.water + net * 100.0 * dt).clamp(0.0, 100.0);

    let loss = health_loss_rate(
        ship.water,
        ship.heel,
        ship.speed,
        env.reef_severity,
        input.event_active,
    );
    ship.health = (ship.health - loss * dt * 100.0).clamp(0.0, 100.0);

    let (tx, ty) = input.target;
    let distance = (ship.x - tx).hypot(ship.y - ty);
    ship.distance_remaining = (distance - ARRIVAL_RADIUS).max(0.0);
}
