// Static gameplay tables and tuning knobs.

pub mod controls;
pub mod legend;
pub mod mission;

pub use controls::{CadenceBand, ControlTuning};
pub use legend::{LegendConfig, LegendId};
pub use mission::{Mission, MissionId, MissionPhase, MissionPlan, PhaseModifiers};
