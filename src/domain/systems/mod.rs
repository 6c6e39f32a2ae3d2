// Simulation systems, in tick order.

pub mod clock;
pub mod environment;
pub mod events;
pub mod finalize;
pub mod host;
pub mod intents;
pub mod physics;
pub mod scoring;
pub mod tick;

pub use clock::TickClock;
pub use finalize::TickOutcome;
pub use host::HostDecision;
pub use tick::{TickContext, advance};
