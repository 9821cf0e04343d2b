//! Per-frame ordering of the agent populations via `SystemSet` phases.
//!
//! Every agent system runs in the `Update` schedule inside exactly one
//! [`AgentSet`]. The sets are configured as a chain:
//!
//! ```text
//! Index  →  Cars  →  Pedestrians  →  Emergency  →  Aircraft  →  Boats  →  Incidents
//! ```
//!
//! * **Index** – refreshes `GridIndex` when the grid version changed, so every
//!   later phase reads a scan that matches the grid it sees.
//! * **Cars … Boats** – one population each. They only write their own
//!   resource, except `Emergency`, which also writes the incident registry's
//!   responder marks.
//! * **Incidents** – crime decay and generation run last, so a crime opened
//!   this frame is first seen by the dispatcher on the next one.

use bevy::prelude::*;

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum AgentSet {
    Index,
    Cars,
    Pedestrians,
    Emergency,
    Aircraft,
    Boats,
    Incidents,
}

pub(crate) fn configure_agent_sets(app: &mut App) {
    app.configure_sets(
        Update,
        (
            AgentSet::Index,
            AgentSet::Cars,
            AgentSet::Pedestrians,
            AgentSet::Emergency,
            AgentSet::Aircraft,
            AgentSet::Boats,
            AgentSet::Incidents,
        )
            .chain(),
    );
}
