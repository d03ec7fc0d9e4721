//! Authorization gating: profile tri-state, capability set, route decisions.

pub mod capabilities;
pub mod profile;
pub mod routes;

pub use capabilities::Capabilities;
pub use profile::{GateState, evaluate};
pub use routes::{Route, RouteDecision, resolve, resolve_terminal};
