//! Navigation state machine and sensor event delivery.

mod controller;
mod events;
mod state;

pub use controller::{NavigationController, ORIGIN};
pub use events::spawn_event_pump;
pub use state::NavigationState;
