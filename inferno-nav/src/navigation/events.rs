//! Sensor event pump.
//!
//! Delivers [`SensorEvent`]s to the controller in arrival order on a
//! dedicated thread. The pump stops once every sender has been dropped and
//! the channel is empty.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;

use super::NavigationController;
use crate::error::Result;
use crate::sensor::SensorEvent;

/// Spawn the pump thread.
pub fn spawn_event_pump(
    controller: Arc<NavigationController>,
    events: Receiver<SensorEvent>,
) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("event-pump".into())
        .spawn(move || {
            log::debug!("Event pump started");
            for event in events.iter() {
                log::trace!("Event: {:?}", event);
                controller.handle_event(event);
            }
            log::debug!("Event pump stopped");
        })?;
    Ok(handle)
}
