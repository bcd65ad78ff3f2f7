//! Simulated position subsystem.
//!
//! Stands in for the on-board GPS: takes waypoints from the [`SensorLink`],
//! moves the rover toward each in straight steps of `step_m` every `tick_ms`,
//! and reports progress as [`SensorEvent`]s. Hidden obstacles from the
//! configuration are reported once the rover comes within
//! `detection_range_m` of them.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;

use super::{SensorEvent, SensorLink};
use crate::config::SensorConfig;
use crate::error::{Error, Result};
use crate::planning::WorldPoint;

/// How a leg ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LegOutcome {
    Reached,
    Abandoned,
    /// The event receiver is gone
    Closed,
}

/// Simulated GPS thread state.
pub struct SimulatedGps {
    step_m: f32,
    tick: Duration,
    arrival_tolerance_m: f32,
    detection_range_m: f32,
    position: WorldPoint,
    /// Obstacles not yet reported
    hidden: Vec<WorldPoint>,
    link: Arc<SensorLink>,
    events: Sender<SensorEvent>,
}

impl SimulatedGps {
    pub fn new(
        config: &SensorConfig,
        start: WorldPoint,
        link: Arc<SensorLink>,
        events: Sender<SensorEvent>,
    ) -> Self {
        Self {
            step_m: config.step_m,
            tick: Duration::from_millis(config.tick_ms),
            arrival_tolerance_m: config.arrival_tolerance_m,
            detection_range_m: config.detection_range_m,
            position: start,
            hidden: config
                .obstacles
                .iter()
                .map(|&[x, y]| WorldPoint::new(x, y))
                .collect(),
            link,
            events,
        }
    }

    /// Start the simulation on its own thread.
    pub fn spawn(self) -> Result<SensorHandle> {
        let link = Arc::clone(&self.link);
        let thread = thread::Builder::new()
            .name("sensor".into())
            .spawn(move || {
                let mut gps = self;
                gps.run();
            })?;

        Ok(SensorHandle {
            link,
            thread: Some(thread),
        })
    }

    /// Main loop; returns once shutdown is requested or events can no
    /// longer be delivered.
    pub fn run(&mut self) {
        log::info!("Sensor thread started at ({:.3}, {:.3})", self.position.x, self.position.y);

        while !self.link.is_shutdown() {
            let Some(target) = self.link.take_next(self.tick) else {
                continue;
            };
            log::debug!("Sensor: leg to ({:.3}, {:.3})", target.x, target.y);

            match self.drive_leg(target) {
                LegOutcome::Reached => {
                    if !self.emit(SensorEvent::WaypointReached(self.position)) {
                        break;
                    }
                }
                LegOutcome::Abandoned => log::debug!("Sensor: leg abandoned"),
                LegOutcome::Closed => break,
            }
        }

        log::info!("Sensor thread stopped");
    }

    /// Move toward `target`, checking the abandon flag before every step.
    fn drive_leg(&mut self, target: WorldPoint) -> LegOutcome {
        loop {
            if self.link.should_abandon() {
                return LegOutcome::Abandoned;
            }

            let remaining = self.position.distance(&target);
            if remaining <= self.arrival_tolerance_m {
                self.position = target;
                return LegOutcome::Reached;
            }

            let step = self.step_m.min(remaining);
            self.position = WorldPoint::new(
                self.position.x + (target.x - self.position.x) / remaining * step,
                self.position.y + (target.y - self.position.y) / remaining * step,
            );
            if !self.emit(SensorEvent::PositionChanged(self.position)) || !self.scan() {
                return LegOutcome::Closed;
            }

            thread::sleep(self.tick);
        }
    }

    /// Report hidden obstacles within range. Each is reported once.
    fn scan(&mut self) -> bool {
        let position = self.position;
        let range = self.detection_range_m;
        let (found, hidden): (Vec<_>, Vec<_>) = self
            .hidden
            .drain(..)
            .partition(|o| o.distance(&position) <= range);
        self.hidden = hidden;

        found.into_iter().all(|o| {
            log::info!("Sensor: obstacle detected at ({:.3}, {:.3})", o.x, o.y);
            self.emit(SensorEvent::ObstacleFound(o))
        })
    }

    fn emit(&self, event: SensorEvent) -> bool {
        self.events.send(event).is_ok()
    }
}

/// Lifecycle handle for a running sensor thread.
pub struct SensorHandle {
    link: Arc<SensorLink>,
    thread: Option<JoinHandle<()>>,
}

impl SensorHandle {
    /// Request the thread to stop; also abandons the current leg.
    pub fn stop(&self) {
        self.link.request_shutdown();
    }

    /// Wait for the thread to finish. Joining twice is a no-op.
    pub fn join(&mut self) -> Result<()> {
        match self.thread.take() {
            Some(handle) => handle.join().map_err(|_| Error::ThreadPanic),
            None => Ok(()),
        }
    }
}
