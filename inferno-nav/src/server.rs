//! Navigation server lifecycle.
//!
//! `init` builds the grid, controller and queues; `start_sensor` launches the
//! position subsystem and the event pump; `run` serves one console session;
//! `teardown` stops everything in order. Teardown runs on every exit path,
//! including drop.

use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::config::Config;
use crate::drive::{self, DriveCommand, SharedDrive};
use crate::error::{Error, Result};
use crate::navigation::{NavigationController, ORIGIN, spawn_event_pump};
use crate::planning::Grid;
use crate::protocol::{CommandDispatcher, OutboundQueue, ProtocolGateway};
use crate::sensor::{SensorEvent, SensorHandle, SensorLink, SimulatedGps};

pub struct NavServer {
    config: Config,
    controller: Arc<NavigationController>,
    outbound: OutboundQueue,
    drive: SharedDrive,
    link: Arc<SensorLink>,
    running: Arc<AtomicBool>,
    events_tx: Option<Sender<SensorEvent>>,
    events_rx: Option<Receiver<SensorEvent>>,
    sensor: Option<SensorHandle>,
    pump: Option<JoinHandle<()>>,
    torn_down: bool,
}

impl NavServer {
    /// Build the server around a drive. Checks the battery and hands the
    /// configured default speed to both wheels.
    pub fn init(config: Config, drive: SharedDrive) -> Result<Self> {
        config.validate()?;

        let grid = Grid::new(&config.grid);
        log::info!(
            "Grid {}x{} ({:.2}m x {:.2}m), border {}, diagonals {}",
            grid.columns(),
            grid.rows(),
            config.grid.width_m,
            config.grid.height_m,
            grid.border_thickness(),
            grid.use_diagonals()
        );

        drive::check_battery(&drive, &config.drive)?;
        drive::send_all(
            &drive,
            &[
                DriveCommand::SetLeftSpeed(config.drive.speed),
                DriveCommand::SetRightSpeed(config.drive.speed),
            ],
        )?;

        let outbound = OutboundQueue::new();
        let link = Arc::new(SensorLink::new());
        let controller = Arc::new(NavigationController::new(
            grid,
            outbound.clone(),
            Arc::clone(&drive),
            Arc::clone(&link),
        ));
        let (events_tx, events_rx) = unbounded();

        Ok(Self {
            config,
            controller,
            outbound,
            drive,
            link,
            running: Arc::new(AtomicBool::new(true)),
            events_tx: Some(events_tx),
            events_rx: Some(events_rx),
            sensor: None,
            pump: None,
            torn_down: false,
        })
    }

    pub fn controller(&self) -> &Arc<NavigationController> {
        &self.controller
    }

    pub fn outbound(&self) -> &OutboundQueue {
        &self.outbound
    }

    /// Flag polled by the session loop; clearing it ends the session.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Start the event pump and the simulated position subsystem.
    pub fn start_sensor(&mut self) -> Result<()> {
        let (Some(rx), Some(tx)) = (self.events_rx.take(), self.events_tx.as_ref()) else {
            return Err(Error::Other("sensor already started".into()));
        };

        self.pump = Some(spawn_event_pump(Arc::clone(&self.controller), rx)?);

        let start = self.controller.world_from_node(ORIGIN);
        let gps = SimulatedGps::new(&self.config.sensor, start, Arc::clone(&self.link), tx.clone());
        self.sensor = Some(gps.spawn()?);
        Ok(())
    }

    /// Serve one console session, then tear down.
    pub fn run(&mut self, stream: TcpStream) -> Result<()> {
        let dispatcher = CommandDispatcher::new(
            Arc::clone(&self.controller),
            Arc::clone(&self.drive),
            self.config.drive.backward_threshold,
        );

        // The stream outlives teardown on this path too
        if let Err(e) = ProtocolGateway::configure(&stream, &self.config.network) {
            self.teardown();
            return Err(e);
        }
        let mut gateway = ProtocolGateway::new(
            stream,
            self.outbound.clone(),
            dispatcher,
            Arc::clone(&self.running),
            &self.config.network,
        );

        self.controller.begin_session();
        let result = gateway.run();
        self.teardown();
        gateway.close();
        result
    }

    /// Stop the drive, stop and join the position subsystem, then the event
    /// pump. Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        log::info!("Tearing down");

        self.running.store(false, Ordering::Relaxed);
        if let Err(e) = self.drive.lock().send_command(DriveCommand::Stop) {
            log::warn!("Failed to stop drive: {}", e);
        }
        self.controller.end_session();

        self.link.request_shutdown();
        if let Some(mut sensor) = self.sensor.take() {
            sensor.stop();
            if let Err(e) = sensor.join() {
                log::error!("Sensor thread: {}", e);
            }
        }

        // The pump ends once the last sender is gone
        self.events_tx = None;
        self.events_rx = None;
        if let Some(pump) = self.pump.take()
            && pump.join().is_err()
        {
            log::error!("Event pump: {}", Error::ThreadPanic);
        }
    }
}

impl Drop for NavServer {
    fn drop(&mut self) {
        self.teardown();
    }
}
