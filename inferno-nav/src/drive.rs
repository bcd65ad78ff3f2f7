//! Drive sink abstraction.
//!
//! The physical differential drive (motors, LEDs, eye indicators) sits behind
//! [`DriveSink`]. The navigation core only issues [`DriveCommand`]s and never
//! reads anything back except the battery voltage at startup.
//!
//! [`MockDrive`] records and logs every command; it backs the binary when no
//! hardware driver is linked in and is what the tests observe.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::DriveConfig;
use crate::error::Result;

/// Commands accepted by the drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriveCommand {
    Stop,
    SetLeftSpeed(u32),
    SetRightSpeed(u32),
    Forward,
    Backward,
    RotateLeftForever,
    RotateRightForever,
    LedOn(u8),
    LedOff(u8),
    OpenEyes,
    CloseEyes,
}

/// Drive trait for hardware abstraction
pub trait DriveSink: Send {
    /// Send command to hardware
    fn send_command(&mut self, cmd: DriveCommand) -> Result<()>;

    /// Current battery voltage
    fn battery_voltage(&mut self) -> Result<f32>;
}

/// Drive shared between the dispatcher and the navigation controller.
pub type SharedDrive = Arc<Mutex<Box<dyn DriveSink>>>;

/// Wrap a drive for sharing.
pub fn share(drive: impl DriveSink + 'static) -> SharedDrive {
    Arc::new(Mutex::new(Box::new(drive) as Box<dyn DriveSink>))
}

/// Send a sequence of commands, stopping at the first failure.
pub fn send_all(drive: &SharedDrive, cmds: &[DriveCommand]) -> Result<()> {
    let mut drive = drive.lock();
    for &cmd in cmds {
        drive.send_command(cmd)?;
    }
    Ok(())
}

/// Map a manual two-wheel command to drive commands.
///
/// - both zero: stop
/// - left zero: rotate right in place
/// - right zero: rotate left in place
/// - otherwise: wheel speeds from the magnitudes, then backward when both
///   raw values exceed `backward_threshold`, forward otherwise
///
/// The threshold rule is the console's long-standing convention; negative
/// inputs still drive forward.
pub fn manual_drive(left: i32, right: i32, backward_threshold: i32) -> Vec<DriveCommand> {
    match (left, right) {
        (0, 0) => vec![DriveCommand::Stop],
        (0, _) => vec![DriveCommand::RotateRightForever],
        (_, 0) => vec![DriveCommand::RotateLeftForever],
        _ => {
            let direction = if left > backward_threshold && right > backward_threshold {
                DriveCommand::Backward
            } else {
                DriveCommand::Forward
            };
            vec![
                DriveCommand::SetLeftSpeed(left.unsigned_abs()),
                DriveCommand::SetRightSpeed(right.unsigned_abs()),
                direction,
            ]
        }
    }
}

/// Indicator commands for `LON`/`LOFF`.
pub fn indicators(on: bool) -> [DriveCommand; 3] {
    if on {
        [
            DriveCommand::LedOn(0),
            DriveCommand::LedOn(1),
            DriveCommand::OpenEyes,
        ]
    } else {
        [
            DriveCommand::LedOff(0),
            DriveCommand::LedOff(1),
            DriveCommand::CloseEyes,
        ]
    }
}

/// Log the battery state and return the voltage.
pub fn check_battery(drive: &SharedDrive, config: &DriveConfig) -> Result<f32> {
    let volt = drive.lock().battery_voltage()?;
    log::info!("Current voltage: {:.2}V", volt);
    if volt < config.critical_voltage {
        log::error!(
            "Critical! Battery at {:.2}V, charge before continuing",
            volt
        );
    } else if volt < config.low_voltage {
        log::warn!(
            "Battery at {:.2}V, impaired performance is expected",
            volt
        );
    }
    Ok(volt)
}

/// Drive that records commands instead of moving anything.
#[derive(Clone, Debug)]
pub struct MockDrive {
    history: Arc<Mutex<Vec<DriveCommand>>>,
    voltage: f32,
}

impl MockDrive {
    pub fn new(voltage: f32) -> Self {
        Self {
            history: Arc::new(Mutex::new(Vec::new())),
            voltage,
        }
    }

    /// Handle to the recorded commands; stays valid after the drive is shared.
    pub fn history(&self) -> Arc<Mutex<Vec<DriveCommand>>> {
        Arc::clone(&self.history)
    }
}

impl Default for MockDrive {
    fn default() -> Self {
        Self::new(12.0)
    }
}

impl DriveSink for MockDrive {
    fn send_command(&mut self, cmd: DriveCommand) -> Result<()> {
        log::debug!("Drive: {:?}", cmd);
        self.history.lock().push(cmd);
        Ok(())
    }

    fn battery_voltage(&mut self) -> Result<f32> {
        Ok(self.voltage)
    }
}
