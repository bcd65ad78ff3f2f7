//! Command dispatch.
//!
//! Maps decoded console commands onto the navigation controller and the
//! drive. A failing command is logged and skipped; the rest of the input is
//! still processed.

use std::sync::Arc;

use super::command::{Command, CommandParser};
use crate::drive::{self, SharedDrive};
use crate::error::Result;
use crate::navigation::NavigationController;

/// Whether the session continues after a batch of commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionFlow {
    Continue,
    Quit,
}

/// Routes console commands to their handlers.
pub struct CommandDispatcher {
    controller: Arc<NavigationController>,
    drive: SharedDrive,
    backward_threshold: i32,
}

impl CommandDispatcher {
    pub fn new(
        controller: Arc<NavigationController>,
        drive: SharedDrive,
        backward_threshold: i32,
    ) -> Self {
        Self {
            controller,
            drive,
            backward_threshold,
        }
    }

    /// Run every command in `input`. A quit request is honoured after the
    /// remaining commands of the same batch.
    pub fn dispatch(&self, input: &str) -> SessionFlow {
        let mut flow = SessionFlow::Continue;
        for decoded in CommandParser::new(input) {
            let result = decoded.and_then(|cmd| {
                log::debug!("Command: {:?}", cmd);
                self.execute(cmd)
            });
            match result {
                Ok(SessionFlow::Quit) => flow = SessionFlow::Quit,
                Ok(SessionFlow::Continue) => {}
                Err(e) if e.is_protocol_error() => log::warn!("Command ignored: {}", e),
                Err(e) => log::error!("Command failed: {}", e),
            }
        }
        flow
    }

    pub fn execute(&self, cmd: Command) -> Result<SessionFlow> {
        match cmd {
            Command::SetNode { x, y, kind } => {
                let cell = self.controller.cell(x, y)?;
                self.controller.update_node(cell, kind)?;
            }
            Command::Destination { .. } if cmd.is_cancel() => {
                self.controller.clear_destination()?;
            }
            Command::Destination { x, y } => {
                let cell = self.controller.cell(x, y)?;
                self.controller.set_destination(cell);
            }
            Command::Home { x, y } => {
                let cell = self.controller.cell(x, y)?;
                self.controller.set_home(cell);
            }
            Command::Go => self.controller.start_motion(),
            Command::Stop => self.controller.halt()?,
            Command::Quit => {
                log::info!("Quit requested");
                return Ok(SessionFlow::Quit);
            }
            Command::Manual { left, right } => {
                let cmds = drive::manual_drive(left, right, self.backward_threshold);
                drive::send_all(&self.drive, &cmds)?;
            }
            Command::LightsOn => drive::send_all(&self.drive, &drive::indicators(true))?,
            Command::LightsOff => drive::send_all(&self.drive, &drive::indicators(false))?,
        }
        Ok(SessionFlow::Continue)
    }
}
