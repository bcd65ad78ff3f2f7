//! Console wire protocol: command decoding, dispatch, outbound messages and
//! the session loop.

mod command;
mod dispatcher;
mod gateway;
mod message;

pub use command::{Command, CommandParser};
pub use dispatcher::{CommandDispatcher, SessionFlow};
pub use gateway::{GatewayState, ProtocolGateway};
pub use message::{OutboundMessage, OutboundQueue, PATH_SENTINEL};
