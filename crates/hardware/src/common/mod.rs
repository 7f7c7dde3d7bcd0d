//! Types shared by every part of the controller.

pub mod command;
pub mod error;
pub mod request;
pub mod time;

pub use command::{Command, Footprint};
pub use error::{ConfigError, SimError};
pub use request::{BankAddress, Completion, Direction, Request};
pub use time::{Time, TimeInterval};
