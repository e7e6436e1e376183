//! robogate library
//!
//! An HTTP gateway that exposes a live graph of robots, devices and
//! connections. Callers enumerate the graph as JSON and invoke named commands
//! on any node of it.

pub mod assets;
pub mod cli;
pub mod command;
pub mod config;
pub mod graph;
pub mod logging;
pub mod server;

pub use command::{command_fn, Command, CommandArgs, CommandRegistry};
pub use server::{ApiConfig, ApiError, ApiServer, RunningApi};
