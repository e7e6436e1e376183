//! Object graph capabilities
//!
//! The gateway does not own robots, devices or connections. It talks to them
//! through the traits in this module and turns each node into a JSON
//! projection on demand. Projections are built fresh for every request.

pub mod memory;

use crate::command::Command;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Projection of the whole fleet (`GET /`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetJson {
    pub robots: Vec<RobotJson>,
    pub commands: Vec<String>,
}

/// Projection of one robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotJson {
    pub name: String,
    pub commands: Vec<String>,
    pub connections: Vec<ConnectionJson>,
    pub devices: Vec<DeviceJson>,
}

/// Projection of one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceJson {
    pub name: String,
    pub driver: String,
    pub connection: String,
    pub commands: Vec<String>,
}

/// Projection of one connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionJson {
    pub name: String,
    pub adaptor: String,
    pub commands: Vec<String>,
}

/// Root of the object graph.
pub trait Fleet: Send + Sync {
    /// Names of the fleet-level commands.
    fn command_names(&self) -> Vec<String>;

    fn command(&self, name: &str) -> Option<Arc<dyn Command>>;

    /// Robots in iteration order.
    fn robots(&self) -> Vec<Arc<dyn Robot>>;

    fn robot(&self, name: &str) -> Option<Arc<dyn Robot>>;

    fn to_json(&self) -> FleetJson {
        FleetJson {
            robots: self.robots().iter().map(|r| r.to_json()).collect(),
            commands: self.command_names(),
        }
    }
}

/// A named robot composed of devices and connections.
pub trait Robot: Send + Sync {
    fn name(&self) -> String;

    fn command_names(&self) -> Vec<String>;

    fn command(&self, name: &str) -> Option<Arc<dyn Command>>;

    fn devices(&self) -> Vec<Arc<dyn Device>>;

    fn device(&self, name: &str) -> Option<Arc<dyn Device>>;

    fn connections(&self) -> Vec<Arc<dyn Connection>>;

    fn connection(&self, name: &str) -> Option<Arc<dyn Connection>>;

    fn to_json(&self) -> RobotJson {
        RobotJson {
            name: self.name(),
            commands: self.command_names(),
            connections: self.connections().iter().map(|c| c.to_json()).collect(),
            devices: self.devices().iter().map(|d| d.to_json()).collect(),
        }
    }
}

/// A device attached to a robot.
pub trait Device: Send + Sync {
    fn name(&self) -> String;

    fn driver(&self) -> String;

    /// Name of the connection the device talks through.
    fn connection_name(&self) -> String;

    fn command_names(&self) -> Vec<String>;

    fn command(&self, name: &str) -> Option<Arc<dyn Command>>;

    fn to_json(&self) -> DeviceJson {
        DeviceJson {
            name: self.name(),
            driver: self.driver(),
            connection: self.connection_name(),
            commands: self.command_names(),
        }
    }
}

/// A transport link attached to a robot. Exposed read-only over HTTP.
pub trait Connection: Send + Sync {
    fn name(&self) -> String;

    fn adaptor(&self) -> String;

    fn command_names(&self) -> Vec<String>;

    fn command(&self, name: &str) -> Option<Arc<dyn Command>>;

    fn to_json(&self) -> ConnectionJson {
        ConnectionJson {
            name: self.name(),
            adaptor: self.adaptor(),
            commands: self.command_names(),
        }
    }
}
