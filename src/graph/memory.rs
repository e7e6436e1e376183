//! In-memory object graph
//!
//! Thread-safe implementations of the graph traits. Nodes can be added and
//! commands registered while the gateway is serving; every projection reads
//! the current state.

use super::{Connection, Device, Fleet, Robot};
use crate::command::{Command, CommandRegistry};
use parking_lot::RwLock;
use std::sync::Arc;

/// Fleet root holding robots in insertion order.
#[derive(Default)]
pub struct MemoryFleet {
    robots: RwLock<Vec<Arc<MemoryRobot>>>,
    commands: RwLock<CommandRegistry>,
}

impl MemoryFleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a robot. A robot with the same name is replaced in place.
    pub fn add_robot(&self, robot: MemoryRobot) -> Arc<MemoryRobot> {
        let robot = Arc::new(robot);
        let mut robots = self.robots.write();
        match robots.iter_mut().find(|r| r.name == robot.name) {
            Some(slot) => *slot = Arc::clone(&robot),
            None => robots.push(Arc::clone(&robot)),
        }
        tracing::debug!(robot = %robot.name, "robot added to fleet");
        robot
    }

    pub fn add_command(&self, name: impl Into<String>, command: Arc<dyn Command>) {
        self.commands.write().register(name, command);
    }

    pub fn robot_names(&self) -> Vec<String> {
        self.robots.read().iter().map(|r| r.name.clone()).collect()
    }
}

impl Fleet for MemoryFleet {
    fn command_names(&self) -> Vec<String> {
        self.commands.read().names()
    }

    fn command(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.read().get(name)
    }

    fn robots(&self) -> Vec<Arc<dyn Robot>> {
        self.robots
            .read()
            .iter()
            .map(|r| Arc::clone(r) as Arc<dyn Robot>)
            .collect()
    }

    fn robot(&self, name: &str) -> Option<Arc<dyn Robot>> {
        self.robots
            .read()
            .iter()
            .find(|r| r.name == name)
            .map(|r| Arc::clone(r) as Arc<dyn Robot>)
    }
}

pub struct MemoryRobot {
    name: String,
    commands: RwLock<CommandRegistry>,
    devices: RwLock<Vec<Arc<MemoryDevice>>>,
    connections: RwLock<Vec<Arc<MemoryConnection>>>,
}

impl MemoryRobot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: RwLock::new(CommandRegistry::new()),
            devices: RwLock::new(Vec::new()),
            connections: RwLock::new(Vec::new()),
        }
    }

    pub fn with_command(self, name: impl Into<String>, command: Arc<dyn Command>) -> Self {
        self.add_command(name, command);
        self
    }

    pub fn with_device(self, device: MemoryDevice) -> Self {
        self.add_device(device);
        self
    }

    pub fn with_connection(self, connection: MemoryConnection) -> Self {
        self.add_connection(connection);
        self
    }

    pub fn add_command(&self, name: impl Into<String>, command: Arc<dyn Command>) {
        self.commands.write().register(name, command);
    }

    pub fn add_device(&self, device: MemoryDevice) -> Arc<MemoryDevice> {
        let device = Arc::new(device);
        let mut devices = self.devices.write();
        match devices.iter_mut().find(|d| d.name == device.name) {
            Some(slot) => *slot = Arc::clone(&device),
            None => devices.push(Arc::clone(&device)),
        }
        device
    }

    pub fn add_connection(&self, connection: MemoryConnection) -> Arc<MemoryConnection> {
        let connection = Arc::new(connection);
        let mut connections = self.connections.write();
        match connections.iter_mut().find(|c| c.name == connection.name) {
            Some(slot) => *slot = Arc::clone(&connection),
            None => connections.push(Arc::clone(&connection)),
        }
        connection
    }
}

impl Robot for MemoryRobot {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn command_names(&self) -> Vec<String> {
        self.commands.read().names()
    }

    fn command(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.read().get(name)
    }

    fn devices(&self) -> Vec<Arc<dyn Device>> {
        self.devices
            .read()
            .iter()
            .map(|d| Arc::clone(d) as Arc<dyn Device>)
            .collect()
    }

    fn device(&self, name: &str) -> Option<Arc<dyn Device>> {
        self.devices
            .read()
            .iter()
            .find(|d| d.name == name)
            .map(|d| Arc::clone(d) as Arc<dyn Device>)
    }

    fn connections(&self) -> Vec<Arc<dyn Connection>> {
        self.connections
            .read()
            .iter()
            .map(|c| Arc::clone(c) as Arc<dyn Connection>)
            .collect()
    }

    fn connection(&self, name: &str) -> Option<Arc<dyn Connection>> {
        self.connections
            .read()
            .iter()
            .find(|c| c.name == name)
            .map(|c| Arc::clone(c) as Arc<dyn Connection>)
    }
}

pub struct MemoryDevice {
    name: String,
    driver: String,
    connection: String,
    commands: RwLock<CommandRegistry>,
}

impl MemoryDevice {
    pub fn new(
        name: impl Into<String>,
        driver: impl Into<String>,
        connection: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            driver: driver.into(),
            connection: connection.into(),
            commands: RwLock::new(CommandRegistry::new()),
        }
    }

    pub fn with_command(self, name: impl Into<String>, command: Arc<dyn Command>) -> Self {
        self.add_command(name, command);
        self
    }

    pub fn add_command(&self, name: impl Into<String>, command: Arc<dyn Command>) {
        self.commands.write().register(name, command);
    }
}

impl Device for MemoryDevice {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn driver(&self) -> String {
        self.driver.clone()
    }

    fn connection_name(&self) -> String {
        self.connection.clone()
    }

    fn command_names(&self) -> Vec<String> {
        self.commands.read().names()
    }

    fn command(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.read().get(name)
    }
}

pub struct MemoryConnection {
    name: String,
    adaptor: String,
    commands: RwLock<CommandRegistry>,
}

impl MemoryConnection {
    pub fn new(name: impl Into<String>, adaptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            adaptor: adaptor.into(),
            commands: RwLock::new(CommandRegistry::new()),
        }
    }

    pub fn with_command(self, name: impl Into<String>, command: Arc<dyn Command>) -> Self {
        self.commands.write().register(name, command);
        self
    }
}

impl Connection for MemoryConnection {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn adaptor(&self) -> String {
        self.adaptor.clone()
    }

    fn command_names(&self) -> Vec<String> {
        self.commands.read().names()
    }

    fn command(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.read().get(name)
    }
}
