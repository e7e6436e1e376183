//! Route resolution
//!
//! An ordered table of `(method, pattern, handler)` entries. Patterns are made
//! of literal segments and `:name` placeholders; a placeholder matches exactly
//! one non-empty path segment. Resolution scans entries in registration order
//! and the first entry whose method and pattern match wins, so specific
//! patterns must be registered before the catch-all asset patterns.

use axum::http::Method;
use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled URL pattern such as `/robots/:robot/devices/:device`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    pub fn parse(raw: &str) -> Self {
        let segments = split_path(raw)
            .map(|s| match s.strip_prefix(':') {
                Some(name) if !name.is_empty() => Segment::Param(name.to_string()),
                _ => Segment::Literal(s.to_string()),
            })
            .collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a request path, binding placeholder segments by name.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let mut params = PathParams::default();
        let mut parts = split_path(path);
        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(lit) => {
                    if lit != part {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    params.push(name, decode_segment(part));
                }
            }
        }
        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }
}

/// `/a/b/` → `["a", "b", ""]`, `/` → `[""]`.
fn split_path(path: &str) -> std::str::Split<'_, char> {
    path.strip_prefix('/').unwrap_or(path).split('/')
}

fn decode_segment(segment: &str) -> String {
    match urlencoding::decode(segment) {
        Ok(Cow::Borrowed(s)) => s.to_string(),
        Ok(Cow::Owned(s)) => s,
        Err(_) => segment.to_string(),
    }
}

/// Placeholder bindings for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    bindings: Vec<(String, String)>,
}

impl PathParams {
    fn push(&mut self, name: &str, value: String) {
        self.bindings.push((name.to_string(), value));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RouteEntry<H> {
    pub method: Method,
    pub pattern: Pattern,
    pub handler: H,
}

/// Ordered, first-match-wins route table.
#[derive(Debug, Clone)]
pub struct RouteTable<H> {
    entries: Vec<RouteEntry<H>>,
}

impl<H> Default for RouteTable<H> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<H> RouteTable<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, method: Method, pattern: &str, handler: H) -> &mut Self {
        self.entries.push(RouteEntry {
            method,
            pattern: Pattern::parse(pattern),
            handler,
        });
        self
    }

    pub fn get(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.register(Method::GET, pattern, handler)
    }

    pub fn post(&mut self, pattern: &str, handler: H) -> &mut Self {
        self.register(Method::POST, pattern, handler)
    }

    pub fn resolve(&self, method: &Method, path: &str) -> Option<(&H, PathParams)> {
        self.entries
            .iter()
            .filter(|e| e.method == *method)
            .find_map(|e| e.pattern.matches(path).map(|p| (&e.handler, p)))
    }

    pub fn entries(&self) -> &[RouteEntry<H>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Every operation the gateway exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Fleet,
    FleetCommands,
    InvokeFleetCommand,
    Robots,
    Robot,
    RobotCommands,
    InvokeRobotCommand,
    RobotDevices,
    RobotDevice,
    RobotDeviceCommands,
    InvokeDeviceCommand,
    RobotConnections,
    RobotConnection,
    Asset,
}

const FLEET_COMMAND_ROUTE: &str = "/commands/:command";
const ROBOT_COMMAND_ROUTE: &str = "/robots/:robot/commands/:command";
const DEVICE_COMMAND_ROUTE: &str = "/robots/:robot/devices/:device/commands/:command";

/// Build the fixed route table, asset catch-alls last.
pub fn api_routes() -> RouteTable<Operation> {
    let mut table = RouteTable::new();
    table
        .get("/", Operation::Fleet)
        .get("/commands", Operation::FleetCommands)
        .get(FLEET_COMMAND_ROUTE, Operation::InvokeFleetCommand)
        .post(FLEET_COMMAND_ROUTE, Operation::InvokeFleetCommand)
        .get("/robots", Operation::Robots)
        .get("/robots/:robot", Operation::Robot)
        .get("/robots/:robot/commands", Operation::RobotCommands)
        .get(ROBOT_COMMAND_ROUTE, Operation::InvokeRobotCommand)
        .post(ROBOT_COMMAND_ROUTE, Operation::InvokeRobotCommand)
        .get("/robots/:robot/devices", Operation::RobotDevices)
        .get("/robots/:robot/devices/:device", Operation::RobotDevice)
        .get(
            "/robots/:robot/devices/:device/commands",
            Operation::RobotDeviceCommands,
        )
        .get(DEVICE_COMMAND_ROUTE, Operation::InvokeDeviceCommand)
        .post(DEVICE_COMMAND_ROUTE, Operation::InvokeDeviceCommand)
        .get("/robots/:robot/connections", Operation::RobotConnections)
        .get(
            "/robots/:robot/connections/:connection",
            Operation::RobotConnection,
        )
        .get("/:a", Operation::Asset)
        .get("/:a/", Operation::Asset)
        .get("/:a/:b", Operation::Asset)
        .get("/:a/:b/", Operation::Asset)
        .get("/:a/:b/:c", Operation::Asset)
        .get("/:a/:b/:c/", Operation::Asset);
    table
}
