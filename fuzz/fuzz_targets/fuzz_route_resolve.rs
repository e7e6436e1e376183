#![no_main]

use axum::http::Method;
use libfuzzer_sys::fuzz_target;
use robogate::server::routes::{api_routes, Operation};

// Arbitrary paths must never panic the resolver, and every placeholder a
// matched route declares must be bound to a non-empty value.
fuzz_target!(|data: &[u8]| {
    let Ok(path) = std::str::from_utf8(data) else {
        return;
    };
    let table = api_routes();
    for method in [Method::GET, Method::POST] {
        let Some((op, params)) = table.resolve(&method, path) else {
            continue;
        };
        let required: &[&str] = match op {
            Operation::InvokeFleetCommand => &["command"],
            Operation::Robot
            | Operation::RobotCommands
            | Operation::RobotDevices
            | Operation::RobotConnections => &["robot"],
            Operation::InvokeRobotCommand => &["robot", "command"],
            Operation::RobotDevice | Operation::RobotDeviceCommands => &["robot", "device"],
            Operation::InvokeDeviceCommand => &["robot", "device", "command"],
            Operation::RobotConnection => &["robot", "connection"],
            Operation::Asset => &["a"],
            Operation::Fleet | Operation::FleetCommands | Operation::Robots => &[],
        };
        for name in required {
            assert!(params.get(name).is_some_and(|v| !v.is_empty()));
        }
    }
});
