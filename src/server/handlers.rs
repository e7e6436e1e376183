//! Route handlers
//!
//! One handler per [`Operation`]. Projection handlers serialize a live
//! snapshot of the addressed node; invocation handlers look a command up by
//! name and run it with the request's argument bag. A missing command is
//! reported in-band as `"Unknown Command"` with status 200.

use axum::body::Bytes;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use crate::assets::{self, AssetSource};
use crate::command::{Command, CommandArgs};
use crate::graph::{Device, Fleet, Robot};
use crate::server::routes::{Operation, PathParams};

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const UNKNOWN_COMMAND: &str = "Unknown Command";
pub const COMMAND_TIMED_OUT: &str = "Command Timed Out";
pub const COMMAND_FAILED: &str = "Command Failed";
pub const UNKNOWN_ROBOT: &str = "Unknown Robot";
pub const UNKNOWN_DEVICE: &str = "Unknown Device";
pub const UNKNOWN_CONNECTION: &str = "Unknown Connection";

/// Everything a handler may read. Immutable once the server is built.
#[derive(Clone)]
pub struct HandlerContext {
    pub fleet: Arc<dyn Fleet>,
    pub assets: Arc<dyn AssetSource>,
    pub command_timeout: Option<Duration>,
}

/// Run the handler for `op`.
pub async fn handle(
    ctx: &HandlerContext,
    op: Operation,
    params: &PathParams,
    path: &str,
    body: &Bytes,
) -> Response {
    let param = |name: &str| params.get(name).unwrap_or_default();
    match op {
        Operation::Fleet => json_ok(ctx.fleet.to_json()),
        Operation::FleetCommands => json_ok(ctx.fleet.command_names()),
        Operation::InvokeFleetCommand => {
            let command = ctx.fleet.command(param("command"));
            invoke(command, decode_args(body), ctx.command_timeout).await
        }
        Operation::Robots => {
            let robots: Vec<_> = ctx.fleet.robots().iter().map(|r| r.to_json()).collect();
            json_ok(robots)
        }
        Operation::Robot => match find_robot(ctx, param("robot")) {
            Ok(robot) => json_ok(robot.to_json()),
            Err(resp) => resp,
        },
        Operation::RobotCommands => match find_robot(ctx, param("robot")) {
            Ok(robot) => json_ok(robot.command_names()),
            Err(resp) => resp,
        },
        Operation::InvokeRobotCommand => {
            let robot = match find_robot(ctx, param("robot")) {
                Ok(robot) => robot,
                Err(resp) => return resp,
            };
            let mut args = decode_args(body);
            args.insert("robot".to_string(), Value::String(robot.name()));
            invoke(robot.command(param("command")), args, ctx.command_timeout).await
        }
        Operation::RobotDevices => match find_robot(ctx, param("robot")) {
            Ok(robot) => {
                let devices: Vec<_> = robot.devices().iter().map(|d| d.to_json()).collect();
                json_ok(devices)
            }
            Err(resp) => resp,
        },
        Operation::RobotDevice => match find_device(ctx, param("robot"), param("device")) {
            Ok((_, device)) => json_ok(device.to_json()),
            Err(resp) => resp,
        },
        Operation::RobotDeviceCommands => {
            match find_device(ctx, param("robot"), param("device")) {
                Ok((_, device)) => json_ok(device.command_names()),
                Err(resp) => resp,
            }
        }
        Operation::InvokeDeviceCommand => {
            let (robot, device) = match find_device(ctx, param("robot"), param("device")) {
                Ok(found) => found,
                Err(resp) => return resp,
            };
            let mut args = decode_args(body);
            args.insert("robot".to_string(), Value::String(robot.name()));
            args.insert("device".to_string(), Value::String(device.name()));
            invoke(device.command(param("command")), args, ctx.command_timeout).await
        }
        Operation::RobotConnections => match find_robot(ctx, param("robot")) {
            Ok(robot) => {
                let connections: Vec<_> =
                    robot.connections().iter().map(|c| c.to_json()).collect();
                json_ok(connections)
            }
            Err(resp) => resp,
        },
        Operation::RobotConnection => {
            let robot = match find_robot(ctx, param("robot")) {
                Ok(robot) => robot,
                Err(resp) => return resp,
            };
            match robot.connection(param("connection")) {
                Some(connection) => json_ok(connection.to_json()),
                None => json_response(StatusCode::NOT_FOUND, UNKNOWN_CONNECTION),
            }
        }
        Operation::Asset => serve_asset(ctx.assets.as_ref(), path),
    }
}

fn find_robot(ctx: &HandlerContext, name: &str) -> Result<Arc<dyn Robot>, Response> {
    ctx.fleet.robot(name).ok_or_else(|| {
        tracing::debug!(robot = %name, "robot not found");
        json_response(StatusCode::NOT_FOUND, UNKNOWN_ROBOT)
    })
}

fn find_device(
    ctx: &HandlerContext,
    robot: &str,
    device: &str,
) -> Result<(Arc<dyn Robot>, Arc<dyn Device>), Response> {
    let robot = find_robot(ctx, robot)?;
    match robot.device(device) {
        Some(device) => Ok((robot, device)),
        None => {
            tracing::debug!(robot = %robot.name(), device = %device, "device not found");
            Err(json_response(StatusCode::NOT_FOUND, UNKNOWN_DEVICE))
        }
    }
}

/// Decode the request body into an argument bag. Anything that is not a JSON
/// object yields an empty bag.
pub fn decode_args(body: &Bytes) -> CommandArgs {
    if body.is_empty() {
        return CommandArgs::new();
    }
    match serde_json::from_slice::<CommandArgs>(body) {
        Ok(args) => args,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring undecodable command body");
            CommandArgs::new()
        }
    }
}

/// Run `command` on the blocking pool, bounded by `timeout` when set.
pub async fn invoke(
    command: Option<Arc<dyn Command>>,
    args: CommandArgs,
    timeout: Option<Duration>,
) -> Response {
    let Some(command) = command else {
        return json_ok(UNKNOWN_COMMAND);
    };

    let task = tokio::task::spawn_blocking(move || command.invoke(&args));
    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined,
            Err(_) => {
                tracing::warn!(timeout_ms = limit.as_millis() as u64, "command timed out");
                return json_response(StatusCode::GATEWAY_TIMEOUT, COMMAND_TIMED_OUT);
            }
        },
        None => task.await,
    };

    match joined {
        Ok(value) => json_ok(value),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            json_response(StatusCode::INTERNAL_SERVER_ERROR, COMMAND_FAILED)
        }
    }
}

fn serve_asset(assets: &dyn AssetSource, path: &str) -> Response {
    let raw = path.strip_prefix('/').unwrap_or(path);
    let name = urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw));
    let name = name.as_ref();
    match assets.asset(name) {
        Ok(bytes) => {
            let body = bytes.into_owned();
            match assets::content_type(name) {
                Some(ct) => ([(header::CONTENT_TYPE, ct)], body).into_response(),
                None => {
                    let mut response = body.into_response();
                    response.headers_mut().remove(header::CONTENT_TYPE);
                    response
                }
            }
        }
        Err(e) => {
            tracing::debug!(asset = %name, error = %e, "asset lookup failed");
            (
                StatusCode::NOT_FOUND,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                e.to_string(),
            )
                .into_response()
        }
    }
}

pub fn json_ok<T: Serialize>(value: T) -> Response {
    json_response(StatusCode::OK, value)
}

pub fn json_response<T: Serialize>(status: StatusCode, value: T) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)],
        Json(value),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::command_fn;

    async fn body_json(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn test_decode_args() {
        let args = decode_args(&Bytes::from_static(br#"{"speed":5}"#));
        assert_eq!(args.get("speed"), Some(&Value::from(5)));
        assert!(decode_args(&Bytes::new()).is_empty());
        assert!(decode_args(&Bytes::from_static(b"not json")).is_empty());
        assert!(decode_args(&Bytes::from_static(b"[1,2]")).is_empty());
    }

    #[tokio::test]
    async fn test_invoke_known_command() {
        let cmd = command_fn(|args: &CommandArgs| args.len());
        let mut args = CommandArgs::new();
        args.insert("a".to_string(), Value::Null);
        let response = invoke(Some(cmd), args, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            JSON_CONTENT_TYPE
        );
        assert_eq!(body_json(response).await, Value::from(1));
    }

    #[test]
    fn test_invoke_unknown_command() {
        let response = tokio_test::block_on(invoke(None, CommandArgs::new(), None));
        assert_eq!(response.status(), StatusCode::OK);
        let body = tokio_test::block_on(body_json(response));
        assert_eq!(body, Value::from(UNKNOWN_COMMAND));
    }

    #[tokio::test]
    async fn test_invoke_times_out() {
        let cmd = command_fn(|_| {
            std::thread::sleep(Duration::from_millis(500));
            "late"
        });
        let response = invoke(
            Some(cmd),
            CommandArgs::new(),
            Some(Duration::from_millis(20)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body_json(response).await, Value::from(COMMAND_TIMED_OUT));
    }

    #[tokio::test]
    async fn test_invoke_panicking_command() {
        let cmd = command_fn(|_| -> u8 { panic!("boom") });
        let response = invoke(Some(cmd), CommandArgs::new(), None).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, Value::from(COMMAND_FAILED));
    }
}
