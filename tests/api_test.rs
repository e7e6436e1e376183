//! End-to-end tests against the gateway router.
//!
//! Each test builds its own `ApiServer` over an in-memory fleet and drives the
//! router in-process with `oneshot`.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use parking_lot::Mutex;
use robogate::command::{command_fn, Command, CommandArgs};
use robogate::graph::memory::{MemoryConnection, MemoryDevice, MemoryFleet, MemoryRobot};
use robogate::graph::{Fleet, Robot};
use robogate::server::ApiServer;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

/// Fleet wrapper counting every graph query.
struct CountingFleet {
    inner: MemoryFleet,
    queries: AtomicUsize,
}

impl CountingFleet {
    fn touch(&self) {
        self.queries.fetch_add(1, Ordering::SeqCst);
    }
}

impl Fleet for CountingFleet {
    fn command_names(&self) -> Vec<String> {
        self.touch();
        self.inner.command_names()
    }

    fn command(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.touch();
        self.inner.command(name)
    }

    fn robots(&self) -> Vec<Arc<dyn Robot>> {
        self.touch();
        self.inner.robots()
    }

    fn robot(&self, name: &str) -> Option<Arc<dyn Robot>> {
        self.touch();
        self.inner.robot(name)
    }
}

/// Robots "A" and "B"; "A" has device "motor" whose "start" command records
/// the argument bag it was called with.
fn fleet(seen: Arc<Mutex<Option<CommandArgs>>>) -> MemoryFleet {
    let fleet = MemoryFleet::new();
    fleet.add_command("ping", command_fn(|_| "pong"));
    let start = command_fn(move |args: &CommandArgs| {
        *seen.lock() = Some(args.clone());
        json!({ "started": true, "speed": args.get("speed").cloned().unwrap_or(Value::Null) })
    });
    fleet.add_robot(
        MemoryRobot::new("A")
            .with_command("wave", command_fn(|args: &CommandArgs| args.get("robot").cloned()))
            .with_connection(MemoryConnection::new("loop", "Loopback"))
            .with_device(MemoryDevice::new("motor", "Motor", "loop").with_command("start", start)),
    );
    fleet.add_robot(MemoryRobot::new("B"));
    fleet
}

fn server() -> (ApiServer, Arc<Mutex<Option<CommandArgs>>>) {
    let seen = Arc::new(Mutex::new(None));
    let server = ApiServer::new(Arc::new(fleet(Arc::clone(&seen))));
    (server, seen)
}

async fn call(router: Router, method: &str, uri: &str, body: &str) -> Response {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    router.oneshot(req).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", user, pass)))
}

#[tokio::test]
async fn test_list_robots_in_registration_order() {
    let (server, _) = server();
    let response = call(server.router(), "GET", "/robots", "").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json; charset=utf-8"
    );
    let robots = json_body(response).await;
    let names: Vec<&str> = robots
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["A", "B"]);
}

#[tokio::test]
async fn test_device_command_receives_body_and_robot() {
    let (server, seen) = server();
    let response = call(
        server.router(),
        "POST",
        "/robots/A/devices/motor/commands/start",
        r#"{"speed":5}"#,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"started": true, "speed": 5}));

    let args = seen.lock().clone().expect("command ran");
    assert_eq!(args.get("robot"), Some(&json!("A")));
    assert_eq!(args.get("speed"), Some(&json!(5)));
}

#[tokio::test]
async fn test_unknown_device_command_is_reported_in_band() {
    let (server, seen) = server();
    let response = call(
        server.router(),
        "POST",
        "/robots/A/devices/motor/commands/bogus",
        r#"{"speed":5}"#,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!("Unknown Command"));
    assert!(seen.lock().is_none());
}

#[tokio::test]
async fn test_missing_credentials_rejected_before_graph_access() {
    let seen = Arc::new(Mutex::new(None));
    let counting = Arc::new(CountingFleet {
        inner: fleet(Arc::clone(&seen)),
        queries: AtomicUsize::new(0),
    });
    let mut server = ApiServer::new(Arc::clone(&counting) as Arc<dyn Fleet>);
    server.set_basic_auth("admin", "s3cret");

    for (method, uri) in [
        ("GET", "/robots"),
        ("GET", "/"),
        ("POST", "/robots/A/devices/motor/commands/start"),
        ("GET", "/app.js"),
    ] {
        let response = call(server.router(), method, uri, r#"{"speed":5}"#).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Basic realm=\"Authorization Required\""
        );
    }
    assert_eq!(counting.queries.load(Ordering::SeqCst), 0);
    assert!(seen.lock().is_none());
}

#[tokio::test]
async fn test_valid_credentials_pass_through() {
    let (mut server, _) = server();
    server.set_basic_auth("admin", "s3cret");
    let router = server.router();

    let req = Request::builder()
        .uri("/commands")
        .header(header::AUTHORIZATION, basic("admin", "s3cret"))
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!(["ping"]));

    for wrong in [basic("admin", "s3creT"), basic("admin", "s3cret!"), basic("", "")] {
        let req = Request::builder()
            .uri("/commands")
            .header(header::AUTHORIZATION, wrong)
            .body(Body::empty())
            .unwrap();
        let response = router.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_robot_command_gets_robot_name() {
    let (server, _) = server();
    let response = call(server.router(), "GET", "/robots/A/commands/wave", "").await;
    assert_eq!(json_body(response).await, json!("A"));
}

#[tokio::test]
async fn test_fleet_command_ignores_malformed_body() {
    let (server, _) = server();
    let response = call(server.router(), "POST", "/commands/ping", "{not json").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!("pong"));

    let response = call(server.router(), "POST", "/commands/nope", "").await;
    assert_eq!(json_body(response).await, json!("Unknown Command"));
}

#[tokio::test]
async fn test_projections() {
    let (server, _) = server();
    let router = server.router();

    let root = json_body(call(router.clone(), "GET", "/", "").await).await;
    assert_eq!(root["commands"], json!(["ping"]));
    assert_eq!(root["robots"].as_array().unwrap().len(), 2);

    let robot = json_body(call(router.clone(), "GET", "/robots/A", "").await).await;
    assert_eq!(robot["name"], "A");
    assert_eq!(robot["commands"], json!(["wave"]));

    let commands = json_body(call(router.clone(), "GET", "/robots/A/commands", "").await).await;
    assert_eq!(commands, json!(["wave"]));

    let devices = json_body(call(router.clone(), "GET", "/robots/A/devices", "").await).await;
    assert_eq!(
        devices,
        json!([{"name": "motor", "driver": "Motor", "connection": "loop", "commands": ["start"]}])
    );

    let device = json_body(call(router.clone(), "GET", "/robots/A/devices/motor", "").await).await;
    assert_eq!(device["driver"], "Motor");

    let device_commands = json_body(
        call(router.clone(), "GET", "/robots/A/devices/motor/commands", "").await,
    )
    .await;
    assert_eq!(device_commands, json!(["start"]));

    let connections = json_body(call(router.clone(), "GET", "/robots/A/connections", "").await).await;
    assert_eq!(
        connections,
        json!([{"name": "loop", "adaptor": "Loopback", "commands": []}])
    );

    let connection =
        json_body(call(router, "GET", "/robots/A/connections/loop", "").await).await;
    assert_eq!(connection["adaptor"], "Loopback");
}

#[tokio::test]
async fn test_projection_reflects_live_graph() {
    let fleet = Arc::new(MemoryFleet::new());
    let server = ApiServer::new(Arc::clone(&fleet) as Arc<dyn Fleet>);
    let router = server.router();

    let robots = json_body(call(router.clone(), "GET", "/robots", "").await).await;
    assert_eq!(robots, json!([]));

    fleet.add_robot(MemoryRobot::new("late"));
    let robots = json_body(call(router, "GET", "/robots", "").await).await;
    assert_eq!(robots[0]["name"], "late");
}

#[tokio::test]
async fn test_independent_servers_coexist() {
    let (mut guarded, _) = server();
    guarded.set_basic_auth("u", "p");
    let (open, _) = server();

    let response = call(guarded.router(), "GET", "/robots", "").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = call(open.router(), "GET", "/robots", "").await;
    assert_eq!(response.status(), StatusCode::OK);
}
