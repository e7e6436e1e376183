//! Named commands
//!
//! A command is an invocable capability registered under a name on a graph
//! node. It receives a keyed argument bag decoded from the request body and
//! returns an arbitrary JSON value.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Argument bag passed to every command.
pub type CommandArgs = Map<String, Value>;

/// An invocable command.
///
/// Implementations must be safe to call from several request tasks at once;
/// the gateway adds no locking around invocation.
pub trait Command: Send + Sync {
    fn invoke(&self, args: &CommandArgs) -> Value;
}

impl<F> Command for F
where
    F: Fn(&CommandArgs) -> Value + Send + Sync,
{
    fn invoke(&self, args: &CommandArgs) -> Value {
        self(args)
    }
}

/// Adapt a closure returning any serializable value into a command.
///
/// A result that cannot be represented as JSON becomes `null`.
pub fn command_fn<F, T>(f: F) -> Arc<dyn Command>
where
    F: Fn(&CommandArgs) -> T + Send + Sync + 'static,
    T: Serialize,
{
    Arc::new(move |args: &CommandArgs| match serde_json::to_value(f(args)) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "command result is not JSON-serializable");
            Value::Null
        }
    })
}

/// Ordered name → command map owned by a single graph node.
///
/// Registering an existing name replaces the command but keeps its position.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    entries: Vec<(String, Arc<dyn Command>)>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, command: Arc<dyn Command>) {
        let name = name.into();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = command;
            return;
        }
        self.entries.push((name, command));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| Arc::clone(c))
    }

    /// Command names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter().map(|(n, _)| n)).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_preserves_registration_order() {
        let mut registry = CommandRegistry::new();
        registry.register("stop", command_fn(|_| "stopped"));
        registry.register("start", command_fn(|_| "started"));
        registry.register("reset", command_fn(|_| "reset"));
        assert_eq!(registry.names(), vec!["stop", "start", "reset"]);
    }

    #[test]
    fn test_registry_replace_keeps_position() {
        let mut registry = CommandRegistry::new();
        registry.register("a", command_fn(|_| 1));
        registry.register("b", command_fn(|_| 2));
        registry.register("a", command_fn(|_| 3));
        assert_eq!(registry.names(), vec!["a", "b"]);
        let a = registry.get("a").unwrap();
        assert_eq!(a.invoke(&CommandArgs::new()), json!(3));
    }

    #[test]
    fn test_registry_unknown_name() {
        let registry = CommandRegistry::new();
        assert!(registry.get("missing").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_command_fn_serializes_result() {
        #[derive(Serialize)]
        struct Reading {
            celsius: f64,
            ok: bool,
        }
        let cmd = command_fn(|_| Reading {
            celsius: 21.5,
            ok: true,
        });
        assert_eq!(
            cmd.invoke(&CommandArgs::new()),
            json!({"celsius": 21.5, "ok": true})
        );
    }

    #[test]
    fn test_command_sees_arguments() {
        let cmd = command_fn(|args: &CommandArgs| args.get("speed").cloned());
        let mut args = CommandArgs::new();
        args.insert("speed".to_string(), json!(5));
        assert_eq!(cmd.invoke(&args), json!(5));
        assert_eq!(cmd.invoke(&CommandArgs::new()), Value::Null);
    }

    #[test]
    fn test_unserializable_result_is_null() {
        use std::collections::HashMap;
        // Non-string map keys cannot become JSON object keys.
        let cmd = command_fn(|_| {
            let mut m = HashMap::new();
            m.insert((1, 2), "x");
            m
        });
        assert_eq!(cmd.invoke(&CommandArgs::new()), Value::Null);
    }
}
