// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Access to host-side values: the incoming message and context stores.

use crate::descriptor::{ContextKind, MessageField, SourceKind};
use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Host collaborator resolving message fields and context references.
///
/// `Ok(None)` means the reference exists syntactically but holds nothing;
/// `Err` means the lookup itself failed.
pub trait ContextLookup {
    fn message_field(&self, field: MessageField) -> Option<Value>;

    fn evaluate(&self, kind: &SourceKind, value: &str) -> Result<Option<Value>>;
}

/// Kinds whose value is the literal text itself.
///
/// Returns `None` for kinds that need a real store.
pub fn evaluate_literal(kind: &SourceKind, value: &str) -> Option<Result<Option<Value>>> {
    let lookup_err = |message: String| Error::Lookup {
        kind: kind.to_string(),
        value: value.to_string(),
        message,
    };
    match kind {
        SourceKind::Context(ContextKind::Str) => Some(Ok(Some(Value::String(value.to_string())))),
        SourceKind::Context(ContextKind::Bool) => {
            Some(Ok(Some(Value::Bool(value.trim().eq_ignore_ascii_case("true")))))
        }
        SourceKind::Number => Some(
            value
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(|n| Some(Value::Number(n)))
                .ok_or_else(|| Error::NotANumber {
                    kind: kind.to_string(),
                    value: value.to_string(),
                }),
        ),
        SourceKind::Json => Some(
            serde_json::from_str(value)
                .map(Some)
                .map_err(|e| lookup_err(e.to_string())),
        ),
        _ => None,
    }
}

/// Lookup with no message and no stores; only literal kinds resolve.
#[derive(Debug, Default, Copy, Clone)]
pub struct NoContext;

impl ContextLookup for NoContext {
    fn message_field(&self, _field: MessageField) -> Option<Value> {
        None
    }

    fn evaluate(&self, kind: &SourceKind, value: &str) -> Result<Option<Value>> {
        evaluate_literal(kind, value).unwrap_or_else(|| Err(Error::not_evaluable(kind, value)))
    }
}

/// In-memory context backed by JSON documents.
///
/// Resolves `msg`, `flow` and `global` references as dotted paths
/// (`"payload.rules[1].low"`), `env` from a string map, and the literal kinds.
/// Expression and binary kinds are not supported and fail the lookup.
#[derive(Debug, Default, Clone)]
pub struct JsonContext {
    pub message: Value,
    pub flow: Value,
    pub global: Value,
    pub env: HashMap<String, String>,
}

impl JsonContext {
    pub fn new(message: Value) -> Self {
        Self {
            message,
            flow: Value::Object(Map::new()),
            global: Value::Object(Map::new()),
            env: HashMap::new(),
        }
    }

    pub fn with_flow(mut self, flow: Value) -> Self {
        self.flow = flow;
        self
    }

    pub fn with_global(mut self, global: Value) -> Self {
        self.global = global;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// `"a.b[2].c"` → `"/a/b/2/c"`.
fn json_pointer(path: &str) -> String {
    path.replace('[', ".")
        .replace(']', "")
        .split('.')
        .filter(|s| !s.is_empty())
        .fold(String::new(), |mut acc, seg| {
            acc.push('/');
            acc.push_str(&seg.replace('~', "~0").replace('/', "~1"));
            acc
        })
}

fn lookup_path(doc: &Value, path: &str) -> Option<Value> {
    doc.pointer(&json_pointer(path))
        .filter(|v| !v.is_null())
        .cloned()
}

impl ContextLookup for JsonContext {
    fn message_field(&self, field: MessageField) -> Option<Value> {
        self.message.get(field.key()).filter(|v| !v.is_null()).cloned()
    }

    fn evaluate(&self, kind: &SourceKind, value: &str) -> Result<Option<Value>> {
        if let Some(literal) = evaluate_literal(kind, value) {
            return literal;
        }
        match kind {
            SourceKind::Context(ContextKind::Msg) => Ok(lookup_path(&self.message, value)),
            SourceKind::Context(ContextKind::Flow) => Ok(lookup_path(&self.flow, value)),
            SourceKind::Context(ContextKind::Global) => Ok(lookup_path(&self.global, value)),
            SourceKind::Context(ContextKind::Env) => {
                Ok(self.env.get(value.trim()).cloned().map(Value::String))
            }
            SourceKind::Message(field) => Ok(self.message_field(*field)),
            _ => Err(Error::Lookup {
                kind: kind.to_string(),
                value: value.to_string(),
                message: "unsupported in a JSON context".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> JsonContext {
        JsonContext::new(json!({
            "payload": { "rules": [ { "low": 90 }, { "low": 180 } ] },
            "ts": 1_700_000_000_000_i64,
            "value": null,
        }))
        .with_flow(json!({ "limits": { "high": 270 } }))
        .with_env("HOME_LAT", "48.1")
    }

    #[test]
    fn pointer_translation() {
        assert_eq!(json_pointer("payload.rules[1].low"), "/payload/rules/1/low");
        assert_eq!(json_pointer("a/b"), "/a~1b");
        assert_eq!(json_pointer(""), "");
    }

    #[test]
    fn message_paths_and_fields() {
        let c = ctx();
        assert_eq!(
            c.evaluate(&SourceKind::from("msg"), "payload.rules[1].low").unwrap(),
            Some(json!(180))
        );
        assert_eq!(c.message_field(MessageField::Ts), Some(json!(1_700_000_000_000_i64)));
        assert_eq!(c.message_field(MessageField::Value), None);
        assert_eq!(c.evaluate(&SourceKind::from("msg"), "missing").unwrap(), None);
    }

    #[test]
    fn stores_and_literals() {
        let c = ctx();
        assert_eq!(
            c.evaluate(&SourceKind::from("flow"), "limits.high").unwrap(),
            Some(json!(270))
        );
        assert_eq!(
            c.evaluate(&SourceKind::from("env"), "HOME_LAT").unwrap(),
            Some(json!("48.1"))
        );
        assert_eq!(
            c.evaluate(&SourceKind::from("json"), "[1,2]").unwrap(),
            Some(json!([1, 2]))
        );
        assert_eq!(
            c.evaluate(&SourceKind::from("bool"), "TRUE").unwrap(),
            Some(json!(true))
        );
        assert_eq!(
            c.evaluate(&SourceKind::from("num"), " 2.5 ").unwrap(),
            Some(json!(2.5))
        );
    }

    #[test]
    fn unsupported_kinds_fail() {
        let c = ctx();
        assert!(c.evaluate(&SourceKind::from("jsonata"), "$now()").is_err());
        assert!(c.evaluate(&SourceKind::from("json"), "{oops").is_err());
        assert!(NoContext.evaluate(&SourceKind::from("flow"), "x").is_err());
        assert_eq!(
            NoContext.evaluate(&SourceKind::from("str"), "abc").unwrap(),
            Some(json!("abc"))
        );
    }
}
