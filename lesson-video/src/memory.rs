//! Session-scoped key-value memory shared by the lesson stages.

use serde_json::Value;
use std::collections::HashMap;

/// In-process store of JSON values. Every key is prefixed with the session
/// name, so one store can hold several sessions.
#[derive(Debug, Default)]
pub struct ContextMemory {
    session: String,
    entries: HashMap<String, Value>,
}

impl ContextMemory {
    pub fn new(session: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            entries: HashMap::new(),
        }
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}_{}", self.session, key)
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn save(&mut self, key: &str, value: impl Into<Value>) {
        let key = self.scoped(key);
        self.entries.insert(key, value.into());
    }

    /// Value under `key`, or `default` when absent.
    pub fn get(&self, key: &str, default: Value) -> Value {
        self.entries
            .get(&self.scoped(key))
            .cloned()
            .unwrap_or(default)
    }

    /// Push `item` onto the list under `key`.
    ///
    /// A missing or non-list value starts over as a one-item list.
    pub fn append(&mut self, key: &str, item: impl Into<Value>) {
        let key = self.scoped(key);
        let entry = self
            .entries
            .entry(key)
            .or_insert_with(|| Value::Array(Vec::new()));
        match entry {
            Value::Array(items) => items.push(item.into()),
            other => *other = Value::Array(vec![item.into()]),
        }
    }

    /// Drop every entry of this session.
    pub fn clear(&mut self) {
        let prefix = format!("{}_", self.session);
        self.entries.retain(|key, _| !key.starts_with(&prefix));
    }
}
