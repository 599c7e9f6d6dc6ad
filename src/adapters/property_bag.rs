//! Shared in-memory property store standing in for a UI element.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::adapters::{InputEvent, InputSimulator, PropertySource};
use crate::harness::value::Value;

#[derive(Debug, Default)]
struct BagState {
    values: BTreeMap<String, Value>,
    inputs: Vec<InputEvent>,
}

/// Cloneable handle to a property map.
///
/// Clones share state, so a callback posted to the dispatcher can update the
/// same bag a later step verifies.
#[derive(Debug, Clone, Default)]
pub struct PropertyBag {
    inner: Arc<RwLock<BagState>>,
}

impl PropertyBag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a bag pre-populated with `values`.
    #[must_use]
    pub fn with_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let bag = Self::new();
        {
            let mut state = bag.inner.write();
            for (k, v) in values {
                state.values.insert(k.into(), v);
            }
        }
        bag
    }

    /// Set `property`, returning the previous value.
    pub fn set_value(&self, property: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner.write().values.insert(property.into(), value.into())
    }

    pub fn remove(&self, property: &str) -> Option<Value> {
        self.inner.write().values.remove(property)
    }

    /// Property names in sorted order.
    #[must_use]
    pub fn properties(&self) -> Vec<String> {
        self.inner.read().values.keys().cloned().collect()
    }

    /// Every input event received, oldest first.
    #[must_use]
    pub fn inputs(&self) -> Vec<InputEvent> {
        self.inner.read().inputs.clone()
    }
}

impl PropertySource for PropertyBag {
    fn get_value(&self, property: &str) -> Option<Value> {
        self.inner.read().values.get(property).cloned()
    }
}

impl InputSimulator for PropertyBag {
    /// Records the event and mirrors it into readable properties:
    /// `LastInput` always, `Text` appended for text input.
    fn send_input(&self, event: InputEvent) {
        let mut state = self.inner.write();
        let summary = match &event {
            InputEvent::Click { x, y } => format!("click {x},{y}"),
            InputEvent::Key { key } => format!("key {key}"),
            InputEvent::Text { text } => {
                let current = match state.values.get("Text") {
                    Some(Value::Text(t)) => t.clone(),
                    _ => String::new(),
                };
                state
                    .values
                    .insert("Text".to_string(), Value::Text(current + text));
                format!("text {text}")
            }
        };
        state
            .values
            .insert("LastInput".to_string(), Value::Text(summary));
        state.inputs.push(event);
    }
}
