//! Seams to the framework under test.
//!
//! The harness never builds or renders UI itself. It reads values through
//! [`PropertySource`] and triggers input through [`InputSimulator`];
//! [`PropertyBag`] is the in-memory stand-in used by declarative scenarios
//! and tests.

pub mod property_bag;
pub mod tagged;

use serde::{Deserialize, Serialize};

use crate::core::errors::{HarnessError, Result};
use crate::harness::value::Value;

pub use property_bag::PropertyBag;
pub use tagged::Tagged;

/// Opaque value source: `GetValue(property) -> value`.
pub trait PropertySource {
    /// Current value of `property`, or `None` if the source does not expose it.
    fn get_value(&self, property: &str) -> Option<Value>;

    /// Like [`get_value`](Self::get_value), but a missing property is an error.
    fn require(&self, property: &str) -> Result<Value> {
        self.get_value(property)
            .ok_or_else(|| HarnessError::MissingProperty {
                property: property.to_string(),
            })
    }
}

/// Synthesized user input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputEvent {
    /// Mouse click at element-relative coordinates.
    Click { x: f64, y: f64 },
    /// A single key press, by key name ("Enter", "Tab", "A").
    Key { key: String },
    /// Typed text.
    Text { text: String },
}

/// Fire-and-forget input trigger; effects are observed by later property reads.
pub trait InputSimulator {
    fn send_input(&self, event: InputEvent);
}

impl<T: PropertySource + ?Sized> PropertySource for &T {
    fn get_value(&self, property: &str) -> Option<Value> {
        (**self).get_value(property)
    }
}
