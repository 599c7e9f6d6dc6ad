//! Tag decorator: attach test markers to an object without subclassing it.

#![allow(missing_docs)]

use std::collections::BTreeSet;
use std::ops::{Deref, DerefMut};

use crate::adapters::{InputEvent, InputSimulator, PropertySource};
use crate::harness::value::Value;

/// Tag marking an object as created by a test.
pub const TEST_TAG: &str = "test";

/// Wraps `T` with a set of string tags.
///
/// Derefs to the wrapped value and forwards [`PropertySource`] and
/// [`InputSimulator`]. Reading `IsTest` falls back to the `test` tag when the
/// inner source does not define it.
#[derive(Debug, Clone, Default)]
pub struct Tagged<T> {
    inner: T,
    tags: BTreeSet<String>,
}

impl<T> Tagged<T> {
    #[must_use]
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            tags: BTreeSet::new(),
        }
    }

    /// Wrap `inner` with the `test` tag set.
    #[must_use]
    pub fn for_test(inner: T) -> Self {
        Self::new(inner).with_tag(TEST_TAG)
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn tag(&mut self, tag: impl Into<String>) {
        self.tags.insert(tag.into());
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    #[must_use]
    pub fn is_test(&self) -> bool {
        self.has_tag(TEST_TAG)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    #[must_use]
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> Deref for Tagged<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> DerefMut for Tagged<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T: PropertySource> PropertySource for Tagged<T> {
    fn get_value(&self, property: &str) -> Option<Value> {
        self.inner.get_value(property).or_else(|| {
            (property == "IsTest").then(|| Value::Bool(self.is_test()))
        })
    }
}

impl<T: InputSimulator> InputSimulator for Tagged<T> {
    fn send_input(&self, event: InputEvent) {
        self.inner.send_input(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::PropertyBag;

    #[test]
    fn tags_are_attached_without_changing_behavior() {
        let bag = PropertyBag::new();
        bag.set_value("Width", 160);
        let tagged = Tagged::for_test(bag).with_tag("sub-button");
        assert!(tagged.is_test());
        assert!(tagged.has_tag("sub-button"));
        assert_eq!(tagged.get_value("Width"), Some(Value::Int(160)));
        // Deref reaches the wrapped bag's own API.
        tagged.set_value("Height", 60);
        assert_eq!(tagged.get_value("Height"), Some(Value::Int(60)));
    }

    #[test]
    fn is_test_property_falls_back_to_tag() {
        let plain = Tagged::new(PropertyBag::new());
        assert_eq!(plain.get_value("IsTest"), Some(Value::Bool(false)));
        let marked = Tagged::for_test(PropertyBag::new());
        assert_eq!(marked.get_value("IsTest"), Some(Value::Bool(true)));

        let explicit = Tagged::for_test(PropertyBag::with_values([(
            "IsTest",
            Value::Bool(false),
        )]));
        assert_eq!(explicit.get_value("IsTest"), Some(Value::Bool(false)));
    }

    #[test]
    fn input_is_forwarded() {
        let tagged = Tagged::for_test(PropertyBag::new());
        tagged.send_input(InputEvent::Key { key: "Tab".into() });
        assert_eq!(tagged.inputs().len(), 1);
    }
}
