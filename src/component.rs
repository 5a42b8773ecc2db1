//! Custom field types
//!
//! A custom field is rendered by a [`FieldComponent`]: it is instantiated with
//! the field's current value and path and returns a [`FieldWidget`] that owns
//! all further behavior. The engine tags the widget with the path and reads it
//! back through [`FieldWidget::value`].
//!
//! Components are looked up by type name in a [`ComponentRegistry`] that the
//! application fills once at startup.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::FormResult;
use crate::path::FieldPath;

/// Constructor for a custom field type
#[async_trait]
pub trait FieldComponent: Send + Sync {
    /// Type name used in templates
    fn name(&self) -> &str;

    /// Instantiate a widget for `value` at `path`
    async fn create(&self, value: Value, path: &FieldPath) -> FormResult<Box<dyn FieldWidget>>;
}

/// A live custom field
pub trait FieldWidget: Send + Sync + fmt::Debug {
    /// Current value contributed to the form
    fn value(&self) -> Value;

    /// Replace the widget's value (user edit)
    fn set_value(&mut self, value: Value);
}

/// Widget holding an arbitrary JSON value verbatim
#[derive(Debug, Clone, Default)]
pub struct JsonWidget {
    value: Value,
}

impl JsonWidget {
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

impl FieldWidget for JsonWidget {
    fn value(&self) -> Value {
        self.value.clone()
    }

    fn set_value(&mut self, value: Value) {
        self.value = value;
    }
}

/// Built-in `json` field type: edits a sub-value as raw JSON
pub struct JsonComponent;

#[async_trait]
impl FieldComponent for JsonComponent {
    fn name(&self) -> &str {
        "json"
    }

    async fn create(&self, value: Value, _path: &FieldPath) -> FormResult<Box<dyn FieldWidget>> {
        Ok(Box::new(JsonWidget::new(value)))
    }
}

type CreateFn = dyn Fn(Value, &FieldPath) -> FormResult<Box<dyn FieldWidget>> + Send + Sync;

/// Component backed by a synchronous closure
pub struct FnComponent {
    name: String,
    create: Box<CreateFn>,
}

impl FnComponent {
    pub fn new<F>(name: impl Into<String>, create: F) -> Self
    where
        F: Fn(Value, &FieldPath) -> FormResult<Box<dyn FieldWidget>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            create: Box::new(create),
        }
    }
}

#[async_trait]
impl FieldComponent for FnComponent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create(&self, value: Value, path: &FieldPath) -> FormResult<Box<dyn FieldWidget>> {
        (self.create)(value, path)
    }
}

/// Explicit, per-application set of custom field types
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    components: HashMap<String, Arc<dyn FieldComponent>>,
}

impl ComponentRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `json` type
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(JsonComponent));
        registry
    }

    /// Register a component under its own name, replacing any previous one
    pub fn register(&mut self, component: Arc<dyn FieldComponent>) -> &mut Self {
        self.components
            .insert(component.name().to_string(), component);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn FieldComponent>> {
        self.components.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.components.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_registry_lookup() {
        let mut registry = ComponentRegistry::with_builtins();
        registry.register(Arc::new(FnComponent::new("color", |value, _path| {
            Ok(Box::new(JsonWidget::new(value)) as Box<dyn FieldWidget>)
        })));

        assert_eq!(registry.names(), vec!["color".to_string(), "json".to_string()]);
        assert!(registry.get("missing").is_none());

        let component = registry.get("json").unwrap();
        let mut widget = component
            .create(json!({"a": 1}), &FieldPath::parse("raw"))
            .await
            .unwrap();
        assert_eq!(widget.value(), json!({"a": 1}));
        widget.set_value(json!([1, 2]));
        assert_eq!(widget.value(), json!([1, 2]));
    }
}
