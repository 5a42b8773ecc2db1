//! Form templates
//!
//! A template describes one field: its key, its kind and how it behaves. The
//! kind is an explicit sum type so that rendering dispatches exhaustively.
//! Templates can be written as data (JSON, YAML or TOML, including the
//! `"key:type"` shorthand) or built in code, which is the only way to attach
//! callbacks such as hidden predicates, option producers and redraw handlers.

use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::component::FieldComponent;
use crate::error::{FormError, FormResult};
use crate::input::{InputKind, SelectOption};
use crate::path::FieldPath;

/// Type name used when a template omits `type`
pub const DEFAULT_TYPE: &str = "string";

/// Predicate deciding whether a field is hidden, given the form value (hidden
/// fields left out), the field's resolved path and the field's own value
pub type HiddenFn = Arc<dyn Fn(&Value, &FieldPath, &Value) -> bool + Send + Sync>;

/// Asynchronous producer of select options, given the field's current value
pub type OptionsFn = Arc<dyn Fn(Value) -> BoxFuture<'static, FormResult<Vec<SelectOption>>> + Send + Sync>;

/// Rewrites a field's template from the current values of its redraw paths
pub type RedrawFn = Arc<dyn Fn(&[Option<Value>], &Template) -> Template + Send + Sync>;

/// Called after a field has been rendered with its path and value
pub type AfterRenderFn = Arc<dyn Fn(&FieldPath, &Value) + Send + Sync>;

/// Visibility rule of a field
#[derive(Clone)]
pub enum Hidden {
    Always(bool),
    When(HiddenFn),
}

impl Hidden {
    pub fn evaluate(&self, form_value: &Value, path: &FieldPath, own_value: &Value) -> bool {
        match self {
            Hidden::Always(hidden) => *hidden,
            Hidden::When(predicate) => predicate(form_value, path, own_value),
        }
    }
}

impl fmt::Debug for Hidden {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hidden::Always(hidden) => write!(f, "Always({})", hidden),
            Hidden::When(_) => write!(f, "When(<fn>)"),
        }
    }
}

/// Choices of a select field
#[derive(Clone)]
pub enum Options {
    Static(Vec<SelectOption>),
    Dynamic(OptionsFn),
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Options::Static(options) => f.debug_tuple("Static").field(options).finish(),
            Options::Dynamic(_) => write!(f, "Dynamic(<fn>)"),
        }
    }
}

/// Fields whose changes re-render this one
#[derive(Clone, Default)]
pub struct Redraw {
    pub paths: Vec<String>,
    pub handler: Option<RedrawFn>,
}

impl fmt::Debug for Redraw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Redraw")
            .field("paths", &self.paths)
            .field("handler", &self.handler.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Attributes shared by every template kind
#[derive(Clone, Default)]
pub struct FieldMeta {
    pub key: Option<String>,
    pub name: Option<String>,
    pub hint: Option<String>,
    pub placeholder: Option<String>,
    pub default: Option<Value>,
    pub disabled: bool,
    pub format: Option<String>,
    pub style: Option<String>,
    pub trim: Option<bool>,
    pub hidden: Option<Hidden>,
    pub redraw: Option<Redraw>,
    pub after_render: Option<AfterRenderFn>,
}

impl fmt::Debug for FieldMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMeta")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("default", &self.default)
            .field("disabled", &self.disabled)
            .field("format", &self.format)
            .field("hidden", &self.hidden)
            .field("redraw", &self.redraw)
            .finish_non_exhaustive()
    }
}

/// Layout-only markers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutKind {
    Header,
    Description,
    Rule,
}

/// Where a custom field's component comes from
#[derive(Clone)]
pub enum CustomSource {
    /// Looked up in the form's registry at render time
    Named(String),
    /// Supplied directly
    Component(Arc<dyn FieldComponent>),
}

impl CustomSource {
    pub fn name(&self) -> &str {
        match self {
            CustomSource::Named(name) => name,
            CustomSource::Component(component) => component.name(),
        }
    }
}

impl fmt::Debug for CustomSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomSource::Named(name) => f.debug_tuple("Named").field(name).finish(),
            CustomSource::Component(c) => f.debug_tuple("Component").field(&c.name()).finish(),
        }
    }
}

/// Kind-specific part of a template
#[derive(Clone, Debug)]
pub enum TemplateKind {
    /// One input-bearing field
    Primitive {
        input: InputKind,
        options: Option<Options>,
    },
    /// Nested object: children share this field's path as prefix
    Object { children: Vec<Template> },
    /// Repeating items, each an expansion of `children`
    Array {
        children: Vec<Template>,
        sortable: bool,
    },
    /// Field rendered by a custom component
    Custom(CustomSource),
    /// Header, description or rule; never serialized
    Layout { kind: LayoutKind, text: Option<String> },
    /// Unkeyed list of templates
    Group(Vec<Template>),
}

/// Declarative description of one form field
#[derive(Clone, Debug)]
pub struct Template {
    pub meta: FieldMeta,
    pub kind: TemplateKind,
}

impl Template {
    fn with_kind(key: Option<&str>, kind: TemplateKind) -> Self {
        Self {
            meta: FieldMeta {
                key: key.map(str::to_string),
                ..Default::default()
            },
            kind,
        }
    }

    pub fn input(key: &str, input: InputKind) -> Self {
        Self::with_kind(Some(key), TemplateKind::Primitive { input, options: None })
    }

    /// Input without a key: its value becomes the enclosing value itself
    pub fn unkeyed(input: InputKind) -> Self {
        Self::with_kind(None, TemplateKind::Primitive { input, options: None })
    }

    pub fn string(key: &str) -> Self {
        Self::input(key, InputKind::String)
    }

    pub fn text(key: &str) -> Self {
        Self::input(key, InputKind::Text)
    }

    pub fn number(key: &str) -> Self {
        Self::input(key, InputKind::Number)
    }

    pub fn boolean(key: &str) -> Self {
        Self::input(key, InputKind::Boolean)
    }

    pub fn checkbox(key: &str) -> Self {
        Self::input(key, InputKind::Checkbox)
    }

    pub fn datetime(key: &str) -> Self {
        Self::input(key, InputKind::Datetime)
    }

    pub fn select(key: &str, options: Vec<SelectOption>) -> Self {
        Self::with_kind(
            Some(key),
            TemplateKind::Primitive {
                input: InputKind::Select,
                options: Some(Options::Static(options)),
            },
        )
    }

    pub fn object(key: &str, children: Vec<Template>) -> Self {
        Self::with_kind(Some(key), TemplateKind::Object { children })
    }

    pub fn array(key: &str, children: Vec<Template>) -> Self {
        Self::with_kind(
            Some(key),
            TemplateKind::Array {
                children,
                sortable: false,
            },
        )
    }

    pub fn custom(key: &str, type_name: &str) -> Self {
        Self::with_kind(
            Some(key),
            TemplateKind::Custom(CustomSource::Named(type_name.to_string())),
        )
    }

    pub fn component(key: &str, component: Arc<dyn FieldComponent>) -> Self {
        Self::with_kind(Some(key), TemplateKind::Custom(CustomSource::Component(component)))
    }

    pub fn layout(kind: LayoutKind, text: Option<&str>) -> Self {
        Self::with_kind(
            None,
            TemplateKind::Layout {
                kind,
                text: text.map(str::to_string),
            },
        )
    }

    pub fn header(text: &str) -> Self {
        Self::layout(LayoutKind::Header, Some(text))
    }

    pub fn group(children: Vec<Template>) -> Self {
        Self::with_kind(None, TemplateKind::Group(children))
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.meta.name = Some(name.to_string());
        self
    }

    pub fn with_hint(mut self, hint: &str) -> Self {
        self.meta.hint = Some(hint.to_string());
        self
    }

    pub fn with_placeholder(mut self, placeholder: &str) -> Self {
        self.meta.placeholder = Some(placeholder.to_string());
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.meta.default = Some(default);
        self
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.meta.format = Some(format.to_string());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.meta.disabled = true;
        self
    }

    pub fn trim(mut self, trim: bool) -> Self {
        self.meta.trim = Some(trim);
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.meta.hidden = Some(Hidden::Always(hidden));
        self
    }

    pub fn hidden_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Value, &FieldPath, &Value) -> bool + Send + Sync + 'static,
    {
        self.meta.hidden = Some(Hidden::When(Arc::new(predicate)));
        self
    }

    /// Re-render this field whenever one of `paths` changes value
    pub fn redraw_on<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let redraw = self.meta.redraw.get_or_insert_with(Redraw::default);
        redraw.paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_redraw_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&[Option<Value>], &Template) -> Template + Send + Sync + 'static,
    {
        let redraw = self.meta.redraw.get_or_insert_with(Redraw::default);
        redraw.handler = Some(Arc::new(handler));
        self
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        if let TemplateKind::Primitive { options: slot, .. } = &mut self.kind {
            *slot = Some(Options::Static(options));
        }
        self
    }

    pub fn with_options_fn<F>(mut self, producer: F) -> Self
    where
        F: Fn(Value) -> BoxFuture<'static, FormResult<Vec<SelectOption>>> + Send + Sync + 'static,
    {
        if let TemplateKind::Primitive { options: slot, .. } = &mut self.kind {
            *slot = Some(Options::Dynamic(Arc::new(producer)));
        }
        self
    }

    pub fn sortable(mut self, enabled: bool) -> Self {
        if let TemplateKind::Array { sortable, .. } = &mut self.kind {
            *sortable = enabled;
        }
        self
    }

    pub fn after_render<F>(mut self, hook: F) -> Self
    where
        F: Fn(&FieldPath, &Value) + Send + Sync + 'static,
    {
        self.meta.after_render = Some(Arc::new(hook));
        self
    }

    pub fn key(&self) -> Option<&str> {
        self.meta.key.as_deref()
    }

    /// Label shown for the field: its name, else its key
    pub fn label(&self) -> Option<&str> {
        self.meta.name.as_deref().or(self.meta.key.as_deref())
    }

    /// Type name as written in template data
    pub fn type_name(&self) -> &str {
        match &self.kind {
            TemplateKind::Primitive { input, .. } => input.type_name(),
            TemplateKind::Object { .. } => "object",
            TemplateKind::Array { .. } => "array",
            TemplateKind::Custom(source) => source.name(),
            TemplateKind::Layout { kind, .. } => match kind {
                LayoutKind::Header => "header",
                LayoutKind::Description => "description",
                LayoutKind::Rule => "hr",
            },
            TemplateKind::Group(_) => "group",
        }
    }

    /// Parse template data with `string` as the default type
    pub fn from_value(value: &Value) -> FormResult<Self> {
        Self::from_value_with_default(value, DEFAULT_TYPE)
    }

    /// Parse template data; fields without a `type` get `default_type`
    pub fn from_value_with_default(value: &Value, default_type: &str) -> FormResult<Self> {
        match value {
            Value::String(shorthand) => Ok(parse_shorthand(shorthand, default_type)),
            Value::Array(items) => {
                let children = items
                    .iter()
                    .map(|item| Self::from_value_with_default(item, default_type))
                    .collect::<FormResult<Vec<_>>>()?;
                Ok(Self::group(children))
            }
            Value::Object(obj) => {
                // `{ fields = [...] }` documents (TOML has no top-level arrays)
                if !obj.contains_key("type") && !obj.contains_key("key") {
                    if let Some(fields) = obj.get("fields") {
                        return Self::from_value_with_default(fields, default_type);
                    }
                }
                parse_object(value, default_type)
            }
            other => Err(FormError::Template(format!(
                "expected a string, list or object template, got {}",
                other
            ))),
        }
    }

    /// Load template data from a `.json`, `.yaml`/`.yml` or `.toml` file
    pub fn load(path: &Path, default_type: &str) -> FormResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let value: Value = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "toml" => toml::from_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };
        Self::from_value_with_default(&value, default_type)
    }
}

fn parse_shorthand(shorthand: &str, default_type: &str) -> Template {
    match shorthand.split_once(':') {
        Some((key, type_name)) => {
            let type_name = if type_name.trim().is_empty() {
                default_type
            } else {
                type_name.trim()
            };
            let mut template = template_for_type(type_name, Vec::new());
            template.meta.key = Some(key.trim().to_string());
            template
        }
        None => template_for_type(shorthand.trim(), Vec::new()),
    }
}

fn template_for_type(type_name: &str, children: Vec<Template>) -> Template {
    let kind = if let Some(input) = InputKind::from_type_name(type_name) {
        TemplateKind::Primitive { input, options: None }
    } else {
        match type_name {
            "object" | "compound" => TemplateKind::Object { children },
            "array" => TemplateKind::Array {
                children,
                sortable: false,
            },
            "header" => TemplateKind::Layout {
                kind: LayoutKind::Header,
                text: None,
            },
            "description" => TemplateKind::Layout {
                kind: LayoutKind::Description,
                text: None,
            },
            "hr" => TemplateKind::Layout {
                kind: LayoutKind::Rule,
                text: None,
            },
            other => TemplateKind::Custom(CustomSource::Named(other.to_string())),
        }
    };
    Template {
        meta: FieldMeta::default(),
        kind,
    }
}

fn parse_object(value: &Value, default_type: &str) -> FormResult<Template> {
    let type_name = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or(default_type);

    let children = match value.get("children") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| Template::from_value_with_default(item, default_type))
            .collect::<FormResult<Vec<_>>>()?,
        Some(single @ (Value::Object(_) | Value::String(_))) => {
            vec![Template::from_value_with_default(single, default_type)?]
        }
        _ => Vec::new(),
    };

    let mut template = template_for_type(type_name, children);
    let text = |field: &str| value.get(field).and_then(Value::as_str).map(str::to_string);

    template.meta.key = text("key");
    template.meta.name = text("name");
    template.meta.hint = text("hint");
    template.meta.placeholder = text("placeholder");
    template.meta.format = text("format");
    template.meta.style = text("style");
    template.meta.default = value.get("default").cloned();
    template.meta.disabled = value.get("disabled").and_then(Value::as_bool).unwrap_or(false);
    template.meta.trim = value.get("trim").and_then(Value::as_bool);
    template.meta.hidden = value.get("hidden").and_then(Value::as_bool).map(Hidden::Always);
    template.meta.redraw = match value.get("redraw") {
        Some(Value::String(path)) => Some(Redraw {
            paths: vec![path.clone()],
            handler: None,
        }),
        Some(Value::Array(paths)) => Some(Redraw {
            paths: paths.iter().filter_map(Value::as_str).map(str::to_string).collect(),
            handler: None,
        }),
        _ => None,
    };

    match &mut template.kind {
        TemplateKind::Primitive { options, .. } => {
            *options = value.get("options").and_then(parse_options).map(Options::Static);
        }
        TemplateKind::Array { sortable, .. } => {
            *sortable = value
                .get("config")
                .and_then(|c| c.get("sortable"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
        }
        TemplateKind::Layout { text: layout_text, .. } => {
            *layout_text = template.meta.name.clone().or_else(|| template.meta.hint.clone());
        }
        _ => {}
    }

    Ok(template)
}

fn parse_options(value: &Value) -> Option<Vec<SelectOption>> {
    match value {
        Value::Array(items) => Some(items.iter().map(SelectOption::from_value).collect()),
        Value::Object(map) => Some(
            map.iter()
                .map(|(k, label)| SelectOption::new(k.clone(), crate::input::raw_text(label)))
                .collect(),
        ),
        _ => None,
    }
}
