//! Template expansion
//!
//! Turns templates plus a value into detached [`Fragment`]s. Rendering is
//! asynchronous because option producers and custom components may be. Every
//! field is wrapped in a field node that carries its template, so hidden and
//! redraw rules can find it again.

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::component::ComponentRegistry;
use crate::document::{Fragment, InputNode, NodeKind};
use crate::error::FormResult;
use crate::input::format_value;
use crate::path::FieldPath;
use crate::template::{CustomSource, Hidden, Options, Template, TemplateKind};

/// Shared inputs of one render pass
#[derive(Clone, Debug, Default)]
pub struct RenderContext {
    pub registry: Arc<ComponentRegistry>,
    pub trim_strings: bool,
}

/// The value a field renders with: `value[key]`, falling back to the
/// template default when missing or null. Unkeyed templates use `value`.
pub fn field_value(template: &Template, value: &Value) -> Value {
    let own = match template.key() {
        Some(key) => value.get(key).cloned().unwrap_or(Value::Null),
        None => value.clone(),
    };
    if own.is_null() {
        template.meta.default.clone().unwrap_or(Value::Null)
    } else {
        own
    }
}

/// Path of a field rendered under `base`
pub fn field_path(template: &Template, base: &FieldPath) -> FieldPath {
    match template.key() {
        Some(key) => base.push_key(key),
        None => base.clone(),
    }
}

/// Render a list of templates against one value, in order
pub fn json_to_html<'a>(
    ctx: &'a RenderContext,
    templates: &'a [Template],
    value: &'a Value,
    base: &'a FieldPath,
) -> BoxFuture<'a, FormResult<Vec<Fragment>>> {
    async move {
        let mut fragments = Vec::with_capacity(templates.len());
        for template in templates {
            fragments.push(one_item(ctx, template, value, base).await?);
        }
        Ok(fragments)
    }
    .boxed()
}

/// Render one field, wrapped in its field node
pub fn one_item<'a>(
    ctx: &'a RenderContext,
    template: &'a Template,
    value: &'a Value,
    base: &'a FieldPath,
) -> BoxFuture<'a, FormResult<Fragment>> {
    async move {
        let own_value = field_value(template, value);
        let path = field_path(template, base);
        let content = render_content(ctx, template, &own_value, &path).await?;

        let mut slot = Fragment::new(
            NodeKind::Field {
                template: template.clone(),
                base: base.clone(),
            },
            Some(path.clone()),
        )
        .with_children(content);
        if let Some(Hidden::Always(hidden)) = &template.meta.hidden {
            slot.hidden = *hidden;
        }

        if let Some(hook) = &template.meta.after_render {
            hook(&path, &own_value);
        }
        Ok(slot)
    }
    .boxed()
}

/// Render the content of a field node (everything below the wrapper)
pub async fn render_content(
    ctx: &RenderContext,
    template: &Template,
    own_value: &Value,
    path: &FieldPath,
) -> FormResult<Vec<Fragment>> {
    debug!(path = %path, kind = template.type_name(), "Rendering field");

    let fragments = match &template.kind {
        TemplateKind::Primitive { input, options } => {
            let options = match options {
                Some(Options::Static(options)) => options.clone(),
                Some(Options::Dynamic(producer)) => producer(own_value.clone()).await?,
                None => Vec::new(),
            };
            let node = InputNode {
                kind: *input,
                state: format_value(*input, own_value),
                options,
                format: template.meta.format.clone(),
                trim: template.meta.trim.unwrap_or(ctx.trim_strings),
                disabled: template.meta.disabled,
                placeholder: template.meta.placeholder.clone(),
            };
            vec![Fragment::new(NodeKind::Input(node), Some(path.clone()))]
        }
        TemplateKind::Object { children } | TemplateKind::Group(children) => {
            let inner = json_to_html(ctx, children, own_value, path).await?;
            vec![Fragment::new(NodeKind::Group, None).with_children(inner)]
        }
        TemplateKind::Array { children, sortable } => {
            let mut items = Vec::new();
            if let Some(values) = own_value.as_array() {
                for item in values {
                    items.push(render_item(ctx, children, item, path).await?);
                }
            }
            vec![Fragment::new(
                NodeKind::Array {
                    children: children.clone(),
                    sortable: *sortable,
                },
                Some(path.clone()),
            )
            .with_children(items)]
        }
        TemplateKind::Custom(source) => {
            let component = match source {
                CustomSource::Component(component) => Some(component.clone()),
                CustomSource::Named(name) => ctx.registry.get(name),
            };
            match component {
                Some(component) => {
                    let widget = component.create(own_value.clone(), path).await?;
                    vec![Fragment::new(
                        NodeKind::Custom {
                            type_name: source.name().to_string(),
                            widget,
                        },
                        Some(path.clone()),
                    )]
                }
                None => {
                    warn!(path = %path, type_name = source.name(), "Unknown field type, rendering nothing");
                    Vec::new()
                }
            }
        }
        TemplateKind::Layout { kind, text } => vec![Fragment::new(
            NodeKind::Layout {
                kind: *kind,
                text: text.clone(),
            },
            None,
        )],
    };
    Ok(fragments)
}

/// Render one array item from the array's child templates
pub fn render_item<'a>(
    ctx: &'a RenderContext,
    children: &'a [Template],
    item_value: &'a Value,
    array_path: &'a FieldPath,
) -> BoxFuture<'a, FormResult<Fragment>> {
    async move {
        let item_path = array_path.push_each();
        let inner = json_to_html(ctx, children, item_value, &item_path).await?;
        Ok(Fragment::new(
            NodeKind::Item {
                keyed: children.iter().any(produces_keys),
            },
            Some(item_path),
        )
        .with_children(inner))
    }
    .boxed()
}

/// Whether rendering `template` yields keyed values (items read back as objects)
pub fn produces_keys(template: &Template) -> bool {
    if template.key().is_some() {
        return true;
    }
    match &template.kind {
        TemplateKind::Object { children } | TemplateKind::Group(children) => {
            children.iter().any(produces_keys)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::assemble;
    use crate::document::Document;
    use crate::input::InputKind;
    use serde_json::json;

    async fn render_and_read(template: &Template, value: &Value) -> Value {
        let ctx = RenderContext::default();
        let mut doc = Document::new();
        let root = doc.root();
        let fragment = one_item(&ctx, template, value, &FieldPath::root()).await.unwrap();
        doc.attach(root, None, fragment);
        assemble(&doc.entries(false))
    }

    #[test]
    fn test_field_value_defaults() {
        let t = Template::string("name").with_default(json!("anon"));
        assert_eq!(field_value(&t, &json!({"name": "Al"})), json!("Al"));
        assert_eq!(field_value(&t, &json!({"name": null})), json!("anon"));
        assert_eq!(field_value(&t, &json!({})), json!("anon"));
        assert_eq!(field_value(&t, &Value::Null), json!("anon"));

        let unkeyed = Template::unkeyed(InputKind::String);
        assert_eq!(field_value(&unkeyed, &json!("x")), json!("x"));
    }

    #[tokio::test]
    async fn test_object_children_share_prefix() {
        let template = Template::group(vec![Template::object(
            "address",
            vec![Template::string("street"), Template::string("city")],
        )]);
        let value = json!({"address": {"street": "Main", "city": "Oslo"}});
        assert_eq!(render_and_read(&template, &value).await, value);
    }

    #[tokio::test]
    async fn test_primitive_array_items() {
        let template = Template::group(vec![Template::array(
            "tags",
            vec![Template::unkeyed(InputKind::String)],
        )]);
        let value = json!({"tags": ["a", "b"]});
        assert_eq!(render_and_read(&template, &value).await, value);
    }

    #[tokio::test]
    async fn test_layout_and_unknown_types_render_no_values() {
        let template = Template::group(vec![
            Template::header("Profile"),
            Template::custom("avatar", "not-registered"),
            Template::string("name"),
        ]);
        let value = json!({"name": "Al", "avatar": "x.png"});
        assert_eq!(render_and_read(&template, &value).await, json!({"name": "Al"}));
    }

    #[test]
    fn test_produces_keys() {
        assert!(produces_keys(&Template::string("a")));
        assert!(!produces_keys(&Template::unkeyed(InputKind::Number)));
        assert!(produces_keys(&Template::group(vec![Template::string("a")])));
        assert!(!produces_keys(&Template::header("x")));
    }
}
