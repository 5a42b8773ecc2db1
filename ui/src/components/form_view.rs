//! Form View
//!
//! Renders a [`Form`] from its document snapshot. The view holds no form
//! state of its own: every edit goes through the form's edit API, and the
//! view re-renders from a fresh snapshot whenever a change cycle completes.

use formloom::{Form, NodeId, NodeView, ViewKind};
use futures::StreamExt;
use leptos::prelude::*;
use serde_json::Value;

use super::array_field::ArrayView;
use super::fields::{CustomWidget, InputField};

/// Shared by every node renderer of one form
#[derive(Clone)]
pub struct FormHandle {
    pub form: Form,
    /// Item currently being dragged
    pub dragging: RwSignal<Option<NodeId>>,
}

/// Builds `form` from `initial` and renders it live
#[component]
pub fn FormView(form: Form, initial: Value, value: RwSignal<Value>) -> impl IntoView {
    let snapshot = RwSignal::new(None::<NodeView>);
    let handle = FormHandle {
        form: form.clone(),
        dragging: RwSignal::new(None),
    };

    wasm_bindgen_futures::spawn_local(async move {
        let mut events = form.subscribe().await;
        if let Err(e) = form.build(initial).await {
            log::error!("Failed to build form: {}", e);
        }
        while let Some(event) = events.next().await {
            log::debug!("Change cycle {} complete", event.cycle);
            snapshot.set(Some(form.snapshot().await));
            value.set(event.value);
        }
    });

    view! {
        <form class="fl-form" on:submit=|ev| ev.prevent_default()>
            {move || match snapshot.get() {
                Some(root) => render_node(root, handle.clone()),
                None => view! { <div class="fl-loading">"Loading form..."</div> }.into_any(),
            }}
        </form>
    }
}

pub fn render_children(children: Vec<NodeView>, handle: &FormHandle) -> Vec<AnyView> {
    children
        .into_iter()
        .map(|child| render_node(child, handle.clone()))
        .collect()
}

/// Render one document node and its subtree
pub fn render_node(node: NodeView, handle: FormHandle) -> AnyView {
    let style = if node.hidden { "display: none" } else { "" };

    match node.content.clone() {
        ViewKind::Group => view! {
            <div class="fl-group" style=style>
                {render_children(node.children, &handle)}
            </div>
        }
        .into_any(),
        ViewKind::Field { label, hint, type_name } => view! {
            <div
                class=format!("fl-field fl-{}", type_name)
                style=style
                data-path=node.resolved.clone().unwrap_or_default()
            >
                {label.map(|label| view! { <label class="fl-label">{label}</label> })}
                {render_children(node.children, &handle)}
                {hint.map(|hint| view! { <p class="fl-hint">{hint}</p> })}
            </div>
        }
        .into_any(),
        ViewKind::Array { sortable } => view! {
            <ArrayView node=node sortable=sortable handle=handle />
        }
        .into_any(),
        // Items only occur below arrays, which render them
        ViewKind::Item => view! {
            <div class="fl-item" style=style>
                {render_children(node.children, &handle)}
            </div>
        }
        .into_any(),
        ViewKind::Input {
            kind,
            raw,
            checked,
            options,
            disabled,
            placeholder,
        } => view! {
            <InputField
                id=node.id
                kind=kind
                raw=raw
                checked=checked
                options=options
                disabled=disabled
                placeholder=placeholder
                form=handle.form
            />
        }
        .into_any(),
        ViewKind::Custom { type_name, value } => view! {
            <CustomWidget id=node.id type_name=type_name value=value form=handle.form />
        }
        .into_any(),
        ViewKind::Layout { kind, text } => {
            let text = text.unwrap_or_default();
            match kind {
                "header" => view! { <h3 class="fl-header" style=style>{text}</h3> }.into_any(),
                "description" => {
                    view! { <p class="fl-description" style=style>{text}</p> }.into_any()
                }
                _ => view! { <hr class="fl-rule" style=style /> }.into_any(),
            }
        }
    }
}
