//! Input Field Renderers
//!
//! One control per input kind. Controls commit on `change`, so each commit is
//! exactly one edit and one change cycle.

use formloom::input::is_truthy;
use formloom::{Form, InputKind, InputValue, NodeId, SelectOption};
use leptos::prelude::*;
use leptos::web_sys;
use serde_json::Value;

/// Apply an edit and let the change cycle re-render the form
fn submit(form: Form, id: NodeId, input: InputValue) {
    wasm_bindgen_futures::spawn_local(async move {
        if let Err(e) = form.set_input(id, input).await {
            log::error!("Edit of {} failed: {}", id, e);
        }
    });
}

/// `datetime-local` inputs take `YYYY-MM-DDTHH:MM`
fn datetime_local(raw: &str) -> String {
    raw.get(..16).unwrap_or(raw).to_string()
}

#[component]
pub fn InputField(
    id: NodeId,
    kind: InputKind,
    raw: String,
    checked: bool,
    options: Vec<SelectOption>,
    disabled: bool,
    placeholder: Option<String>,
    form: Form,
) -> impl IntoView {
    let on_text = {
        let form = form.clone();
        move |ev: web_sys::Event| submit(form.clone(), id, InputValue::Text(event_target_value(&ev)))
    };
    let placeholder = placeholder.unwrap_or_default();

    match kind {
        InputKind::String => view! {
            <input
                type="text"
                class="fl-input"
                placeholder=placeholder
                disabled=disabled
                prop:value=raw
                on:change=on_text
            />
        }
        .into_any(),
        InputKind::Text => view! {
            <textarea
                class="fl-input fl-textarea"
                rows="4"
                placeholder=placeholder
                disabled=disabled
                prop:value=raw
                on:change=on_text
            ></textarea>
        }
        .into_any(),
        InputKind::Number => view! {
            <input
                type="number"
                step="any"
                class="fl-input"
                placeholder=placeholder
                disabled=disabled
                prop:value=raw
                on:change=on_text
            />
        }
        .into_any(),
        InputKind::Datetime => view! {
            <input
                type="datetime-local"
                class="fl-input"
                disabled=disabled
                prop:value=datetime_local(&raw)
                on:change=on_text
            />
        }
        .into_any(),
        InputKind::Boolean => {
            let current = if is_truthy(&raw) { "true" } else { "false" };
            view! {
                <select class="fl-input" disabled=disabled prop:value=current on:change=on_text>
                    <option value="true">"Yes"</option>
                    <option value="false">"No"</option>
                </select>
            }
            .into_any()
        }
        InputKind::Checkbox | InputKind::Toggle => {
            let class = if kind == InputKind::Toggle { "fl-toggle" } else { "fl-checkbox" };
            view! {
                <input
                    type="checkbox"
                    class=class
                    disabled=disabled
                    prop:checked=checked
                    on:change=move |ev| {
                        submit(form.clone(), id, InputValue::Checked(event_target_checked(&ev)))
                    }
                />
            }
            .into_any()
        }
        InputKind::Select => {
            // Keep a value that is not among the options selectable
            let known = options.iter().any(|opt| opt.key() == raw);
            view! {
                <select class="fl-input" disabled=disabled prop:value=raw.clone() on:change=on_text>
                    {(!known).then(|| view! { <option value=raw.clone()>{raw.clone()}</option> })}
                    {options
                        .into_iter()
                        .map(|opt| view! { <option value=opt.key()>{opt.label.clone()}</option> })
                        .collect::<Vec<_>>()}
                </select>
            }
            .into_any()
        }
    }
}

/// Fallback editor for custom field types: the widget's value as JSON
#[component]
pub fn CustomWidget(id: NodeId, type_name: String, value: Value, form: Form) -> impl IntoView {
    let text = serde_json::to_string_pretty(&value).unwrap_or_default();

    let on_change = move |ev: web_sys::Event| {
        let raw = event_target_value(&ev);
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => {
                let form = form.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    if let Err(e) = form.set_custom(id, value).await {
                        log::error!("Edit of {} failed: {}", id, e);
                    }
                });
            }
            Err(e) => log::warn!("Ignoring invalid JSON for {}: {}", id, e),
        }
    };

    view! {
        <div class=format!("fl-custom fl-custom-{}", type_name)>
            <textarea class="fl-input fl-json" rows="6" prop:value=text on:change=on_change></textarea>
        </div>
    }
}
