//! Array Field Component
//!
//! Array containers with Add Item and per-item Remove buttons. Items of
//! sortable arrays can be dragged onto another item to take its position.

use formloom::{NodeId, NodeView};
use leptos::prelude::*;
use leptos::web_sys;

use super::form_view::{render_children, FormHandle};

#[component]
pub fn ArrayView(node: NodeView, sortable: bool, handle: FormHandle) -> impl IntoView {
    let array_id = node.id;
    let style = if node.hidden { "display: none" } else { "" };
    let count = node.children.len();

    let form = handle.form.clone();
    let on_add = move |_| {
        let form = form.clone();
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = form.add_item(array_id).await {
                log::error!("Failed to add item to {}: {}", array_id, e);
            }
        });
    };

    let items = node
        .children
        .into_iter()
        .enumerate()
        .map(|(position, item)| {
            view! { <ArrayItem item=item position=position sortable=sortable handle=handle.clone() /> }
        })
        .collect::<Vec<_>>();

    view! {
        <div class="fl-array" style=style>
            <div class="fl-array-header">
                <span class="fl-count">{format!("Items: {}", count)}</span>
                <button type="button" class="fl-add" on:click=on_add>
                    "Add Item"
                </button>
            </div>
            {(count == 0).then(|| view! {
                <div class="fl-empty">"No items. Click \"Add Item\" to add one."</div>
            })}
            <div class="fl-items">{items}</div>
        </div>
    }
}

#[component]
fn ArrayItem(item: NodeView, position: usize, sortable: bool, handle: FormHandle) -> impl IntoView {
    let item_id = item.id;
    let style = if item.hidden { "display: none" } else { "" };
    let dragging = handle.dragging;

    let form = handle.form.clone();
    let on_remove = move |_| {
        let form = form.clone();
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = form.remove_item(item_id).await {
                log::error!("Failed to remove {}: {}", item_id, e);
            }
        });
    };

    let on_dragstart = move |ev: web_sys::DragEvent| {
        if !sortable {
            return;
        }
        if let Some(transfer) = ev.data_transfer() {
            // Firefox only starts a drag that carries data
            let _ = transfer.set_data("text/plain", &item_id.to_string());
        }
        dragging.set(Some(item_id));
    };

    let on_dragover = move |ev: web_sys::DragEvent| {
        if sortable && dragging.get_untracked().is_some() {
            ev.prevent_default();
        }
    };

    let form = handle.form.clone();
    let on_drop = move |ev: web_sys::DragEvent| {
        ev.prevent_default();
        let Some(dragged) = dragging.get_untracked() else {
            return;
        };
        dragging.set(None);
        if dragged == item_id {
            return;
        }
        let form = form.clone();
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = form.move_item(dragged, position).await {
                log::error!("Failed to move {}: {}", dragged, e);
            }
        });
    };

    let children = render_children(item.children, &handle);

    view! {
        <div
            class="fl-item"
            style=style
            draggable=if sortable { "true" } else { "false" }
            on:dragstart=on_dragstart
            on:dragover=on_dragover
            on:drop=on_drop
            on:dragend=move |_| dragging.set(None::<NodeId>)
        >
            <div class="fl-item-header">
                {sortable.then(|| view! { <span class="fl-handle" title="Drag to reorder">"::"</span> })}
                <span class="fl-item-index">{format!("#{}", position + 1)}</span>
                <button type="button" class="fl-remove" on:click=on_remove>
                    "Remove"
                </button>
            </div>
            {children}
        </div>
    }
}
