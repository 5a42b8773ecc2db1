//! # Formloom - Declarative Form Templates
//!
//! Formloom interprets a declarative form template against a JSON value: it
//! renders the value into a live document of typed inputs, lets a user (or
//! code) edit that document, and reads it back into a JSON value of the same
//! shape.
//!
//! ## Features
//!
//! - **Field types**: string, text, number, checkbox, toggle, boolean, datetime, select
//! - **Structure**: nested objects and arrays with add, remove and reorder
//! - **Rules**: per-field hidden predicates and redraw dependencies
//! - **Custom types**: explicit [`ComponentRegistry`] of [`FieldComponent`]s
//! - **Change cycles**: ordered async listeners, single-flight re-runs, change events
//! - **Templates as data**: JSON, YAML or TOML, with the `"key:type"` shorthand
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use formloom::{Form, Template};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let template = Template::from_value(&json!([
//!         "name:string",
//!         {"key": "tags", "type": "array", "children": ["value:string"]}
//!     ]))?;
//!
//!     let form = Form::new(template);
//!     form.build(json!({"name": "Al", "tags": [{"value": "a"}]})).await?;
//!
//!     let tags = form.find_array("tags").await.expect("rendered");
//!     form.add_item(tags).await?;
//!     form.edit("tags[1].value", "b").await?;
//!
//!     assert_eq!(form.json(false).await["tags"][1]["value"], "b");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Template**: what to render ([`template`], [`input`], [`component`])
//! - **Document**: the rendered, path-tagged node tree ([`document`], [`render`])
//! - **Read back**: path assembly into JSON ([`path`], [`assemble`])
//! - **Form**: the interpreter and its change cycle ([`form`])
//! - **Config**: settings and template loading ([`config`])

pub mod assemble;
#[cfg(feature = "cli")]
pub mod cli;
pub mod component;
pub mod config;
pub mod document;
pub mod error;
pub mod form;
pub mod input;
pub mod path;
pub mod render;
pub mod template;

pub use assemble::read_json_with_key;
pub use component::{ComponentRegistry, FieldComponent, FieldWidget, FnComponent, JsonWidget};
pub use document::{NodeId, NodeView, ViewKind};
pub use error::{FormError, FormResult};
pub use form::{ChangeEvent, Form, ListenerId};
pub use input::{InputKind, InputValue, SelectOption};
pub use path::FieldPath;
pub use template::Template;
