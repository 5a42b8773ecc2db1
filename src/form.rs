//! The form interpreter
//!
//! A [`Form`] owns a template and the document it renders into. `build`
//! renders a value, edits mutate the document, and every mutation runs one
//! change cycle: the form is read back, the registered change listeners run
//! in registration order, and a [`ChangeEvent`] goes out to subscribers.
//!
//! Change cycles are single-flight. A cycle requested while another one is
//! running is folded into a re-run of the running cycle, so listeners never
//! interleave and a listener may safely trigger further edits.

use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::assemble::{assemble, read_json_with_key};
use crate::component::ComponentRegistry;
use crate::config::FormSettings;
use crate::document::{Document, NodeId, NodeKind, NodeView};
use crate::error::{FormError, FormResult};
use crate::input::{is_truthy, InputValue};
use crate::path::FieldPath;
use crate::render::{self, RenderContext};
use crate::template::Template;

/// External change listener: receives the form value of the cycle
pub type ChangeListenerFn = Arc<dyn Fn(Value) -> BoxFuture<'static, FormResult<()>> + Send + Sync>;

/// Handle of a registered change listener
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Dispatched to subscribers once per completed change cycle
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeEvent {
    /// Number of completed cycles, starting at 1
    pub cycle: u64,
    pub value: Value,
}

#[derive(Clone)]
enum ListenerKind {
    Hidden { field: NodeId },
    Redraw { field: NodeId },
    External(ChangeListenerFn),
}

struct Registered {
    id: ListenerId,
    /// Field whose removal retires the listener
    owner: Option<NodeId>,
    kind: ListenerKind,
    /// Serialized redraw dependencies seen last
    cache: Option<String>,
}

struct FormState {
    document: Document,
    listeners: Vec<Registered>,
    value: Value,
    subscribers: Vec<UnboundedSender<ChangeEvent>>,
    cycle: u64,
    next_listener: u64,
}

impl FormState {
    fn push_listener(&mut self, owner: Option<NodeId>, kind: ListenerKind) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.push(Registered {
            id,
            owner,
            kind,
            cache: None,
        });
        id
    }

    /// Register hidden and redraw rules of every field below `subtree`
    fn register_rules(&mut self, subtree: NodeId) {
        let mut rules = Vec::new();
        for id in self.document.descendants(subtree) {
            if let Some(NodeKind::Field { template, .. }) = self.document.get(id).map(|n| &n.kind) {
                if template.meta.hidden.is_some() {
                    rules.push(ListenerKind::Hidden { field: id });
                }
                if template
                    .meta
                    .redraw
                    .as_ref()
                    .map(|r| !r.paths.is_empty())
                    .unwrap_or(false)
                {
                    rules.push(ListenerKind::Redraw { field: id });
                }
            }
        }
        for rule in rules {
            let owner = match &rule {
                ListenerKind::Hidden { field } | ListenerKind::Redraw { field } => Some(*field),
                ListenerKind::External(_) => None,
            };
            self.push_listener(owner, rule);
        }
    }

    fn prune_listeners(&mut self) {
        let document = &self.document;
        self.listeners
            .retain(|l| l.owner.map(|o| document.contains(o)).unwrap_or(true));
    }
}

#[derive(Default)]
struct CycleGate {
    running: bool,
    pending: bool,
}

struct Inner {
    template: Template,
    ctx: RenderContext,
    state: RwLock<FormState>,
    gate: Mutex<CycleGate>,
}

/// Resets the gate when a cycle ends by error
struct GateGuard<'a> {
    gate: &'a Mutex<CycleGate>,
    armed: bool,
}

impl GateGuard<'_> {
    /// Finish the cycle unless a re-run was requested. Deciding and releasing
    /// happen under one lock, so no request can land between the two.
    fn finish_or_rerun(&mut self) -> bool {
        let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        if gate.pending {
            gate.pending = false;
            return true;
        }
        gate.running = false;
        self.armed = false;
        false
    }
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        gate.running = false;
        gate.pending = false;
    }
}

/// Template interpreter bound to one live document. Cloning shares the form.
#[derive(Clone)]
pub struct Form {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Form").finish_non_exhaustive()
    }
}

impl Form {
    /// Form with an empty component registry and untrimmed strings
    pub fn new(template: Template) -> Self {
        Self::with_context(template, RenderContext::default())
    }

    pub fn with_registry(template: Template, registry: ComponentRegistry) -> Self {
        Self::with_context(
            template,
            RenderContext {
                registry: Arc::new(registry),
                trim_strings: false,
            },
        )
    }

    /// Form configured from the `[form]` settings section
    pub fn with_settings(template: Template, registry: ComponentRegistry, settings: &FormSettings) -> Self {
        Self::with_context(
            template,
            RenderContext {
                registry: Arc::new(registry),
                trim_strings: settings.trim_strings,
            },
        )
    }

    pub fn with_context(template: Template, ctx: RenderContext) -> Self {
        Self {
            inner: Arc::new(Inner {
                template,
                ctx,
                state: RwLock::new(FormState {
                    document: Document::new(),
                    listeners: Vec::new(),
                    value: Value::Null,
                    subscribers: Vec::new(),
                    cycle: 0,
                    next_listener: 0,
                }),
                gate: Mutex::new(CycleGate::default()),
            }),
        }
    }

    pub fn template(&self) -> &Template {
        &self.inner.template
    }

    /// Replace all content with a rendering of `value`, then run one change cycle
    pub async fn build(&self, value: Value) -> FormResult<&Self> {
        let templates = std::slice::from_ref(&self.inner.template);
        let fragments =
            render::json_to_html(&self.inner.ctx, templates, &value, &FieldPath::root()).await?;

        {
            let mut state = self.inner.state.write().await;
            state.document.clear();
            state.prune_listeners();
            let root = state.document.root();
            for fragment in fragments {
                let id = state.document.attach(root, None, fragment);
                state.register_rules(id);
            }
            debug!(
                nodes = state.document.len(),
                slots = state.document.capacity(),
                listeners = state.listeners.len(),
                "Form built"
            );
        }

        self.on_change().await?;
        Ok(self)
    }

    /// Read the form back into a nested value. Hidden fields are left out
    /// unless `include_hidden`.
    pub async fn json(&self, include_hidden: bool) -> Value {
        let state = self.inner.state.read().await;
        assemble(&state.document.entries(include_hidden))
    }

    /// Value stored by the last completed change cycle
    pub async fn value(&self) -> Value {
        self.inner.state.read().await.value.clone()
    }

    /// Number of completed change cycles
    pub async fn cycles(&self) -> u64 {
        self.inner.state.read().await.cycle
    }

    /// Run one change cycle (or fold into the running one)
    pub async fn on_change(&self) -> FormResult<()> {
        {
            let mut gate = self.inner.gate.lock().unwrap_or_else(PoisonError::into_inner);
            if gate.running {
                gate.pending = true;
                debug!("Change cycle already running, queued a re-run");
                return Ok(());
            }
            gate.running = true;
        }
        let mut guard = GateGuard {
            gate: &self.inner.gate,
            armed: true,
        };

        loop {
            self.run_cycle().await?;
            if !guard.finish_or_rerun() {
                return Ok(());
            }
        }
    }

    async fn run_cycle(&self) -> FormResult<()> {
        let value = self.json(false).await;
        self.inner.state.write().await.value = value.clone();

        // Listeners appended while the cycle runs (by a redraw) run in this cycle too.
        // Ids ascend in registration order, so the next one is found by bisection.
        let mut last_seen: Option<ListenerId> = None;
        let mut ran = 0usize;
        loop {
            let next = {
                let state = self.inner.state.read().await;
                let start = match last_seen {
                    Some(seen) => state.listeners.partition_point(|l| l.id <= seen),
                    None => 0,
                };
                state.listeners.get(start).map(|l| {
                    let live = l.owner.map(|o| state.document.contains(o)).unwrap_or(true);
                    (l.id, live, l.kind.clone())
                })
            };
            let Some((id, live, kind)) = next else {
                break;
            };
            last_seen = Some(id);
            if !live {
                warn!(listener = ?id, "Skipping listener of a removed field");
                continue;
            }

            ran += 1;
            match kind {
                ListenerKind::Hidden { field } => self.apply_hidden(field, &value).await,
                ListenerKind::Redraw { field } => self.apply_redraw(id, field, &value).await?,
                ListenerKind::External(listener) => listener(value.clone()).await?,
            }
        }

        let mut state = self.inner.state.write().await;
        state.prune_listeners();
        state.cycle += 1;
        let event = ChangeEvent {
            cycle: state.cycle,
            value,
        };
        state
            .subscribers
            .retain(|tx| tx.unbounded_send(event.clone()).is_ok());
        debug!(cycle = event.cycle, listeners = ran, "Change cycle complete");
        Ok(())
    }

    async fn apply_hidden(&self, field: NodeId, value: &Value) {
        let mut state = self.inner.state.write().await;
        let path = state
            .document
            .resolved_path(field, true)
            .unwrap_or_default();
        // The form value leaves hidden fields out; the field's own value does not.
        let own = state.document.field_value(field).unwrap_or(Value::Null);
        let hidden = match state.document.get(field).map(|n| &n.kind) {
            Some(NodeKind::Field { template, .. }) => template
                .meta
                .hidden
                .as_ref()
                .map(|rule| rule.evaluate(value, &path, &own)),
            _ => None,
        };
        if let (Some(hidden), Some(node)) = (hidden, state.document.get_mut(field)) {
            node.hidden = hidden;
        }
    }

    async fn apply_redraw(&self, listener: ListenerId, field: NodeId, value: &Value) -> FormResult<()> {
        // Decide under the lock, render without it, attach under it again.
        let plan = {
            let mut state = self.inner.state.write().await;
            let Some(NodeKind::Field { template, base }) = state.document.get(field).map(|n| &n.kind) else {
                return Ok(());
            };
            let Some(redraw) = template.meta.redraw.clone() else {
                return Ok(());
            };
            let template = template.clone();
            let base = base.clone();

            let deps: Vec<Option<Value>> = redraw
                .paths
                .iter()
                .map(|path| read_json_with_key(value, path))
                .collect();
            let serialized = serde_json::to_string(&deps)?;

            let Some(entry) = state.listeners.iter_mut().find(|l| l.id == listener) else {
                return Ok(());
            };
            if entry.cache.as_deref() == Some(serialized.as_str()) {
                return Ok(());
            }
            let first = entry.cache.is_none();
            entry.cache = Some(serialized);
            // A fresh field already shows the current value; only a handler changes it.
            if first && redraw.handler.is_none() {
                return Ok(());
            }

            let template = match &redraw.handler {
                Some(handler) => handler(&deps, &template),
                None => template,
            };
            let own = state
                .document
                .field_value(field)
                .filter(|v| !v.is_null())
                .or_else(|| template.meta.default.clone())
                .unwrap_or(Value::Null);
            (template, base, own)
        };

        let (template, base, own) = plan;
        let path = render::field_path(&template, &base);
        debug!(path = %path, "Redrawing field");
        let content = render::render_content(&self.inner.ctx, &template, &own, &path).await?;
        if let Some(hook) = &template.meta.after_render {
            hook(&path, &own);
        }

        let mut state = self.inner.state.write().await;
        if !state.document.contains(field) {
            return Ok(());
        }
        state.document.clear_children(field);
        let mut attached = Vec::with_capacity(content.len());
        for fragment in content {
            attached.push(state.document.attach(field, None, fragment));
        }
        if let Some(node) = state.document.get_mut(field) {
            node.kind = NodeKind::Field { template, base };
        }
        for id in attached {
            state.register_rules(id);
        }
        Ok(())
    }

    /// Register a listener run on every change cycle, after those registered before it
    pub async fn add_change_listener<F, Fut>(&self, listener: F) -> ListenerId
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FormResult<()>> + Send + 'static,
    {
        let listener: ChangeListenerFn = Arc::new(move |value| listener(value).boxed());
        self.inner
            .state
            .write()
            .await
            .push_listener(None, ListenerKind::External(listener))
    }

    pub async fn remove_change_listener(&self, id: ListenerId) -> bool {
        let mut state = self.inner.state.write().await;
        let before = state.listeners.len();
        state.listeners.retain(|l| l.id != id);
        state.listeners.len() != before
    }

    /// Receive a [`ChangeEvent`] for every completed cycle from now on
    pub async fn subscribe(&self) -> UnboundedReceiver<ChangeEvent> {
        let (tx, rx) = unbounded();
        self.inner.state.write().await.subscribers.push(tx);
        rx
    }

    /// Serializable copy of the current document
    pub async fn snapshot(&self) -> NodeView {
        self.inner.state.read().await.document.snapshot()
    }

    /// Any node tagged with `path`
    pub async fn find(&self, path: &str) -> Option<NodeId> {
        let state = self.inner.state.read().await;
        state.document.find_where(path, |_| true)
    }

    /// Input or custom widget tagged with `path` (`tags[].value` or `tags[1].value`)
    pub async fn find_input(&self, path: &str) -> Option<NodeId> {
        let state = self.inner.state.read().await;
        state.document.find_where(path, |kind| {
            matches!(kind, NodeKind::Input(_) | NodeKind::Custom { .. })
        })
    }

    /// Array container tagged with `path`
    pub async fn find_array(&self, path: &str) -> Option<NodeId> {
        let state = self.inner.state.read().await;
        state
            .document
            .find_where(path, |kind| matches!(kind, NodeKind::Array { .. }))
    }

    /// Array item at a resolved path such as `tags[1]`
    pub async fn find_item(&self, path: &str) -> Option<NodeId> {
        let state = self.inner.state.read().await;
        state
            .document
            .find_where(path, |kind| matches!(kind, NodeKind::Item { .. }))
    }

    /// Field wrapper tagged with `path`
    pub async fn find_field(&self, path: &str) -> Option<NodeId> {
        let state = self.inner.state.read().await;
        state
            .document
            .find_where(path, |kind| matches!(kind, NodeKind::Field { .. }))
    }

    /// Items of an array container, in document order
    pub async fn items(&self, array: NodeId) -> FormResult<Vec<NodeId>> {
        let state = self.inner.state.read().await;
        let node = state.document.get(array).ok_or(FormError::UnknownNode(array))?;
        match node.kind {
            NodeKind::Array { .. } => Ok(node.children().to_vec()),
            _ => Err(FormError::NotAnArray(array)),
        }
    }

    /// Whether the node or any ancestor is hidden
    pub async fn is_hidden(&self, node: NodeId) -> bool {
        self.inner.state.read().await.document.is_hidden(node)
    }

    /// Apply a user edit to an input and run one change cycle
    pub async fn set_input(&self, node: NodeId, input: impl Into<InputValue>) -> FormResult<()> {
        {
            let mut state = self.inner.state.write().await;
            let target = state
                .document
                .get_mut(node)
                .ok_or(FormError::UnknownNode(node))?;
            match &mut target.kind {
                NodeKind::Input(input_node) => {
                    let input = match input.into() {
                        // Text written to a checkbox toggles it
                        InputValue::Text(raw) if input_node.kind.uses_checked() => {
                            InputValue::Checked(is_truthy(&raw))
                        }
                        other => other,
                    };
                    input_node.state.apply(input);
                }
                _ => return Err(FormError::NotAnInput(node)),
            }
        }
        self.on_change().await
    }

    /// Edit the input tagged with `path`
    pub async fn edit(&self, path: &str, input: impl Into<InputValue>) -> FormResult<()> {
        let node = self
            .find_input(path)
            .await
            .ok_or_else(|| FormError::UnknownPath(path.to_string()))?;
        self.set_input(node, input).await
    }

    /// Replace a custom widget's value and run one change cycle
    pub async fn set_custom(&self, node: NodeId, value: Value) -> FormResult<()> {
        {
            let mut state = self.inner.state.write().await;
            let target = state
                .document
                .get_mut(node)
                .ok_or(FormError::UnknownNode(node))?;
            match &mut target.kind {
                NodeKind::Custom { widget, .. } => widget.set_value(value),
                _ => return Err(FormError::NotACustomWidget(node)),
            }
        }
        self.on_change().await
    }

    /// Append a fresh item (children at their defaults) and run one change cycle
    pub async fn add_item(&self, array: NodeId) -> FormResult<NodeId> {
        let (children, path) = {
            let state = self.inner.state.read().await;
            let node = state.document.get(array).ok_or(FormError::UnknownNode(array))?;
            match (&node.kind, &node.path) {
                (NodeKind::Array { children, .. }, Some(path)) => (children.clone(), path.clone()),
                _ => return Err(FormError::NotAnArray(array)),
            }
        };

        let fragment = render::render_item(&self.inner.ctx, &children, &Value::Null, &path).await?;

        let item = {
            let mut state = self.inner.state.write().await;
            if !state.document.contains(array) {
                return Err(FormError::UnknownNode(array));
            }
            let item = state.document.attach(array, None, fragment);
            state.register_rules(item);
            item
        };
        debug!(array = %path, item = %item, "Added array item");
        self.on_change().await?;
        Ok(item)
    }

    /// Remove one array item and run one change cycle
    pub async fn remove_item(&self, item: NodeId) -> FormResult<()> {
        {
            let mut state = self.inner.state.write().await;
            let node = state.document.get(item).ok_or(FormError::UnknownNode(item))?;
            if !matches!(node.kind, NodeKind::Item { .. }) {
                return Err(FormError::NotAnArray(item));
            }
            state.document.detach(item);
        }
        self.on_change().await
    }

    /// Move an item of a sortable array to `position` and run one change cycle
    pub async fn move_item(&self, item: NodeId, position: usize) -> FormResult<()> {
        {
            let mut state = self.inner.state.write().await;
            let node = state.document.get(item).ok_or(FormError::UnknownNode(item))?;
            if !matches!(node.kind, NodeKind::Item { .. }) {
                return Err(FormError::NotAnArray(item));
            }
            let array = node.parent().ok_or(FormError::NotAnArray(item))?;
            let container = state.document.get(array).ok_or(FormError::UnknownNode(array))?;
            let NodeKind::Array { sortable, .. } = container.kind else {
                return Err(FormError::NotAnArray(array));
            };
            if !sortable {
                let path = container.path.as_ref().map(ToString::to_string).unwrap_or_default();
                return Err(FormError::NotSortable(path));
            }
            let len = container.children().len();
            if position >= len {
                return Err(FormError::InvalidPosition { position, len });
            }
            state.document.move_within_parent(item, position);
        }
        self.on_change().await
    }
}
