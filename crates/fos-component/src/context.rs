//! Request context
//!
//! Everything a phase needs besides the tree itself: the render kit,
//! the expression resolver, the diagnostic sink, the attached-type
//! registries and the scoped current-component stack.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use fos_state::{StateValue, TypeRegistry};

use crate::{
    BoxError, ComponentId, ComponentResult, ComponentTree, Listener, PhaseId, RenderKit, Renderer,
    ValueBinding, ValueExpression,
};

/// Receives non-fatal diagnostics. Must never fail.
pub trait DiagnosticSink {
    fn log(&self, message: &str);
}

/// Forwards diagnostics to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn log(&self, message: &str) {
        tracing::warn!("{}", message);
    }
}

/// Records diagnostics in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: RefCell<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded messages
    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.messages.borrow_mut().clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn log(&self, message: &str) {
        tracing::debug!("{}", message);
        self.messages.borrow_mut().push(message.to_string());
    }
}

/// External expression engine
pub trait ExpressionResolver {
    /// Evaluate `expression` with `current` as the scoped component
    fn resolve(
        &self,
        tree: &ComponentTree,
        current: Option<ComponentId>,
        expression: &str,
    ) -> Result<Option<StateValue>, BoxError>;
}

/// Application-level notifications published during rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEvent {
    BeforeRender(ComponentId),
}

type Observer = Box<dyn FnMut(&SystemEvent)>;

/// Per-request state shared across all components
pub struct RequestContext {
    render_kit: RenderKit,
    resolver: Option<Rc<dyn ExpressionResolver>>,
    diagnostics: Rc<dyn DiagnosticSink>,
    listener_types: TypeRegistry<dyn Listener>,
    binding_types: TypeRegistry<dyn ValueBinding>,
    scope: Vec<ComponentId>,
    phase: PhaseId,
    render_response: bool,
    params: BTreeMap<String, String>,
    response: String,
    observers: Vec<Observer>,
}

impl RequestContext {
    /// Create a context rendering with `render_kit`
    ///
    /// [`ValueExpression`] is registered as a binding type.
    pub fn new(render_kit: RenderKit) -> Self {
        let mut binding_types: TypeRegistry<dyn ValueBinding> = TypeRegistry::new();
        binding_types.register::<ValueExpression>(|| Box::new(ValueExpression::default()));

        Self {
            render_kit,
            resolver: None,
            diagnostics: Rc::new(TracingSink),
            listener_types: TypeRegistry::new(),
            binding_types,
            scope: Vec::new(),
            phase: PhaseId::RestoreView,
            render_response: false,
            params: BTreeMap::new(),
            response: String::new(),
            observers: Vec::new(),
        }
    }

    pub fn with_resolver(mut self, resolver: Rc<dyn ExpressionResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Rc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn render_kit(&self) -> &RenderKit {
        &self.render_kit
    }

    pub fn render_kit_mut(&mut self) -> &mut RenderKit {
        &mut self.render_kit
    }

    pub fn resolver(&self) -> Option<&dyn ExpressionResolver> {
        self.resolver.as_deref()
    }

    pub fn diagnostics(&self) -> &dyn DiagnosticSink {
        self.diagnostics.as_ref()
    }

    /// Record a non-fatal diagnostic
    pub fn log(&self, message: &str) {
        self.diagnostics.log(message);
    }

    pub fn listener_types(&self) -> &TypeRegistry<dyn Listener> {
        &self.listener_types
    }

    pub fn listener_types_mut(&mut self) -> &mut TypeRegistry<dyn Listener> {
        &mut self.listener_types
    }

    pub fn binding_types(&self) -> &TypeRegistry<dyn ValueBinding> {
        &self.binding_types
    }

    pub fn binding_types_mut(&mut self) -> &mut TypeRegistry<dyn ValueBinding> {
        &mut self.binding_types
    }

    // --- scoped current component ---

    /// Enter a component. Every push must be matched by one pop.
    pub fn push_component(&mut self, id: ComponentId) {
        self.scope.push(id);
    }

    /// Leave the current component
    pub fn pop_component(&mut self) -> Option<ComponentId> {
        let popped = self.scope.pop();
        if popped.is_none() {
            tracing::warn!("Component scope popped while empty");
        }
        popped
    }

    /// Component expressions are currently evaluated against
    pub fn current_component(&self) -> Option<ComponentId> {
        self.scope.last().copied()
    }

    pub fn scope_depth(&self) -> usize {
        self.scope.len()
    }

    // --- request flow ---

    pub fn phase(&self) -> PhaseId {
        self.phase
    }

    pub fn set_phase(&mut self, phase: PhaseId) {
        tracing::debug!("Entering phase {:?}", phase);
        self.phase = phase;
    }

    /// Skip remaining validate/update work and go straight to rendering
    pub fn render_response(&mut self) {
        if !self.render_response {
            tracing::debug!("Request degraded to render-response only");
        }
        self.render_response = true;
    }

    pub fn is_render_response(&self) -> bool {
        self.render_response
    }

    /// Submitted request parameter
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.insert(name.into(), value.into());
    }

    // --- response ---

    /// Append markup to the response
    pub fn write(&mut self, markup: &str) {
        self.response.push_str(markup);
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn take_response(&mut self) -> String {
        std::mem::take(&mut self.response)
    }

    // --- system events ---

    pub fn subscribe(&mut self, observer: impl FnMut(&SystemEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn publish(&mut self, event: &SystemEvent) {
        for observer in self.observers.iter_mut() {
            observer(event);
        }
    }

    /// Renderer for a component's (family, renderer type) pair
    ///
    /// A component without a renderer type has no renderer. A renderer type
    /// missing from the kit is tolerated but logged.
    pub fn renderer_for(
        &self,
        tree: &ComponentTree,
        id: ComponentId,
    ) -> ComponentResult<Option<Rc<dyn Renderer>>> {
        let Some(renderer_type) = tree.renderer_type(id, self)? else {
            return Ok(None);
        };
        let family = tree.component(id)?.family();
        let renderer = self.render_kit.renderer(family, &renderer_type);
        if renderer.is_none() {
            self.log(&format!(
                "No Renderer found for component {} (component-family={}, renderer-type={})",
                tree.path_to(id),
                family,
                renderer_type
            ));
        }
        Ok(renderer)
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("render_kit", &self.render_kit)
            .field("phase", &self.phase)
            .field("render_response", &self.render_response)
            .field("scope", &self.scope)
            .field("listener_types", &self.listener_types)
            .field("binding_types", &self.binding_types)
            .finish_non_exhaustive()
    }
}
