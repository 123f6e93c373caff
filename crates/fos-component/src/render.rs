//! Render kit
//!
//! Renderers are looked up by (component family, renderer type). A kit is
//! populated at startup and consulted by value; nothing is instantiated
//! reflectively.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::{BoxError, ComponentId, ComponentTree, RequestContext};

/// Render backend for one (family, renderer type) pair
///
/// Every entry point has a no-op default.
pub trait Renderer {
    /// Read submitted values for the component
    fn decode(
        &self,
        _tree: &mut ComponentTree,
        _ctx: &mut RequestContext,
        _id: ComponentId,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    fn encode_begin(
        &self,
        _tree: &mut ComponentTree,
        _ctx: &mut RequestContext,
        _id: ComponentId,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    /// Render the children. The default renders each child fully.
    fn encode_children(
        &self,
        tree: &mut ComponentTree,
        ctx: &mut RequestContext,
        id: ComponentId,
    ) -> Result<(), BoxError> {
        for child in tree.children(id)?.to_vec() {
            tree.encode_all(child, ctx)?;
        }
        Ok(())
    }

    fn encode_end(
        &self,
        _tree: &mut ComponentTree,
        _ctx: &mut RequestContext,
        _id: ComponentId,
    ) -> Result<(), BoxError> {
        Ok(())
    }

    /// Whether this renderer recurses into children itself
    fn renders_children(&self) -> bool {
        false
    }

    /// Last chance to transform a composed client id (escaping etc.)
    fn convert_client_id(&self, client_id: String) -> String {
        client_id
    }
}

/// Registry of renderers keyed by (family, renderer type)
pub struct RenderKit {
    id: String,
    renderers: HashMap<(String, String), Rc<dyn Renderer>>,
}

impl RenderKit {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            renderers: HashMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Register a renderer, replacing any previous one for the pair
    pub fn add_renderer(
        &mut self,
        family: impl Into<String>,
        renderer_type: impl Into<String>,
        renderer: impl Renderer + 'static,
    ) -> &mut Self {
        let key = (family.into(), renderer_type.into());
        tracing::debug!("Render kit {}: registered renderer {}/{}", self.id, key.0, key.1);
        self.renderers.insert(key, Rc::new(renderer));
        self
    }

    pub fn renderer(&self, family: &str, renderer_type: &str) -> Option<Rc<dyn Renderer>> {
        self.renderers
            .get(&(family.to_string(), renderer_type.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}

impl fmt::Debug for RenderKit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self
            .renderers
            .keys()
            .map(|(family, renderer_type)| format!("{family}/{renderer_type}"))
            .collect();
        keys.sort_unstable();
        f.debug_struct("RenderKit")
            .field("id", &self.id)
            .field("renderers", &keys)
            .finish()
    }
}
