//! Phase traversal
//!
//! Decode, validate and update walk the tree depth-first: facets, then
//! children, then the component's own action. Components that are not
//! rendered are skipped together with their subtree. Every component is
//! the current component while it is visited; the scope is released on
//! every exit path.

use crate::{
    BoxError, ComponentError, ComponentId, ComponentResult, ComponentTree, RequestContext,
    SystemEvent,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Traversal {
    Decode,
    Validate,
    Update,
}

impl ComponentTree {
    /// Apply request values to the subtree
    ///
    /// A decode fault switches the request to render-response only before
    /// it is returned.
    pub fn process_decodes(&mut self, id: ComponentId, ctx: &mut RequestContext) -> ComponentResult<()> {
        self.traverse(id, ctx, Traversal::Decode)
    }

    pub fn process_validators(&mut self, id: ComponentId, ctx: &mut RequestContext) -> ComponentResult<()> {
        self.traverse(id, ctx, Traversal::Validate)
    }

    pub fn process_updates(&mut self, id: ComponentId, ctx: &mut RequestContext) -> ComponentResult<()> {
        self.traverse(id, ctx, Traversal::Update)
    }

    /// Decode a single component through its renderer
    ///
    /// Failing to look the renderer up counts as a decode fault too.
    pub fn decode(&mut self, id: ComponentId, ctx: &mut RequestContext) -> ComponentResult<()> {
        let result = match ctx.renderer_for(self, id) {
            Ok(Some(renderer)) => renderer.decode(self, ctx, id),
            Ok(None) => Ok(()),
            Err(err) => Err(BoxError::from(err)),
        };
        result.map_err(|source| {
            ctx.render_response();
            ComponentError::Decode {
                path: self.path_to(id),
                source,
            }
        })
    }

    fn traverse(&mut self, id: ComponentId, ctx: &mut RequestContext, traversal: Traversal) -> ComponentResult<()> {
        ctx.push_component(id);
        let result = self.traverse_scoped(id, ctx, traversal);
        ctx.pop_component();
        result
    }

    fn traverse_scoped(
        &mut self,
        id: ComponentId,
        ctx: &mut RequestContext,
        traversal: Traversal,
    ) -> ComponentResult<()> {
        if !self.is_rendered(id, ctx)? {
            return Ok(());
        }
        for child in self.facets_and_children(id)? {
            self.traverse(child, ctx, traversal)?;
        }
        match traversal {
            Traversal::Decode => self.decode(id, ctx),
            Traversal::Validate | Traversal::Update => Ok(()),
        }
    }

    // --- rendering ---

    /// Enter a component for rendering
    ///
    /// The component stays current until [`encode_end`](Self::encode_end),
    /// unless this call fails.
    pub fn encode_begin(&mut self, id: ComponentId, ctx: &mut RequestContext) -> ComponentResult<()> {
        ctx.push_component(id);
        let result = self.encode_begin_scoped(id, ctx);
        if result.is_err() {
            ctx.pop_component();
        }
        result
    }

    fn encode_begin_scoped(&mut self, id: ComponentId, ctx: &mut RequestContext) -> ComponentResult<()> {
        if !self.is_rendered(id, ctx)? {
            return Ok(());
        }
        ctx.publish(&SystemEvent::BeforeRender(id));
        if let Some(renderer) = ctx.renderer_for(self, id)? {
            renderer
                .encode_begin(self, ctx, id)
                .map_err(|source| self.encode_error("begin", id, source))?;
        }
        Ok(())
    }

    /// Render the children through the renderer, or render each child fully
    pub fn encode_children(&mut self, id: ComponentId, ctx: &mut RequestContext) -> ComponentResult<()> {
        if !self.is_rendered(id, ctx)? {
            return Ok(());
        }
        match ctx.renderer_for(self, id)? {
            Some(renderer) => renderer
                .encode_children(self, ctx, id)
                .map_err(|source| self.encode_error("children", id, source)),
            None => self.encode_each_child(id, ctx),
        }
    }

    fn encode_each_child(&mut self, id: ComponentId, ctx: &mut RequestContext) -> ComponentResult<()> {
        for child in self.children(id)?.to_vec() {
            self.encode_all(child, ctx)?;
        }
        Ok(())
    }

    /// Leave a component after rendering; the scope is always released
    pub fn encode_end(&mut self, id: ComponentId, ctx: &mut RequestContext) -> ComponentResult<()> {
        let result = self.encode_end_scoped(id, ctx);
        ctx.pop_component();
        result
    }

    fn encode_end_scoped(&mut self, id: ComponentId, ctx: &mut RequestContext) -> ComponentResult<()> {
        if !self.is_rendered(id, ctx)? {
            return Ok(());
        }
        if let Some(renderer) = ctx.renderer_for(self, id)? {
            renderer
                .encode_end(self, ctx, id)
                .map_err(|source| self.encode_error("end", id, source))?;
        }
        Ok(())
    }

    /// Render a component and its subtree
    pub fn encode_all(&mut self, id: ComponentId, ctx: &mut RequestContext) -> ComponentResult<()> {
        if !self.is_rendered(id, ctx)? {
            return Ok(());
        }

        self.encode_begin(id, ctx)?;
        let body = if self.renders_children(id, ctx)? {
            self.encode_children(id, ctx)
        } else {
            self.encode_each_child(id, ctx)
        };
        if let Err(err) = body {
            ctx.pop_component();
            return Err(err);
        }
        self.encode_end(id, ctx)
    }

    /// Whether the component's renderer renders its children itself
    pub fn renders_children(&self, id: ComponentId, ctx: &RequestContext) -> ComponentResult<bool> {
        Ok(ctx
            .renderer_for(self, id)?
            .is_some_and(|renderer| renderer.renders_children()))
    }

    fn encode_error(&self, stage: &'static str, id: ComponentId, source: BoxError) -> ComponentError {
        ComponentError::Encode {
            stage,
            path: self.path_to(id),
            source,
        }
    }
}
