//! Identity resolution
//!
//! Local ids are unique within the nearest naming container. Client ids
//! compose the local ids of naming-container ancestors with
//! [`SEPARATOR_CHAR`] and are memoized per component until its local id
//! changes.

use crate::{BoxError, ComponentError, ComponentId, ComponentResult, ComponentTree, RequestContext};

/// Separates naming-container segments in client ids and search expressions
pub const SEPARATOR_CHAR: char = ':';

/// Check local id syntax
///
/// The first character must be a letter or `_`; the rest letters, digits,
/// `_` or `-`.
pub fn validate_id(id: &str) -> ComponentResult<()> {
    let invalid = |reason: &str| ComponentError::InvalidId {
        id: id.to_string(),
        reason: reason.to_string(),
    };

    let mut chars = id.chars();
    let Some(first) = chars.next() else {
        return Err(invalid("must not be empty"));
    };
    if !(first.is_alphabetic() || first == '_') {
        return Err(invalid("first character must be a letter or '_'"));
    }
    if chars.any(|c| !(c.is_alphanumeric() || c == '_' || c == '-')) {
        return Err(invalid("subsequent characters must be letters, digits, '_' or '-'"));
    }
    Ok(())
}

impl ComponentTree {
    /// Assign (or clear) a local id
    ///
    /// Re-setting the current id is always accepted. The cached client id
    /// is dropped either way.
    pub fn set_id(&mut self, id: ComponentId, local_id: Option<&str>) -> ComponentResult<()> {
        let component = self.component(id)?;
        if let Some(new_id) = local_id {
            if component.id.as_deref() != Some(new_id) {
                validate_id(new_id)?;
                if let Some(parent) = component.parent {
                    self.check_sibling_id(parent, id, new_id)?;
                }
            }
        }

        let component = self.component_mut(id)?;
        component.id = local_id.map(str::to_string);
        component.client_id = None;
        Ok(())
    }

    fn sibling_has_id(&self, parent: ComponentId, id: ComponentId, local_id: &str) -> ComponentResult<bool> {
        Ok(self
            .facets_and_children(parent)?
            .into_iter()
            .filter(|&sibling| sibling != id)
            .any(|sibling| self.get(sibling).and_then(|s| s.id.as_deref()) == Some(local_id)))
    }

    fn check_sibling_id(&self, parent: ComponentId, id: ComponentId, local_id: &str) -> ComponentResult<()> {
        if self.sibling_has_id(parent, id, local_id)? {
            return Err(ComponentError::DuplicateId {
                id: local_id.to_string(),
                path: self.path_to(parent),
            });
        }
        Ok(())
    }

    /// Nearest strict ancestor flagged as a naming container
    pub fn naming_container_of(&self, id: ComponentId) -> Option<ComponentId> {
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            if self.get(ancestor)?.naming_container {
                return Some(ancestor);
            }
            current = self.parent(ancestor);
        }
        None
    }

    /// Client id of a component
    ///
    /// A component without a local id is given a generated one first; that
    /// requires the component to hang under the view root. The renderer, if
    /// any, may transform the composed id. The result is cached.
    pub fn client_id(&mut self, id: ComponentId, ctx: &RequestContext) -> ComponentResult<String> {
        let component = self.component(id)?;
        if let Some(cached) = &component.client_id {
            return Ok(cached.clone());
        }

        let (local_id, generated) = match component.id.clone() {
            Some(local_id) => (local_id, false),
            None => {
                if self.top_ancestor(id) != self.root() {
                    return Err(ComponentError::NoViewRoot { path: self.path_to(id) });
                }
                let mut unique = self.create_unique_id();
                if let Some(parent) = self.parent(id) {
                    while self.sibling_has_id(parent, id, &unique)? {
                        unique = self.create_unique_id();
                    }
                }
                self.component_mut(id)?.id = Some(unique.clone());
                (unique, true)
            }
        };

        let composed = match self.naming_container_of(id) {
            Some(container) => {
                let container_id = self.client_id(container, ctx)?;
                let mut buffer = String::with_capacity(container_id.len() + 1 + local_id.len());
                buffer.push_str(&container_id);
                buffer.push(SEPARATOR_CHAR);
                buffer.push_str(&local_id);
                buffer
            }
            None => local_id,
        };

        let client_id = match ctx.renderer_for(self, id)? {
            Some(renderer) => renderer.convert_client_id(composed),
            None => composed,
        };

        if generated {
            tracing::debug!("Generated client id {} for {}", client_id, id);
            ctx.log(&format!(
                "Component {} had no id assigned; generated client id {}",
                self.path_to(id),
                client_id
            ));
        }

        self.component_mut(id)?.client_id = Some(client_id.clone());
        Ok(client_id)
    }

    /// Look up a component by search expression
    ///
    /// A leading [`SEPARATOR_CHAR`] searches from the view root's scope.
    /// Otherwise the search starts at `from` if it is a naming container,
    /// else at its nearest naming-container ancestor (or the topmost
    /// ancestor). Every segment but the last must name a naming container.
    pub fn find_component(&self, from: ComponentId, expr: &str) -> ComponentResult<Option<ComponentId>> {
        self.component(from)?;
        if expr.is_empty() {
            return Ok(None);
        }

        let (mut base, mut rest) = match expr.strip_prefix(SEPARATOR_CHAR) {
            Some(stripped) => (self.top_ancestor(from), stripped),
            None => {
                let mut base = from;
                while let Some(parent) = self.parent(base) {
                    if self.component(base)?.naming_container {
                        break;
                    }
                    base = parent;
                }
                (base, expr)
            }
        };

        loop {
            let (segment, remainder) = match rest.split_once(SEPARATOR_CHAR) {
                Some((segment, remainder)) => (segment, Some(remainder)),
                None => (rest, None),
            };
            let Some(found) = self.find_in_scope(base, segment) else {
                return Ok(None);
            };
            let Some(remainder) = remainder else {
                return Ok(Some(found));
            };
            if !self.component(found)?.naming_container {
                return Err(ComponentError::NotNamingContainer {
                    segment: segment.to_string(),
                    expr: expr.to_string(),
                });
            }
            base = found;
            rest = remainder;
        }
    }

    /// Depth-first, facets before children, not descending into nested
    /// naming containers (which can still match themselves)
    fn find_in_scope(&self, base: ComponentId, local_id: &str) -> Option<ComponentId> {
        let component = self.get(base)?;
        if component.id.as_deref() == Some(local_id) {
            return Some(base);
        }
        for child in self.facets_and_children(base).ok()? {
            let child_component = self.get(child)?;
            if !child_component.naming_container {
                if let Some(found) = self.find_in_scope(child, local_id) {
                    return Some(found);
                }
            } else if child_component.id.as_deref() == Some(local_id) {
                return Some(child);
            }
        }
        None
    }

    /// Human-readable ancestor path for diagnostics
    ///
    /// `{Component-Path : [Family: root,ViewId: /v][Family: form,Id: f]}`
    pub fn path_to(&self, id: ComponentId) -> String {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            chain.push(node);
            current = self.parent(node);
        }

        let mut path = String::from("{Component-Path : ");
        for node in chain.into_iter().rev() {
            let Some(component) = self.get(node) else {
                path.push_str(&format!("[Missing: {node}]"));
                continue;
            };
            path.push_str("[Family: ");
            path.push_str(&component.family);
            if node == self.root() {
                path.push_str(",ViewId: ");
                path.push_str(self.view_id());
            } else if let Some(local_id) = &component.id {
                path.push_str(",Id: ");
                path.push_str(local_id);
            }
            path.push(']');
        }
        path.push('}');
        path
    }

    /// Find the component with `client_id` under `from` and run `callback`
    /// with it as the current component
    ///
    /// Returns whether a component matched.
    pub fn invoke_on_component<F>(
        &mut self,
        from: ComponentId,
        ctx: &mut RequestContext,
        client_id: &str,
        mut callback: F,
    ) -> ComponentResult<bool>
    where
        F: FnMut(&mut ComponentTree, &mut RequestContext, ComponentId) -> Result<(), BoxError>,
    {
        self.invoke_on_component_inner(from, ctx, client_id, &mut callback)
    }

    fn invoke_on_component_inner<F>(
        &mut self,
        id: ComponentId,
        ctx: &mut RequestContext,
        client_id: &str,
        callback: &mut F,
    ) -> ComponentResult<bool>
    where
        F: FnMut(&mut ComponentTree, &mut RequestContext, ComponentId) -> Result<(), BoxError>,
    {
        if self.client_id(id, ctx)? == client_id {
            ctx.push_component(id);
            let result = callback(self, ctx, id);
            ctx.pop_component();
            return result.map(|()| true).map_err(|source| ComponentError::Invoke {
                path: self.path_to(id),
                source,
            });
        }

        for child in self.facets_and_children(id)? {
            if self.invoke_on_component_inner(child, ctx, client_id, callback)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemorySink, RenderKit, Renderer};
    use std::rc::Rc;

    fn ctx() -> RequestContext {
        RequestContext::new(RenderKit::new("basic"))
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("_x-1").is_ok());
        assert!(validate_id("name").is_ok());
        assert!(validate_id("").is_err());
        assert!(validate_id("1abc").is_err());
        assert!(validate_id("a b").is_err());
        assert!(validate_id("a:b").is_err());
        assert!(validate_id("-a").is_err());
    }

    #[test]
    fn test_client_id_without_container() {
        let mut tree = ComponentTree::new("/v");
        let c = tree.create_child(tree.root(), "input", Some("name")).unwrap();
        assert_eq!(tree.client_id(c, &ctx()).unwrap(), "name");
    }

    #[test]
    fn test_client_id_nested_containers() {
        let mut tree = ComponentTree::new("/v");
        let form = tree.create_child(tree.root(), "form", Some("f")).unwrap();
        tree.component_mut(form).unwrap().set_naming_container(true);
        let panel = tree.create_child(form, "panel", Some("p")).unwrap();
        let table = tree.create_child(panel, "table", Some("t")).unwrap();
        tree.component_mut(table).unwrap().set_naming_container(true);
        let cell = tree.create_child(table, "output", Some("c")).unwrap();

        let ctx = ctx();
        // Non-container panel contributes nothing
        assert_eq!(tree.client_id(cell, &ctx).unwrap(), "f:t:c");
        assert_eq!(tree.client_id(panel, &ctx).unwrap(), "f:p");
    }

    #[test]
    fn test_set_id_invalidates_only_own_cache() {
        let mut tree = ComponentTree::new("/v");
        let form = tree.create_child(tree.root(), "form", Some("f")).unwrap();
        tree.component_mut(form).unwrap().set_naming_container(true);
        let input = tree.create_child(form, "input", Some("a")).unwrap();

        let ctx = ctx();
        tree.client_id(input, &ctx).unwrap();
        tree.set_id(input, Some("b")).unwrap();
        assert_eq!(tree.component(input).unwrap().cached_client_id(), None);
        assert_eq!(tree.component(form).unwrap().cached_client_id(), Some("f"));
        assert_eq!(tree.client_id(input, &ctx).unwrap(), "f:b");
    }

    #[test]
    fn test_reset_same_id_skips_validation() {
        let mut tree = ComponentTree::new("/v");
        let c = tree.create("output");
        // Bypass validation the way a snapshot restore would
        tree.component_mut(c).unwrap().id = Some("1legacy".into());
        assert!(tree.set_id(c, Some("1legacy")).is_ok());
        assert!(tree.set_id(c, Some("2legacy")).is_err());
    }

    #[test]
    fn test_generated_id_is_logged_once() {
        let sink = Rc::new(MemorySink::new());
        let ctx = ctx().with_diagnostics(sink.clone());
        let mut tree = ComponentTree::new("/v");
        let c = tree.create_child(tree.root(), "output", None).unwrap();

        let first = tree.client_id(c, &ctx).unwrap();
        let second = tree.client_id(c, &ctx).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with(crate::UNIQUE_ID_PREFIX));
        assert_eq!(tree.component(c).unwrap().id(), Some(first.as_str()));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_generated_id_skips_sibling_ids() {
        let mut tree = ComponentTree::new("/v");
        let root = tree.root();
        tree.create_child(root, "output", Some("_id1")).unwrap();
        let unnamed = tree.create_child(root, "output", None).unwrap();

        let generated = tree.client_id(unnamed, &ctx()).unwrap();
        assert_ne!(generated, "_id1");
        assert_eq!(generated, "_id2");
    }

    #[test]
    fn test_detached_without_id_fails() {
        let mut tree = ComponentTree::new("/v");
        let c = tree.create("output");
        let err = tree.client_id(c, &ctx()).unwrap_err();
        assert!(matches!(err, ComponentError::NoViewRoot { .. }));
    }

    #[test]
    fn test_renderer_converts_client_id() {
        struct Escaping;
        impl Renderer for Escaping {
            fn convert_client_id(&self, client_id: String) -> String {
                client_id.replace(SEPARATOR_CHAR, "_")
            }
        }

        let mut kit = RenderKit::new("basic");
        kit.add_renderer("input", "text", Escaping);
        let ctx = RequestContext::new(kit);

        let mut tree = ComponentTree::new("/v");
        let form = tree.create_child(tree.root(), "form", Some("f")).unwrap();
        tree.component_mut(form).unwrap().set_naming_container(true);
        let input = tree.create_child(form, "input", Some("x")).unwrap();
        tree.component_mut(input).unwrap().set_renderer_type(Some("text"));

        assert_eq!(tree.client_id(input, &ctx).unwrap(), "f_x");
    }

    #[test]
    fn test_find_component_scopes() {
        let mut tree = ComponentTree::new("/v");
        let root = tree.root();
        let nc = tree.create_child(root, "form", Some("NC")).unwrap();
        tree.component_mut(nc).unwrap().set_naming_container(true);
        let foo = tree.create_child(nc, "input", Some("foo")).unwrap();
        let plain = tree.create_child(root, "panel", Some("plain")).unwrap();
        tree.create_child(plain, "output", Some("leaf")).unwrap();

        assert_eq!(tree.find_component(root, ":NC:foo").unwrap(), Some(foo));
        assert_eq!(tree.find_component(nc, "foo").unwrap(), Some(foo));
        // Nested container contents are not visible from outside
        assert_eq!(tree.find_component(root, "foo").unwrap(), None);
        // Relative search from inside a container starts at that container
        assert_eq!(tree.find_component(foo, "foo").unwrap(), Some(foo));
        assert_eq!(tree.find_component(root, ":NC:missing").unwrap(), None);
        assert_eq!(tree.find_component(root, "").unwrap(), None);

        let err = tree.find_component(root, "plain:leaf").unwrap_err();
        assert!(matches!(err, ComponentError::NotNamingContainer { .. }));
    }

    #[test]
    fn test_path_to() {
        let mut tree = ComponentTree::new("/v");
        let form = tree.create_child(tree.root(), "form", Some("f")).unwrap();
        let out = tree.create_child(form, "output", None).unwrap();

        assert_eq!(
            tree.path_to(out),
            "{Component-Path : [Family: root,ViewId: /v][Family: form,Id: f][Family: output]}"
        );
    }

    #[test]
    fn test_invoke_on_component() {
        let mut tree = ComponentTree::new("/v");
        let form = tree.create_child(tree.root(), "form", Some("f")).unwrap();
        tree.component_mut(form).unwrap().set_naming_container(true);
        let input = tree.create_child(form, "input", Some("x")).unwrap();

        let mut ctx = ctx();
        let mut seen = None;
        let found = tree
            .invoke_on_component(tree.root(), &mut ctx, "f:x", |_, ctx, id| {
                seen = Some((id, ctx.current_component()));
                Ok(())
            })
            .unwrap();

        assert!(found);
        assert_eq!(seen, Some((input, Some(input))));
        assert_eq!(ctx.scope_depth(), 0);

        let missing = tree
            .invoke_on_component(tree.root(), &mut ctx, "f:y", |_, _, _| Ok(()))
            .unwrap();
        assert!(!missing);
    }
}
