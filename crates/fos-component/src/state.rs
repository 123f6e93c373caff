//! State saving
//!
//! [`ComponentState`] is one component's own state. [`TreeState`] nests it
//! with the states of the component's facets (by name) and children (by
//! position). Transient components are never saved.

use std::collections::BTreeMap;

use fos_state::{
    restore_attached_list, restore_attached_object, save_attached_list, save_attached_object,
    AttachedState, StateError, StateValue,
};
use serde::{Deserialize, Serialize};

use crate::{ComponentError, ComponentId, ComponentResult, ComponentTree, RequestContext};

/// Own state of a single component
///
/// Structural links are not part of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentState {
    pub id: Option<String>,
    pub rendered: Option<bool>,
    pub renderer_type: Option<String>,
    pub client_id: Option<String>,
    pub attributes: Option<BTreeMap<String, StateValue>>,
    pub listeners: Option<AttachedState>,
    pub bindings: Option<BTreeMap<String, AttachedState>>,
    /// Unique-id counter; only the view root carries it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id_counter: Option<u32>,
}

/// State of a component and its non-transient facets and children
///
/// `facets` and `children` are `None` rather than empty when there is
/// nothing to save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeState {
    pub state: ComponentState,
    pub facets: Option<BTreeMap<String, TreeState>>,
    pub children: Option<Vec<TreeState>>,
}

impl ComponentTree {
    /// Capture a component's own state
    pub fn save_state(&self, id: ComponentId) -> ComponentResult<ComponentState> {
        let component = self.component(id)?;

        let bindings = component.bindings.as_ref().map(|bindings| {
            bindings
                .iter()
                .filter_map(|(name, binding)| {
                    save_attached_object(binding.as_ref()).map(|state| (name.clone(), state))
                })
                .collect()
        });

        Ok(ComponentState {
            id: component.id.clone(),
            rendered: component.rendered,
            renderer_type: component.renderer_type.clone(),
            client_id: component.client_id.clone(),
            attributes: component.attributes.clone(),
            listeners: component.listeners.as_deref().map(save_attached_list),
            bindings,
            unique_id_counter: (id == self.root() && self.unique_counter > 0)
                .then_some(self.unique_counter),
        })
    }

    /// Apply a component's own state
    ///
    /// Fields are written directly: the attribute map is replaced wholesale
    /// and the cached client id is taken from the snapshot as is.
    pub fn restore_state(
        &mut self,
        id: ComponentId,
        state: &ComponentState,
        ctx: &RequestContext,
    ) -> ComponentResult<()> {
        self.component(id)?;

        let listeners = match &state.listeners {
            Some(saved) => Some(
                restore_attached_list(ctx.listener_types(), saved)
                    .map_err(|source| self.restore_error(id, source))?,
            ),
            None => None,
        };

        let bindings = match &state.bindings {
            Some(saved) => {
                let mut bindings = BTreeMap::new();
                for (name, binding) in saved {
                    let binding = restore_attached_object(ctx.binding_types(), binding)
                        .map_err(|source| self.restore_error(id, source))?;
                    bindings.insert(name.clone(), binding);
                }
                Some(bindings)
            }
            None => None,
        };

        let component = self.component_mut(id)?;
        component.id = state.id.clone();
        component.rendered = state.rendered;
        component.renderer_type = state.renderer_type.clone();
        component.client_id = state.client_id.clone();
        component.attributes = state.attributes.clone();
        component.listeners = listeners;
        component.bindings = bindings;

        if let Some(counter) = state.unique_id_counter.filter(|_| id == self.root()) {
            self.unique_counter = self.unique_counter.max(counter);
        }
        Ok(())
    }

    fn restore_error(&self, id: ComponentId, source: StateError) -> ComponentError {
        ComponentError::Restore {
            path: self.path_to(id),
            source,
        }
    }

    /// Save a subtree; `None` for a transient component
    pub fn process_save_state(&self, id: ComponentId) -> ComponentResult<Option<TreeState>> {
        let component = self.component(id)?;
        if component.transient {
            return Ok(None);
        }

        let mut facets = BTreeMap::new();
        for (name, facet) in &component.facets {
            if let Some(saved) = self.process_save_state(*facet)? {
                facets.insert(name.clone(), saved);
            }
        }

        let mut children = Vec::with_capacity(component.children.len());
        for &child in &component.children {
            if let Some(saved) = self.process_save_state(child)? {
                children.push(saved);
            }
        }

        Ok(Some(TreeState {
            state: self.save_state(id)?,
            facets: (!facets.is_empty()).then_some(facets),
            children: (!children.is_empty()).then_some(children),
        }))
    }

    /// Restore a subtree saved by [`process_save_state`](Self::process_save_state)
    ///
    /// Facets are matched by name and children by position among the
    /// non-transient ones. Anything without a matching snapshot keeps its
    /// current state and is reported through the diagnostic sink.
    pub fn process_restore_state(
        &mut self,
        id: ComponentId,
        state: &TreeState,
        ctx: &mut RequestContext,
    ) -> ComponentResult<()> {
        ctx.push_component(id);
        let result = self.restore_subtree(id, state, ctx);
        ctx.pop_component();
        result
    }

    fn restore_subtree(
        &mut self,
        id: ComponentId,
        state: &TreeState,
        ctx: &mut RequestContext,
    ) -> ComponentResult<()> {
        self.restore_state(id, &state.state, ctx)?;

        for (name, facet) in self.facets(id)?.to_vec() {
            if self.component(facet)?.transient {
                continue;
            }
            match state.facets.as_ref().and_then(|facets| facets.get(&name)) {
                Some(saved) => self.process_restore_state(facet, saved, ctx)?,
                None => ctx.log(&format!(
                    "No state found to restore facet {} of component {}",
                    name,
                    self.path_to(id)
                )),
            }
        }

        let saved_children = state.children.as_deref().unwrap_or(&[]);
        let mut saved = saved_children.iter();
        for child in self.children(id)?.to_vec() {
            if self.component(child)?.transient {
                continue;
            }
            match saved.next() {
                Some(child_state) => self.process_restore_state(child, child_state, ctx)?,
                None => ctx.log(&format!(
                    "No state found to restore child {} of component {}",
                    self.path_to(child),
                    self.path_to(id)
                )),
            }
        }

        let surplus = saved.count();
        if surplus > 0 {
            ctx.log(&format!(
                "{} saved child states of component {} have no matching child",
                surplus,
                self.path_to(id)
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemorySink, RenderKit, ValueExpression};
    use std::rc::Rc;

    fn ctx() -> RequestContext {
        RequestContext::new(RenderKit::new("basic"))
    }

    #[test]
    fn test_own_state_round_trip() {
        let mut tree = ComponentTree::new("/v");
        let c = tree.create_child(tree.root(), "input", Some("name")).unwrap();
        tree.component_mut(c).unwrap().set_rendered(false);
        tree.component_mut(c).unwrap().set_renderer_type(Some("text"));
        tree.set_attribute(c, "size", 20).unwrap();
        tree.set_value_binding(c, "value", Some(Box::new(ValueExpression::new("#{user.name}"))))
            .unwrap();

        let saved = tree.save_state(c).unwrap();

        let mut fresh = ComponentTree::new("/v");
        let d = fresh.create_child(fresh.root(), "input", None).unwrap();
        fresh.restore_state(d, &saved, &ctx()).unwrap();

        let restored = fresh.component(d).unwrap();
        assert_eq!(restored.id(), Some("name"));
        assert_eq!(restored.local_rendered(), Some(false));
        assert_eq!(restored.local_renderer_type(), Some("text"));
        assert_eq!(restored.attributes().unwrap().get("size"), Some(&StateValue::Int(20)));
        assert_eq!(restored.binding("value").unwrap().expression_string(), "#{user.name}");
        assert_eq!(fresh.save_state(d).unwrap(), saved);
    }

    #[test]
    fn test_restore_trusts_snapshot_client_id() {
        let mut tree = ComponentTree::new("/v");
        let c = tree.create_child(tree.root(), "input", Some("a")).unwrap();
        let state = ComponentState {
            id: Some("a".into()),
            client_id: Some("outer:a".into()),
            ..ComponentState::default()
        };
        tree.restore_state(c, &state, &ctx()).unwrap();
        assert_eq!(tree.client_id(c, &ctx()).unwrap(), "outer:a");
    }

    #[test]
    fn test_transient_subtree_not_saved() {
        let mut tree = ComponentTree::new("/v");
        let root = tree.root();
        let kept = tree.create_child(root, "panel", Some("kept")).unwrap();
        let skipped = tree.create_child(root, "panel", Some("skipped")).unwrap();
        tree.component_mut(skipped).unwrap().set_transient(true);

        assert_eq!(tree.process_save_state(skipped).unwrap(), None);
        let saved = tree.process_save_state(root).unwrap().unwrap();
        let children = saved.children.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].state.id.as_deref(), Some("kept"));
        assert!(saved.facets.is_none());
        assert!(tree.process_save_state(kept).unwrap().unwrap().children.is_none());
    }

    #[test]
    fn test_missing_facet_state_is_reported() {
        let mut tree = ComponentTree::new("/v");
        let root = tree.root();
        let saved = tree.process_save_state(root).unwrap().unwrap();

        tree.create_facet(root, "header", "output", None).unwrap();
        let sink = Rc::new(MemorySink::new());
        let mut ctx = ctx().with_diagnostics(sink.clone());
        tree.process_restore_state(root, &saved, &mut ctx).unwrap();

        assert_eq!(sink.len(), 1);
        assert!(sink.messages()[0].contains("facet header"));
        assert_eq!(ctx.scope_depth(), 0);
    }

    #[test]
    fn test_surplus_child_states_reported_once() {
        let mut tree = ComponentTree::new("/v");
        let root = tree.root();
        tree.create_child(root, "output", Some("a")).unwrap();
        tree.create_child(root, "output", Some("b")).unwrap();
        let saved = tree.process_save_state(root).unwrap().unwrap();

        let mut smaller = ComponentTree::new("/v");
        let only = smaller.create_child(smaller.root(), "output", None).unwrap();
        let sink = Rc::new(MemorySink::new());
        let mut ctx = ctx().with_diagnostics(sink.clone());
        smaller.process_restore_state(smaller.root(), &saved, &mut ctx).unwrap();

        assert_eq!(smaller.component(only).unwrap().id(), Some("a"));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_unique_id_counter_survives_restore() {
        let build = || {
            let mut tree = ComponentTree::new("/v");
            let a = tree.create_child(tree.root(), "output", None).unwrap();
            (tree, a)
        };

        let (mut first, a) = build();
        let first_id = first.client_id(a, &ctx()).unwrap();
        let saved = first.process_save_state(first.root()).unwrap().unwrap();
        assert_eq!(saved.state.unique_id_counter, Some(1));

        let (mut second, a) = build();
        let mut restore_ctx = ctx();
        second.process_restore_state(second.root(), &saved, &mut restore_ctx).unwrap();
        let b = second.create_child(second.root(), "output", None).unwrap();

        assert_eq!(second.client_id(a, &ctx()).unwrap(), first_id);
        assert_ne!(second.client_id(b, &ctx()).unwrap(), first_id);
    }

    #[test]
    fn test_only_view_root_carries_counter() {
        let mut tree = ComponentTree::new("/v");
        let a = tree.create_child(tree.root(), "output", None).unwrap();
        tree.client_id(a, &ctx()).unwrap();
        assert_eq!(tree.save_state(a).unwrap().unique_id_counter, None);
        assert_eq!(tree.save_state(tree.root()).unwrap().unique_id_counter, Some(1));
    }
}
