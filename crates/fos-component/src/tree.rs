//! Component tree (arena-based)
//!
//! The tree owns every component. Structural links are kept consistent
//! here: a component has at most one parent, and inserting it somewhere
//! new detaches it from wherever it was.

use crate::{Component, ComponentError, ComponentEvent, ComponentId, ComponentResult};

/// Family of the view root
pub const ROOT_FAMILY: &str = "root";

/// Prefix of ids generated by [`ComponentTree::create_unique_id`]
pub const UNIQUE_ID_PREFIX: &str = "_id";

/// Arena of components rooted at a view root
#[derive(Debug)]
pub struct ComponentTree {
    nodes: Vec<Option<Component>>,
    root: ComponentId,
    view_id: String,
    pub(crate) unique_counter: u32,
    pub(crate) events: Vec<ComponentEvent>,
}

impl ComponentTree {
    /// Create a tree holding only a view root
    pub fn new(view_id: impl Into<String>) -> Self {
        Self {
            nodes: vec![Some(Component::new(ROOT_FAMILY))],
            root: ComponentId(0),
            view_id: view_id.into(),
            unique_counter: 0,
            events: Vec::new(),
        }
    }

    /// The view root
    #[inline]
    pub fn root(&self) -> ComponentId {
        self.root
    }

    pub fn view_id(&self) -> &str {
        &self.view_id
    }

    /// Allocate a detached component
    pub fn create(&mut self, family: impl Into<String>) -> ComponentId {
        let id = ComponentId(self.nodes.len() as u32);
        self.nodes.push(Some(Component::new(family)));
        id
    }

    pub fn get(&self, id: ComponentId) -> Option<&Component> {
        self.nodes.get(id.index())?.as_ref()
    }

    pub fn get_mut(&mut self, id: ComponentId) -> Option<&mut Component> {
        self.nodes.get_mut(id.index())?.as_mut()
    }

    pub fn component(&self, id: ComponentId) -> ComponentResult<&Component> {
        self.get(id).ok_or(ComponentError::NotFound(id))
    }

    pub fn component_mut(&mut self, id: ComponentId) -> ComponentResult<&mut Component> {
        self.get_mut(id).ok_or(ComponentError::NotFound(id))
    }

    /// Number of live components, attached or not
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.get(id).is_some()
    }

    pub fn parent(&self, id: ComponentId) -> Option<ComponentId> {
        self.get(id)?.parent
    }

    pub fn children(&self, id: ComponentId) -> ComponentResult<&[ComponentId]> {
        Ok(&self.component(id)?.children)
    }

    pub fn facets(&self, id: ComponentId) -> ComponentResult<&[(String, ComponentId)]> {
        Ok(&self.component(id)?.facets)
    }

    pub fn facet(&self, id: ComponentId, name: &str) -> ComponentResult<Option<ComponentId>> {
        Ok(self.component(id)?.facet(name))
    }

    /// Facets in insertion order, then children in list order
    pub fn facets_and_children(&self, id: ComponentId) -> ComponentResult<Vec<ComponentId>> {
        let component = self.component(id)?;
        let mut all = Vec::with_capacity(component.facets.len() + component.children.len());
        all.extend(component.facets.iter().map(|&(_, facet)| facet));
        all.extend_from_slice(&component.children);
        Ok(all)
    }

    /// Topmost ancestor (the component itself when it has no parent)
    pub fn top_ancestor(&self, id: ComponentId) -> ComponentId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Whether `ancestor` is a strict ancestor of `id`
    pub fn is_ancestor(&self, ancestor: ComponentId, id: ComponentId) -> bool {
        let mut current = self.parent(id);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    /// Whether the component hangs under the view root
    pub fn is_attached(&self, id: ComponentId) -> bool {
        self.contains(id) && self.top_ancestor(id) == self.root
    }

    /// Fresh local id, never handed out before by this tree
    ///
    /// The counter travels with the view root's saved state, so a restored
    /// tree continues where the previous request stopped.
    pub fn create_unique_id(&mut self) -> String {
        self.unique_counter += 1;
        format!("{}{}", UNIQUE_ID_PREFIX, self.unique_counter)
    }

    // --- building ---

    /// Create a component and append it to `parent`'s children
    pub fn create_child(
        &mut self,
        parent: ComponentId,
        family: &str,
        id: Option<&str>,
    ) -> ComponentResult<ComponentId> {
        let child = self.create(family);
        let attached = self
            .set_id(child, id)
            .and_then(|()| self.append_child(parent, child));
        if let Err(err) = attached {
            self.free(child);
            return Err(err);
        }
        Ok(child)
    }

    /// Create a component and store it as facet `name` of `parent`
    pub fn create_facet(
        &mut self,
        parent: ComponentId,
        name: &str,
        family: &str,
        id: Option<&str>,
    ) -> ComponentResult<ComponentId> {
        let facet = self.create(family);
        let attached = self
            .set_id(facet, id)
            .and_then(|()| self.set_facet(parent, name, facet).map(|_| ()));
        if let Err(err) = attached {
            self.free(facet);
            return Err(err);
        }
        Ok(facet)
    }

    /// Append `child` to `parent`, detaching it from any previous parent
    pub fn append_child(&mut self, parent: ComponentId, child: ComponentId) -> ComponentResult<()> {
        self.check_insert(parent, child, None)?;
        self.detach(child);
        self.component_mut(parent)?.children.push(child);
        self.component_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Insert `child` at `index` in `parent`'s children
    ///
    /// The index is interpreted after `child` has been detached.
    pub fn insert_child(
        &mut self,
        parent: ComponentId,
        index: usize,
        child: ComponentId,
    ) -> ComponentResult<()> {
        self.check_insert(parent, child, None)?;
        self.detach(child);
        let children = &mut self.component_mut(parent)?.children;
        if index > children.len() {
            let len = children.len();
            return Err(ComponentError::Hierarchy(format!(
                "child index {index} out of bounds (length {len})"
            )));
        }
        children.insert(index, child);
        self.component_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Remove `child` from `parent`'s children; it stays allocated, detached
    pub fn remove_child(&mut self, parent: ComponentId, child: ComponentId) -> ComponentResult<bool> {
        let children = &mut self.component_mut(parent)?.children;
        let Some(pos) = children.iter().position(|&c| c == child) else {
            return Ok(false);
        };
        children.remove(pos);
        if let Some(component) = self.get_mut(child) {
            component.parent = None;
        }
        Ok(true)
    }

    /// Store `facet` under `name`, returning the facet it replaced
    pub fn set_facet(
        &mut self,
        parent: ComponentId,
        name: &str,
        facet: ComponentId,
    ) -> ComponentResult<Option<ComponentId>> {
        let previous = self.component(parent)?.facet(name);
        if previous == Some(facet) {
            return Ok(None);
        }
        self.check_insert(parent, facet, previous)?;
        self.detach(facet);

        let facets = &mut self.component_mut(parent)?.facets;
        match facets.iter_mut().find(|(facet_name, _)| facet_name == name) {
            Some(slot) => slot.1 = facet,
            None => facets.push((name.to_string(), facet)),
        }
        self.component_mut(facet)?.parent = Some(parent);

        if let Some(previous) = previous {
            if let Some(component) = self.get_mut(previous) {
                component.parent = None;
            }
        }
        Ok(previous)
    }

    /// Remove facet `name`; the facet stays allocated, detached
    pub fn remove_facet(&mut self, parent: ComponentId, name: &str) -> ComponentResult<Option<ComponentId>> {
        let facets = &mut self.component_mut(parent)?.facets;
        let Some(pos) = facets.iter().position(|(facet_name, _)| facet_name == name) else {
            return Ok(None);
        };
        let (_, facet) = facets.remove(pos);
        if let Some(component) = self.get_mut(facet) {
            component.parent = None;
        }
        Ok(Some(facet))
    }

    /// Detach a component and free it together with its whole subtree
    pub fn discard(&mut self, id: ComponentId) -> ComponentResult<usize> {
        if id == self.root {
            return Err(ComponentError::Hierarchy("the view root cannot be discarded".into()));
        }
        self.component(id)?;
        self.detach(id);

        let mut stack = vec![id];
        let mut freed = Vec::new();
        while let Some(current) = stack.pop() {
            if let Some(component) = self.nodes.get_mut(current.index()).and_then(Option::take) {
                stack.extend(component.facets.iter().map(|&(_, facet)| facet));
                stack.extend_from_slice(&component.children);
                freed.push(current);
            }
        }

        self.events.retain(|event| !freed.contains(&event.source));
        tracing::debug!("Discarded {} components under {}", freed.len(), id);
        Ok(freed.len())
    }

    // --- internal ---

    /// Validate an insertion of `child` under `parent`. `replacing` is the
    /// facet the insertion will displace, excluded from the id check.
    fn check_insert(
        &self,
        parent: ComponentId,
        child: ComponentId,
        replacing: Option<ComponentId>,
    ) -> ComponentResult<()> {
        let parent_component = self.component(parent)?;
        let child_component = self.component(child)?;

        if child == self.root {
            return Err(ComponentError::Hierarchy("the view root cannot be inserted".into()));
        }
        if child == parent || self.is_ancestor(child, parent) {
            return Err(ComponentError::Hierarchy(format!(
                "{child} cannot be inserted under its own descendant {parent}"
            )));
        }

        let Some(local_id) = child_component.id.as_deref() else {
            return Ok(());
        };
        let collides = parent_component
            .facets
            .iter()
            .map(|&(_, facet)| facet)
            .chain(parent_component.children.iter().copied())
            .filter(|&sibling| sibling != child && Some(sibling) != replacing)
            .any(|sibling| self.get(sibling).and_then(|s| s.id.as_deref()) == Some(local_id));
        if collides {
            return Err(ComponentError::DuplicateId {
                id: local_id.to_string(),
                path: self.path_to(parent),
            });
        }
        Ok(())
    }

    /// Unlink a component from its parent's children or facets
    fn detach(&mut self, id: ComponentId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(parent) = self.get_mut(parent) {
            parent.children.retain(|&c| c != id);
            parent.facets.retain(|&(_, f)| f != id);
        }
        if let Some(component) = self.get_mut(id) {
            component.parent = None;
        }
    }

    /// Free a single, never-attached slot
    fn free(&mut self, id: ComponentId) {
        if let Some(slot) = self.nodes.get_mut(id.index()) {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tree_has_root() {
        let tree = ComponentTree::new("/index");
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.view_id(), "/index");
        assert_eq!(tree.component(tree.root()).unwrap().family(), ROOT_FAMILY);
        assert!(tree.is_attached(tree.root()));
    }

    #[test]
    fn test_append_and_order() {
        let mut tree = ComponentTree::new("/v");
        let root = tree.root();
        let a = tree.create_child(root, "panel", Some("a")).unwrap();
        let b = tree.create_child(root, "panel", Some("b")).unwrap();
        let c = tree.create("panel");
        tree.insert_child(root, 1, c).unwrap();

        assert_eq!(tree.children(root).unwrap(), &[a, c, b]);
        assert_eq!(tree.parent(c), Some(root));
    }

    #[test]
    fn test_reparent_detaches_from_previous_parent() {
        let mut tree = ComponentTree::new("/v");
        let root = tree.root();
        let first = tree.create_child(root, "panel", None).unwrap();
        let second = tree.create_child(root, "panel", None).unwrap();
        let moved = tree.create_child(first, "output", None).unwrap();

        tree.append_child(second, moved).unwrap();
        assert!(tree.children(first).unwrap().is_empty());
        assert_eq!(tree.children(second).unwrap(), &[moved]);
        assert_eq!(tree.parent(moved), Some(second));
    }

    #[test]
    fn test_child_to_facet_moves() {
        let mut tree = ComponentTree::new("/v");
        let root = tree.root();
        let table = tree.create_child(root, "table", None).unwrap();
        let header = tree.create_child(table, "output", None).unwrap();

        assert_eq!(tree.set_facet(table, "header", header).unwrap(), None);
        assert!(tree.children(table).unwrap().is_empty());
        assert_eq!(tree.facet(table, "header").unwrap(), Some(header));
    }

    #[test]
    fn test_set_facet_replaces() {
        let mut tree = ComponentTree::new("/v");
        let root = tree.root();
        let old = tree.create_facet(root, "header", "output", Some("title")).unwrap();
        let new = tree.create("output");
        tree.set_id(new, Some("title")).unwrap();

        // Same id as the displaced facet is fine
        assert_eq!(tree.set_facet(root, "header", new).unwrap(), Some(old));
        assert_eq!(tree.parent(old), None);
        assert_eq!(tree.facets(root).unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_sibling_id_rejected() {
        let mut tree = ComponentTree::new("/v");
        let root = tree.root();
        tree.create_child(root, "input", Some("name")).unwrap();
        let err = tree.create_child(root, "input", Some("name")).unwrap_err();
        assert!(matches!(err, ComponentError::DuplicateId { .. }));
        // The failed component was not left behind
        assert_eq!(tree.len(), 2);

        // Facet and child namespaces are shared
        let err = tree.create_facet(root, "f", "input", Some("name")).unwrap_err();
        assert!(matches!(err, ComponentError::DuplicateId { .. }));

        // Unidentified siblings may repeat
        tree.create_child(root, "output", None).unwrap();
        tree.create_child(root, "output", None).unwrap();
    }

    #[test]
    fn test_cycles_rejected() {
        let mut tree = ComponentTree::new("/v");
        let root = tree.root();
        let outer = tree.create_child(root, "panel", None).unwrap();
        let inner = tree.create_child(outer, "panel", None).unwrap();

        assert!(matches!(tree.append_child(inner, outer), Err(ComponentError::Hierarchy(_))));
        assert!(matches!(tree.append_child(outer, outer), Err(ComponentError::Hierarchy(_))));
        assert!(matches!(tree.append_child(inner, root), Err(ComponentError::Hierarchy(_))));
    }

    #[test]
    fn test_insert_out_of_bounds() {
        let mut tree = ComponentTree::new("/v");
        let c = tree.create("panel");
        assert!(tree.insert_child(tree.root(), 3, c).is_err());
    }

    #[test]
    fn test_facets_and_children_order() {
        let mut tree = ComponentTree::new("/v");
        let root = tree.root();
        let child = tree.create_child(root, "panel", None).unwrap();
        let footer = tree.create_facet(root, "footer", "output", None).unwrap();
        let header = tree.create_facet(root, "header", "output", None).unwrap();

        assert_eq!(tree.facets_and_children(root).unwrap(), vec![footer, header, child]);
    }

    #[test]
    fn test_remove_keeps_component_allocated() {
        let mut tree = ComponentTree::new("/v");
        let root = tree.root();
        let c = tree.create_child(root, "panel", None).unwrap();
        assert!(tree.remove_child(root, c).unwrap());
        assert!(!tree.remove_child(root, c).unwrap());
        assert!(tree.contains(c));
        assert!(!tree.is_attached(c));

        let f = tree.create_facet(root, "header", "output", None).unwrap();
        assert_eq!(tree.remove_facet(root, "header").unwrap(), Some(f));
        assert_eq!(tree.remove_facet(root, "header").unwrap(), None);
    }

    #[test]
    fn test_discard_frees_subtree() {
        let mut tree = ComponentTree::new("/v");
        let root = tree.root();
        let panel = tree.create_child(root, "panel", None).unwrap();
        let inner = tree.create_child(panel, "output", None).unwrap();
        let facet = tree.create_facet(panel, "header", "output", None).unwrap();

        assert_eq!(tree.discard(panel).unwrap(), 3);
        assert!(!tree.contains(inner));
        assert!(!tree.contains(facet));
        assert!(tree.children(root).unwrap().is_empty());
        assert!(tree.discard(root).is_err());
    }

    #[test]
    fn test_unique_ids_never_repeat() {
        let mut tree = ComponentTree::new("/v");
        let first = tree.create_unique_id();
        let second = tree.create_unique_id();
        assert_ne!(first, second);
        assert!(first.starts_with(UNIQUE_ID_PREFIX));
    }
}
