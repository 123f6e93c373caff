//! Component - a single tree element
//!
//! Structural links (parent, children, facets) are owned by the
//! [`ComponentTree`]; a component only records them.
//!
//! Derived properties resolve in two tiers: a locally stored value wins,
//! otherwise a value binding of the same name is evaluated, otherwise the
//! hardcoded default applies.

use std::collections::BTreeMap;

use fos_state::StateValue;

use crate::{
    ComponentError, ComponentId, ComponentResult, ComponentTree, Listener, RequestContext,
    ValueBinding,
};

/// `rendered` when neither a local value nor a binding is present
pub const DEFAULT_RENDERED: bool = true;

/// Attribute names that map onto component properties
const PROP_ID: &str = "id";
const PROP_RENDERED: &str = "rendered";
const PROP_RENDERER_TYPE: &str = "rendererType";
const PROP_TRANSIENT: &str = "transient";

/// A component in the tree
#[derive(Debug)]
pub struct Component {
    pub(crate) id: Option<String>,
    pub(crate) client_id: Option<String>,
    pub(crate) family: String,
    pub(crate) rendered: Option<bool>,
    pub(crate) renderer_type: Option<String>,
    pub(crate) transient: bool,
    pub(crate) naming_container: bool,
    pub(crate) parent: Option<ComponentId>,
    pub(crate) children: Vec<ComponentId>,
    pub(crate) facets: Vec<(String, ComponentId)>,
    pub(crate) attributes: Option<BTreeMap<String, StateValue>>,
    pub(crate) listeners: Option<Vec<Box<dyn Listener>>>,
    pub(crate) bindings: Option<BTreeMap<String, Box<dyn ValueBinding>>>,
}

impl Component {
    pub(crate) fn new(family: impl Into<String>) -> Self {
        Self {
            id: None,
            client_id: None,
            family: family.into(),
            rendered: None,
            renderer_type: None,
            transient: false,
            naming_container: false,
            parent: None,
            children: Vec::new(),
            facets: Vec::new(),
            attributes: None,
            listeners: None,
            bindings: None,
        }
    }

    /// Local id, unique within the nearest naming container
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Component family, used with the renderer type to pick a renderer
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Memoized client id, if computed or restored
    pub fn cached_client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Locally stored `rendered` value (not the resolved one)
    pub fn local_rendered(&self) -> Option<bool> {
        self.rendered
    }

    pub fn set_rendered(&mut self, rendered: bool) {
        self.rendered = Some(rendered);
    }

    /// Locally stored renderer type (not the resolved one)
    pub fn local_renderer_type(&self) -> Option<&str> {
        self.renderer_type.as_deref()
    }

    pub fn set_renderer_type(&mut self, renderer_type: Option<&str>) {
        self.renderer_type = renderer_type.map(str::to_string);
    }

    pub fn is_transient(&self) -> bool {
        self.transient
    }

    /// Transient components are skipped when saving state
    pub fn set_transient(&mut self, transient: bool) {
        self.transient = transient;
    }

    pub fn is_naming_container(&self) -> bool {
        self.naming_container
    }

    /// Naming containers scope the client ids of their descendants
    pub fn set_naming_container(&mut self, naming_container: bool) {
        self.naming_container = naming_container;
    }

    pub fn parent(&self) -> Option<ComponentId> {
        self.parent
    }

    pub fn children(&self) -> &[ComponentId] {
        &self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Facets in insertion order
    pub fn facets(&self) -> &[(String, ComponentId)] {
        &self.facets
    }

    pub fn facet(&self, name: &str) -> Option<ComponentId> {
        self.facets
            .iter()
            .find(|(facet_name, _)| facet_name == name)
            .map(|&(_, id)| id)
    }

    pub fn facet_count(&self) -> usize {
        self.facets.len()
    }

    /// Raw attribute map; `None` until an attribute is first stored
    pub fn attributes(&self) -> Option<&BTreeMap<String, StateValue>> {
        self.attributes.as_ref()
    }

    pub fn listeners(&self) -> &[Box<dyn Listener>] {
        self.listeners.as_deref().unwrap_or(&[])
    }

    pub fn binding(&self, name: &str) -> Option<&dyn ValueBinding> {
        self.bindings.as_ref()?.get(name).map(|b| b.as_ref())
    }

    pub fn binding_names(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().flat_map(|b| b.keys().map(String::as_str))
    }
}

impl ComponentTree {
    /// Evaluate the value binding named `name`, if any
    fn resolve_binding(
        &self,
        id: ComponentId,
        name: &str,
        ctx: &RequestContext,
    ) -> ComponentResult<Option<StateValue>> {
        let Some(binding) = self.component(id)?.binding(name) else {
            return Ok(None);
        };
        binding
            .value(self, ctx)
            .map_err(|source| ComponentError::Expression {
                name: name.to_string(),
                path: self.path_to(id),
                source,
            })
    }

    /// Resolved `rendered` flag: local value, then binding, then [`DEFAULT_RENDERED`]
    pub fn is_rendered(&self, id: ComponentId, ctx: &RequestContext) -> ComponentResult<bool> {
        if let Some(rendered) = self.component(id)?.rendered {
            return Ok(rendered);
        }
        Ok(self
            .resolve_binding(id, PROP_RENDERED, ctx)?
            .and_then(|value| value.as_bool())
            .unwrap_or(DEFAULT_RENDERED))
    }

    /// Resolved renderer type: local value, then binding, else none
    pub fn renderer_type(
        &self,
        id: ComponentId,
        ctx: &RequestContext,
    ) -> ComponentResult<Option<String>> {
        if let Some(renderer_type) = &self.component(id)?.renderer_type {
            return Ok(Some(renderer_type.clone()));
        }
        Ok(self
            .resolve_binding(id, PROP_RENDERER_TYPE, ctx)?
            .and_then(|value| value.as_str().map(str::to_string)))
    }

    /// Read an attribute
    ///
    /// Property names read the property; other names read the attribute map
    /// and fall back to a value binding of the same name.
    pub fn attribute(
        &self,
        id: ComponentId,
        name: &str,
        ctx: &RequestContext,
    ) -> ComponentResult<Option<StateValue>> {
        let component = self.component(id)?;
        match name {
            PROP_ID => Ok(component.id.clone().map(StateValue::Str)),
            PROP_RENDERED => self.is_rendered(id, ctx).map(|r| Some(StateValue::Bool(r))),
            PROP_RENDERER_TYPE => Ok(self.renderer_type(id, ctx)?.map(StateValue::Str)),
            PROP_TRANSIENT => Ok(Some(StateValue::Bool(component.transient))),
            _ => match component.attributes.as_ref().and_then(|a| a.get(name)) {
                Some(value) => Ok(Some(value.clone())),
                None => self.resolve_binding(id, name, ctx),
            },
        }
    }

    /// Write an attribute
    ///
    /// Property names go through the property setters (`id` is validated);
    /// other names are stored in the attribute map.
    pub fn set_attribute(
        &mut self,
        id: ComponentId,
        name: &str,
        value: impl Into<StateValue>,
    ) -> ComponentResult<()> {
        let value = value.into();
        match name {
            PROP_ID => self.set_id(id, value.as_str()),
            PROP_RENDERED => {
                let rendered = value.as_bool().unwrap_or(DEFAULT_RENDERED);
                self.component_mut(id)?.rendered = Some(rendered);
                Ok(())
            }
            PROP_RENDERER_TYPE => {
                self.component_mut(id)?.renderer_type = value.as_str().map(str::to_string);
                Ok(())
            }
            PROP_TRANSIENT => {
                self.component_mut(id)?.transient = value.as_bool().unwrap_or(false);
                Ok(())
            }
            _ => {
                self.component_mut(id)?
                    .attributes
                    .get_or_insert_with(BTreeMap::new)
                    .insert(name.to_string(), value);
                Ok(())
            }
        }
    }

    /// Remove an attribute from the attribute map
    pub fn remove_attribute(
        &mut self,
        id: ComponentId,
        name: &str,
    ) -> ComponentResult<Option<StateValue>> {
        Ok(self
            .component_mut(id)?
            .attributes
            .as_mut()
            .and_then(|a| a.remove(name)))
    }

    pub fn value_binding(&self, id: ComponentId, name: &str) -> ComponentResult<Option<&dyn ValueBinding>> {
        Ok(self.component(id)?.binding(name))
    }

    /// Bind a property to an expression, or clear the binding with `None`
    ///
    /// Literal expressions are stored as plain attributes instead.
    pub fn set_value_binding(
        &mut self,
        id: ComponentId,
        name: &str,
        binding: Option<Box<dyn ValueBinding>>,
    ) -> ComponentResult<()> {
        if name == PROP_ID || name == "parent" {
            return Err(ComponentError::ReservedBinding {
                name: name.to_string(),
            });
        }

        match binding {
            Some(binding) if binding.is_literal_text() => {
                let literal = binding.expression_string().to_string();
                self.set_attribute(id, name, literal)
            }
            Some(binding) => {
                self.component_mut(id)?
                    .bindings
                    .get_or_insert_with(BTreeMap::new)
                    .insert(name.to_string(), binding);
                Ok(())
            }
            None => {
                if let Some(bindings) = self.component_mut(id)?.bindings.as_mut() {
                    bindings.remove(name);
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RenderKit, ValueExpression};

    fn ctx() -> RequestContext {
        RequestContext::new(RenderKit::new("basic"))
    }

    #[test]
    fn test_rendered_defaults_true() {
        let tree = ComponentTree::new("/v");
        assert!(tree.is_rendered(tree.root(), &ctx()).unwrap());
    }

    #[test]
    fn test_local_rendered_wins() {
        let mut tree = ComponentTree::new("/v");
        let c = tree.create_child(tree.root(), "panel", None).unwrap();
        tree.component_mut(c).unwrap().set_rendered(false);
        assert!(!tree.is_rendered(c, &ctx()).unwrap());
    }

    #[test]
    fn test_property_attributes_route_to_setters() {
        let mut tree = ComponentTree::new("/v");
        let c = tree.create_child(tree.root(), "panel", None).unwrap();

        tree.set_attribute(c, "rendered", false).unwrap();
        tree.set_attribute(c, "id", "main").unwrap();
        tree.set_attribute(c, "style", "bold").unwrap();

        let component = tree.component(c).unwrap();
        assert_eq!(component.local_rendered(), Some(false));
        assert_eq!(component.id(), Some("main"));
        // Only the non-property landed in the raw map
        assert_eq!(component.attributes().unwrap().len(), 1);
        assert!(tree.set_attribute(c, "id", "1bad").is_err());
    }

    #[test]
    fn test_attribute_reads() {
        let mut tree = ComponentTree::new("/v");
        let c = tree.create_child(tree.root(), "panel", Some("p")).unwrap();
        tree.set_attribute(c, "title", "hello").unwrap();

        let ctx = ctx();
        assert_eq!(tree.attribute(c, "title", &ctx).unwrap(), Some(StateValue::from("hello")));
        assert_eq!(tree.attribute(c, "id", &ctx).unwrap(), Some(StateValue::from("p")));
        assert_eq!(tree.attribute(c, "missing", &ctx).unwrap(), None);
        assert_eq!(tree.remove_attribute(c, "title").unwrap(), Some(StateValue::from("hello")));
    }

    #[test]
    fn test_reserved_bindings_rejected() {
        let mut tree = ComponentTree::new("/v");
        let c = tree.create("output");
        let err = tree
            .set_value_binding(c, "id", Some(Box::new(ValueExpression::new("#{x}"))))
            .unwrap_err();
        assert!(matches!(err, ComponentError::ReservedBinding { .. }));
    }

    #[test]
    fn test_literal_binding_becomes_attribute() {
        let mut tree = ComponentTree::new("/v");
        let c = tree.create("output");
        tree.set_value_binding(c, "label", Some(Box::new(ValueExpression::new("Plain"))))
            .unwrap();

        let component = tree.component(c).unwrap();
        assert!(component.binding("label").is_none());
        assert_eq!(
            component.attributes().unwrap().get("label"),
            Some(&StateValue::from("Plain"))
        );
    }

    struct Flags;

    impl crate::ExpressionResolver for Flags {
        fn resolve(
            &self,
            _tree: &ComponentTree,
            _current: Option<ComponentId>,
            expression: &str,
        ) -> Result<Option<StateValue>, crate::BoxError> {
            match expression {
                "#{hidden}" => Ok(Some(StateValue::Bool(false))),
                "#{kind}" => Ok(Some(StateValue::from("fancy"))),
                _ => Err(format!("unknown expression {expression}").into()),
            }
        }
    }

    #[test]
    fn test_bound_properties_resolve() {
        let mut tree = ComponentTree::new("/v");
        let c = tree.create_child(tree.root(), "panel", Some("p")).unwrap();
        tree.set_value_binding(c, "rendered", Some(Box::new(ValueExpression::new("#{hidden}"))))
            .unwrap();
        tree.set_value_binding(c, "rendererType", Some(Box::new(ValueExpression::new("#{kind}"))))
            .unwrap();
        tree.set_value_binding(c, "title", Some(Box::new(ValueExpression::new("#{broken}"))))
            .unwrap();

        let ctx = ctx().with_resolver(std::rc::Rc::new(Flags));
        assert!(!tree.is_rendered(c, &ctx).unwrap());
        assert_eq!(tree.renderer_type(c, &ctx).unwrap().as_deref(), Some("fancy"));
        assert!(matches!(
            tree.attribute(c, "title", &ctx),
            Err(ComponentError::Expression { .. })
        ));

        // A local value overrides the binding
        tree.component_mut(c).unwrap().set_rendered(true);
        assert!(tree.is_rendered(c, &ctx).unwrap());
        assert!(tree.value_binding(c, "rendered").unwrap().is_some());
    }

    #[test]
    fn test_unresolved_binding_without_resolver() {
        let mut tree = ComponentTree::new("/v");
        let c = tree.create("panel");
        tree.set_value_binding(c, "rendered", Some(Box::new(ValueExpression::new("#{x}"))))
            .unwrap();
        assert!(tree.is_rendered(c, &ctx()).unwrap());

        tree.set_value_binding(c, "rendered", None).unwrap();
        assert!(tree.value_binding(c, "rendered").unwrap().is_none());
    }
}
