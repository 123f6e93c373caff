//! Type registry
//!
//! Maps saved type names to zero-argument constructors. Restoring an
//! envelope only works for types registered here.

use std::collections::HashMap;
use std::fmt;

use crate::StateError;

/// Zero-argument constructor for a registered type
pub type Factory<T> = fn() -> Box<T>;

/// Registry of constructible types, keyed by [`Attachable::type_name`](crate::Attachable::type_name)
pub struct TypeRegistry<T: ?Sized> {
    factories: HashMap<String, Factory<T>>,
}

impl<T: ?Sized> TypeRegistry<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a constructor for `C`, keyed by `C`'s type name
    pub fn register<C: ?Sized + 'static>(&mut self, factory: Factory<T>) -> &mut Self {
        self.register_named(std::any::type_name::<C>(), factory)
    }

    /// Register a constructor under an explicit name
    pub fn register_named(&mut self, type_name: impl Into<String>, factory: Factory<T>) -> &mut Self {
        let type_name = type_name.into();
        tracing::debug!("Registering attached type {}", type_name);
        self.factories.insert(type_name, factory);
        self
    }

    /// Check whether a type name is known
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Instantiate a fresh default instance of a registered type
    pub fn instantiate(&self, type_name: &str) -> Result<Box<T>, StateError> {
        match self.factories.get(type_name) {
            Some(factory) => Ok(factory()),
            None => Err(StateError::Reconstruction {
                type_name: type_name.to_string(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl<T: ?Sized> Default for TypeRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for TypeRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}
