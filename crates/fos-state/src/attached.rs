//! Attached-state envelope
//!
//! Save/restore for objects that are not components but must survive a
//! snapshot alongside one.
//!
//! Restoring a [`AttachedState::TypeOnly`] envelope is lossy: the object is
//! rebuilt from its registered zero-argument constructor and none of its
//! previous fields come back. Types that need their data preserved must
//! implement [`StateHolder`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{StateError, StateValue, TypeRegistry};

/// An object that saves and restores its own state
pub trait StateHolder {
    /// Capture the object's state
    fn save_state(&self) -> StateValue;

    /// Reapply state produced by [`save_state`](StateHolder::save_state)
    fn restore_state(&mut self, state: &StateValue) -> Result<(), StateError>;

    /// Transient holders are not saved at all
    fn is_transient(&self) -> bool {
        false
    }
}

/// An object that can be carried by the envelope
pub trait Attachable: fmt::Debug {
    /// Name under which the type is registered for reconstruction
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// The object's [`StateHolder`] view, if it describes its own state
    fn state_holder(&self) -> Option<&dyn StateHolder> {
        None
    }

    fn state_holder_mut(&mut self) -> Option<&mut dyn StateHolder> {
        None
    }
}

/// A live attached object
#[derive(Debug)]
pub enum Attached<T: ?Sized> {
    /// Plain serializable value, saved as-is
    Value(StateValue),
    /// Runtime-typed object
    Object(Box<T>),
    /// Ordered list of attached objects
    List(Vec<Option<Attached<T>>>),
}

impl<T: ?Sized> Attached<T> {
    pub fn as_object(&self) -> Option<&T> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<Box<T>> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&StateValue> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Option<Attached<T>>]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

/// The saved form of an attached object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachedState {
    /// Passthrough value
    Value(StateValue),
    /// Self-describing object: type plus its own state
    Stateful { type_name: String, state: StateValue },
    /// Type only; restores to a default instance
    TypeOnly { type_name: String },
    /// Element-wise enveloped list
    Sequence(Vec<Option<AttachedState>>),
}

impl AttachedState {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::Stateful { .. } => "stateful",
            Self::TypeOnly { .. } => "type-only",
            Self::Sequence(_) => "sequence",
        }
    }
}

/// Save a single object
///
/// Returns `None` for a transient state holder.
pub fn save_attached_object<T: Attachable + ?Sized>(object: &T) -> Option<AttachedState> {
    let type_name = object.type_name().to_string();
    match object.state_holder() {
        Some(holder) if holder.is_transient() => None,
        Some(holder) => Some(AttachedState::Stateful {
            type_name,
            state: holder.save_state(),
        }),
        None => {
            tracing::debug!("Attached object {} has no state holder; saving type only", type_name);
            Some(AttachedState::TypeOnly { type_name })
        }
    }
}

/// Save a list of objects as a sequence envelope
pub fn save_attached_list<T: Attachable + ?Sized>(items: &[Box<T>]) -> AttachedState {
    AttachedState::Sequence(
        items
            .iter()
            .map(|item| save_attached_object(item.as_ref()))
            .collect(),
    )
}

/// Save any attached value. `None` round-trips to `None`.
pub fn save_attached<T: Attachable + ?Sized>(attached: Option<&Attached<T>>) -> Option<AttachedState> {
    match attached? {
        Attached::Value(value) => Some(AttachedState::Value(value.clone())),
        Attached::Object(object) => save_attached_object(object.as_ref()),
        Attached::List(items) => Some(AttachedState::Sequence(
            items.iter().map(|item| save_attached(item.as_ref())).collect(),
        )),
    }
}

/// Rebuild an object from a `Stateful` or `TypeOnly` envelope
pub fn restore_attached_object<T: Attachable + ?Sized>(
    registry: &TypeRegistry<T>,
    state: &AttachedState,
) -> Result<Box<T>, StateError> {
    match state {
        AttachedState::Stateful { type_name, state } => {
            let mut object = registry.instantiate(type_name)?;
            if let Some(holder) = object.state_holder_mut() {
                holder.restore_state(state)?;
            }
            Ok(object)
        }
        AttachedState::TypeOnly { type_name } => registry.instantiate(type_name),
        other => Err(StateError::UnexpectedShape {
            expected: "object",
            found: other.kind_name(),
        }),
    }
}

/// Rebuild a list of objects from a sequence envelope
///
/// Elements saved as `None` (transient holders) are dropped.
pub fn restore_attached_list<T: Attachable + ?Sized>(
    registry: &TypeRegistry<T>,
    state: &AttachedState,
) -> Result<Vec<Box<T>>, StateError> {
    let AttachedState::Sequence(items) = state else {
        return Err(StateError::UnexpectedShape {
            expected: "sequence",
            found: state.kind_name(),
        });
    };

    let mut restored = Vec::with_capacity(items.len());
    for item in items.iter().flatten() {
        restored.push(restore_attached_object(registry, item)?);
    }
    Ok(restored)
}

/// Restore any envelope produced by [`save_attached`]
pub fn restore_attached<T: Attachable + ?Sized>(
    registry: &TypeRegistry<T>,
    state: Option<&AttachedState>,
) -> Result<Option<Attached<T>>, StateError> {
    let Some(state) = state else {
        return Ok(None);
    };

    let restored = match state {
        AttachedState::Value(value) => Attached::Value(value.clone()),
        AttachedState::Stateful { .. } | AttachedState::TypeOnly { .. } => {
            Attached::Object(restore_attached_object(registry, state)?)
        }
        AttachedState::Sequence(items) => Attached::List(
            items
                .iter()
                .map(|item| restore_attached(registry, item.as_ref()))
                .collect::<Result<Vec<_>, _>>()?,
        ),
    };
    Ok(Some(restored))
}
