//! fOS State
//!
//! Snapshot values and the attached-state envelope.
//!
//! Components persist their own fields directly, but collaborators that ride
//! along with a component (listeners, value bindings) are arbitrary objects.
//! The [`AttachedState`] envelope lets such objects round-trip through a
//! snapshot without being components themselves:
//!
//! - plain values pass through unchanged
//! - objects implementing [`StateHolder`] store their type name and own state
//! - lists are enveloped element by element
//! - anything else stores only its type name and comes back default-constructed

mod attached;
mod registry;
mod value;

pub use attached::{
    restore_attached, restore_attached_list, restore_attached_object, save_attached,
    save_attached_list, save_attached_object, Attachable, Attached, AttachedState, StateHolder,
};
pub use registry::{Factory, TypeRegistry};
pub use value::StateValue;

/// Errors raised while restoring saved state
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StateError {
    #[error("Could not restore attached object of type {type_name} (no registered constructor)")]
    Reconstruction { type_name: String },

    #[error("Unexpected state shape: expected {expected}, found {found}")]
    UnexpectedShape {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid state for {type_name}: {message}")]
    InvalidState { type_name: String, message: String },
}
