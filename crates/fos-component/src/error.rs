//! Component errors

use fos_state::StateError;

use crate::{AbortProcessing, ComponentId};

/// Fault raised by a collaborator (renderer, listener, expression resolver)
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for component operations
pub type ComponentResult<T> = Result<T, ComponentError>;

/// Component tree errors
///
/// Paths are rendered with [`ComponentTree::path_to`](crate::ComponentTree::path_to).
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    #[error("Component {0} not found")]
    NotFound(ComponentId),

    #[error("Invalid component identifier \"{id}\": {reason}")]
    InvalidId { id: String, reason: String },

    #[error("Duplicate component identifier \"{id}\" in {path}")]
    DuplicateId { id: String, path: String },

    #[error("Hierarchy request error: {0}")]
    Hierarchy(String),

    #[error(
        "Intermediate identifier {segment} in search expression {expr} identifies a component that is not a naming container"
    )]
    NotNamingContainer { segment: String, expr: String },

    #[error("Component is not a descendant of a view root: {path}")]
    Detached { path: String },

    #[error("Cannot create client id: no id is assigned and no view root is reachable: {path}")]
    NoViewRoot { path: String },

    #[error("Property \"{name}\" cannot be bound to an expression")]
    ReservedBinding { name: String },

    #[error("Could not restore state of component : {path}")]
    Restore {
        path: String,
        #[source]
        source: StateError,
    },

    #[error("Exception while evaluating \"{name}\" on component : {path}")]
    Expression {
        name: String,
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("Exception while decoding component : {path}")]
    Decode {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("Exception while encoding ({stage}) component : {path}")]
    Encode {
        stage: &'static str,
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("Exception while calling broadcast on component : {path}")]
    Broadcast {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("Exception while invoking callback on component : {path}")]
    Invoke {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Aborted(#[from] AbortProcessing),
}

impl ComponentError {
    /// Whether this is a listener abort signal rather than a fault
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }
}
