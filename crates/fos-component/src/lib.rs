//! fOS Component Tree
//!
//! Stateful component runtime: a mutable tree of typed components that is
//! rebuilt or restored once per request, walked through a fixed sequence of
//! processing phases, and saved into a serializable snapshot at the end.
//!
//! # Structure
//! - [`ComponentTree`] owns every component in an arena and addresses them by
//!   [`ComponentId`]. Its root is the view root: it hosts the unique-id
//!   generator and the event queue.
//! - Identity: local ids, naming containers and client ids live in [`identity`].
//! - State: [`ComponentState`] and [`TreeState`] are the snapshot records.
//! - Phases: decode, validate, update and render are methods on the tree,
//!   driven with a [`RequestContext`].
//!
//! # Example
//! ```rust,ignore
//! use fos_component::{ComponentTree, RenderKit, RequestContext};
//!
//! let mut tree = ComponentTree::new("/index");
//! let form = tree.create_child(tree.root(), "form", Some("login"))?;
//! tree.component_mut(form)?.set_naming_container(true);
//! let name = tree.create_child(form, "input", Some("name"))?;
//!
//! let ctx = RequestContext::new(RenderKit::new("basic"));
//! assert_eq!(tree.client_id(name, &ctx)?, "login:name");
//! ```

mod binding;
mod component;
mod context;
mod error;
mod event;
pub mod identity;
mod phase;
mod render;
mod state;
mod tree;

pub use binding::{ValueBinding, ValueExpression};
pub use component::{Component, DEFAULT_RENDERED};
pub use context::{
    DiagnosticSink, ExpressionResolver, MemorySink, RequestContext, SystemEvent, TracingSink,
};
pub use error::{BoxError, ComponentError, ComponentResult};
pub use event::{AbortProcessing, ComponentEvent, EventKind, Listener, ListenerError, PhaseId};
pub use identity::{validate_id, SEPARATOR_CHAR};
pub use render::{RenderKit, Renderer};
pub use state::{ComponentState, TreeState};
pub use tree::{ComponentTree, ROOT_FAMILY, UNIQUE_ID_PREFIX};

pub use fos_state::{self, StateValue};

use std::fmt;

/// Component identifier (index into the tree arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) u32);

impl ComponentId {
    /// Arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
