//! fOS Lifecycle
//!
//! Drives a [`ComponentTree`](fos_component::ComponentTree) through one
//! request and persists its state between requests.
//!
//! # Example
//! ```rust,ignore
//! use fos_component::{ComponentTree, RenderKit, RequestContext};
//! use fos_lifecycle::{init_logging, Config, Lifecycle};
//!
//! let config = Config::default();
//! init_logging(&config);
//! let lifecycle = Lifecycle::new(config);
//!
//! let mut tree = ComponentTree::new("/index");
//! let mut ctx = RequestContext::new(RenderKit::new("basic"));
//! let first = lifecycle.execute(&mut tree, &mut ctx, None)?;
//!
//! // Next request: same tree shape, previous state
//! let mut ctx = RequestContext::new(RenderKit::new("basic")).with_param("q", "rust");
//! let second = lifecycle.execute(&mut tree, &mut ctx, first.state.as_deref())?;
//! ```

mod config;
mod lifecycle;
mod logging;
mod serializer;

pub use config::Config;
pub use lifecycle::{Lifecycle, RequestOutcome};
pub use logging::init_logging;
pub use serializer::{JsonStateSerializer, StateCodecError, StateSerializer};

// Re-export the component crate for drivers that only depend on this one
pub use fos_component as component;

/// Lifecycle version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
