//! Component events and listeners
//!
//! Listeners are attached objects and ride along in the snapshot. Events
//! are either broadcast directly to one component's listeners or queued on
//! the view root and delivered per phase.

use fos_state::{Attachable, StateValue};
use serde::{Deserialize, Serialize};

use crate::{BoxError, ComponentError, ComponentId, ComponentResult, ComponentTree};

/// Request processing phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PhaseId {
    /// Matches every phase when used as an event's delivery phase
    AnyPhase,
    RestoreView,
    ApplyRequestValues,
    ProcessValidations,
    UpdateModelValues,
    InvokeApplication,
    RenderResponse,
}

impl PhaseId {
    /// Whether an event tagged with `self` is delivered during `phase`
    pub fn matches(self, phase: PhaseId) -> bool {
        self == PhaseId::AnyPhase || self == phase
    }
}

/// Event type, the capability a listener declares
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Action,
    ValueChange,
    Custom(String),
}

/// An event raised by a component
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentEvent {
    pub source: ComponentId,
    pub kind: EventKind,
    /// Phase the event is delivered in when queued
    pub phase: PhaseId,
    pub payload: StateValue,
}

impl ComponentEvent {
    pub fn new(source: ComponentId, kind: EventKind) -> Self {
        Self {
            source,
            kind,
            phase: PhaseId::AnyPhase,
            payload: StateValue::Null,
        }
    }

    pub fn with_phase(mut self, phase: PhaseId) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_payload(mut self, payload: impl Into<StateValue>) -> Self {
        self.payload = payload.into();
        self
    }
}

/// Raised by a listener to stop the remaining listeners for one event
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Processing aborted: {reason}")]
pub struct AbortProcessing {
    pub reason: String,
}

impl AbortProcessing {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// Listener outcome other than success
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error(transparent)]
    Abort(#[from] AbortProcessing),

    #[error("Listener failed: {0}")]
    Failed(#[source] BoxError),
}

/// Event listener attached to a component
pub trait Listener: Attachable {
    /// Event kind this listener handles
    fn kind(&self) -> EventKind;

    fn is_appropriate(&self, event: &ComponentEvent) -> bool {
        event.kind == self.kind()
    }

    fn process(&mut self, event: &ComponentEvent) -> Result<(), ListenerError>;
}

impl ComponentTree {
    pub fn add_listener(&mut self, id: ComponentId, listener: Box<dyn Listener>) -> ComponentResult<()> {
        self.component_mut(id)?
            .listeners
            .get_or_insert_with(Vec::new)
            .push(listener);
        Ok(())
    }

    /// Detach the listener at `index` in attachment order
    pub fn remove_listener(
        &mut self,
        id: ComponentId,
        index: usize,
    ) -> ComponentResult<Option<Box<dyn Listener>>> {
        let Some(listeners) = self.component_mut(id)?.listeners.as_mut() else {
            return Ok(None);
        };
        if index >= listeners.len() {
            return Ok(None);
        }
        Ok(Some(listeners.remove(index)))
    }

    /// Listeners declaring `kind`, in attachment order
    pub fn listeners_of_kind(&self, id: ComponentId, kind: &EventKind) -> ComponentResult<Vec<&dyn Listener>> {
        Ok(self
            .component(id)?
            .listeners()
            .iter()
            .filter(|listener| listener.kind() == *kind)
            .map(|listener| listener.as_ref())
            .collect())
    }

    /// Deliver `event` to the component's matching listeners in attachment
    /// order
    ///
    /// An abort stops delivery and is returned as
    /// [`ComponentError::Aborted`]. Does not propagate to ancestors.
    pub fn broadcast(&mut self, id: ComponentId, event: &ComponentEvent) -> ComponentResult<()> {
        let outcome = match self.component_mut(id)?.listeners.as_mut() {
            Some(listeners) => listeners
                .iter_mut()
                .filter(|listener| listener.is_appropriate(event))
                .try_for_each(|listener| listener.process(event)),
            None => Ok(()),
        };

        match outcome {
            Ok(()) => Ok(()),
            Err(ListenerError::Abort(abort)) => {
                tracing::debug!("Broadcast on {} aborted: {}", id, abort.reason);
                Err(ComponentError::Aborted(abort))
            }
            Err(ListenerError::Failed(source)) => Err(ComponentError::Broadcast {
                path: self.path_to(id),
                source,
            }),
        }
    }

    /// Queue an event on the view root for later delivery
    ///
    /// The source must hang under the view root.
    pub fn queue_event(&mut self, event: ComponentEvent) -> ComponentResult<()> {
        self.component(event.source)?;
        if self.top_ancestor(event.source) != self.root() {
            return Err(ComponentError::Detached {
                path: self.path_to(event.source),
            });
        }
        tracing::debug!("Queued {:?} event from {} for {:?}", event.kind, event.source, event.phase);
        self.events.push(event);
        Ok(())
    }

    /// Events queued and not yet delivered
    pub fn pending_events(&self) -> &[ComponentEvent] {
        &self.events
    }

    /// Drop every queued event, returning how many were dropped
    pub fn clear_events(&mut self) -> usize {
        let dropped = self.events.len();
        self.events.clear();
        dropped
    }

    /// Deliver the queued events belonging to `phase`
    ///
    /// Events for other phases stay queued. An abort drops the rest of this
    /// phase's events; any other fault propagates.
    pub fn broadcast_events(&mut self, phase: PhaseId) -> ComponentResult<()> {
        let (due, later): (Vec<_>, Vec<_>) = std::mem::take(&mut self.events)
            .into_iter()
            .partition(|event| event.phase.matches(phase));
        self.events = later;

        for event in &due {
            match self.broadcast(event.source, event) {
                Ok(()) => {}
                Err(err) if err.is_abort() => {
                    tracing::debug!("Event delivery for {:?} stopped: {}", phase, err);
                    break;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}
