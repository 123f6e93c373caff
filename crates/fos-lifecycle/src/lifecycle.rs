//! Request driver
//!
//! Runs one request against a component tree: restore the saved state,
//! apply request values, validate, update, invoke the application, render,
//! and save the state for the next request. Queued events are delivered
//! after each phase.

use anyhow::Context;
use fos_component::{ComponentError, ComponentTree, PhaseId, RequestContext};

use crate::{Config, JsonStateSerializer, StateSerializer};

/// What a request produced
#[derive(Debug)]
pub struct RequestOutcome {
    /// Encoded state for the next request, if state saving is enabled
    pub state: Option<Vec<u8>>,
    /// Rendered markup
    pub response: String,
    /// Decode fault that degraded the request to render-only
    pub decode_fault: Option<ComponentError>,
    /// Whether validate/update/invoke were skipped
    pub render_only: bool,
}

/// Request driver
#[derive(Debug)]
pub struct Lifecycle<S: StateSerializer = JsonStateSerializer> {
    config: Config,
    serializer: S,
}

impl Lifecycle {
    /// Driver persisting state as JSON
    pub fn new(config: Config) -> Self {
        let serializer = JsonStateSerializer::new(config.pretty_state);
        Self { config, serializer }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl<S: StateSerializer> Lifecycle<S> {
    pub fn with_serializer(config: Config, serializer: S) -> Self {
        Self { config, serializer }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn serializer(&self) -> &S {
        &self.serializer
    }

    /// Run one request
    ///
    /// Without `saved_state` this is an initial request: nothing is restored
    /// or decoded and the view is only rendered.
    pub fn execute(
        &self,
        tree: &mut ComponentTree,
        ctx: &mut RequestContext,
        saved_state: Option<&[u8]>,
    ) -> anyhow::Result<RequestOutcome> {
        let root = tree.root();
        tracing::info!("Executing request for view {}", tree.view_id());

        ctx.set_phase(PhaseId::RestoreView);
        match saved_state {
            Some(bytes) => {
                let state = self.serializer.decode(bytes).context("decoding view state")?;
                tree.process_restore_state(root, &state, ctx)
                    .context("restoring view state")?;
            }
            None => {
                tracing::debug!("Initial request for {}", tree.view_id());
                ctx.render_response();
            }
        }

        let mut decode_fault = None;
        if !ctx.is_render_response() {
            ctx.set_phase(PhaseId::ApplyRequestValues);
            if let Err(err) = tree.process_decodes(root, ctx) {
                if self.config.propagate_decode_faults {
                    return Err(anyhow::Error::new(err).context("applying request values"));
                }
                tracing::warn!("Decode failed, rendering only: {}", err);
                decode_fault = Some(err);
            }
            tree.broadcast_events(PhaseId::ApplyRequestValues)
                .context("delivering events after applying request values")?;
        }

        if !ctx.is_render_response() {
            ctx.set_phase(PhaseId::ProcessValidations);
            tree.process_validators(root, ctx).context("processing validations")?;
            tree.broadcast_events(PhaseId::ProcessValidations)
                .context("delivering events after validation")?;
        }

        if !ctx.is_render_response() {
            ctx.set_phase(PhaseId::UpdateModelValues);
            tree.process_updates(root, ctx).context("updating model values")?;
            tree.broadcast_events(PhaseId::UpdateModelValues)
                .context("delivering events after model update")?;
        }

        if !ctx.is_render_response() {
            ctx.set_phase(PhaseId::InvokeApplication);
            tree.broadcast_events(PhaseId::InvokeApplication)
                .context("invoking application")?;
        }

        let dropped = tree.clear_events();
        if dropped > 0 {
            tracing::debug!("Dropped {} undelivered events", dropped);
        }

        ctx.set_phase(PhaseId::RenderResponse);
        tree.encode_all(root, ctx).context("rendering view")?;

        let state = if self.config.state_saving {
            match tree.process_save_state(root).context("saving view state")? {
                Some(state) => Some(self.serializer.encode(&state).context("encoding view state")?),
                None => None,
            }
        } else {
            None
        };

        let outcome = RequestOutcome {
            state,
            response: ctx.take_response(),
            decode_fault,
            render_only: ctx.is_render_response(),
        };
        tracing::info!(
            "Request for {} done: {} bytes rendered, {} bytes of state",
            tree.view_id(),
            outcome.response.len(),
            outcome.state.as_ref().map_or(0, Vec::len)
        );
        Ok(outcome)
    }
}
