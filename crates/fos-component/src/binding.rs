//! Value bindings
//!
//! A binding ties a component property to an expression evaluated by the
//! request's [`ExpressionResolver`](crate::ExpressionResolver). Bindings are
//! attached objects: they are saved through the envelope and rebuilt from
//! the context's binding registry.

use fos_state::{Attachable, StateError, StateHolder, StateValue};

use crate::{BoxError, ComponentTree, RequestContext};

/// A property bound to an expression
pub trait ValueBinding: Attachable {
    /// Source text of the expression
    fn expression_string(&self) -> &str;

    /// Literal text has no `#{...}` or `${...}` markers
    fn is_literal_text(&self) -> bool {
        let expr = self.expression_string();
        !(expr.contains("#{") || expr.contains("${"))
    }

    /// Evaluate against the current request
    ///
    /// Literal text evaluates to itself. Without a resolver the binding has
    /// no value.
    fn value(&self, tree: &ComponentTree, ctx: &RequestContext) -> Result<Option<StateValue>, BoxError> {
        if self.is_literal_text() {
            return Ok(Some(StateValue::from(self.expression_string())));
        }
        match ctx.resolver() {
            Some(resolver) => resolver.resolve(tree, ctx.current_component(), self.expression_string()),
            None => Ok(None),
        }
    }
}

/// Default binding: just the expression text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueExpression {
    expression: String,
}

impl ValueExpression {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }
}

impl StateHolder for ValueExpression {
    fn save_state(&self) -> StateValue {
        StateValue::Str(self.expression.clone())
    }

    fn restore_state(&mut self, state: &StateValue) -> Result<(), StateError> {
        match state.as_str() {
            Some(expression) => {
                self.expression = expression.to_string();
                Ok(())
            }
            None => Err(StateError::InvalidState {
                type_name: self.type_name().to_string(),
                message: format!("expected expression string, found {}", state.kind_name()),
            }),
        }
    }
}

impl Attachable for ValueExpression {
    fn state_holder(&self) -> Option<&dyn StateHolder> {
        Some(self)
    }

    fn state_holder_mut(&mut self) -> Option<&mut dyn StateHolder> {
        Some(self)
    }
}

impl ValueBinding for ValueExpression {
    fn expression_string(&self) -> &str {
        &self.expression
    }
}
