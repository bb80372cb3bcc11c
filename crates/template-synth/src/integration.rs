//! External integration handlers.
//!
//! A call whose callee resolves to a [`Node::Reference`] carrying an
//! [`IntegrationId`] is handed to the dialect's `integrate` hook, which in
//! turn calls the handler method for that dialect. Handlers that do not know
//! a dialect inherit a default that reports the construct as unsupported.

use crate::error::SynthError;
use crate::ir::{IntegrationId, Ir, Node, NodeId};
use std::fmt;

#[cfg(feature = "apigateway")]
use crate::dialect::apigateway::ApiGateway;
#[cfg(feature = "appsync")]
use crate::dialect::appsync::Appsync;
#[cfg(any(feature = "appsync", feature = "apigateway"))]
use crate::synth::Synth;

/// A downstream service call the front end recognized in the closure.
pub trait Integration: fmt::Debug + Send + Sync {
    /// Identifier recorded in compile output, e.g. `dynamodb.getItem`.
    fn kind(&self) -> &str;

    /// Render the call site for the resolver template dialect.
    #[cfg(feature = "appsync")]
    fn appsync(
        &self,
        call: &IntegrationCall,
        cx: &mut Synth<'_, Appsync>,
    ) -> Result<String, SynthError> {
        let _ = (call, cx);
        Err(unsupported_in(self.kind(), "appsync"))
    }

    /// Render the call site for the JSON-path mapping dialect.
    #[cfg(feature = "apigateway")]
    fn apigateway(
        &self,
        call: &IntegrationCall,
        cx: &mut Synth<'_, ApiGateway>,
    ) -> Result<String, SynthError> {
        let _ = (call, cx);
        Err(unsupported_in(self.kind(), "apigateway"))
    }
}

fn unsupported_in(kind: &str, dialect: &str) -> SynthError {
    SynthError::unsupported(format!(
        "integration `{kind}` cannot be used in {dialect} templates"
    ))
}

/// A call site handed to an integration handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationCall {
    /// The `Call` node.
    pub call: NodeId,
    /// Argument expressions with argument and parenthesis wrappers removed.
    pub args: Vec<NodeId>,
}

impl IntegrationCall {
    pub fn new(ir: &Ir, call: NodeId) -> Result<Self, SynthError> {
        match ir.node(call)? {
            Node::Call { args, .. } => Ok(Self {
                call,
                args: args.iter().map(|&a| ir.argument_expr(a)).collect(),
            }),
            other => Err(SynthError::internal(format!(
                "integration dispatch on a {}",
                other.kind_name()
            ))),
        }
    }

    pub fn arg(&self, index: usize) -> Option<NodeId> {
        self.args.get(index).copied()
    }
}

/// The integration a callee refers to, if any.
///
/// Recognition is structural: the callee is a reference carrying an
/// integration marker, or a local name initialized with one.
pub fn resolve(ir: &Ir, callee: NodeId) -> Option<IntegrationId> {
    let callee = ir.unwrap_parens(callee);
    match ir.get(callee)? {
        Node::Reference { integration, .. } => *integration,
        Node::Identifier { .. } => {
            let decl = ir.lookup(callee)?;
            match ir.get(decl)? {
                Node::VariableDeclaration {
                    initializer: Some(init),
                    ..
                } => resolve(ir, *init),
                _ => None,
            }
        }
        _ => None,
    }
}

/// The integration invoked by `expr`, looking through `await` and parentheses.
pub fn called_integration(ir: &Ir, expr: NodeId) -> Option<IntegrationId> {
    let mut expr = ir.unwrap_parens(expr);
    while let Some(Node::Await { expr: inner } | Node::Promise { expr: inner }) = ir.get(expr) {
        expr = ir.unwrap_parens(*inner);
    }
    match ir.get(expr)? {
        Node::Call { callee, .. } => resolve(ir, *callee),
        _ => None,
    }
}
