//! Bottom-up construction of an [`Ir`].

use super::{
    BinaryOp, DeclKind, Entry, IntegrationId, Ir, Node, NodeId, PostfixOp, TemplateSpan, UnaryOp,
};
use crate::error::SynthError;
use crate::integration::Integration;
use std::sync::Arc;

/// Builds an [`Ir`] from the leaves up.
///
/// Pushing a node adopts its children: each child's parent link is written
/// exactly once, when its parent is created. A child handed to a second
/// parent keeps its first one and makes [`IrBuilder::finish`] fail.
#[derive(Default)]
pub struct IrBuilder {
    entries: Vec<Entry>,
    integrations: Vec<Arc<dyn Integration>>,
    shared: Option<(NodeId, NodeId)>,
}

impl IrBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.entries.len() as u32);
        for child in node.children() {
            let Some(entry) = self.entries.get_mut(child.index()) else {
                continue;
            };
            match entry.parent {
                None => entry.parent = Some(id),
                Some(_) => {
                    self.shared.get_or_insert((child, id));
                }
            }
        }
        self.entries.push(Entry { node, parent: None });
        id
    }

    /// Freeze the arena. Fails if any node was given two parents.
    pub fn finish(self) -> Result<Ir, SynthError> {
        if let Some((child, second)) = self.shared {
            return Err(SynthError::internal(format!(
                "node {child} is already a child of {}, cannot adopt it into {second}",
                self.entries
                    .get(child.index())
                    .and_then(|e| e.parent)
                    .map_or_else(|| "another node".to_string(), |p| p.to_string())
            )));
        }
        Ok(Ir {
            entries: self.entries,
            integrations: self.integrations,
        })
    }

    /// Register an integration handler and return a reference node carrying it.
    pub fn integration(&mut self, name: &str, handler: Arc<dyn Integration>) -> NodeId {
        let id = IntegrationId(self.integrations.len() as u32);
        self.integrations.push(handler);
        self.push(Node::Reference {
            name: name.to_string(),
            integration: Some(id),
        })
    }

    // Literals

    pub fn null(&mut self) -> NodeId {
        self.push(Node::Null)
    }

    pub fn undefined(&mut self) -> NodeId {
        self.push(Node::Undefined)
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        self.push(Node::Boolean(value))
    }

    pub fn number(&mut self, value: f64) -> NodeId {
        self.push(Node::Number(value))
    }

    pub fn string(&mut self, value: &str) -> NodeId {
        self.push(Node::String(value.to_string()))
    }

    // Composite

    pub fn array(&mut self, items: Vec<NodeId>) -> NodeId {
        self.push(Node::Array { items })
    }

    pub fn spread(&mut self, expr: NodeId) -> NodeId {
        self.push(Node::Spread { expr })
    }

    pub fn object(&mut self, properties: Vec<NodeId>) -> NodeId {
        self.push(Node::Object { properties })
    }

    /// `key: value` with a plain identifier key.
    pub fn property(&mut self, key: &str, value: NodeId) -> NodeId {
        let name = self.ident(key);
        self.push(Node::PropertyAssignment { name, value })
    }

    /// `[key]: value`.
    pub fn computed_property(&mut self, key: NodeId, value: NodeId) -> NodeId {
        let name = self.push(Node::ComputedPropertyName { expr: key });
        self.push(Node::PropertyAssignment { name, value })
    }

    pub fn spread_property(&mut self, expr: NodeId) -> NodeId {
        self.push(Node::SpreadAssignment { expr })
    }

    pub fn template(&mut self, head: &str, spans: Vec<(NodeId, &str)>) -> NodeId {
        let spans = spans
            .into_iter()
            .map(|(expr, literal)| TemplateSpan {
                expr,
                literal: literal.to_string(),
            })
            .collect();
        self.push(Node::Template {
            head: head.to_string(),
            spans,
        })
    }

    // References

    pub fn ident(&mut self, name: &str) -> NodeId {
        self.push(Node::Identifier {
            name: name.to_string(),
        })
    }

    pub fn reference(&mut self, name: &str) -> NodeId {
        self.push(Node::Reference {
            name: name.to_string(),
            integration: None,
        })
    }

    pub fn prop(&mut self, base: NodeId, name: &str) -> NodeId {
        self.push(Node::PropertyAccess {
            base,
            name: name.to_string(),
        })
    }

    pub fn element(&mut self, base: NodeId, element: NodeId) -> NodeId {
        self.push(Node::ElementAccess { base, element })
    }

    // Operators

    pub fn binary(&mut self, left: NodeId, op: BinaryOp, right: NodeId) -> NodeId {
        self.push(Node::Binary { left, op, right })
    }

    pub fn assign(&mut self, target: NodeId, value: NodeId) -> NodeId {
        self.binary(target, BinaryOp::Assign, value)
    }

    pub fn unary(&mut self, op: UnaryOp, operand: NodeId) -> NodeId {
        self.push(Node::Unary { op, operand })
    }

    pub fn postfix(&mut self, operand: NodeId, op: PostfixOp) -> NodeId {
        self.push(Node::Postfix { operand, op })
    }

    pub fn conditional(&mut self, when: NodeId, then: NodeId, otherwise: NodeId) -> NodeId {
        self.push(Node::Conditional {
            when,
            then,
            otherwise,
        })
    }

    pub fn paren(&mut self, expr: NodeId) -> NodeId {
        self.push(Node::Parenthesized { expr })
    }

    pub fn type_of(&mut self, expr: NodeId) -> NodeId {
        self.push(Node::TypeOf { expr })
    }

    // Calls and functions

    /// `callee(args...)`; each argument is wrapped in an [`Node::Argument`].
    pub fn call(&mut self, callee: NodeId, args: Vec<NodeId>) -> NodeId {
        let args = args
            .into_iter()
            .map(|expr| self.push(Node::Argument { expr, name: None }))
            .collect();
        self.push(Node::Call { callee, args })
    }

    /// `base.name(args...)`.
    pub fn method(&mut self, base: NodeId, name: &str, args: Vec<NodeId>) -> NodeId {
        let callee = self.prop(base, name);
        self.call(callee, args)
    }

    pub fn new_expr(&mut self, callee: NodeId, args: Vec<NodeId>) -> NodeId {
        self.push(Node::New { callee, args })
    }

    pub fn await_expr(&mut self, expr: NodeId) -> NodeId {
        self.push(Node::Await { expr })
    }

    pub fn promise(&mut self, expr: NodeId) -> NodeId {
        self.push(Node::Promise { expr })
    }

    pub fn param(&mut self, name: &str) -> NodeId {
        let name = self.ident(name);
        self.push(Node::Parameter {
            name,
            initializer: None,
        })
    }

    /// A parameter bound by a pattern or carrying a default value.
    pub fn param_with(&mut self, name: NodeId, initializer: Option<NodeId>) -> NodeId {
        self.push(Node::Parameter { name, initializer })
    }

    pub fn function(&mut self, parameters: Vec<NodeId>, body: NodeId) -> NodeId {
        self.push(Node::Function { parameters, body })
    }

    /// `(a, b) => body` with plain identifier parameters.
    pub fn arrow(&mut self, params: &[&str], body: NodeId) -> NodeId {
        let parameters = params.iter().map(|p| self.param(p)).collect();
        self.function(parameters, body)
    }

    // Declarations and patterns

    pub fn declare(&mut self, kind: DeclKind, name: NodeId, initializer: Option<NodeId>) -> NodeId {
        self.push(Node::VariableDeclaration {
            kind,
            name,
            initializer,
        })
    }

    pub fn const_decl(&mut self, name: &str, initializer: NodeId) -> NodeId {
        let name = self.ident(name);
        self.declare(DeclKind::Const, name, Some(initializer))
    }

    pub fn let_decl(&mut self, name: &str, initializer: Option<NodeId>) -> NodeId {
        let name = self.ident(name);
        self.declare(DeclKind::Let, name, initializer)
    }

    pub fn object_pattern(&mut self, elements: Vec<NodeId>) -> NodeId {
        self.push(Node::ObjectBinding { elements })
    }

    pub fn array_pattern(&mut self, elements: Vec<NodeId>) -> NodeId {
        self.push(Node::ArrayBinding { elements })
    }

    /// A plain `name` binding element.
    pub fn binding(&mut self, name: &str) -> NodeId {
        let name = self.ident(name);
        self.binding_element(name, None, None, false)
    }

    /// A `...name` binding element.
    pub fn rest_binding(&mut self, name: &str) -> NodeId {
        let name = self.ident(name);
        self.binding_element(name, None, None, true)
    }

    pub fn binding_element(
        &mut self,
        name: NodeId,
        property_name: Option<NodeId>,
        initializer: Option<NodeId>,
        rest: bool,
    ) -> NodeId {
        self.push(Node::BindingElement {
            name,
            property_name,
            initializer,
            rest,
        })
    }

    pub fn omitted(&mut self) -> NodeId {
        self.push(Node::Omitted)
    }

    // Statements

    pub fn block(&mut self, statements: Vec<NodeId>) -> NodeId {
        self.push(Node::Block { statements })
    }

    pub fn expr_stmt(&mut self, expr: NodeId) -> NodeId {
        self.push(Node::ExprStmt { expr })
    }

    pub fn return_stmt(&mut self, expr: Option<NodeId>) -> NodeId {
        self.push(Node::Return { expr })
    }

    pub fn throw_stmt(&mut self, expr: NodeId) -> NodeId {
        self.push(Node::Throw { expr })
    }

    pub fn if_stmt(&mut self, when: NodeId, then: NodeId, otherwise: Option<NodeId>) -> NodeId {
        self.push(Node::If {
            when,
            then,
            otherwise,
        })
    }

    /// `for (const <binding> of iterable) body`; `binding` is a name or pattern.
    pub fn for_of(&mut self, binding: NodeId, iterable: NodeId, body: NodeId) -> NodeId {
        let binding = self.declare(DeclKind::Const, binding, None);
        self.push(Node::ForOf {
            binding,
            iterable,
            body,
        })
    }

    /// `for (const <binding> in iterable) body`.
    pub fn for_in(&mut self, binding: NodeId, iterable: NodeId, body: NodeId) -> NodeId {
        let binding = self.declare(DeclKind::Const, binding, None);
        self.push(Node::ForIn {
            binding,
            iterable,
            body,
        })
    }

    pub fn while_loop(&mut self, when: NodeId, body: NodeId) -> NodeId {
        self.push(Node::While { when, body })
    }

    pub fn try_stmt(&mut self, body: NodeId, catch: Option<NodeId>, finally: Option<NodeId>) -> NodeId {
        self.push(Node::Try {
            body,
            catch,
            finally,
        })
    }

    pub fn break_stmt(&mut self) -> NodeId {
        self.push(Node::Break)
    }

    pub fn continue_stmt(&mut self) -> NodeId {
        self.push(Node::Continue)
    }
}
