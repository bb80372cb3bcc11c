//! Intermediate representation of closure bodies.
//!
//! The front end lowers each user closure into an [`Ir`]: an arena of
//! [`Node`]s addressed by [`NodeId`]. Children are owned through the arena;
//! every entry also records its parent so identifiers can be resolved by
//! walking outward through enclosing scopes. The tree is built once with
//! [`IrBuilder`] and is read-only afterwards.

mod builder;
mod scope;

pub use builder::IrBuilder;
pub use scope::Binding;

use crate::error::SynthError;
use crate::integration::Integration;
use std::fmt;
use std::sync::Arc;

/// Handle to a node inside an [`Ir`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to an integration handler registered with an [`Ir`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntegrationId(u32);

impl IntegrationId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    StrictEq,
    Ne,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    And,
    Or,
    Coalesce,
    In,

    // Assignment
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    CoalesceAssign,
}

impl BinaryOp {
    pub fn is_assignment(self) -> bool {
        self == BinaryOp::Assign || self.compound_base().is_some()
    }

    /// The operator a compound assignment applies (`+=` applies `+`).
    pub fn compound_base(self) -> Option<BinaryOp> {
        match self {
            BinaryOp::AddAssign => Some(BinaryOp::Add),
            BinaryOp::SubAssign => Some(BinaryOp::Sub),
            BinaryOp::MulAssign => Some(BinaryOp::Mul),
            BinaryOp::DivAssign => Some(BinaryOp::Div),
            BinaryOp::ModAssign => Some(BinaryOp::Mod),
            BinaryOp::CoalesceAssign => Some(BinaryOp::Coalesce),
            _ => None,
        }
    }
}

/// Prefix unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    Increment,
    Decrement,
}

/// Postfix unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    Increment,
    Decrement,
}

/// Declaration keyword of a variable declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Const,
    Let,
    Var,
}

/// One `${expr}literal` segment of a template expression.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSpan {
    pub expr: NodeId,
    pub literal: String,
}

/// The closed set of node kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    // Literals
    Null,
    Undefined,
    Boolean(bool),
    Number(f64),
    String(String),

    // Composite
    Array {
        items: Vec<NodeId>,
    },
    Spread {
        expr: NodeId,
    },
    Object {
        properties: Vec<NodeId>,
    },
    PropertyAssignment {
        name: NodeId,
        value: NodeId,
    },
    SpreadAssignment {
        expr: NodeId,
    },
    ComputedPropertyName {
        expr: NodeId,
    },
    Template {
        head: String,
        spans: Vec<TemplateSpan>,
    },

    // References
    Identifier {
        name: String,
    },
    PropertyAccess {
        base: NodeId,
        name: String,
    },
    ElementAccess {
        base: NodeId,
        element: NodeId,
    },
    /// An opaque value captured from outside the closure.
    Reference {
        name: String,
        integration: Option<IntegrationId>,
    },

    // Operators
    Binary {
        left: NodeId,
        op: BinaryOp,
        right: NodeId,
    },
    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    Postfix {
        operand: NodeId,
        op: PostfixOp,
    },
    Conditional {
        when: NodeId,
        then: NodeId,
        otherwise: NodeId,
    },
    Parenthesized {
        expr: NodeId,
    },
    TypeOf {
        expr: NodeId,
    },

    // Control flow
    If {
        when: NodeId,
        then: NodeId,
        otherwise: Option<NodeId>,
    },
    ForOf {
        binding: NodeId,
        iterable: NodeId,
        body: NodeId,
    },
    ForIn {
        binding: NodeId,
        iterable: NodeId,
        body: NodeId,
    },
    While {
        when: NodeId,
        body: NodeId,
    },
    DoWhile {
        body: NodeId,
        when: NodeId,
    },
    For {
        initializer: Option<NodeId>,
        when: Option<NodeId>,
        step: Option<NodeId>,
        body: NodeId,
    },
    Try {
        body: NodeId,
        catch: Option<NodeId>,
        finally: Option<NodeId>,
    },
    Break,
    Continue,
    Block {
        statements: Vec<NodeId>,
    },

    // Calls and functions
    Call {
        callee: NodeId,
        args: Vec<NodeId>,
    },
    New {
        callee: NodeId,
        args: Vec<NodeId>,
    },
    Argument {
        expr: NodeId,
        name: Option<String>,
    },
    Await {
        expr: NodeId,
    },
    /// An unresolved asynchronous result.
    Promise {
        expr: NodeId,
    },
    Function {
        parameters: Vec<NodeId>,
        body: NodeId,
    },
    Parameter {
        name: NodeId,
        initializer: Option<NodeId>,
    },

    // Declarations and patterns
    VariableDeclaration {
        kind: DeclKind,
        name: NodeId,
        initializer: Option<NodeId>,
    },
    ArrayBinding {
        elements: Vec<NodeId>,
    },
    ObjectBinding {
        elements: Vec<NodeId>,
    },
    BindingElement {
        name: NodeId,
        property_name: Option<NodeId>,
        initializer: Option<NodeId>,
        rest: bool,
    },
    /// A hole in an array binding pattern (`[, b] = xs`).
    Omitted,

    // Statements
    Return {
        expr: Option<NodeId>,
    },
    ExprStmt {
        expr: NodeId,
    },
    Throw {
        expr: NodeId,
    },
}

impl Node {
    /// Short kind name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Null => "null literal",
            Node::Undefined => "undefined literal",
            Node::Boolean(_) => "boolean literal",
            Node::Number(_) => "number literal",
            Node::String(_) => "string literal",
            Node::Array { .. } => "array literal",
            Node::Spread { .. } => "spread element",
            Node::Object { .. } => "object literal",
            Node::PropertyAssignment { .. } => "property assignment",
            Node::SpreadAssignment { .. } => "spread assignment",
            Node::ComputedPropertyName { .. } => "computed property name",
            Node::Template { .. } => "template expression",
            Node::Identifier { .. } => "identifier",
            Node::PropertyAccess { .. } => "property access",
            Node::ElementAccess { .. } => "element access",
            Node::Reference { .. } => "reference",
            Node::Binary { .. } => "binary expression",
            Node::Unary { .. } => "unary expression",
            Node::Postfix { .. } => "postfix expression",
            Node::Conditional { .. } => "conditional expression",
            Node::Parenthesized { .. } => "parenthesized expression",
            Node::TypeOf { .. } => "typeof expression",
            Node::If { .. } => "if statement",
            Node::ForOf { .. } => "for-of loop",
            Node::ForIn { .. } => "for-in loop",
            Node::While { .. } => "while loop",
            Node::DoWhile { .. } => "do-while loop",
            Node::For { .. } => "for loop",
            Node::Try { .. } => "try statement",
            Node::Break => "break statement",
            Node::Continue => "continue statement",
            Node::Block { .. } => "block",
            Node::Call { .. } => "call expression",
            Node::New { .. } => "new expression",
            Node::Argument { .. } => "argument",
            Node::Await { .. } => "await expression",
            Node::Promise { .. } => "promise",
            Node::Function { .. } => "function",
            Node::Parameter { .. } => "parameter",
            Node::VariableDeclaration { .. } => "variable declaration",
            Node::ArrayBinding { .. } => "array binding pattern",
            Node::ObjectBinding { .. } => "object binding pattern",
            Node::BindingElement { .. } => "binding element",
            Node::Omitted => "omitted element",
            Node::Return { .. } => "return statement",
            Node::ExprStmt { .. } => "expression statement",
            Node::Throw { .. } => "throw statement",
        }
    }

    /// Whether this node may appear in statement position.
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            Node::If { .. }
                | Node::ForOf { .. }
                | Node::ForIn { .. }
                | Node::While { .. }
                | Node::DoWhile { .. }
                | Node::For { .. }
                | Node::Try { .. }
                | Node::Break
                | Node::Continue
                | Node::Block { .. }
                | Node::VariableDeclaration { .. }
                | Node::Return { .. }
                | Node::ExprStmt { .. }
                | Node::Throw { .. }
        )
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Node::Null
            | Node::Undefined
            | Node::Boolean(_)
            | Node::Number(_)
            | Node::String(_)
            | Node::Identifier { .. }
            | Node::Reference { .. }
            | Node::Break
            | Node::Continue
            | Node::Omitted => Vec::new(),

            Node::Array { items } => items.clone(),
            Node::Object { properties } => properties.clone(),
            Node::Block { statements } => statements.clone(),
            Node::ArrayBinding { elements } | Node::ObjectBinding { elements } => {
                elements.clone()
            }

            Node::Spread { expr }
            | Node::SpreadAssignment { expr }
            | Node::ComputedPropertyName { expr }
            | Node::Parenthesized { expr }
            | Node::TypeOf { expr }
            | Node::Argument { expr, .. }
            | Node::Await { expr }
            | Node::Promise { expr }
            | Node::ExprStmt { expr }
            | Node::Throw { expr } => vec![*expr],

            Node::PropertyAssignment { name, value } => vec![*name, *value],
            Node::Template { spans, .. } => spans.iter().map(|s| s.expr).collect(),
            Node::PropertyAccess { base, .. } => vec![*base],
            Node::ElementAccess { base, element } => vec![*base, *element],
            Node::Binary { left, right, .. } => vec![*left, *right],
            Node::Unary { operand, .. } | Node::Postfix { operand, .. } => vec![*operand],
            Node::Conditional {
                when,
                then,
                otherwise,
            } => vec![*when, *then, *otherwise],
            Node::If {
                when,
                then,
                otherwise,
            } => {
                let mut out = vec![*when, *then];
                out.extend(otherwise);
                out
            }
            Node::ForOf {
                binding,
                iterable,
                body,
            }
            | Node::ForIn {
                binding,
                iterable,
                body,
            } => vec![*binding, *iterable, *body],
            Node::While { when, body } => vec![*when, *body],
            Node::DoWhile { body, when } => vec![*body, *when],
            Node::For {
                initializer,
                when,
                step,
                body,
            } => {
                let mut out: Vec<NodeId> = initializer.iter().copied().collect();
                out.extend(when);
                out.extend(step);
                out.push(*body);
                out
            }
            Node::Try {
                body,
                catch,
                finally,
            } => {
                let mut out = vec![*body];
                out.extend(catch);
                out.extend(finally);
                out
            }
            Node::Call { callee, args } | Node::New { callee, args } => {
                let mut out = vec![*callee];
                out.extend(args);
                out
            }
            Node::Function { parameters, body } => {
                let mut out = parameters.clone();
                out.push(*body);
                out
            }
            Node::Parameter { name, initializer } => {
                let mut out = vec![*name];
                out.extend(initializer);
                out
            }
            Node::VariableDeclaration {
                name, initializer, ..
            } => {
                let mut out = vec![*name];
                out.extend(initializer);
                out
            }
            Node::BindingElement {
                name,
                property_name,
                initializer,
                ..
            } => {
                let mut out: Vec<NodeId> = property_name.iter().copied().collect();
                out.push(*name);
                out.extend(initializer);
                out
            }
            Node::Return { expr } => expr.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    node: Node,
    parent: Option<NodeId>,
}

/// An immutable node arena produced by [`IrBuilder::finish`].
#[derive(Clone)]
pub struct Ir {
    entries: Vec<Entry>,
    integrations: Vec<Arc<dyn Integration>>,
}

impl fmt::Debug for Ir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ir")
            .field("nodes", &self.entries.len())
            .field("integrations", &self.integrations.len())
            .finish()
    }
}

impl Ir {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.entries.get(id.index()).map(|e| &e.node)
    }

    /// Like [`Ir::get`], but a dangling handle is an invariant violation.
    pub fn node(&self, id: NodeId) -> Result<&Node, SynthError> {
        self.get(id)
            .ok_or_else(|| SynthError::internal(format!("node {id} is not part of this IR")))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.entries.get(id.index()).and_then(|e| e.parent)
    }

    /// Parents of `id`, innermost first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    pub fn integration(&self, id: IntegrationId) -> Option<&Arc<dyn Integration>> {
        self.integrations.get(id.index())
    }

    /// Skip `(expr)` wrappers.
    pub fn unwrap_parens(&self, mut id: NodeId) -> NodeId {
        while let Some(Node::Parenthesized { expr }) = self.get(id) {
            id = *expr;
        }
        id
    }

    /// Skip argument and parenthesis wrappers around a call argument.
    pub fn argument_expr(&self, id: NodeId) -> NodeId {
        match self.get(id) {
            Some(Node::Argument { expr, .. }) => self.unwrap_parens(*expr),
            _ => self.unwrap_parens(id),
        }
    }

    /// Whether any node in the subtree rooted at `root` satisfies `pred`.
    pub fn any_descendant(&self, root: NodeId, mut pred: impl FnMut(NodeId, &Node) -> bool) -> bool {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };
            if pred(id, node) {
                return true;
            }
            stack.extend(node.children());
        }
        false
    }
}
