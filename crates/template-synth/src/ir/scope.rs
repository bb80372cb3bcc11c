//! Lexical identifier resolution over parent links.

use super::{Ir, Node, NodeId};
use crate::error::SynthError;

/// What an identifier refers to, from the point of view of a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding<'ir> {
    /// Positional parameter of the outermost closure (payload, context).
    RootParameter(usize),
    /// Declared directly in the outermost closure's body.
    TopLevel(&'ir str),
    /// Any other declaration: nested blocks, loop bindings, callback parameters.
    Local(&'ir str),
    /// A `$`-prefixed name that is passed through untouched.
    Reserved(&'ir str),
    /// Not declared inside the closure.
    Capture(&'ir str),
}

impl Ir {
    /// Resolve an identifier to its declaring node.
    ///
    /// A name in binding position resolves to its own declaration. Other
    /// names search outward: declarations earlier in each enclosing block,
    /// function parameters, and loop bindings (visible only in the loop body).
    /// `None` means the name is captured from outside the closure.
    pub fn lookup(&self, id: NodeId) -> Option<NodeId> {
        let Some(Node::Identifier { name }) = self.get(id) else {
            return None;
        };
        if self.is_binding_name(id) {
            return self.parent(id);
        }
        let mut child = id;
        for scope in self.ancestors(id) {
            if let Some(decl) = self.declared_in(scope, child, name) {
                return Some(decl);
            }
            child = scope;
        }
        None
    }

    fn is_binding_name(&self, id: NodeId) -> bool {
        match self.parent(id).and_then(|p| self.get(p)) {
            Some(Node::VariableDeclaration { name, .. })
            | Some(Node::Parameter { name, .. })
            | Some(Node::BindingElement { name, .. }) => *name == id,
            _ => false,
        }
    }

    fn declared_in(&self, scope: NodeId, from: NodeId, name: &str) -> Option<NodeId> {
        match self.get(scope)? {
            Node::Block { statements } => statements
                .iter()
                .take_while(|&&s| s != from)
                .filter_map(|&s| match self.get(s) {
                    Some(Node::VariableDeclaration { name: target, .. }) => {
                        self.find_binding(*target, name)
                    }
                    _ => None,
                })
                .last(),
            Node::Function { parameters, .. } => parameters.iter().find_map(|&p| match self.get(p) {
                Some(Node::Parameter { name: target, .. }) => self.find_binding(*target, name),
                _ => None,
            }),
            Node::ForOf { binding, body, .. } | Node::ForIn { binding, body, .. }
                if *body == from =>
            {
                match self.get(*binding) {
                    Some(Node::VariableDeclaration { name: target, .. }) => {
                        self.find_binding(*target, name)
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Find the declaration of `name` within a binding name or pattern.
    fn find_binding(&self, target: NodeId, name: &str) -> Option<NodeId> {
        match self.get(target)? {
            Node::Identifier { name: declared } if declared == name => self.parent(target),
            Node::ObjectBinding { elements } | Node::ArrayBinding { elements } => {
                elements.iter().find_map(|&e| match self.get(e) {
                    Some(Node::BindingElement { name: inner, .. }) => self.find_binding(*inner, name),
                    _ => None,
                })
            }
            _ => None,
        }
    }

    /// The nearest function enclosing `id`.
    pub fn enclosing_function(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id)
            .find(|&a| matches!(self.get(a), Some(Node::Function { .. })))
    }

    /// Position of `decl` among the parameters of the outermost closure.
    pub fn root_parameter_index(&self, decl: NodeId) -> Option<usize> {
        let Some(Node::Parameter { .. }) = self.get(decl) else {
            return None;
        };
        let function = self.parent(decl)?;
        let Some(Node::Function { parameters, .. }) = self.get(function) else {
            return None;
        };
        if self.enclosing_function(function).is_some() {
            return None;
        }
        parameters.iter().position(|&p| p == decl)
    }

    /// Whether `decl` is declared directly in the outermost closure's body.
    ///
    /// Names bound by patterns count as declared by the enclosing variable
    /// declaration.
    pub fn is_top_level_declaration(&self, decl: NodeId) -> bool {
        let mut owner = decl;
        while let Some(Node::BindingElement { .. } | Node::ObjectBinding { .. } | Node::ArrayBinding { .. }) =
            self.get(owner)
        {
            match self.parent(owner) {
                Some(p) => owner = p,
                None => return false,
            }
        }
        if !matches!(self.get(owner), Some(Node::VariableDeclaration { .. })) {
            return false;
        }
        let Some(block) = self.parent(owner) else {
            return false;
        };
        if !matches!(self.get(block), Some(Node::Block { .. })) {
            return false;
        }
        match self.parent(block) {
            None => true,
            Some(function) => {
                matches!(self.get(function), Some(Node::Function { .. }))
                    && self.enclosing_function(function).is_none()
            }
        }
    }

    /// Classify an identifier or reference for dereferencing.
    pub fn classify(&self, id: NodeId) -> Result<Binding<'_>, SynthError> {
        match self.node(id)? {
            Node::Reference { name, .. } => Ok(if name.starts_with('$') {
                Binding::Reserved(name)
            } else {
                Binding::Capture(name)
            }),
            Node::Identifier { name } => {
                let decl = self.lookup(id);
                if let Some(index) = decl.and_then(|d| self.root_parameter_index(d)) {
                    return Ok(Binding::RootParameter(index));
                }
                if name.starts_with('$') {
                    return Ok(Binding::Reserved(name));
                }
                Ok(match decl {
                    Some(d) if self.is_top_level_declaration(d) => Binding::TopLevel(name),
                    Some(_) => Binding::Local(name),
                    None => Binding::Capture(name),
                })
            }
            other => Err(SynthError::internal(format!(
                "cannot dereference a {}",
                other.kind_name()
            ))),
        }
    }

    /// Whether any identifier under `root` resolves to `decl`.
    pub fn references(&self, root: NodeId, decl: NodeId) -> bool {
        self.any_descendant(root, |id, node| {
            matches!(node, Node::Identifier { .. }) && !self.is_binding_name(id) && self.lookup(id) == Some(decl)
        })
    }
}
