//! The shared template walker.
//!
//! [`Synth`] walks an [`Ir`] once, appending template lines to a buffer and
//! returning inline expression text for values that need no statements.
//! Anything whose evaluation order matters (assignments, conditionals,
//! postfix operators, destructuring) is written out as `#set` statements and
//! addressed through a generated temporary.
//!
//! ```text
//!            ┌──────────────┐ render_statement ┌─────────────┐
//!  Ir ──────>│    Synth     │─────────────────>│ lines: Vec  │──> template
//!            │ (walker, D)  │ render_expression└─────────────┘
//!            └──────┬───────┘
//!                   │ integrate / dereference / on_return
//!                   v
//!             D: Dialect (appsync, apigateway)
//! ```
//!
//! List fusion lives in `fusion`, pattern desugaring in `pattern`.

mod fusion;
mod pattern;

use crate::dialect::Dialect;
use crate::error::SynthError;
use crate::integration;
use crate::ir::{BinaryOp, IntegrationId, Ir, Node, NodeId, PostfixOp, TemplateSpan, UnaryOp};
use tracing::trace;

/// The null sentinel of the template language.
pub const NULL: &str = "$null";

/// A value to assign: pre-rendered text or a node rendered on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Text(String),
    Node(NodeId),
}

impl From<String> for Operand {
    fn from(text: String) -> Self {
        Operand::Text(text)
    }
}

impl From<&str> for Operand {
    fn from(text: &str) -> Self {
        Operand::Text(text.to_string())
    }
}

impl From<&String> for Operand {
    fn from(text: &String) -> Self {
        Operand::Text(text.clone())
    }
}

impl From<NodeId> for Operand {
    fn from(id: NodeId) -> Self {
        Operand::Node(id)
    }
}

/// One compilation: the output buffer, the temp counter, and dialect state.
pub struct Synth<'ir, D: Dialect> {
    ir: &'ir Ir,
    dialect: D,
    lines: Vec<String>,
    temps: usize,
    integrations: Vec<IntegrationId>,
}

impl<'ir, D: Dialect> Synth<'ir, D> {
    pub fn new(ir: &'ir Ir, dialect: D) -> Self {
        Self {
            ir,
            dialect,
            lines: Vec::new(),
            temps: 0,
            integrations: Vec::new(),
        }
    }

    pub fn ir(&self) -> &'ir Ir {
        self.ir
    }

    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of temporaries allocated so far.
    pub fn temps(&self) -> usize {
        self.temps
    }

    /// Integrations invoked so far, in call order.
    pub fn integrations(&self) -> &[IntegrationId] {
        &self.integrations
    }

    pub fn record_integration(&mut self, id: IntegrationId) {
        self.integrations.push(id);
    }

    /// The finished template.
    pub fn finish(self) -> String {
        self.lines.join("\n")
    }

    pub fn emit(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// A new temporary, unique within this compilation.
    pub fn fresh_temp(&mut self) -> String {
        self.temps += 1;
        let name = format!("$v{}", self.temps);
        trace!(temp = %name, "allocated temporary");
        name
    }

    /// Emit `#set(target = value)` and return `target`.
    pub fn assign(&mut self, target: &str, value: impl Into<Operand>) -> Result<String, SynthError> {
        let value = match value.into() {
            Operand::Text(text) => text,
            Operand::Node(id) => self.render_expression(id)?,
        };
        self.emit(format!("#set({target} = {value})"));
        Ok(target.to_string())
    }

    /// Store a value in a fresh temporary and return the temporary.
    pub fn materialize(&mut self, value: impl Into<Operand>) -> Result<String, SynthError> {
        let value = match value.into() {
            Operand::Text(text) => text,
            Operand::Node(id) => self.render_expression(id)?,
        };
        let temp = self.fresh_temp();
        self.assign(&temp, value)
    }

    /// Evaluate `expr` for its side effect, discarding the result.
    pub fn qr(&mut self, expr: &str) {
        self.emit(format!("$util.qr({expr})"));
    }

    pub fn if_stmt(
        &mut self,
        condition: &str,
        then: impl FnOnce(&mut Self) -> Result<(), SynthError>,
    ) -> Result<(), SynthError> {
        self.emit(format!("#if({condition})"));
        then(self)?;
        self.emit("#end");
        Ok(())
    }

    pub fn if_else(
        &mut self,
        condition: &str,
        then: impl FnOnce(&mut Self) -> Result<(), SynthError>,
        otherwise: impl FnOnce(&mut Self) -> Result<(), SynthError>,
    ) -> Result<(), SynthError> {
        self.emit(format!("#if({condition})"));
        then(self)?;
        self.emit("#else");
        otherwise(self)?;
        self.emit("#end");
        Ok(())
    }

    /// Loop over `iterable`, binding each element to a name or pattern.
    pub fn foreach(
        &mut self,
        binding: NodeId,
        iterable: &str,
        body: impl FnOnce(&mut Self) -> Result<(), SynthError>,
    ) -> Result<(), SynthError> {
        self.require_loops("loop")?;
        match self.ir.node(binding)? {
            Node::Identifier { .. } => {
                let var = D::dereference(self, binding)?;
                self.emit(format!("#foreach({var} in {iterable})"));
            }
            Node::ObjectBinding { .. } | Node::ArrayBinding { .. } => {
                let var = self.fresh_temp();
                self.emit(format!("#foreach({var} in {iterable})"));
                self.expand(binding, &var)?;
            }
            other => {
                return Err(SynthError::internal(format!(
                    "loop binding is a {}",
                    other.kind_name()
                )));
            }
        }
        body(self)?;
        self.emit("#end");
        Ok(())
    }

    fn require_loops(&self, what: &str) -> Result<(), SynthError> {
        if D::SUPPORTS_LOOPS {
            Ok(())
        } else {
            Err(SynthError::unsupported(format!(
                "{what} in {} templates",
                D::NAME
            )))
        }
    }

    /// Compile a closure (or a bare statement or expression) from the top.
    pub fn compile_root(&mut self, root: NodeId) -> Result<(), SynthError> {
        let ir = self.ir;
        match ir.node(root)? {
            Node::Function { parameters, body } => {
                for &param in parameters {
                    let Node::Parameter { name, .. } = ir.node(param)? else {
                        continue;
                    };
                    if !matches!(ir.node(*name)?, Node::Identifier { .. }) {
                        return Err(SynthError::unsupported("destructured resolver parameter"));
                    }
                }
                if matches!(ir.node(*body)?, Node::Block { .. }) {
                    self.render_statement(*body, None)
                } else {
                    D::on_return(self, Some(*body))
                }
            }
            node if node.is_statement() => self.render_statement(root, None),
            _ => D::on_return(self, Some(root)),
        }
    }

    /// Emit one statement.
    ///
    /// Inside callback bodies `slot` names the temporary a `return` writes
    /// to; at the top level `return` is handed to the dialect.
    pub fn render_statement(&mut self, id: NodeId, slot: Option<&str>) -> Result<(), SynthError> {
        let ir = self.ir;
        match ir.node(id)? {
            Node::Block { statements } => {
                for &stmt in statements {
                    self.render_statement(stmt, slot)?;
                }
                Ok(())
            }
            Node::ExprStmt { expr } => self.render_expr_stmt(*expr),
            Node::VariableDeclaration {
                name, initializer, ..
            } => self.render_declaration(*name, *initializer),
            Node::If {
                when,
                then,
                otherwise,
            } => {
                let (then, otherwise) = (*then, *otherwise);
                let condition = self.render_expression(*when)?;
                match otherwise {
                    Some(otherwise) => self.if_else(
                        &condition,
                        |s| s.render_statement(then, slot),
                        |s| s.render_statement(otherwise, slot),
                    ),
                    None => self.if_stmt(&condition, |s| s.render_statement(then, slot)),
                }
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
            } => {
                self.require_loops(ir.node(id)?.kind_name())?;
                let body = *body;
                let mut list = self.render_expression(*iterable)?;
                if matches!(ir.node(id)?, Node::ForIn { .. }) {
                    list = format!("{list}.keySet()");
                }
                let target = match ir.node(*binding)? {
                    Node::VariableDeclaration { name, .. } => *name,
                    _ => *binding,
                };
                self.foreach(target, &list, |s| s.render_statement(body, slot))
            }
            Node::Return { expr } => match slot {
                Some(slot) => {
                    let value = match expr {
                        Some(expr) => self.render_expression(*expr)?,
                        None => NULL.to_string(),
                    };
                    self.assign(slot, value).map(drop)
                }
                None => D::on_return(self, *expr),
            },
            Node::Break => {
                self.require_loops("break")?;
                self.emit("#break");
                Ok(())
            }
            Node::Continue => Err(SynthError::unsupported("continue")),
            Node::Throw { .. } => Err(SynthError::unsupported("throw")),
            node @ (Node::While { .. } | Node::DoWhile { .. } | Node::For { .. } | Node::Try { .. }) => {
                Err(SynthError::unsupported(node.kind_name()))
            }
            other => Err(SynthError::internal(format!(
                "{} in statement position",
                other.kind_name()
            ))),
        }
    }

    fn render_expr_stmt(&mut self, expr: NodeId) -> Result<(), SynthError> {
        let ir = self.ir;
        let expr = ir.unwrap_parens(expr);
        if let Node::Postfix { operand, op } = ir.node(expr)? {
            self.step(*operand, *op == PostfixOp::Increment)?;
            return Ok(());
        }
        let value = self.render_expression(expr)?;
        // Invocations only run when referenced.
        if value.ends_with(')') {
            self.qr(&value);
        }
        Ok(())
    }

    fn render_declaration(&mut self, name: NodeId, initializer: Option<NodeId>) -> Result<(), SynthError> {
        match self.ir.node(name)? {
            Node::Identifier { .. } => {
                let target = D::dereference(self, name)?;
                let value = match initializer {
                    Some(init) => Operand::Node(init),
                    None => Operand::from(NULL),
                };
                self.assign(&target, value).map(drop)
            }
            Node::ObjectBinding { .. } | Node::ArrayBinding { .. } => {
                let init = initializer.ok_or_else(|| {
                    SynthError::internal("destructuring declaration without an initializer")
                })?;
                let source = self.render_reference(init)?;
                self.expand(name, &source)
            }
            other => Err(SynthError::internal(format!(
                "declaration name is a {}",
                other.kind_name()
            ))),
        }
    }

    /// Render `id`, materializing it unless the result is already addressable.
    pub fn render_reference(&mut self, id: NodeId) -> Result<String, SynthError> {
        let value = self.render_expression(id)?;
        if is_reference(&value) {
            Ok(value)
        } else {
            self.materialize(value)
        }
    }

    /// Render a value that is passed to a method or placed in a literal.
    ///
    /// Operator expressions are not accepted inline there, so they go
    /// through a temporary.
    pub fn render_argument(&mut self, id: NodeId) -> Result<String, SynthError> {
        let ir = self.ir;
        let inner = ir.argument_expr(id);
        let value = self.render_expression(inner)?;
        match ir.node(inner)? {
            Node::Binary { op, .. }
                if !op.is_assignment() && !matches!(op, BinaryOp::Coalesce | BinaryOp::In) =>
            {
                self.materialize(value)
            }
            Node::Unary {
                op: UnaryOp::Not | UnaryOp::Neg | UnaryOp::Plus,
                ..
            } => self.materialize(value),
            _ => Ok(value),
        }
    }

    /// Render an expression to inline text, emitting whatever statements
    /// its evaluation requires first.
    pub fn render_expression(&mut self, id: NodeId) -> Result<String, SynthError> {
        let ir = self.ir;
        match ir.node(id)? {
            Node::Null | Node::Undefined => Ok(NULL.to_string()),
            Node::Boolean(value) => Ok(value.to_string()),
            Node::Number(value) => format_number(*value),
            Node::String(value) => Ok(quote(value)),
            Node::Array { items } => self.render_array(items),
            Node::Object { properties } => self.render_object(properties),
            Node::Template { head, spans } => self.render_template(head, spans),
            Node::Identifier { .. } | Node::Reference { .. } => D::dereference(self, id),
            Node::PropertyAccess { base, name } => {
                let base = self.render_expression(*base)?;
                Ok(format!("{base}.{name}"))
            }
            Node::ElementAccess { base, element } => {
                let base = self.render_expression(*base)?;
                let element = self.render_argument(*element)?;
                Ok(format!("{base}[{element}]"))
            }
            Node::Binary { left, op, right } => self.render_binary(*left, *op, *right),
            Node::Unary { op, operand } => match op {
                UnaryOp::Not => Ok(format!("!{}", self.render_expression(*operand)?)),
                UnaryOp::Neg => Ok(format!("-{}", self.render_expression(*operand)?)),
                UnaryOp::Plus => self.render_expression(*operand),
                UnaryOp::Increment => self.step(*operand, true),
                UnaryOp::Decrement => self.step(*operand, false),
            },
            Node::Postfix { operand, op } => {
                let target = self.render_expression(*operand)?;
                let old = self.materialize(target.as_str())?;
                let delta = if *op == PostfixOp::Increment { "+" } else { "-" };
                self.assign(&target, format!("{target} {delta} 1"))?;
                Ok(old)
            }
            Node::Conditional {
                when,
                then,
                otherwise,
            } => {
                let (then, otherwise) = (*then, *otherwise);
                let condition = self.render_expression(*when)?;
                let result = self.fresh_temp();
                self.if_else(
                    &condition,
                    |s| s.assign(&result, then).map(drop),
                    |s| s.assign(&result, otherwise).map(drop),
                )?;
                Ok(result)
            }
            Node::Parenthesized { expr } | Node::Argument { expr, .. } | Node::Await { expr } => {
                self.render_expression(*expr)
            }
            Node::Promise { expr } => self.render_promise(id, *expr),
            Node::Call { callee, args } => self.render_call(id, *callee, args),
            Node::TypeOf { .. } => Err(SynthError::unsupported("typeof")),
            node @ (Node::New { .. } | Node::Function { .. } | Node::Spread { .. }) => Err(
                SynthError::unsupported(format!("{} in expression position", node.kind_name())),
            ),
            other => Err(SynthError::internal(format!(
                "{} in expression position",
                other.kind_name()
            ))),
        }
    }

    /// `++x` / `--x`: update in place and yield the target.
    fn step(&mut self, operand: NodeId, increment: bool) -> Result<String, SynthError> {
        let target = self.render_expression(operand)?;
        let delta = if increment { "+" } else { "-" };
        self.assign(&target, format!("{target} {delta} 1"))
    }

    fn render_binary(&mut self, left: NodeId, op: BinaryOp, right: NodeId) -> Result<String, SynthError> {
        match op {
            BinaryOp::Assign => {
                let target = self.render_expression(left)?;
                self.assign(&target, right)
            }
            BinaryOp::CoalesceAssign => {
                let target = self.render_expression(left)?;
                self.if_stmt(&format!("{target} == {NULL}"), |s| {
                    s.assign(&target, right).map(drop)
                })?;
                Ok(target)
            }
            BinaryOp::Coalesce => {
                let result = self.materialize(left)?;
                self.if_stmt(&format!("{result} == {NULL}"), |s| {
                    s.assign(&result, right).map(drop)
                })?;
                Ok(result)
            }
            BinaryOp::In => {
                let key = self.render_argument(left)?;
                let object = self.render_expression(right)?;
                Ok(format!("{object}.containsKey({key})"))
            }
            _ => {
                if let Some(base) = op.compound_base() {
                    let target = self.render_expression(left)?;
                    let value = self.render_expression(right)?;
                    let symbol = operator(base)?;
                    return self.assign(&target, format!("{target} {symbol} {value}"));
                }
                let left = self.render_expression(left)?;
                let right = self.render_expression(right)?;
                Ok(format!("({left} {} {right})", operator(op)?))
            }
        }
    }

    fn render_array(&mut self, items: &[NodeId]) -> Result<String, SynthError> {
        let ir = self.ir;
        let has_spread = items
            .iter()
            .any(|&item| matches!(ir.get(item), Some(Node::Spread { .. })));
        if !has_spread {
            let rendered = items
                .iter()
                .map(|&item| self.render_argument(item))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(format!("[{}]", rendered.join(", ")));
        }

        let list = self.fresh_temp();
        self.assign(&list, "[]")?;
        for &item in items {
            if let Node::Spread { expr } = ir.node(item)? {
                let value = self.render_expression(*expr)?;
                self.qr(&format!("{list}.addAll({value})"));
            } else {
                let value = self.render_argument(item)?;
                self.qr(&format!("{list}.add({value})"));
            }
        }
        Ok(list)
    }

    /// Objects are built imperatively so spreads keep their source position.
    fn render_object(&mut self, properties: &[NodeId]) -> Result<String, SynthError> {
        let ir = self.ir;
        let object = self.fresh_temp();
        self.assign(&object, "{}")?;
        for &property in properties {
            match ir.node(property)? {
                Node::PropertyAssignment { name, value } => {
                    let key = self.property_key(*name)?;
                    let value = self.render_argument(*value)?;
                    self.qr(&format!("{object}.put({key}, {value})"));
                }
                Node::SpreadAssignment { expr } => {
                    let value = self.render_expression(*expr)?;
                    self.qr(&format!("{object}.putAll({value})"));
                }
                other => {
                    return Err(SynthError::internal(format!(
                        "{} inside an object literal",
                        other.kind_name()
                    )));
                }
            }
        }
        Ok(object)
    }

    fn property_key(&mut self, name: NodeId) -> Result<String, SynthError> {
        match self.ir.node(name)? {
            Node::Identifier { name } | Node::String(name) => Ok(quote(name)),
            Node::Number(n) => Ok(quote(&format_number(*n)?)),
            Node::ComputedPropertyName { expr } => self.render_argument(*expr),
            other => Err(SynthError::internal(format!(
                "property name is a {}",
                other.kind_name()
            ))),
        }
    }

    fn render_template(&mut self, head: &str, spans: &[TemplateSpan]) -> Result<String, SynthError> {
        let mut out = String::from("\"");
        self.push_literal(&mut out, head)?;
        for span in spans {
            let value = self.render_reference(span.expr)?;
            push_interpolation(&mut out, &value);
            self.push_literal(&mut out, &span.literal)?;
        }
        out.push('"');
        Ok(out)
    }

    /// Append literal text to an interpolated string. Text holding template
    /// syntax is routed through a single-quoted temporary.
    fn push_literal(&mut self, out: &mut String, text: &str) -> Result<(), SynthError> {
        if is_template_syntax(text) {
            let slot = self.materialize(quote(text))?;
            push_interpolation(out, &slot);
        } else {
            out.push_str(&escape_string(text));
        }
        Ok(())
    }

    /// An unresolved asynchronous value must be consumed on the spot when it
    /// wraps an integration.
    fn render_promise(&mut self, id: NodeId, expr: NodeId) -> Result<String, SynthError> {
        let ir = self.ir;
        let consumer = ir
            .ancestors(id)
            .find(|&a| !matches!(ir.get(a), Some(Node::Parenthesized { .. })));
        let consumed = matches!(
            consumer.and_then(|c| ir.get(c)),
            Some(Node::Await { .. } | Node::Return { .. })
        );
        if !consumed && integration::called_integration(ir, expr).is_some() {
            return Err(SynthError::illegal_integration(
                "integration result must be awaited or returned immediately",
            ));
        }
        self.render_expression(expr)
    }

    fn render_call(&mut self, call: NodeId, callee: NodeId, args: &[NodeId]) -> Result<String, SynthError> {
        let ir = self.ir;
        if let Some(integration) = integration::resolve(ir, callee) {
            trace!(dialect = D::NAME, call = %call, "dispatching integration");
            return D::integrate(self, integration, call);
        }
        let callee = ir.unwrap_parens(callee);
        match ir.node(callee)? {
            Node::PropertyAccess { base, name } => self.render_method(call, *base, name, args),
            Node::Identifier { name } | Node::Reference { name, .. } if name.starts_with('$') => {
                let function = D::dereference(self, callee)?;
                let args = self.render_arguments(args)?;
                Ok(format!("{function}({args})"))
            }
            Node::Identifier { name } | Node::Reference { name, .. } => Err(
                SynthError::unsupported(format!("call to function `{name}`")),
            ),
            other => Err(SynthError::unsupported(format!(
                "call through a {}",
                other.kind_name()
            ))),
        }
    }

    fn render_arguments(&mut self, args: &[NodeId]) -> Result<String, SynthError> {
        let rendered = args
            .iter()
            .map(|&arg| self.render_argument(arg))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rendered.join(", "))
    }

    fn render_method(
        &mut self,
        call: NodeId,
        base: NodeId,
        name: &str,
        args: &[NodeId],
    ) -> Result<String, SynthError> {
        let ir = self.ir;
        let has_callback = args
            .first()
            .is_some_and(|&arg| matches!(ir.get(ir.argument_expr(arg)), Some(Node::Function { .. })));

        match name {
            "map" | "forEach" | "reduce" | "filter" if has_callback => {
                self.require_loops(&format!("`{name}`"))?;
                match name {
                    "map" => self.fuse_map(call),
                    "forEach" => self.fuse_for_each(call),
                    "reduce" => self.fuse_reduce(call),
                    _ => self.filter(call),
                }
            }
            "map" | "forEach" | "reduce" | "filter" => Err(SynthError::unsupported(format!(
                "`{name}` without an inline callback"
            ))),
            "push" => match args {
                [single] => {
                    let list = self.render_expression(base)?;
                    if let Node::Spread { expr } = ir.node(ir.argument_expr(*single))? {
                        let values = self.render_expression(*expr)?;
                        Ok(format!("{list}.addAll({values})"))
                    } else {
                        let value = self.render_argument(*single)?;
                        Ok(format!("{list}.add({value})"))
                    }
                }
                _ => Err(SynthError::unsupported(format!(
                    "`push` with {} arguments",
                    args.len()
                ))),
            },
            _ => {
                if let Some(rendered) = self.render_builtin(base, name, args)? {
                    return Ok(rendered);
                }
                let receiver = self.render_expression(base)?;
                let args = self.render_arguments(args)?;
                Ok(format!("{receiver}.{name}({args})"))
            }
        }
    }

    /// `JSON.*` and `Object.*` helpers, when those names are not shadowed.
    fn render_builtin(
        &mut self,
        base: NodeId,
        method: &str,
        args: &[NodeId],
    ) -> Result<Option<String>, SynthError> {
        let ir = self.ir;
        let base = ir.unwrap_parens(base);
        let global = match ir.node(base)? {
            Node::Identifier { name } if ir.lookup(base).is_none() => name.as_str(),
            Node::Reference {
                name,
                integration: None,
            } => name.as_str(),
            _ => return Ok(None),
        };
        let template = match (global, method) {
            ("JSON", "stringify") => "$util.toJson({})",
            ("JSON", "parse") => "$util.parseJson({})",
            ("Object", "keys") => "{}.keySet()",
            ("Object", "values") => "{}.values()",
            _ => return Ok(None),
        };
        let [arg] = args else {
            return Err(SynthError::unsupported(format!(
                "`{global}.{method}` with {} arguments",
                args.len()
            )));
        };
        let value = self.render_argument(*arg)?;
        Ok(Some(template.replacen("{}", &value, 1)))
    }
}

fn operator(op: BinaryOp) -> Result<&'static str, SynthError> {
    Ok(match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Eq | BinaryOp::StrictEq => "==",
        BinaryOp::Ne | BinaryOp::StrictNe => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
        other => {
            return Err(SynthError::internal(format!(
                "{other:?} has no inline operator"
            )));
        }
    })
}

/// Integers print without a fractional part. Neither dialect has a token
/// for NaN or the infinities.
pub fn format_number(n: f64) -> Result<String, SynthError> {
    if !n.is_finite() {
        return Err(SynthError::unsupported(format!("number literal `{n}`")));
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Ok(format!("{}", n as i64))
    } else {
        Ok(format!("{n}"))
    }
}

/// A string literal. Double-quoted literals are interpolated by the
/// template engine, so text holding `$` or `#` is single-quoted instead,
/// with embedded single quotes doubled.
pub fn quote(s: &str) -> String {
    if is_template_syntax(s) {
        format!("'{}'", s.replace('\'', "''"))
    } else {
        format!("\"{}\"", escape_string(s))
    }
}

/// Whether the engine would evaluate part of `text` inside a double-quoted
/// literal.
pub fn is_template_syntax(text: &str) -> bool {
    text.contains(['$', '#'])
}

fn push_interpolation(out: &mut String, value: &str) {
    let name = value.strip_prefix('$').unwrap_or(value);
    out.push_str(&format!("${{{name}}}"));
}

fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Whether `value` is a plain `$name.path` reference that can be read again
/// without re-evaluating anything.
pub fn is_reference(value: &str) -> bool {
    let Some(rest) = value.strip_prefix('$') else {
        return false;
    };
    !rest.is_empty()
        && rest
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}
