//! Lowering of `map`, `forEach`, `reduce` and `filter` callbacks.
//!
//! A chain of `.map` stages is fused into the loop of whichever operation
//! consumes it: `flatten` walks down the receivers to the first
//! non-fusible source, emits a single loop header over it, and then renders
//! each stage's callback inside that loop, innermost first, each stage
//! writing into the next stage's item variable.
//!
//! ```text
//! xs.map(f).map(g)      #set($v1 = [])
//!                       #foreach($x in xs)      <- one header
//!                         f body -> $y
//!                         g body -> $v2
//!                         $v1.add($v2)
//!                       #end
//! ```

use super::{Synth, NULL};
use crate::dialect::Dialect;
use crate::error::{ErrorCode, SynthError};
use crate::integration;
use crate::ir::{Node, NodeId};

/// Emits the loop header once the backing collection is known.
type BeforeLoop<'a, S> = dyn FnMut(&mut S, &str, &str) -> Result<(), SynthError> + 'a;

/// Positions of the callback parameters that expose the whole collection.
const MAP_ARRAY_PARAM: usize = 2;
const REDUCE_ARRAY_PARAM: usize = 3;

impl<'ir, D: Dialect> Synth<'ir, D> {
    /// Receiver and callback of `receiver.op(callback, ...)`.
    fn list_call(&self, call: NodeId) -> Result<(NodeId, &'ir [NodeId], NodeId), SynthError> {
        let ir = self.ir;
        let Node::Call { callee, args } = ir.node(call)? else {
            return Err(SynthError::internal("list operation is not a call"));
        };
        let Node::PropertyAccess { base, .. } = ir.node(ir.unwrap_parens(*callee))? else {
            return Err(SynthError::internal("list operation without a receiver"));
        };
        let callback = args
            .first()
            .map(|&arg| ir.argument_expr(arg))
            .ok_or_else(|| SynthError::internal("list operation without a callback"))?;
        let Node::Function { parameters, body } = ir.node(callback)? else {
            return Err(SynthError::internal("list operation callback is not a function"));
        };
        Ok((*base, parameters.as_slice(), *body))
    }

    /// Whether `expr` is a `.map(callback)` stage that can join a fused loop.
    fn map_stage(&self, expr: NodeId) -> Option<NodeId> {
        let ir = self.ir;
        let expr = ir.unwrap_parens(expr);
        let Some(Node::Call { callee, args }) = ir.get(expr) else {
            return None;
        };
        if integration::resolve(ir, *callee).is_some() {
            return None;
        }
        let Some(Node::PropertyAccess { name, .. }) = ir.get(ir.unwrap_parens(*callee)) else {
            return None;
        };
        let callback = ir.argument_expr(*args.first()?);
        (name == "map" && matches!(ir.get(callback), Some(Node::Function { .. }))).then_some(expr)
    }

    /// Whether the callback reads the parameter at `index`.
    fn parameter_used(&self, parameters: &[NodeId], index: usize, body: NodeId) -> bool {
        let ir = self.ir;
        let Some(&param) = parameters.get(index) else {
            return false;
        };
        match ir.get(param) {
            Some(Node::Parameter { name, .. }) => match ir.get(*name) {
                Some(Node::Identifier { .. }) => ir.references(body, param),
                _ => true,
            },
            _ => false,
        }
    }

    /// The loop variable for a callback parameter. Plain names are used
    /// directly; patterns and defaults get a temporary bound afterwards.
    fn loop_variable(&mut self, param: Option<NodeId>) -> Result<String, SynthError> {
        let ir = self.ir;
        if let Some(param) = param
            && let Node::Parameter {
                name,
                initializer: None,
            } = ir.node(param)?
            && matches!(ir.node(*name)?, Node::Identifier { .. })
        {
            return D::dereference(self, *name);
        }
        Ok(self.fresh_temp())
    }

    /// Bind `(item, index, array)` callback parameters inside the loop.
    fn bind_item_parameters(
        &mut self,
        parameters: &[NodeId],
        item: &str,
        list: &str,
    ) -> Result<(), SynthError> {
        let sources = [item, "$foreach.index", list];
        for (&param, source) in parameters.iter().zip(sources) {
            self.bind_parameter(param, source)?;
        }
        Ok(())
    }

    /// Render a callback body to a temporary holding its result.
    fn render_callback_body(&mut self, body: NodeId) -> Result<String, SynthError> {
        if matches!(self.ir.node(body)?, Node::Block { .. }) {
            let slot = self.fresh_temp();
            self.assign(&slot, NULL)?;
            self.render_statement(body, Some(&slot))?;
            Ok(slot)
        } else {
            self.materialize(body)
        }
    }

    /// Walk down a chain of `.map` stages, emit one loop header over the
    /// first non-fusible source, and render the stages inside the loop.
    ///
    /// On return the loop is open and `item` holds the value produced by the
    /// outermost stage. Returns the backing collection reference.
    fn flatten(
        &mut self,
        expr: NodeId,
        item: &str,
        force_stop: bool,
        before_loop: &mut BeforeLoop<'_, Self>,
    ) -> Result<String, SynthError> {
        if !force_stop && let Some(stage) = self.map_stage(expr) {
            let (receiver, parameters, body) = self.list_call(stage)?;
            if !self.parameter_used(parameters, MAP_ARRAY_PARAM, body) {
                let stage_item = self.loop_variable(parameters.first().copied())?;
                let list = self.flatten(receiver, &stage_item, false, before_loop)?;
                self.bind_item_parameters(parameters, &stage_item, &list)?;
                let value = self.render_callback_body(body)?;
                self.assign(item, value)?;
                return Ok(list);
            }
        }
        let list = self.render_reference(expr)?;
        before_loop(self, item, &list)?;
        Ok(list)
    }

    fn open_loop(&mut self, item: &str, list: &str) -> Result<(), SynthError> {
        self.emit(format!("#foreach({item} in {list})"));
        Ok(())
    }

    pub(super) fn fuse_map(&mut self, call: NodeId) -> Result<String, SynthError> {
        let (receiver, parameters, body) = self.list_call(call)?;
        let out = self.fresh_temp();
        self.assign(&out, "[]")?;
        let item = self.loop_variable(parameters.first().copied())?;
        let force_stop = self.parameter_used(parameters, MAP_ARRAY_PARAM, body);
        let list = self.flatten(receiver, &item, force_stop, &mut Self::open_loop)?;
        self.bind_item_parameters(parameters, &item, &list)?;
        let value = self.render_callback_body(body)?;
        self.qr(&format!("{out}.add({value})"));
        self.emit("#end");
        Ok(out)
    }

    pub(super) fn fuse_for_each(&mut self, call: NodeId) -> Result<String, SynthError> {
        let (receiver, parameters, body) = self.list_call(call)?;
        let item = self.loop_variable(parameters.first().copied())?;
        let force_stop = self.parameter_used(parameters, MAP_ARRAY_PARAM, body);
        let list = self.flatten(receiver, &item, force_stop, &mut Self::open_loop)?;
        self.bind_item_parameters(parameters, &item, &list)?;
        self.render_callback_body(body)?;
        self.emit("#end");
        Ok(NULL.to_string())
    }

    /// `reduce(callback, initial?)`.
    ///
    /// The accumulator lives in its own temporary and is copied into the
    /// user's parameter each iteration. Without an initial value an empty
    /// source raises at execution time and the first element seeds the
    /// accumulator.
    pub(super) fn fuse_reduce(&mut self, call: NodeId) -> Result<String, SynthError> {
        let ir = self.ir;
        let (receiver, parameters, body) = self.list_call(call)?;
        let initial = match ir.node(call)? {
            Node::Call { args, .. } => args.get(1).map(|&arg| ir.argument_expr(arg)),
            _ => None,
        };

        let acc = self.fresh_temp();
        if let Some(initial) = initial {
            self.assign(&acc, initial)?;
        }
        let item = self.loop_variable(parameters.get(1).copied())?;
        let force_stop = self.parameter_used(parameters, REDUCE_ARRAY_PARAM, body);
        let seeded = initial.is_none();
        let list = self.flatten(
            receiver,
            &item,
            force_stop,
            &mut |s: &mut Self, item: &str, list: &str| {
                if seeded {
                    s.if_stmt(&format!("{list}.isEmpty()"), |s| {
                        s.emit(format!(
                            "$util.error(\"Reduce of empty array with no initial value\", \"{}\")",
                            ErrorCode::EmptyReduceNoInitial.name()
                        ));
                        Ok(())
                    })?;
                }
                s.open_loop(item, list)
            },
        )?;

        if seeded {
            self.if_else(
                "$foreach.index == 0",
                |s| s.assign(&acc, item.as_str()).map(drop),
                |s| s.reduce_step(parameters, body, &acc, &item, &list),
            )?;
        } else {
            self.reduce_step(parameters, body, &acc, &item, &list)?;
        }
        self.emit("#end");
        Ok(acc)
    }

    fn reduce_step(
        &mut self,
        parameters: &[NodeId],
        body: NodeId,
        acc: &str,
        item: &str,
        list: &str,
    ) -> Result<(), SynthError> {
        let sources = [acc, item, "$foreach.index", list];
        for (&param, source) in parameters.iter().zip(sources) {
            self.bind_parameter(param, source)?;
        }
        let value = self.render_callback_body(body)?;
        self.assign(acc, value).map(drop)
    }

    /// `filter(callback)`: consumes a fused `.map` chain, appends each item
    /// the predicate accepts.
    pub(super) fn filter(&mut self, call: NodeId) -> Result<String, SynthError> {
        let (receiver, parameters, body) = self.list_call(call)?;
        let out = self.fresh_temp();
        self.assign(&out, "[]")?;
        let item = self.loop_variable(parameters.first().copied())?;
        let force_stop = self.parameter_used(parameters, MAP_ARRAY_PARAM, body);
        let list = self.flatten(receiver, &item, force_stop, &mut Self::open_loop)?;
        self.bind_item_parameters(parameters, &item, &list)?;
        let keep = self.render_callback_body(body)?;
        self.if_stmt(&keep, |s| {
            s.qr(&format!("{out}.add({item})"));
            Ok(())
        })?;
        self.emit("#end");
        Ok(out)
    }
}
