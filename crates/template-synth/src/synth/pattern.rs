//! Destructuring patterns desugared into sequential assignments.

use super::{NULL, Synth, is_reference, quote};
use crate::dialect::Dialect;
use crate::error::SynthError;
use crate::ir::{Node, NodeId};

impl<D: Dialect> Synth<'_, D> {
    /// Bind every name in `pattern` from the value addressed by `target`.
    ///
    /// Fixed elements are bound in source order, each with its own default
    /// guard and nested expansion; the rest element, if any, is bound last.
    pub fn expand(&mut self, pattern: NodeId, target: &str) -> Result<(), SynthError> {
        let ir = self.ir;
        match ir.node(pattern)? {
            Node::ObjectBinding { elements } => {
                let mut bound_keys = Vec::new();
                let mut rest = None;
                for &element in elements {
                    let Node::BindingElement {
                        name,
                        property_name,
                        initializer,
                        rest: is_rest,
                    } = ir.node(element)?
                    else {
                        return Err(SynthError::internal(format!(
                            "{} inside an object pattern",
                            ir.node(element)?.kind_name()
                        )));
                    };
                    if *is_rest {
                        rest = Some(*name);
                        continue;
                    }
                    let (accessor, key) = self.property_accessor(target, *name, *property_name)?;
                    bound_keys.push(key);
                    self.bind_element(*name, accessor, *initializer)?;
                }
                if let Some(name) = rest {
                    let remainder = self.object_rest(target, &bound_keys)?;
                    self.bind_element(name, remainder, None)?;
                }
                Ok(())
            }
            Node::ArrayBinding { elements } => {
                let mut rest = None;
                for (index, &element) in elements.iter().enumerate() {
                    match ir.node(element)? {
                        Node::Omitted => {}
                        Node::BindingElement {
                            name, rest: true, ..
                        } => rest = Some((index, *name)),
                        Node::BindingElement {
                            name, initializer, ..
                        } => {
                            self.bind_element(*name, format!("{target}[{index}]"), *initializer)?;
                        }
                        other => {
                            return Err(SynthError::internal(format!(
                                "{} inside an array pattern",
                                other.kind_name()
                            )));
                        }
                    }
                }
                if let Some((start, name)) = rest {
                    let tail = format!("{target}.subList({start}, {target}.size())");
                    self.bind_element(name, tail, None)?;
                }
                Ok(())
            }
            other => Err(SynthError::internal(format!(
                "cannot destructure with a {}",
                other.kind_name()
            ))),
        }
    }

    /// Accessor expression for one object pattern element, plus the key
    /// text used to exclude it from a rest element.
    fn property_accessor(
        &mut self,
        target: &str,
        name: NodeId,
        property_name: Option<NodeId>,
    ) -> Result<(String, String), SynthError> {
        let ir = self.ir;
        let Some(property) = property_name else {
            return match ir.node(name)? {
                Node::Identifier { name } => Ok((format!("{target}.{name}"), quote(name))),
                other => Err(SynthError::ambiguous_binding(format!(
                    "{} has no property name to read from",
                    other.kind_name()
                ))),
            };
        };
        match ir.node(property)? {
            Node::Identifier { name } => Ok((format!("{target}.{name}"), quote(name))),
            Node::String(key) => {
                let key = quote(key);
                Ok((format!("{target}[{key}]"), key))
            }
            Node::Number(n) => {
                let key = quote(&super::format_number(*n)?);
                Ok((format!("{target}[{key}]"), key))
            }
            Node::ComputedPropertyName { expr } => {
                let key = self.render_reference(*expr)?;
                Ok((format!("{target}[{key}]"), key))
            }
            other => Err(SynthError::ambiguous_binding(format!(
                "property name is a {}",
                other.kind_name()
            ))),
        }
    }

    /// Assign `value` to a binding name, applying its default and recursing
    /// into nested patterns.
    fn bind_element(
        &mut self,
        name: NodeId,
        value: String,
        initializer: Option<NodeId>,
    ) -> Result<(), SynthError> {
        let value = match initializer {
            Some(default) => {
                let slot = self.materialize(value)?;
                self.if_stmt(&format!("{slot} == {NULL}"), |s| {
                    s.assign(&slot, default).map(drop)
                })?;
                slot
            }
            None => value,
        };
        match self.ir.node(name)? {
            Node::Identifier { .. } => {
                let target = D::dereference(self, name)?;
                self.assign(&target, value).map(drop)
            }
            Node::ObjectBinding { .. } | Node::ArrayBinding { .. } => {
                let source = if is_reference(&value) {
                    value
                } else {
                    self.materialize(value)?
                };
                self.expand(name, &source)
            }
            other => Err(SynthError::internal(format!(
                "binding name is a {}",
                other.kind_name()
            ))),
        }
    }

    /// Copy every key of `source` not in `bound_keys` into a new map.
    fn object_rest(&mut self, source: &str, bound_keys: &[String]) -> Result<String, SynthError> {
        let remainder = self.fresh_temp();
        self.assign(&remainder, "{}")?;
        let key = self.fresh_temp();
        self.emit(format!("#foreach({key} in {source}.keySet())"));
        let copy = format!("{remainder}.put({key}, {source}.get({key}))");
        if bound_keys.is_empty() {
            self.qr(&copy);
        } else {
            let condition = bound_keys
                .iter()
                .map(|k| format!("{key} != {k}"))
                .collect::<Vec<_>>()
                .join(" && ");
            self.if_stmt(&condition, |s| {
                s.qr(&copy);
                Ok(())
            })?;
        }
        self.emit("#end");
        Ok(remainder)
    }

    /// Bind a callback parameter from a loop value.
    pub(super) fn bind_parameter(&mut self, param: NodeId, source: &str) -> Result<(), SynthError> {
        let ir = self.ir;
        let Node::Parameter { name, initializer } = ir.node(param)? else {
            return Err(SynthError::internal(format!(
                "callback parameter is a {}",
                ir.node(param)?.kind_name()
            )));
        };
        if let Node::Identifier { .. } = ir.node(*name)? {
            let target = D::dereference(self, *name)?;
            if target != source {
                self.assign(&target, source)?;
            }
            if let Some(default) = *initializer {
                self.if_stmt(&format!("{target} == {NULL}"), |s| {
                    s.assign(&target, default).map(drop)
                })?;
            }
            return Ok(());
        }
        self.bind_element(*name, source.to_string(), *initializer)
    }
}
