//! Request and response mapping templates for API Gateway integrations.
//!
//! This dialect is expression-only: there are no loops, and the body
//! usually reduces to one JSON fragment. A value that is a chain of
//! property accesses off the request payload becomes `$input.json('path')`.
//! Literal objects and arrays become literal JSON with their leaves
//! rendered recursively. Anything else is computed by the shared walker and
//! printed through a runtime dispatch that only knows null, strings,
//! numbers and booleans; every other runtime type sets the configured error
//! status.

use super::Dialect;
use crate::config::ApiGatewayConfig;
use crate::error::SynthError;
use crate::integration::{self, IntegrationCall};
use crate::ir::{Binding, BinaryOp, IntegrationId, Ir, Node, NodeId};
use crate::synth::{Synth, format_number, is_template_syntax, quote};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Content type every template is registered under.
pub const APPLICATION_JSON: &str = "application/json";

/// Which side of the integration a template maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Request,
    Response,
}

/// Dialect state for one mapping template compilation.
#[derive(Debug, Clone)]
pub struct ApiGateway {
    direction: Direction,
    config: ApiGatewayConfig,
}

/// A compiled mapping template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingTemplate {
    pub direction: Direction,
    pub template: String,
}

impl ApiGateway {
    pub fn new(direction: Direction, config: ApiGatewayConfig) -> Self {
        Self { direction, config }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn compile(
        ir: &Ir,
        root: NodeId,
        direction: Direction,
        config: &ApiGatewayConfig,
    ) -> Result<MappingTemplate, SynthError> {
        debug!(root = %root, ?direction, "compiling mapping template");
        let mut cx = Synth::new(ir, ApiGateway::new(direction, config.clone()));
        cx.compile_root(root)?;
        debug!(
            lines = cx.lines().len(),
            temps = cx.temps(),
            "compiled mapping template"
        );
        Ok(MappingTemplate {
            direction,
            template: cx.finish(),
        })
    }
}

impl Dialect for ApiGateway {
    const NAME: &'static str = "apigateway";
    const SUPPORTS_LOOPS: bool = false;

    fn integrate(
        cx: &mut Synth<'_, Self>,
        integration: IntegrationId,
        call: NodeId,
    ) -> Result<String, SynthError> {
        let ir = cx.ir();
        let handler = ir
            .integration(integration)
            .ok_or_else(|| SynthError::internal("integration handle is not part of this IR"))?;
        if cx.dialect().direction == Direction::Response {
            return Err(SynthError::illegal_integration(format!(
                "`{}` called while rendering a response template",
                handler.kind()
            )));
        }
        if cx.dialect().config.single_integration && !cx.integrations().is_empty() {
            return Err(SynthError::illegal_integration(format!(
                "`{}` is a second integration call in one request template",
                handler.kind()
            )));
        }
        cx.record_integration(integration);
        let site = IntegrationCall::new(ir, call)?;
        handler.apigateway(&site, cx)
    }

    fn dereference(cx: &Synth<'_, Self>, id: NodeId) -> Result<String, SynthError> {
        match cx.ir().classify(id)? {
            Binding::RootParameter(0) => Ok("$input.path('$')".to_string()),
            Binding::RootParameter(1) => Ok("$context".to_string()),
            Binding::RootParameter(index) => Err(SynthError::unsupported(format!(
                "mapping parameter at position {index}"
            ))),
            Binding::TopLevel(name) | Binding::Local(name) => Ok(format!("${name}")),
            Binding::Reserved(name) => Ok(name.to_string()),
            Binding::Capture(name) => Err(SynthError::unsupported(format!(
                "reference to `{name}` captured from outside the mapping"
            ))),
        }
    }

    fn on_return(cx: &mut Synth<'_, Self>, value: Option<NodeId>) -> Result<(), SynthError> {
        let fragment = match value {
            Some(value) => to_json(cx, value)?,
            None => "null".to_string(),
        };
        cx.emit(fragment);
        Ok(())
    }
}

/// Express an access chain rooted at the payload parameter as a JSON path.
pub fn to_json_path(ir: &Ir, expr: NodeId) -> Option<String> {
    let expr = ir.unwrap_parens(expr);
    match ir.get(expr)? {
        Node::Identifier { .. } => match ir.classify(expr).ok()? {
            Binding::RootParameter(0) => Some("$".to_string()),
            _ => None,
        },
        Node::PropertyAccess { base, name } => {
            let base = to_json_path(ir, *base)?;
            if is_path_segment(name) {
                Some(format!("{base}.{name}"))
            } else {
                Some(format!("{base}[{}]", path_key(name)))
            }
        }
        Node::ElementAccess { base, element } => {
            let base = to_json_path(ir, *base)?;
            match ir.get(ir.unwrap_parens(*element))? {
                Node::Number(n) if n.fract() == 0.0 && *n >= 0.0 => {
                    Some(format!("{base}[{}]", format_number(*n).ok()?))
                }
                Node::String(key) => Some(format!("{base}[{}]", path_key(key))),
                _ => None,
            }
        }
        _ => None,
    }
}

/// A bracketed path key. Double quotes keep the key from closing the
/// single-quoted `$input.json('...')` argument.
fn path_key(key: &str) -> String {
    format!("\"{}\"", key.replace('\\', "\\\\").replace('"', "\\\""))
}

/// `$input.json(...)` over a path; a quote inside the literal is doubled.
fn input_json(path: &str) -> String {
    format!("$input.json('{}')", path.replace('\'', "''"))
}

fn is_path_segment(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Render `expr` as a JSON fragment.
pub fn to_json(cx: &mut Synth<'_, ApiGateway>, expr: NodeId) -> Result<String, SynthError> {
    let ir = cx.ir();
    let expr = ir.unwrap_parens(expr);
    if let Some(path) = to_json_path(ir, expr) {
        return Ok(input_json(&path));
    }
    match ir.node(expr)? {
        Node::Null | Node::Undefined => Ok("null".to_string()),
        Node::Boolean(value) => Ok(value.to_string()),
        Node::Number(value) => format_number(*value),
        Node::String(value) => json_text(cx, value),
        Node::Object { properties } => {
            let mut fields = Vec::with_capacity(properties.len());
            for &property in properties {
                let Node::PropertyAssignment { name, value } = ir.node(property)? else {
                    return Err(SynthError::unsupported("object spread in a mapping template"));
                };
                let key = match ir.node(*name)? {
                    Node::Identifier { name } | Node::String(name) => json_text(cx, name)?,
                    Node::Number(n) => json_string(&format_number(*n)?)?,
                    _ => {
                        return Err(SynthError::unsupported(
                            "computed property name in a mapping template",
                        ));
                    }
                };
                fields.push(format!("{key}:{}", to_json(cx, *value)?));
            }
            Ok(format!("{{{}}}", fields.join(",")))
        }
        Node::Array { items } => {
            let mut values = Vec::with_capacity(items.len());
            for &item in items {
                if matches!(ir.node(item)?, Node::Spread { .. }) {
                    return Err(SynthError::unsupported("array spread in a mapping template"));
                }
                values.push(to_json(cx, item)?);
            }
            Ok(format!("[{}]", values.join(",")))
        }
        Node::Template { .. } => {
            let value = cx.render_reference(expr)?;
            Ok(escaped(&value))
        }
        Node::Await { expr: inner } => to_json(cx, *inner),
        Node::Promise { expr: inner } => {
            if integration::called_integration(ir, *inner).is_some() {
                cx.render_expression(expr)
            } else {
                to_json(cx, *inner)
            }
        }
        Node::Call { .. } if integration::called_integration(ir, expr).is_some() => {
            cx.render_expression(expr)
        }
        _ => primitive_dispatch(cx, expr),
    }
}

fn json_string(value: &str) -> Result<String, SynthError> {
    serde_json::to_string(value).map_err(|e| SynthError::internal(e.to_string()))
}

/// A JSON string for literal text. Text the engine would evaluate is
/// assigned from a single-quoted literal and printed escaped.
fn json_text(cx: &mut Synth<'_, ApiGateway>, text: &str) -> Result<String, SynthError> {
    if is_template_syntax(text) {
        let slot = cx.materialize(quote(text))?;
        Ok(escaped(&slot))
    } else {
        json_string(text)
    }
}

/// A runtime string value printed as a JSON string.
fn escaped(value: &str) -> String {
    format!("\"$util.escapeJavaScript({value})\"")
}

/// Compute `expr` with the shared walker and print it by runtime type.
fn primitive_dispatch(cx: &mut Synth<'_, ApiGateway>, expr: NodeId) -> Result<String, SynthError> {
    if is_statically_composite(cx.ir(), expr) {
        return Err(SynthError::unsupported(
            "object or array value outside a path; nested structures cannot be printed by the primitive fallback",
        ));
    }
    let value = cx.render_reference(expr)?;
    let status = cx.dialect().config.error_status;
    let class = format!("{value}.class.name");
    Ok(format!(
        "#if({value} == $null)null\
         #elseif({class} == 'java.lang.String')\"$util.escapeJavaScript({value})\"\
         #elseif({class} == 'java.lang.Integer' || {class} == 'java.lang.Long' || {class} == 'java.lang.Double' || {class} == 'java.lang.Boolean'){value}\
         #{{else}}#set($context.responseOverride.status = {status})\"unsupported value type\"#{{end}}"
    ))
}

/// Whether `expr` certainly evaluates to an object or array.
fn is_statically_composite(ir: &Ir, expr: NodeId) -> bool {
    let expr = ir.unwrap_parens(expr);
    match ir.get(expr) {
        Some(Node::Object { .. } | Node::Array { .. }) => true,
        Some(Node::Await { expr } | Node::Promise { expr }) => is_statically_composite(ir, *expr),
        Some(Node::Conditional {
            then, otherwise, ..
        }) => is_statically_composite(ir, *then) || is_statically_composite(ir, *otherwise),
        Some(Node::Binary {
            left,
            op: BinaryOp::And | BinaryOp::Or | BinaryOp::Coalesce,
            right,
        }) => is_statically_composite(ir, *left) || is_statically_composite(ir, *right),
        Some(Node::Identifier { .. }) => match ir.lookup(expr).and_then(|d| ir.get(d)) {
            Some(Node::VariableDeclaration {
                initializer: Some(init),
                ..
            }) => is_statically_composite(ir, *init),
            _ => false,
        },
        _ => false,
    }
}

/// One entry of an integration's response list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationResponse {
    pub status_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_pattern: Option<String>,
    pub response_templates: BTreeMap<String, String>,
}

/// Request template, default response, and per-status responses, in the
/// shape API Gateway's integration resource expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationMapping {
    pub request_templates: BTreeMap<String, String>,
    pub integration_responses: Vec<IntegrationResponse>,
}

impl IntegrationMapping {
    pub fn new(request: MappingTemplate, response: MappingTemplate) -> Result<Self, SynthError> {
        expect_direction(&request, Direction::Request)?;
        expect_direction(&response, Direction::Response)?;
        Ok(Self {
            request_templates: BTreeMap::from([(APPLICATION_JSON.to_string(), request.template)]),
            integration_responses: vec![IntegrationResponse {
                status_code: "200".to_string(),
                selection_pattern: None,
                response_templates: BTreeMap::from([(
                    APPLICATION_JSON.to_string(),
                    response.template,
                )]),
            }],
        })
    }

    /// Add a response selected when the backend answers with `status`.
    pub fn with_status(mut self, status: u16, response: MappingTemplate) -> Result<Self, SynthError> {
        expect_direction(&response, Direction::Response)?;
        self.integration_responses.push(IntegrationResponse {
            status_code: status.to_string(),
            selection_pattern: Some(format!("^{status}$")),
            response_templates: BTreeMap::from([(APPLICATION_JSON.to_string(), response.template)]),
        });
        Ok(self)
    }
}

fn expect_direction(template: &MappingTemplate, direction: Direction) -> Result<(), SynthError> {
    if template.direction == direction {
        Ok(())
    } else {
        Err(SynthError::internal(format!(
            "expected a {direction:?} template, got a {:?} template",
            template.direction
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;
    use crate::ir::IrBuilder;

    fn compile_return(
        direction: Direction,
        build: impl FnOnce(&mut IrBuilder, NodeId) -> NodeId,
    ) -> Result<MappingTemplate, SynthError> {
        let mut b = IrBuilder::new();
        let input = b.param("input");
        let payload = b.ident("input");
        let value = build(&mut b, payload);
        let ret = b.return_stmt(Some(value));
        let body = b.block(vec![ret]);
        let root = b.function(vec![input], body);
        let ir = b.finish().unwrap();
        ApiGateway::compile(&ir, root, direction, &ApiGatewayConfig::default())
    }

    #[test]
    fn test_path_chain() {
        let out = compile_return(Direction::Response, |b, input| {
            let items = b.prop(input, "items");
            let zero = b.number(0.0);
            let first = b.element(items, zero);
            b.prop(first, "id")
        })
        .unwrap();
        assert_eq!(out.template, "$input.json('$.items[0].id')");
    }

    #[test]
    fn test_bracketed_keys_are_double_quoted() {
        let out = compile_return(Direction::Request, |b, input| {
            let key = b.string("x-api-key");
            let headers = b.prop(input, "headers");
            b.element(headers, key)
        })
        .unwrap();
        assert_eq!(out.template, "$input.json('$.headers[\"x-api-key\"]')");
    }

    #[test]
    fn test_literal_object_with_path_leaves() {
        let out = compile_return(Direction::Request, |b, input| {
            let id = b.prop(input, "id");
            let id_prop = b.property("id", id);
            let flag = b.boolean(true);
            let flag_prop = b.property("flag", flag);
            b.object(vec![id_prop, flag_prop])
        })
        .unwrap();
        assert_eq!(out.template, "{\"id\":$input.json('$.id'),\"flag\":true}");
    }

    #[test]
    fn test_computed_value_uses_dispatch() {
        let out = compile_return(Direction::Response, |b, input| {
            let count = b.prop(input, "count");
            let one = b.number(1.0);
            b.binary(count, BinaryOp::Add, one)
        })
        .unwrap();
        let mut lines = out.template.lines();
        assert_eq!(lines.next(), Some("#set($v1 = ($input.path('$').count + 1))"));
        let fragment = lines.next().unwrap();
        assert!(fragment.starts_with("#if($v1 == $null)null"));
        assert!(fragment.contains("$v1.class.name == 'java.lang.String'"));
        assert!(fragment.contains("$context.responseOverride.status = 500"));
    }

    #[test]
    fn test_composite_through_dispatch_is_unsupported() {
        let err = compile_return(Direction::Response, |b, input| {
            let fallback = b.object(vec![]);
            let value = b.prop(input, "value");
            b.binary(value, BinaryOp::Or, fallback)
        })
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedConstruct);
    }

    #[test]
    fn test_loops_are_unsupported() {
        let err = compile_return(Direction::Request, |b, input| {
            let items = b.prop(input, "items");
            let x = b.ident("x");
            let callback = b.arrow(&["x"], x);
            b.method(items, "map", vec![callback])
        })
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedConstruct);
    }

    #[test]
    fn test_mapping_shape() {
        let request = MappingTemplate {
            direction: Direction::Request,
            template: "$input.json('$')".to_string(),
        };
        let response = MappingTemplate {
            direction: Direction::Response,
            template: "$input.json('$.body')".to_string(),
        };
        let failure = MappingTemplate {
            direction: Direction::Response,
            template: "{\"error\":true}".to_string(),
        };
        let mapping = IntegrationMapping::new(request.clone(), response)
            .unwrap()
            .with_status(400, failure)
            .unwrap();
        let json = serde_json::to_value(&mapping).unwrap();
        assert_eq!(json["requestTemplates"]["application/json"], "$input.json('$')");
        assert_eq!(json["integrationResponses"][0]["statusCode"], "200");
        assert!(json["integrationResponses"][0].get("selectionPattern").is_none());
        assert_eq!(json["integrationResponses"][1]["selectionPattern"], "^400$");

        assert!(IntegrationMapping::new(request.clone(), request).is_err());
    }
}
