//! Resolver templates for AppSync's statement dialect.
//!
//! The full walker is available here: loops, `#set` assignment, conditional
//! blocks, and list/map mutation through `$util.qr`. A top-level `return`
//! becomes `#return(value)`.

use super::Dialect;
use crate::config::AppsyncConfig;
use crate::error::SynthError;
use crate::integration::IntegrationCall;
use crate::ir::{Binding, IntegrationId, Ir, NodeId};
use crate::synth::Synth;
use serde::Serialize;
use tracing::debug;

/// Root accessors for the closure's `(payload, context)` parameters.
const ROOT_PARAMETERS: [&str; 2] = ["$context.arguments", "$context"];

/// Dialect state for one resolver compilation.
#[derive(Debug, Clone, Default)]
pub struct Appsync {
    config: AppsyncConfig,
}

/// A compiled resolver template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppsyncOutput {
    pub template: String,
    /// Kinds of the integrations the template invokes, in call order.
    pub integrations: Vec<String>,
}

impl Appsync {
    pub fn new(config: AppsyncConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppsyncConfig {
        &self.config
    }

    /// Compile a closure into a resolver template.
    pub fn compile(ir: &Ir, root: NodeId, config: &AppsyncConfig) -> Result<AppsyncOutput, SynthError> {
        debug!(root = %root, nodes = ir.len(), "compiling appsync template");
        let mut cx = Synth::new(ir, Appsync::new(config.clone()));
        cx.compile_root(root)?;
        let integrations = cx
            .integrations()
            .iter()
            .filter_map(|&id| ir.integration(id))
            .map(|handler| handler.kind().to_string())
            .collect();
        debug!(
            lines = cx.lines().len(),
            temps = cx.temps(),
            "compiled appsync template"
        );
        Ok(AppsyncOutput {
            template: cx.finish(),
            integrations,
        })
    }
}

impl Dialect for Appsync {
    const NAME: &'static str = "appsync";
    const SUPPORTS_LOOPS: bool = true;

    fn integrate(
        cx: &mut Synth<'_, Self>,
        integration: IntegrationId,
        call: NodeId,
    ) -> Result<String, SynthError> {
        let ir = cx.ir();
        let handler = ir
            .integration(integration)
            .ok_or_else(|| SynthError::internal("integration handle is not part of this IR"))?;
        if cx.dialect().config.single_integration && !cx.integrations().is_empty() {
            return Err(SynthError::illegal_integration(format!(
                "`{}` is a second integration call in a single-integration resolver",
                handler.kind()
            )));
        }
        cx.record_integration(integration);
        let site = IntegrationCall::new(ir, call)?;
        handler.appsync(&site, cx)
    }

    fn dereference(cx: &Synth<'_, Self>, id: NodeId) -> Result<String, SynthError> {
        match cx.ir().classify(id)? {
            Binding::RootParameter(index) => ROOT_PARAMETERS
                .get(index)
                .map(|root| root.to_string())
                .ok_or_else(|| {
                    SynthError::unsupported(format!("resolver parameter at position {index}"))
                }),
            Binding::TopLevel(name) if cx.dialect().config.stash_locals => {
                Ok(format!("$context.stash.{name}"))
            }
            Binding::TopLevel(name) | Binding::Local(name) => Ok(format!("${name}")),
            Binding::Reserved(name) => Ok(name.to_string()),
            Binding::Capture(name) => Err(SynthError::unsupported(format!(
                "reference to `{name}` captured from outside the resolver"
            ))),
        }
    }

    fn on_return(cx: &mut Synth<'_, Self>, value: Option<NodeId>) -> Result<(), SynthError> {
        match value {
            Some(value) => {
                let value = cx.render_expression(value)?;
                cx.emit(format!("#return({value})"));
            }
            None => cx.emit("#return"),
        }
        Ok(())
    }
}
