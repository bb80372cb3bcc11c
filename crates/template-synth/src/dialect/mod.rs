//! Output dialects built on the shared walker.
//!
//! A dialect supplies the hooks the walker cannot decide on its own: how a
//! name is addressed, how an integration call site is rendered, and what a
//! top-level `return` emits. Hooks are associated functions over
//! [`Synth`] so they can render sub-expressions through the walker.

#[cfg(feature = "apigateway")]
pub mod apigateway;
#[cfg(feature = "appsync")]
pub mod appsync;

use crate::error::SynthError;
use crate::ir::{IntegrationId, NodeId};
use crate::synth::Synth;

pub trait Dialect: Sized {
    /// Name used in diagnostics and logs.
    const NAME: &'static str;

    /// Whether loop constructs (and therefore list fusion) can be emitted.
    const SUPPORTS_LOOPS: bool;

    /// Render a call to an external integration.
    fn integrate(
        cx: &mut Synth<'_, Self>,
        integration: IntegrationId,
        call: NodeId,
    ) -> Result<String, SynthError>;

    /// Address an identifier or captured reference.
    fn dereference(cx: &Synth<'_, Self>, id: NodeId) -> Result<String, SynthError>;

    /// Emit the top-level "stop and yield" for `return value`.
    fn on_return(cx: &mut Synth<'_, Self>, value: Option<NodeId>) -> Result<(), SynthError>;
}
