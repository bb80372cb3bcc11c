//! Template synthesis for closure bodies.
//!
//! `template-synth` compiles the IR of a user closure into templates that
//! downstream services execute: AppSync resolver templates and API Gateway
//! request/response mapping templates. One walker is shared by both; each
//! dialect only decides how names are addressed, how integration calls are
//! rendered, and what a top-level `return` emits.
//!
//! # Architecture
//!
//! ```text
//!  front end          shared walker (synth)              dialects
//! ───────────    ────────────────────────────────    ──────────────────
//!               ┌─> statements / expressions ─┐   ┌─> appsync    ─> VTL
//!  Ir ──────────┼─> list fusion (map/reduce) ──┼──>┤
//!  (ir.rs)      └─> pattern desugaring ────────┘   └─> apigateway ─> JSON path
//!                          │
//!                          └─> integration handlers (integration.rs)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use template_synth::{Appsync, AppsyncConfig, IrBuilder};
//!
//! // (input) => { return input; }
//! let mut b = IrBuilder::new();
//! let input = b.param("input");
//! let value = b.ident("input");
//! let ret = b.return_stmt(Some(value));
//! let body = b.block(vec![ret]);
//! let root = b.function(vec![input], body);
//! let ir = b.finish()?;
//!
//! let out = Appsync::compile(&ir, root, &AppsyncConfig::default())?;
//! // => "#return($context.arguments)"
//! ```

pub mod config;
pub mod dialect;
pub mod error;
pub mod integration;
pub mod ir;
pub mod registry;
pub mod synth;
pub mod traits;

// Re-exports: IR
pub use ir::{
    BinaryOp, Binding, DeclKind, IntegrationId, Ir, IrBuilder, Node, NodeId, PostfixOp, UnaryOp,
};

// Re-exports: errors and config
pub use config::{ApiGatewayConfig, AppsyncConfig, ConfigError, SynthConfig};
pub use error::{ErrorCode, SynthError};

// Re-exports: walker and integrations
pub use dialect::Dialect;
pub use integration::{Integration, IntegrationCall};
pub use synth::{NULL, Operand, Synth};

// Re-exports: targets
pub use registry::{register_target, target_for_name, targets};
pub use traits::Target;

// Re-exports: built-in dialects
#[cfg(feature = "apigateway")]
pub use dialect::apigateway::{
    ApiGateway, Direction, IntegrationMapping, IntegrationResponse, MappingTemplate,
};
#[cfg(feature = "appsync")]
pub use dialect::appsync::{Appsync, AppsyncOutput};
