//! Named compile targets.

use crate::config::SynthConfig;
use crate::error::SynthError;
use crate::ir::{Ir, NodeId};

/// A template flavour a closure can be compiled into.
pub trait Target: Send + Sync {
    /// Target identifier (e.g., "appsync", "apigateway-request").
    fn name(&self) -> &'static str;

    /// Compile the closure rooted at `root` to template text.
    fn compile(&self, ir: &Ir, root: NodeId, config: &SynthConfig) -> Result<String, SynthError>;
}

#[cfg(feature = "appsync")]
pub use appsync_target::{APPSYNC_TARGET, AppsyncTarget};

#[cfg(feature = "appsync")]
mod appsync_target {
    use super::*;
    use crate::dialect::appsync::Appsync;

    /// Static instance of the resolver target for the registry.
    pub static APPSYNC_TARGET: AppsyncTarget = AppsyncTarget;

    pub struct AppsyncTarget;

    impl Target for AppsyncTarget {
        fn name(&self) -> &'static str {
            "appsync"
        }

        fn compile(&self, ir: &Ir, root: NodeId, config: &SynthConfig) -> Result<String, SynthError> {
            Appsync::compile(ir, root, &config.appsync).map(|out| out.template)
        }
    }
}

#[cfg(feature = "apigateway")]
pub use apigateway_target::{APIGATEWAY_REQUEST_TARGET, APIGATEWAY_RESPONSE_TARGET, ApiGatewayTarget};

#[cfg(feature = "apigateway")]
mod apigateway_target {
    use super::*;
    use crate::dialect::apigateway::{ApiGateway, Direction};

    pub static APIGATEWAY_REQUEST_TARGET: ApiGatewayTarget = ApiGatewayTarget(Direction::Request);
    pub static APIGATEWAY_RESPONSE_TARGET: ApiGatewayTarget = ApiGatewayTarget(Direction::Response);

    /// Mapping template target for one direction.
    pub struct ApiGatewayTarget(pub Direction);

    impl Target for ApiGatewayTarget {
        fn name(&self) -> &'static str {
            match self.0 {
                Direction::Request => "apigateway-request",
                Direction::Response => "apigateway-response",
            }
        }

        fn compile(&self, ir: &Ir, root: NodeId, config: &SynthConfig) -> Result<String, SynthError> {
            ApiGateway::compile(ir, root, self.0, &config.apigateway).map(|out| out.template)
        }
    }
}
