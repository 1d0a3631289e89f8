//! Turning controller methods into route endpoints.

mod args;
mod reply;

use std::sync::Arc;

use crate::decorators::MethodHandler;
use crate::metadata::ParameterMetadata;
use crate::middleware::{Endpoint, RequestContext};
use crate::server::HandlerFuture;

pub use args::{Arg, ArgValue, Args};
pub use reply::Reply;

/// Builds the last step of a route's chain: resolve the bound arguments,
/// call the controller method and render its reply.
pub fn endpoint<C>(controller: Arc<C>, handler: MethodHandler<C>, bindings: Arc<[ParameterMetadata]>) -> Endpoint
where
    C: Send + Sync + 'static,
{
    Arc::new(move |ctx: RequestContext| -> HandlerFuture {
        let controller = controller.clone();
        let handler = handler.clone();
        let bindings = bindings.clone();
        Box::pin(async move {
            let slot = ctx.response.clone();
            let args = Args::resolve(&bindings, ctx);
            let reply = handler(controller, args).await?;
            reply.into_response(&slot)
        })
    })
}
