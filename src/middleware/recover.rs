use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use http::StatusCode;
use tracing::error;

use crate::context::Context;
use crate::handler::BoxFuture;

/// Runs the rest of the chain and catches any panic it raises.
///
/// On panic the chain is aborted, whatever body was written is dropped and
/// the response becomes `500 Internal Server Error`.
pub fn recover(ctx: &mut Context) -> BoxFuture<'_> {
    Box::pin(async move {
        let outcome = AssertUnwindSafe(ctx.next()).catch_unwind().await;
        if let Err(panic) = outcome {
            error!(
                path = ctx.request().path(),
                panic = panic_message(panic.as_ref()),
                "handler panicked"
            );
            ctx.abort();
            ctx.response_mut()
                .clear_body()
                .set_status(StatusCode::INTERNAL_SERVER_ERROR);
        }
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}
