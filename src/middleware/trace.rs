use std::time::Instant;

use tracing::{Instrument, info, info_span};

use crate::context::Context;
use crate::handler::BoxFuture;

/// Wraps the rest of the chain in a `request` span and emits one access line.
pub fn trace(ctx: &mut Context) -> BoxFuture<'_> {
    let span = info_span!(
        "request",
        method = %ctx.request().method(),
        path = ctx.request().path()
    );

    Box::pin(
        async move {
            let start = Instant::now();
            ctx.next().await;

            let status = ctx.response().status().as_u16();
            let latency_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
            match ctx.err() {
                Some(err) => info!(status, latency_us, error = %err, "request finished"),
                None => info!(status, latency_us, "request finished"),
            }
        }
        .instrument(span),
    )
}
