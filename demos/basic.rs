//! Minimal burrow example: JSON endpoints, a scoped group and request logging.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users -d '{"name":"alice"}'
//!   curl http://localhost:3000/static/css/site.css
//!   curl -H 'x-admin-token: secret' http://localhost:3000/admin/stats

use burrow::{BoxFuture, Context, Router, Server, handler_fn, middleware};
use http::StatusCode;

#[tokio::main]
async fn main() -> Result<(), burrow::Error> {
    tracing_subscriber::fmt::init();

    let mut app = Router::new();
    app.middleware(middleware::trace).middleware(middleware::recover);
    app.not_found(handler_fn(|ctx| {
        Box::pin(async move {
            ctx.response_mut().json(br#"{"error":"not found"}"#);
        })
    }));

    app.group("/users", |r| {
        r.get("/:id", get_user);
        r.post("/", create_user);
        r.delete("/:id", delete_user);
    });
    app.get("/static/*path", serve_static);

    let mut admin = Router::new();
    admin.middleware(require_token);
    admin.get("/stats", stats);
    app.mount("/admin", admin);

    Server::bind("0.0.0.0:3000").pool_capacity(256).serve(app).await
}

// GET /users/:id
fn get_user(ctx: &mut Context) -> BoxFuture<'_> {
    Box::pin(async move {
        let body = format!(r#"{{"id":"{}","name":"alice"}}"#, ctx.param("id").unwrap_or_default());
        ctx.response_mut().json(body.as_bytes());
    })
}

// POST /users
//
// The body is already buffered; parse it with whatever serialiser you like.
fn create_user(ctx: &mut Context) -> BoxFuture<'_> {
    Box::pin(async move {
        if ctx.request().body().is_empty() {
            ctx.response_mut().set_status(StatusCode::BAD_REQUEST);
            return;
        }
        ctx.response_mut()
            .set_status(StatusCode::CREATED)
            .header(http::header::LOCATION, http::HeaderValue::from_static("/users/99"))
            .json(br#"{"id":"99","name":"new_user"}"#);
    })
}

// DELETE /users/:id → 204 No Content
fn delete_user(ctx: &mut Context) -> BoxFuture<'_> {
    Box::pin(async move {
        ctx.response_mut().set_status(StatusCode::NO_CONTENT);
    })
}

// GET /static/*path; `path` keeps its leading slash.
fn serve_static(ctx: &mut Context) -> BoxFuture<'_> {
    Box::pin(async move {
        let path = ctx.param("path").unwrap_or("/").to_owned();
        ctx.response_mut().text(&format!("would serve {path}"));
    })
}

fn require_token(ctx: &mut Context) -> BoxFuture<'_> {
    Box::pin(async move {
        if ctx.request().header("x-admin-token") != Some("secret") {
            ctx.error("missing admin token");
            ctx.response_mut().set_status(StatusCode::UNAUTHORIZED);
            ctx.abort();
        }
    })
}

fn stats(ctx: &mut Context) -> BoxFuture<'_> {
    Box::pin(async move {
        ctx.response_mut().json(br#"{"requests":0}"#);
    })
}
