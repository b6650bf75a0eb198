//! Outgoing response facade.
//!
//! Handlers write into a buffered [`Response`] held by the
//! [`Context`](crate::Context). Nothing reaches the wire until dispatch
//! flushes it once the chain has finished.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`Response::bytes`].
pub enum ContentType {
    Csv,          // text/csv
    EventStream,  // text/event-stream
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Csv         => "text/csv",
            Self::EventStream => "text/event-stream",
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// A buffered HTTP response.
///
/// Status defaults to `200 OK`. Body writes append, so several handlers in a
/// chain can contribute to one body:
///
/// ```rust
/// use burrow::{BoxFuture, Context};
///
/// fn created(ctx: &mut Context) -> BoxFuture<'_> {
///     Box::pin(async move {
///         ctx.response_mut()
///             .set_status(http::StatusCode::CREATED)
///             .header(http::header::LOCATION, http::HeaderValue::from_static("/users/42"))
///             .json(br#"{"id":42}"#);
///     })
/// }
/// ```
#[derive(Debug, Default)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    flushed: bool,
}

impl Response {
    pub fn status(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn is_flushed(&self) -> bool { self.flushed }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// Sets a header, replacing any value already under `name`.
    pub fn header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.headers.insert(name, value);
        self
    }

    /// Appends raw bytes without touching the content type.
    pub fn write(&mut self, data: &[u8]) -> &mut Self {
        self.body.extend_from_slice(data);
        self
    }

    /// Appends text; content type `text/plain; charset=utf-8`.
    pub fn text(&mut self, text: &str) -> &mut Self {
        self.bytes(ContentType::Text, text.as_bytes())
    }

    /// Appends already-serialised JSON; content type `application/json`.
    pub fn json(&mut self, body: &[u8]) -> &mut Self {
        self.bytes(ContentType::Json, body)
    }

    pub fn bytes(&mut self, content_type: ContentType, body: &[u8]) -> &mut Self {
        self.header(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()))
            .write(body)
    }

    /// Drops everything written so far, keeping the status.
    pub fn clear_body(&mut self) -> &mut Self {
        self.body.clear();
        self
    }

    /// Produces the wire response the first time it is called; `None` after.
    pub(crate) fn flush(&mut self) -> Option<http::Response<Full<Bytes>>> {
        if self.flushed {
            return None;
        }
        self.flushed = true;

        let mut res = http::Response::new(Full::new(Bytes::from(std::mem::take(&mut self.body))));
        *res.status_mut() = self.status;
        *res.headers_mut() = std::mem::take(&mut self.headers);
        Some(res)
    }

    pub(crate) fn reset(&mut self) {
        self.status = StatusCode::OK;
        self.headers.clear();
        self.body.clear();
        self.flushed = false;
    }
}
