//! Incoming request facade.
//!
//! The router never parses HTTP. It receives an already-parsed
//! `http::Request` with a fully buffered body and exposes the pieces handlers
//! need through [`Request`].

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};

/// An incoming HTTP request.
#[derive(Debug, Default)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    pub fn new(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// The query string without the leading `?`, undecoded.
    pub fn raw_query(&self) -> &str {
        self.uri.query().unwrap_or("")
    }

    /// First value of the query parameter `key`, percent-decoded.
    pub fn query(&self, key: &str) -> Option<String> {
        url::form_urlencoded::parse(self.raw_query().as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// Header value as text; `None` if absent or not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        Self::new(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str) -> Request {
        http::Request::builder()
            .method("POST")
            .uri(uri)
            .header("X-Trace", "abc")
            .body(Bytes::from_static(b"payload"))
            .unwrap()
            .into()
    }

    #[test]
    fn exposes_parts() {
        let req = request("/users/7?sort=name");
        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.path(), "/users/7");
        assert_eq!(req.raw_query(), "sort=name");
        assert_eq!(req.header("x-trace"), Some("abc"));
        assert_eq!(req.body(), b"payload");
    }

    #[test]
    fn query_is_decoded() {
        let req = request("/search?q=hello%20world&tag=a+b&tag=c");
        assert_eq!(req.query("q").as_deref(), Some("hello world"));
        assert_eq!(req.query("tag").as_deref(), Some("a b"));
        assert_eq!(req.query("missing"), None);
        assert_eq!(request("/").raw_query(), "");
    }
}
