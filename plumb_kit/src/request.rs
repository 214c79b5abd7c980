use axum::body::Bytes;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, Uri};

/// A request with its body already read, handed to every binder and
/// [`FromRequest`](crate::FromRequest) implementation.
#[derive(Debug)]
pub struct RequestContext {
    parts: Parts,
    body: Bytes,
    query: Vec<(String, String)>,
}

impl RequestContext {
    pub fn new(parts: Parts, body: Bytes) -> Self {
        let query = parts
            .uri
            .query()
            .and_then(|query| serde_urlencoded::from_str::<Vec<(String, String)>>(query).ok())
            .unwrap_or_default();
        RequestContext { parts, body, query }
    }

    pub fn parts(&self) -> &Parts {
        &self.parts
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Header value as text; `None` when absent or not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name)?.to_str().ok()
    }

    pub fn extensions(&self) -> &axum::http::Extensions {
        &self.parts.extensions
    }

    /// First value of the named query parameter.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn context(uri: &str) -> RequestContext {
        let (parts, _) = Request::builder()
            .uri(uri)
            .header("x-api-key", "secret")
            .body(())
            .unwrap()
            .into_parts();
        RequestContext::new(parts, Bytes::new())
    }

    #[test]
    fn query_returns_the_first_decoded_value() {
        let ctx = context("/items?id=a%20b&id=second&page=2");
        assert_eq!(ctx.query("id"), Some("a b"));
        assert_eq!(ctx.query("page"), Some("2"));
        assert_eq!(ctx.query("missing"), None);
    }

    #[test]
    fn headers_and_path_are_exposed() {
        let ctx = context("/items/list?x=1");
        assert_eq!(ctx.path(), "/items/list");
        assert_eq!(ctx.header("x-api-key"), Some("secret"));
        assert_eq!(*ctx.method(), Method::GET);
    }
}
