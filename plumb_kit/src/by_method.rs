use std::fmt;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{ALLOW, CONTENT_TYPE};
use axum::http::{HeaderValue, Request, StatusCode};
use axum::response::Response;

use crate::adapter::{Adapter, BoxFuture};
use crate::error::{Error, Result};
use crate::handler::{HandlerValue, IntoHandler};

const METHOD_NOT_ALLOWED_BODY: &str = r#"{"error":"method not allowed"}"#;

/// The methods a [`ByMethod`] leaf dispatches on, in `Allow` header order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    pub const ALL: [Method; 6] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
        Method::Options,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    pub fn from_http(method: &axum::http::Method) -> Option<Method> {
        Method::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == method.as_str())
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A leaf holding one optional handler per method.
///
/// ```ignore
/// let items = ByMethod::new().get(list_items).post(create_item);
/// mux.handle("/items", items)?;
/// ```
#[derive(Clone, Default)]
pub struct ByMethod {
    slots: [Option<HandlerValue>; 6],
}

impl ByMethod {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<M>(mut self, method: Method, handler: impl IntoHandler<M>) -> Self {
        self.slots[method.index()] = Some(handler.into_handler());
        self
    }

    pub fn get<M>(self, handler: impl IntoHandler<M>) -> Self {
        self.on(Method::Get, handler)
    }

    pub fn post<M>(self, handler: impl IntoHandler<M>) -> Self {
        self.on(Method::Post, handler)
    }

    pub fn put<M>(self, handler: impl IntoHandler<M>) -> Self {
        self.on(Method::Put, handler)
    }

    pub fn patch<M>(self, handler: impl IntoHandler<M>) -> Self {
        self.on(Method::Patch, handler)
    }

    pub fn delete<M>(self, handler: impl IntoHandler<M>) -> Self {
        self.on(Method::Delete, handler)
    }

    pub fn options<M>(self, handler: impl IntoHandler<M>) -> Self {
        self.on(Method::Options, handler)
    }

    pub fn slot(&self, method: Method) -> Option<&HandlerValue> {
        self.slots[method.index()].as_ref()
    }

    /// Populated slots in method order.
    pub fn iter(&self) -> impl Iterator<Item = (Method, &HandlerValue)> {
        Method::ALL
            .into_iter()
            .filter_map(|method| self.slot(method).map(|handler| (method, handler)))
    }

    /// The `Allow` header value: populated methods joined by ", ".
    pub fn allow(&self) -> String {
        self.iter()
            .map(|(method, _)| method.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Compiles every populated slot once and returns the dispatching adapter.
    pub fn compile(&self) -> Result<Adapter> {
        let mut adapters: [Option<Adapter>; 6] = Default::default();
        for (method, handler) in self.iter() {
            let adapter = handler.compile().map_err(|source| Error::Method {
                method: method.as_str(),
                source: Box::new(source),
            })?;
            adapters[method.index()] = Some(adapter);
        }

        let allow = HeaderValue::from_str(&self.allow())
            .map_err(|err| anyhow::anyhow!("building Allow header: {err}"))?;
        let adapters = Arc::new(adapters);

        Ok(Arc::new(
            move |req: Request<Body>| -> BoxFuture<'static, Response> {
                let method = Method::from_http(req.method());
                match method.and_then(|method| adapters[method.index()].clone()) {
                    Some(adapter) => (*adapter)(req),
                    None => {
                        let response = unmatched(method, allow.clone());
                        Box::pin(async move { response })
                    }
                }
            },
        ))
    }
}

fn unmatched(method: Option<Method>, allow: HeaderValue) -> Response {
    let mut response = if method == Some(Method::Options) {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        response
    } else {
        let mut response = Response::new(Body::from(METHOD_NOT_ALLOWED_BODY));
        *response.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    };
    response.headers_mut().insert(ALLOW, allow);
    response
}

impl fmt::Debug for ByMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Raw;

    fn ok() -> Raw {
        Raw::new(|_req: Request<Body>| async { "ok" })
    }

    async fn send(adapter: &Adapter, method: &str) -> Response {
        let req = Request::builder()
            .method(method)
            .uri("/x")
            .body(Body::empty())
            .unwrap();
        (**adapter)(req).await
    }

    #[test]
    fn allow_lists_populated_methods_in_order() {
        let leaf = ByMethod::new().post(ok()).get(ok());
        assert_eq!(leaf.allow(), "GET, POST");
        assert_eq!(ByMethod::new().allow(), "");
    }

    #[tokio::test]
    async fn unmatched_methods_get_405_with_allow() {
        let adapter = ByMethod::new().get(ok()).post(ok()).compile().unwrap();

        let matched = send(&adapter, "GET").await;
        assert_eq!(matched.status(), StatusCode::OK);

        let response = send(&adapter, "DELETE").await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "GET, POST");

        let response = send(&adapter, "HEAD").await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn options_without_a_slot_is_no_content() {
        let adapter = ByMethod::new().get(ok()).compile().unwrap();
        let response = send(&adapter, "OPTIONS").await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[ALLOW], "GET");
    }

    #[tokio::test]
    async fn empty_leaf_allows_nothing() {
        let adapter = ByMethod::new().compile().unwrap();
        let response = send(&adapter, "GET").await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "");
    }
}
