use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use axum::body::Body;
use axum::http::Request;
use axum::routing::any;
use axum::Router;

use crate::adapter::Adapter;
use crate::docs::Documentation;
use crate::error::{Error, Result};
use crate::handler::{HandlerValue, IntoHandler};

struct RouteEntry {
    path: String,
    handler: HandlerValue,
    adapter: Adapter,
    documentation: Vec<String>,
}

/// The route registry: paths mapped to compiled handler leaves.
///
/// Handlers are compiled when registered, so a signature that cannot be
/// classified is reported by [`ServeMux::handle`] rather than on the first
/// request.
#[derive(Default)]
pub struct ServeMux {
    routes: Vec<RouteEntry>,
}

/// Attaches documentation lines to a freshly registered route.
pub struct RouteDoc<'a> {
    documentation: &'a mut Vec<String>,
}

impl RouteDoc<'_> {
    pub fn doc(self, text: impl Into<String>) -> Self {
        self.documentation.push(text.into());
        self
    }
}

impl ServeMux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` on `path`, replacing any earlier registration of
    /// the same path.
    pub fn handle<M>(&mut self, path: &str, handler: impl IntoHandler<M>) -> Result<RouteDoc<'_>> {
        let route_error = |source: Error| Error::Route {
            path: path.to_string(),
            source: Box::new(source),
        };
        if !path.starts_with('/') {
            return Err(route_error(
                anyhow::anyhow!("path must start with '/'").into(),
            ));
        }
        self.check_routable(path)
            .map_err(|reason| route_error(anyhow::anyhow!(reason).into()))?;

        let handler = handler.into_handler();
        let adapter = handler.compile().map_err(route_error)?;
        tracing::debug!(path, "registered route");

        let entry = RouteEntry {
            path: path.to_string(),
            handler,
            adapter,
            documentation: Vec::new(),
        };
        let index = match self.routes.iter().position(|route| route.path == path) {
            Some(index) => {
                self.routes[index] = entry;
                index
            }
            None => {
                self.routes.push(entry);
                self.routes.len() - 1
            }
        };

        Ok(RouteDoc {
            documentation: &mut self.routes[index].documentation,
        })
    }

    /// Builds a scratch router over the registered paths plus `path`, so a
    /// path axum refuses (legacy `:id` captures, unbalanced braces, captures
    /// conflicting with another route) is reported here instead of by
    /// [`ServeMux::into_router`].
    fn check_routable(&self, path: &str) -> std::result::Result<(), String> {
        let paths: Vec<&str> = self
            .routes
            .iter()
            .map(|route| route.path.as_str())
            .filter(|existing| *existing != path)
            .chain(std::iter::once(path))
            .collect();
        panic::catch_unwind(AssertUnwindSafe(|| {
            paths.iter().fold(Router::<()>::new(), |router, path| {
                router.route(path, any(|| async {}))
            })
        }))
        .map(drop)
        .map_err(|payload| panic_message(payload.as_ref()))
    }

    /// Every route in registration order: path, registered handler and its
    /// documentation lines.
    pub fn walk(&self) -> impl Iterator<Item = (&str, &HandlerValue, &[String])> {
        self.routes.iter().map(|route| {
            (
                route.path.as_str(),
                &route.handler,
                route.documentation.as_slice(),
            )
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn documentation(&self, introduction: &[&str]) -> Result<Documentation> {
        Documentation::collect(self, introduction)
    }

    pub fn into_router(self) -> Router {
        self.routes
            .into_iter()
            .fold(Router::new(), |router, route| {
                let adapter = route.adapter;
                router.route(
                    &route.path,
                    any(move |req: Request<Body>| {
                        let adapter = adapter.clone();
                        async move { (*adapter)(req).await }
                    }),
                )
            })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "path rejected by the router".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::by_method::ByMethod;
    use crate::handler::Raw;

    fn raw(text: &'static str) -> Raw {
        Raw::new(move |_req: Request<Body>| async move { text })
    }

    #[test]
    fn reregistering_replaces_in_place() {
        let mut mux = ServeMux::new();
        mux.handle("/a", raw("a")).unwrap().doc("first");
        mux.handle("/b", raw("b")).unwrap();
        mux.handle("/a", ByMethod::new().get(raw("a2")))
            .unwrap()
            .doc("second")
            .doc("lines");

        let routes: Vec<_> = mux.walk().collect();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].0, "/a");
        assert!(matches!(routes[0].1, HandlerValue::Methods(_)));
        assert_eq!(routes[0].2, ["second".to_string(), "lines".to_string()]);
        assert_eq!(routes[1].0, "/b");
    }

    #[test]
    fn relative_paths_are_rejected_with_the_path() {
        let mut mux = ServeMux::new();
        let err = mux.handle("items", raw("x")).err().unwrap();
        assert_eq!(
            err.to_string(),
            "error while routing items: path must start with '/'"
        );
    }

    #[test]
    fn paths_the_router_refuses_are_rejected_at_registration() {
        let mut mux = ServeMux::new();
        for path in ["/items/:id", "/items/{id", "/files/*rest"] {
            let err = mux.handle(path, raw("x")).err().unwrap();
            assert!(
                matches!(&err, Error::Route { path: rejected, .. } if rejected == path),
                "{path}: {err}"
            );
        }
        assert!(mux.is_empty());
    }

    #[test]
    fn conflicting_captures_are_rejected() {
        let mut mux = ServeMux::new();
        mux.handle("/items/{id}", raw("by id")).unwrap();
        let err = mux.handle("/items/{name}", raw("by name")).err().unwrap();
        assert!(matches!(err, Error::Route { .. }));
        assert_eq!(mux.len(), 1);

        // re-registering the same path is a replacement, not a conflict
        mux.handle("/items/{id}", raw("again")).unwrap();
        mux.handle("/files/{*rest}", raw("files")).unwrap();
        let _router = mux.into_router();
    }
}
