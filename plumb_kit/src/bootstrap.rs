use axum::routing::get;
use axum::{Json, Router};

use crate::docs::Documentation;
use crate::error::Result;
use crate::mux::ServeMux;
use crate::openapi;

/// 从 ServeMux 直接构建 REST Router
pub fn rest_router(mux: ServeMux) -> Router {
    mux.into_router()
}

/// 构建 REST Router，并附带文档端点
///
/// Serves the documentation artifact at `/api-docs/endpoints.json` and the
/// OpenAPI document at `/api-docs/openapi.json` next to the registered routes.
pub fn rest_router_with_docs(
    mux: ServeMux,
    title: &str,
    version: &str,
    introduction: &[&str],
) -> Result<Router> {
    let documentation = mux.documentation(introduction)?;
    let description = documentation.introduction.join(" ");
    let openapi = openapi::build_openapi(&documentation, title, version, &description);
    Ok(mux
        .into_router()
        .merge(docs_router(documentation, openapi)))
}

fn docs_router(documentation: Documentation, openapi: utoipa::openapi::OpenApi) -> Router {
    Router::new()
        .route(
            "/api-docs/endpoints.json",
            get(move || {
                let documentation = documentation.clone();
                async move { Json(documentation) }
            }),
        )
        .route(
            "/api-docs/openapi.json",
            get(move || {
                let openapi = openapi.clone();
                async move { Json(openapi) }
            }),
        )
}
